// ==========================================
// 系统初始化导入中心 - 依赖图解析引擎
// ==========================================
// 职责: 计算导入顺序（依赖先于被依赖）、检测循环依赖、输出排序原因
// 排序: DFS 拓扑序；同层按 priority 升序，再按 module id 字典序
// 红线: 结果必须确定（不依赖 HashMap 迭代顺序）；所有排序必须输出 reason
// 循环: 仅作诊断上报，不中断排序
// ==========================================

use crate::domain::module::ModuleDescriptor;
use crate::engine::module_registry::{CircularDependency, ModuleRegistry};
use crate::i18n::{t, t_with_args};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ==========================================
// ImportOrderEntry - 排序结果（含原因）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOrderEntry {
    pub module: String,
    pub reason: String,
}

// ==========================================
// DependencyResolver
// ==========================================
pub struct DependencyResolver<'a> {
    registry: &'a ModuleRegistry,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(registry: &'a ModuleRegistry) -> Self {
        Self { registry }
    }

    /// 按 (priority, module) 排序的描述列表
    fn sorted_descriptors(&self) -> Vec<&'a ModuleDescriptor> {
        let mut sorted: Vec<&ModuleDescriptor> = self.registry.get_all_services().iter().collect();
        sorted.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.module.cmp(&b.module)));
        sorted
    }

    /// 导入顺序（仅 module id）
    pub fn get_import_order(&self) -> Vec<String> {
        let mut order: Vec<String> = Vec::with_capacity(self.registry.len());
        let mut visited: HashSet<&str> = HashSet::new();
        let mut on_stack: HashSet<&str> = HashSet::new();

        for descriptor in self.sorted_descriptors() {
            self.visit(descriptor, &mut visited, &mut on_stack, &mut order);
        }
        order
    }

    fn visit(
        &self,
        descriptor: &'a ModuleDescriptor,
        visited: &mut HashSet<&'a str>,
        on_stack: &mut HashSet<&'a str>,
        order: &mut Vec<String>,
    ) {
        let name = descriptor.module.as_str();
        // 已输出，或处于当前路径（循环，跳过该边）
        if visited.contains(name) || on_stack.contains(name) {
            return;
        }
        on_stack.insert(name);

        let mut deps: Vec<&ModuleDescriptor> = descriptor
            .dependencies
            .iter()
            .filter_map(|d| self.registry.get_service(d))
            .collect();
        deps.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.module.cmp(&b.module)));
        for dep in deps {
            self.visit(dep, visited, on_stack, order);
        }

        on_stack.remove(name);
        visited.insert(name);
        order.push(descriptor.module.clone());
    }

    /// 导入顺序 + 原因
    ///
    /// - 无依赖: "no dependencies"
    /// - 有依赖: "depends on X, Y"
    /// - 依赖未注册或因循环未能排在前面: 追加 "(unresolved: Z)"
    pub fn get_import_order_with_reasons(&self) -> Vec<ImportOrderEntry> {
        let order = self.get_import_order();
        let position: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(i, m)| (m.as_str(), i))
            .collect();

        order
            .iter()
            .enumerate()
            .filter_map(|(i, module)| {
                let descriptor = self.registry.get_service(module)?;
                Some(ImportOrderEntry {
                    module: module.clone(),
                    reason: explain(descriptor, i, &position),
                })
            })
            .collect()
    }
}

fn explain(descriptor: &ModuleDescriptor, index: usize, position: &HashMap<&str, usize>) -> String {
    if descriptor.dependencies.is_empty() {
        return t("resolver.no_dependencies");
    }

    let unresolved: Vec<&str> = descriptor
        .dependencies
        .iter()
        .map(|d| d.as_str())
        .filter(|d| position.get(d).map_or(true, |&p| p >= index))
        .collect();

    let mut reason = t_with_args(
        "resolver.depends_on",
        &[("modules", &descriptor.dependencies.join(", "))],
    );
    if !unresolved.is_empty() {
        reason.push_str(" (");
        reason.push_str(&t_with_args(
            "resolver.unresolved",
            &[("modules", &unresolved.join(", "))],
        ));
        reason.push(')');
    }
    reason
}

// ==========================================
// 循环依赖检测
// ==========================================

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// 检测循环依赖
///
/// DFS + 当前路径栈；遇到仍在栈上的节点即记录 [起点 .. 终点, 起点]。
/// 每个环只上报一次（按旋转归一去重），未注册的依赖忽略。
pub fn detect_cycles(descriptors: &[ModuleDescriptor]) -> Vec<CircularDependency> {
    let by_name: HashMap<&str, &ModuleDescriptor> =
        descriptors.iter().map(|d| (d.module.as_str(), d)).collect();

    let mut roots: Vec<&str> = by_name.keys().copied().collect();
    roots.sort_unstable();

    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut path: Vec<&str> = Vec::new();
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut cycles = Vec::new();

    for root in roots {
        if !marks.contains_key(root) {
            walk(root, &by_name, &mut marks, &mut path, &mut seen, &mut cycles);
        }
    }
    cycles
}

fn walk<'a>(
    node: &'a str,
    by_name: &HashMap<&'a str, &'a ModuleDescriptor>,
    marks: &mut HashMap<&'a str, Mark>,
    path: &mut Vec<&'a str>,
    seen: &mut HashSet<Vec<String>>,
    cycles: &mut Vec<CircularDependency>,
) {
    marks.insert(node, Mark::Visiting);
    path.push(node);

    if let Some(descriptor) = by_name.get(node) {
        for dep in &descriptor.dependencies {
            let Some((&dep, _)) = by_name.get_key_value(dep.as_str()) else {
                continue;
            };
            match marks.get(dep) {
                Some(Mark::Visiting) => {
                    if let Some(start) = path.iter().position(|n| *n == dep) {
                        let ring: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
                        if seen.insert(canonical_ring(&ring)) {
                            let mut full = ring;
                            full.push(dep.to_string());
                            cycles.push(CircularDependency { path: full });
                        }
                    }
                }
                Some(Mark::Done) => {}
                None => walk(dep, by_name, marks, path, seen, cycles),
            }
        }
    }

    path.pop();
    marks.insert(node, Mark::Done);
}

/// 环的归一表示：旋转到字典序最小的节点开头
fn canonical_ring(ring: &[String]) -> Vec<String> {
    let Some(min_index) = ring
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(i, _)| i)
    else {
        return Vec::new();
    };
    ring[min_index..]
        .iter()
        .chain(ring[..min_index].iter())
        .cloned()
        .collect()
}
