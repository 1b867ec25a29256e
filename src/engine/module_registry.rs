// ==========================================
// 系统初始化导入中心 - 模块描述注册表
// ==========================================
// 职责: 持有所有可导入模块的静态描述
// 约束: 进程启动时构建，之后以 Arc 只读共享（无全局单例）
// 自检: 缺失依赖 / 循环依赖只作为诊断数据上报，不阻断查询
// ==========================================

use crate::domain::module::ModuleDescriptor;
use crate::engine::dependency_resolver::detect_cycles;
use crate::i18n::t_with_args;
use crate::importer::error::{ImportError, ImportResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ==========================================
// CircularDependency - 循环依赖路径
// ==========================================
// path 首尾相同，如 [A, B, A]；自依赖为 [A, A]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircularDependency {
    pub path: Vec<String>,
}

// ==========================================
// RegistryHealth - 注册表自检结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryHealth {
    pub is_healthy: bool,
    pub validation_errors: Vec<String>,
    pub circular_dependencies: Vec<CircularDependency>,
}

// ==========================================
// ModuleRegistry
// ==========================================
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    services: Vec<ModuleDescriptor>,
    index: HashMap<String, usize>,
    validation_errors: Vec<String>,
    circular_dependencies: Vec<CircularDependency>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 批量注册（启动装配用）
    pub fn with_modules(descriptors: Vec<ModuleDescriptor>) -> ImportResult<Self> {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    /// 注册模块
    ///
    /// # 错误
    /// - DuplicateModule: module id 已注册
    /// - InvalidSchema: 列定义的 pattern 无法编译
    pub fn register(&mut self, descriptor: ModuleDescriptor) -> ImportResult<()> {
        if self.index.contains_key(&descriptor.module) {
            return Err(ImportError::DuplicateModule(descriptor.module));
        }

        for column in &descriptor.columns {
            if let Some(pattern) = &column.pattern {
                Regex::new(pattern).map_err(|e| ImportError::InvalidSchema {
                    module: descriptor.module.clone(),
                    column: column.name.clone(),
                    message: t_with_args(
                        "registry.invalid_pattern",
                        &[("column", &column.name), ("error", &e.to_string())],
                    ),
                })?;
            }
        }

        tracing::debug!(
            module = %descriptor.module,
            domain = %descriptor.domain,
            dependencies = ?descriptor.dependencies,
            priority = descriptor.priority,
            "注册导入模块"
        );

        self.index
            .insert(descriptor.module.clone(), self.services.len());
        self.services.push(descriptor);
        self.refresh_diagnostics();
        Ok(())
    }

    fn refresh_diagnostics(&mut self) {
        let mut errors = Vec::new();
        for descriptor in &self.services {
            for dependency in &descriptor.dependencies {
                if !self.index.contains_key(dependency) {
                    errors.push(t_with_args(
                        "registry.missing_dependency",
                        &[("module", &descriptor.module), ("dependency", dependency)],
                    ));
                }
            }
        }
        self.validation_errors = errors;
        self.circular_dependencies = detect_cycles(&self.services);
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 全部模块（注册顺序）
    pub fn get_all_services(&self) -> &[ModuleDescriptor] {
        &self.services
    }

    pub fn get_service(&self, module_name: &str) -> Option<&ModuleDescriptor> {
        self.index.get(module_name).map(|&i| &self.services[i])
    }

    /// 同 get_service，未注册时返回 ModuleNotFound
    pub fn require_service(&self, module_name: &str) -> ImportResult<&ModuleDescriptor> {
        self.get_service(module_name)
            .ok_or_else(|| ImportError::ModuleNotFound(module_name.to_string()))
    }

    pub fn contains(&self, module_name: &str) -> bool {
        self.index.contains_key(module_name)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn get_services_by_domain(&self, domain: &str) -> Vec<&ModuleDescriptor> {
        self.services
            .iter()
            .filter(|d| d.domain.eq_ignore_ascii_case(domain))
            .collect()
    }

    pub fn get_services_by_tag(&self, tag: &str) -> Vec<&ModuleDescriptor> {
        self.services.iter().filter(|d| d.has_tag(tag)).collect()
    }

    /// priority 升序，其次 module id
    pub fn get_services_by_priority(&self) -> Vec<&ModuleDescriptor> {
        let mut sorted: Vec<&ModuleDescriptor> = self.services.iter().collect();
        sorted.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.module.cmp(&b.module)));
        sorted
    }

    /// 反向依赖图: module -> 直接依赖它的模块（排序）
    ///
    /// 只包含已注册模块；无下游的模块映射为空列表
    pub fn get_dependency_graph(&self) -> BTreeMap<String, Vec<String>> {
        let mut graph: BTreeMap<String, Vec<String>> = self
            .services
            .iter()
            .map(|d| (d.module.clone(), Vec::new()))
            .collect();

        for descriptor in &self.services {
            for dependency in &descriptor.dependencies {
                if let Some(dependents) = graph.get_mut(dependency) {
                    dependents.push(descriptor.module.clone());
                }
            }
        }
        for dependents in graph.values_mut() {
            dependents.sort();
            dependents.dedup();
        }
        graph
    }

    // ==========================================
    // 自检
    // ==========================================

    pub fn is_healthy(&self) -> bool {
        self.validation_errors.is_empty() && self.circular_dependencies.is_empty()
    }

    pub fn get_validation_errors(&self) -> &[String] {
        &self.validation_errors
    }

    pub fn get_circular_dependencies(&self) -> &[CircularDependency] {
        &self.circular_dependencies
    }

    pub fn health(&self) -> RegistryHealth {
        RegistryHealth {
            is_healthy: self.is_healthy(),
            validation_errors: self.validation_errors.clone(),
            circular_dependencies: self.circular_dependencies.clone(),
        }
    }
}
