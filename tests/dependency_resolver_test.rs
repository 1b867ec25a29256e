// ==========================================
// 模块注册表 / 依赖排序 集成测试
// ==========================================
// 测试范围:
// 1. 排序确定性与依赖优先
// 2. 循环依赖 [A, B, A] 只上报一次，注册表仍可查询
// 3. 缺失依赖的自检错误
// ==========================================

mod test_helpers;

use system_init_import::engine::builtin_modules::inventory_modules;
use system_init_import::engine::{DependencyResolver, ModuleRegistry};
use system_init_import::ImportError;
use test_helpers::simple_module;

#[test]
fn test_import_order_is_deterministic() {
    let registry = ModuleRegistry::with_modules(inventory_modules()).unwrap();
    let resolver = DependencyResolver::new(&registry);

    let first = resolver.get_import_order_with_reasons();
    for _ in 0..10 {
        assert_eq!(resolver.get_import_order_with_reasons(), first);
    }

    // 注册顺序打乱后结果不变
    let mut reversed = inventory_modules();
    reversed.reverse();
    let registry2 = ModuleRegistry::with_modules(reversed).unwrap();
    assert_eq!(
        DependencyResolver::new(&registry2).get_import_order_with_reasons(),
        first
    );
}

#[test]
fn test_dependencies_come_first() {
    let registry = ModuleRegistry::with_modules(vec![
        simple_module("drug_prices", &["drugs"]),
        simple_module("drugs", &[]),
    ])
    .unwrap();
    let order = DependencyResolver::new(&registry).get_import_order_with_reasons();

    let names: Vec<_> = order.iter().map(|e| e.module.as_str()).collect();
    assert_eq!(names, vec!["drugs", "drug_prices"]);
    assert!(order[1].reason.contains("drugs"));
    assert!(!order[0].reason.contains("drug_prices"));
}

#[test]
fn test_cycle_reported_once_and_registry_still_usable() {
    let registry = ModuleRegistry::with_modules(vec![
        simple_module("A", &["B"]),
        simple_module("B", &["A"]),
        simple_module("C", &[]),
    ])
    .unwrap();

    let cycles = registry.get_circular_dependencies();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].path, vec!["A", "B", "A"]);
    assert!(!registry.is_healthy());

    assert_eq!(registry.get_all_services().len(), 3);
    let order = DependencyResolver::new(&registry).get_import_order();
    assert_eq!(order.len(), 3);
}

#[test]
fn test_self_dependency_is_cycle() {
    let registry = ModuleRegistry::with_modules(vec![simple_module("A", &["A"])]).unwrap();
    let cycles = registry.get_circular_dependencies();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].path, vec!["A", "A"]);
}

#[test]
fn test_missing_dependency_is_validation_error() {
    let registry = ModuleRegistry::with_modules(vec![simple_module("drug_prices", &["drugs"])]).unwrap();

    assert!(!registry.is_healthy());
    let errors = registry.get_validation_errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("drug_prices"));
    assert!(errors[0].contains("drugs"));
    assert!(registry.get_service("drug_prices").is_some());
}

#[test]
fn test_duplicate_registration_rejected() {
    let mut registry = ModuleRegistry::new();
    registry.register(simple_module("drugs", &[])).unwrap();
    let err = registry.register(simple_module("drugs", &[])).unwrap_err();
    assert!(matches!(err, ImportError::DuplicateModule(ref m) if m == "drugs"));
}
