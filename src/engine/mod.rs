// ==========================================
// 系统初始化导入中心 - 引擎层
// ==========================================
// 职责: 模块注册、依赖排序、循环检测
// 红线: Engine 不拼 SQL, 所有排序必须输出 reason
// ==========================================

pub mod builtin_modules;
pub mod dependency_resolver;
pub mod module_registry;

// 重导出核心引擎
pub use dependency_resolver::{detect_cycles, DependencyResolver, ImportOrderEntry};
pub use module_registry::{CircularDependency, ModuleRegistry, RegistryHealth};
