// ==========================================
// 系统初始化导入中心 - 导入任务仓储
// ==========================================
// 对齐: import_job 表
// 状态写入一律 compare-and-set: WHERE status = 旧状态
// ==========================================

mod core;
mod queries;

#[cfg(test)]
mod tests;

pub use core::ImportJobRepository;
