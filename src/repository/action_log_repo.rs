// ==========================================
// 系统初始化导入中心 - 操作日志数据仓储
// ==========================================
// 对齐: action_log 表
// 红线: 所有改变数据的导入操作必须记录
// ==========================================

mod core;
mod queries;

#[cfg(test)]
mod tests;

pub use core::ActionLogRepository;
