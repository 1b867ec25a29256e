// ==========================================
// 系统初始化导入中心 - 操作日志领域模型
// ==========================================
// 红线: 所有改变数据的导入操作必须留痕
// 对齐: action_log 表
// ==========================================

use crate::domain::job::ImportContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,
    pub action_type: String,          // 存储为字符串（ActionType::as_str）
    pub action_ts: DateTime<Utc>,
    pub actor: String,
    pub actor_name: Option<String>,
    pub module_name: String,
    pub job_id: Option<String>,
    pub session_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub payload_json: Option<JsonValue>,
    pub detail: Option<String>,
}

impl ActionLog {
    pub fn new(
        action_id: String,
        action_type: ActionType,
        action_ts: DateTime<Utc>,
        module_name: &str,
        ctx: &ImportContext,
    ) -> Self {
        Self {
            action_id,
            action_type: action_type.as_str().to_string(),
            action_ts,
            actor: ctx.user_id.clone(),
            actor_name: ctx.user_name.clone(),
            module_name: module_name.to_string(),
            job_id: None,
            session_id: None,
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.clone(),
            payload_json: None,
            detail: None,
        }
    }

    pub fn with_job(mut self, job_id: &str) -> Self {
        self.job_id = Some(job_id.to_string());
        self
    }

    pub fn with_session(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload_json = Some(payload);
        self
    }

    pub fn with_detail(mut self, detail: String) -> Self {
        self.detail = Some(detail);
        self
    }
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    ValidateFile,   // 上传校验
    ImportStart,    // 开始导入
    ImportComplete, // 导入完成
    ImportFail,     // 导入失败
    Rollback,       // 回滚
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::ValidateFile => "VALIDATE_FILE",
            ActionType::ImportStart => "IMPORT_START",
            ActionType::ImportComplete => "IMPORT_COMPLETE",
            ActionType::ImportFail => "IMPORT_FAIL",
            ActionType::Rollback => "ROLLBACK",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "VALIDATE_FILE" => Some(ActionType::ValidateFile),
            "IMPORT_START" => Some(ActionType::ImportStart),
            "IMPORT_COMPLETE" => Some(ActionType::ImportComplete),
            "IMPORT_FAIL" => Some(ActionType::ImportFail),
            "ROLLBACK" => Some(ActionType::Rollback),
            _ => None,
        }
    }
}
