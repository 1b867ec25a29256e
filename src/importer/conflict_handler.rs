// ==========================================
// 系统初始化导入中心 - 冲突处理器
// ==========================================
// 职责: 检测同文件内重复主键 / 与已入库记录重复的主键
// 主键: ModuleDescriptor.key_column 对应的值
// ==========================================

use crate::domain::session::ValidatedRow;
use std::collections::{HashMap, HashSet};

/// 重复主键
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateKey {
    pub row_number: usize,
    pub key: String,
    /// 同文件内首次出现的行号（跨批次重复时为 None）
    pub first_row: Option<usize>,
}

pub struct ConflictHandler;

impl ConflictHandler {
    /// 检测同文件内重复主键
    ///
    /// # 返回
    /// - 重复记录列表（不包括第一次出现）
    pub fn detect_duplicates(&self, rows: &[ValidatedRow], key_column: &str) -> Vec<DuplicateKey> {
        let mut first_occurrence: HashMap<&str, usize> = HashMap::new();
        let mut duplicates = Vec::new();

        for row in rows {
            let Some(key) = row.values.get(key_column) else {
                continue;
            };
            match first_occurrence.get(key.as_str()) {
                Some(&first_row) => duplicates.push(DuplicateKey {
                    row_number: row.row_number,
                    key: key.clone(),
                    first_row: Some(first_row),
                }),
                None => {
                    first_occurrence.insert(key.as_str(), row.row_number);
                }
            }
        }

        duplicates
    }

    /// 检测与已入库记录重复的主键
    ///
    /// # 参数
    /// - existing_keys: 数据库中已存在的主键
    pub fn detect_existing(
        &self,
        rows: &[ValidatedRow],
        key_column: &str,
        existing_keys: &HashSet<String>,
    ) -> Vec<DuplicateKey> {
        rows.iter()
            .filter_map(|row| {
                let key = row.values.get(key_column)?;
                existing_keys.contains(key).then(|| DuplicateKey {
                    row_number: row.row_number,
                    key: key.clone(),
                    first_row: None,
                })
            })
            .collect()
    }
}
