// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::models::error::ScrapeError;
use crate::utils::validators::validate_identifier;

/// 目标表配置
///
/// 描述抓取结果到关系表的映射：目标表名、选择器id到列名的
/// 映射，以及是否附带页面元数据列。表名与列名在进入任何
/// DDL/DML之前都必须通过标识符白名单校验。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    /// 目标表名
    pub table: String,
    /// 选择器id → 列名
    #[serde(default)]
    pub columns: BTreeMap<String, String>,
    /// 附加选项
    #[serde(default)]
    pub options: DatabaseOptions,
}

/// 持久化附加选项
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseOptions {
    /// 是否附带页面元数据列（标题、状态码、内容类型、响应时间）
    #[serde(default)]
    pub include_metadata: bool,
}

impl DatabaseConfig {
    /// 校验全部标识符
    ///
    /// 表名与每个映射列名都必须匹配安全标识符模式，否则拒绝，
    /// 原始输入永远不会出现在SQL文本的标识符位置。
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 全部标识符安全
    /// * `Err(ScrapeError::Database)` - 存在不安全标识符
    pub fn validate(&self) -> Result<(), ScrapeError> {
        validate_identifier(&self.table)?;
        for column in self.columns.values() {
            validate_identifier(column)?;
        }
        if self.columns.is_empty() {
            return Err(ScrapeError::Database(
                "no selector-to-column mappings configured".to_string(),
            ));
        }
        Ok(())
    }
}
