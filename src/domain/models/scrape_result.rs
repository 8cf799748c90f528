// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// 单个目标的抓取结果
///
/// 批量抓取响应中的一项。失败结果的`data`为空且`error`必填；
/// 成功结果的`data`键集合是目标选择器id集合的子集。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapingResult {
    /// 目标URL
    pub url: String,
    /// 结果生成时间
    pub timestamp: DateTime<Utc>,
    /// 该目标是否抓取成功
    pub success: bool,
    /// 按选择器id键控的提取结果
    #[serde(default)]
    pub data: BTreeMap<String, SelectorValue>,
    /// 页面元数据
    #[serde(default)]
    pub metadata: PageMetadata,
    /// 截图数据（base64编码），仅在请求截图时存在
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    /// 目标级错误信息，仅在`success = false`时存在
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 单个选择器的提取结果
///
/// 提取成功时为值数组；单个选择器求值失败被就地捕获，
/// 以`{"error": ...}`形式嵌入数据映射，不影响同目标的
/// 其余选择器。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectorValue {
    /// 提取出的值列表
    Values(Vec<Value>),
    /// 该选择器的求值错误
    Failed {
        /// 错误信息
        error: String,
    },
}

impl SelectorValue {
    pub fn is_failed(&self) -> bool {
        matches!(self, SelectorValue::Failed { .. })
    }

    /// 追加另一页提取出的值（分页爬取时合并用）
    pub fn extend_values(&mut self, more: Vec<Value>) {
        if let SelectorValue::Values(values) = self {
            values.extend(more);
        }
    }
}

/// 页面元数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    /// 页面标题
    pub page_title: Option<String>,
    /// HTTP状态码
    pub status_code: u16,
    /// 内容类型
    pub content_type: Option<String>,
    /// 响应时间（毫秒）
    pub response_time_ms: u64,
}

impl ScrapingResult {
    /// 构造一个失败结果
    ///
    /// 失败结果的数据映射保持为空，错误信息记录在`error`字段，
    /// 批次中的其余目标不受影响。
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timestamp: Utc::now(),
            success: false,
            data: BTreeMap::new(),
            metadata: PageMetadata::default(),
            screenshot: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failed_result_has_empty_data_and_error() {
        let result = ScrapingResult::failed("https://bad.example", "dns failure");
        assert!(!result.success);
        assert!(result.data.is_empty());
        assert!(result.error.as_deref().unwrap().contains("dns failure"));
    }

    #[test]
    fn selector_value_serializes_untagged() {
        let values = SelectorValue::Values(vec![json!("Example Title")]);
        assert_eq!(
            serde_json::to_value(&values).unwrap(),
            json!(["Example Title"])
        );

        let failed = SelectorValue::Failed {
            error: "boom".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({"error": "boom"})
        );
    }

    #[test]
    fn extend_values_appends_only_to_value_variant() {
        let mut values = SelectorValue::Values(vec![json!("a")]);
        values.extend_values(vec![json!("b")]);
        match &values {
            SelectorValue::Values(v) => assert_eq!(v.len(), 2),
            _ => unreachable!(),
        }

        let mut failed = SelectorValue::Failed {
            error: "boom".to_string(),
        };
        failed.extend_values(vec![json!("b")]);
        assert!(failed.is_failed());
    }
}
