// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::models::error::ScrapeError;

/// 提取选择器配置
///
/// 描述如何从已加载的页面中提取一项结构化数据。每个选择器
/// 在一个目标的选择器集合内通过`id`唯一标识，提取结果以该
/// `id`为键写入抓取结果的数据映射。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorConfig {
    /// 选择器唯一标识符，作为结果数据映射的键
    pub id: String,
    /// 人类可读名称，仅用于管理界面展示
    #[serde(default)]
    pub name: Option<String>,
    /// CSS选择器路径
    pub selector: String,
    /// 提取类型，决定从匹配元素中取出什么内容
    #[serde(rename = "type", default)]
    pub kind: SelectorKind,
    /// 属性名，`kind = Attribute`时必填
    #[serde(default)]
    pub attribute: Option<String>,
    /// 列表项选择器，`kind = List`时必填
    #[serde(default)]
    pub list_item_selector: Option<String>,
}

/// 提取类型枚举
///
/// 封闭的四种提取变体。未知的`type`字符串在反序列化时即报错，
/// 未指定时退化为文本提取。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SelectorKind {
    /// 文本提取，收集所有匹配元素去除首尾空白后的文本
    #[default]
    Text,
    /// HTML提取，收集所有匹配元素序列化后的外层标记
    Html,
    /// 属性提取，收集所有匹配元素上指定属性的值
    Attribute,
    /// 列表提取，对每个匹配元素收集其后代列表项的文本
    List,
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SelectorKind::Text => write!(f, "text"),
            SelectorKind::Html => write!(f, "html"),
            SelectorKind::Attribute => write!(f, "attribute"),
            SelectorKind::List => write!(f, "list"),
        }
    }
}

impl SelectorConfig {
    /// 校验选择器配置
    ///
    /// 在提取运行之前强制执行每种类型的必填子字段约束，
    /// 并拒绝`scraper`无法解析的CSS路径。
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 配置有效
    /// * `Err(ScrapeError::InvalidSelector)` - 配置无效
    pub fn validate(&self) -> Result<(), ScrapeError> {
        if self.id.trim().is_empty() {
            return Err(ScrapeError::InvalidSelector(
                "selector id cannot be empty".to_string(),
            ));
        }

        if self.selector.trim().is_empty() {
            return Err(ScrapeError::InvalidSelector(format!(
                "selector '{}' has an empty CSS path",
                self.id
            )));
        }

        Selector::parse(&self.selector).map_err(|e| {
            ScrapeError::InvalidSelector(format!(
                "selector '{}' has an invalid CSS path: {}",
                self.id, e
            ))
        })?;

        match self.kind {
            SelectorKind::Attribute => {
                let has_attribute = self
                    .attribute
                    .as_deref()
                    .is_some_and(|a| !a.trim().is_empty());
                if !has_attribute {
                    return Err(ScrapeError::InvalidSelector(format!(
                        "selector '{}' has type=attribute but no attribute name",
                        self.id
                    )));
                }
            }
            SelectorKind::List => {
                let item_selector = self
                    .list_item_selector
                    .as_deref()
                    .filter(|s| !s.trim().is_empty())
                    .ok_or_else(|| {
                        ScrapeError::InvalidSelector(format!(
                            "selector '{}' has type=list but no listItemSelector",
                            self.id
                        ))
                    })?;

                Selector::parse(item_selector).map_err(|e| {
                    ScrapeError::InvalidSelector(format!(
                        "selector '{}' has an invalid listItemSelector: {}",
                        self.id, e
                    ))
                })?;
            }
            SelectorKind::Text | SelectorKind::Html => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(kind: SelectorKind) -> SelectorConfig {
        SelectorConfig {
            id: "title".to_string(),
            name: None,
            selector: "h1".to_string(),
            kind,
            attribute: None,
            list_item_selector: None,
        }
    }

    #[test]
    fn text_selector_is_valid() {
        assert!(base(SelectorKind::Text).validate().is_ok());
    }

    #[test]
    fn attribute_selector_requires_attribute_name() {
        let mut cfg = base(SelectorKind::Attribute);
        assert!(cfg.validate().is_err());

        cfg.attribute = Some("  ".to_string());
        assert!(cfg.validate().is_err());

        cfg.attribute = Some("href".to_string());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn list_selector_requires_item_selector() {
        let mut cfg = base(SelectorKind::List);
        assert!(cfg.validate().is_err());

        cfg.list_item_selector = Some("li".to_string());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn invalid_css_path_is_rejected() {
        let mut cfg = base(SelectorKind::Text);
        cfg.selector = "div[".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_id_is_rejected() {
        let mut cfg = base(SelectorKind::Text);
        cfg.id = "".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_type_defaults_to_text() {
        let cfg: SelectorConfig =
            serde_json::from_str(r#"{"id":"title","selector":"h1"}"#).unwrap();
        assert_eq!(cfg.kind, SelectorKind::Text);
    }

    #[test]
    fn unknown_type_is_a_deserialization_error() {
        let parsed: Result<SelectorConfig, _> =
            serde_json::from_str(r#"{"id":"x","selector":"h1","type":"regex"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn camel_case_wire_names() {
        let cfg: SelectorConfig = serde_json::from_str(
            r#"{"id":"items","selector":"ul.menu","type":"list","listItemSelector":"li"}"#,
        )
        .unwrap();
        assert_eq!(cfg.kind, SelectorKind::List);
        assert_eq!(cfg.list_item_selector.as_deref(), Some("li"));
    }
}
