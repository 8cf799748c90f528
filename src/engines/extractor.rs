// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

use crate::domain::models::job::JobMetadata;
use crate::domain::models::scrape_result::SelectorValue;
use crate::domain::models::selector::{SelectorConfig, SelectorKind};

/// 文本承载元素的选择器，供任务提取与分页爬取使用
const TEXT_BEARING: &str = "p, h1, h2, h3, h4, h5, h6, li, blockquote";

/// 对已加载页面内容应用一个选择器
///
/// 按选择器类型收集值数组。求值过程中的任何错误被就地捕获并
/// 作为`Failed`变体返回，不会影响同一目标的其余选择器。求值
/// 只读取内容快照，从不修改页面状态。
pub fn apply_selector(html: &str, config: &SelectorConfig) -> SelectorValue {
    match evaluate(html, config) {
        Ok(values) => SelectorValue::Values(values),
        Err(error) => SelectorValue::Failed { error },
    }
}

/// 对页面内容运行一组选择器
///
/// 返回按选择器id键控的结果映射；单个选择器的失败作为
/// `{"error": ...}`嵌入，不中断其余选择器。
pub fn run_selectors(html: &str, selectors: &[SelectorConfig]) -> BTreeMap<String, SelectorValue> {
    selectors
        .iter()
        .map(|config| (config.id.clone(), apply_selector(html, config)))
        .collect()
}

fn evaluate(html: &str, config: &SelectorConfig) -> Result<Vec<Value>, String> {
    let selector = Selector::parse(&config.selector)
        .map_err(|e| format!("invalid selector '{}': {}", config.selector, e))?;
    let document = Html::parse_document(html);

    let values = match config.kind {
        SelectorKind::Text => document
            .select(&selector)
            .map(|element| Value::String(element_text(&element)))
            .collect(),
        SelectorKind::Html => document
            .select(&selector)
            .map(|element| Value::String(element.html()))
            .collect(),
        SelectorKind::Attribute => {
            let name = config
                .attribute
                .as_deref()
                .ok_or_else(|| format!("selector '{}' is missing its attribute name", config.id))?;
            document
                .select(&selector)
                .map(|element| {
                    element
                        .value()
                        .attr(name)
                        .map(|v| Value::String(v.to_string()))
                        .unwrap_or(Value::Null)
                })
                .collect()
        }
        SelectorKind::List => {
            let item_path = config.list_item_selector.as_deref().ok_or_else(|| {
                format!("selector '{}' is missing its listItemSelector", config.id)
            })?;
            let item_selector = Selector::parse(item_path)
                .map_err(|e| format!("invalid listItemSelector '{}': {}", item_path, e))?;

            // 每个容器产生一个列表，展平一层后存储
            document
                .select(&selector)
                .flat_map(|container| {
                    container
                        .select(&item_selector)
                        .map(|item| Value::String(element_text(&item)))
                        .collect::<Vec<_>>()
                })
                .collect()
        }
    };

    Ok(values)
}

fn element_text(element: &scraper::ElementRef) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// 收集页面中文本承载元素的文本
pub fn page_text(html: &str) -> Vec<String> {
    let selector = Selector::parse(TEXT_BEARING).unwrap();
    let document = Html::parse_document(html);
    document
        .select(&selector)
        .map(|element| element_text(&element))
        .filter(|text| !text.is_empty())
        .collect()
}

/// 收集页面中的图片地址，相对地址按页面URL补全
pub fn page_images(html: &str, base: &Url) -> Vec<String> {
    collect_attr(html, "img[src]", "src", base)
}

/// 收集页面中的视频地址
pub fn page_videos(html: &str, base: &Url) -> Vec<String> {
    let mut sources = collect_attr(html, "video[src]", "src", base);
    sources.extend(collect_attr(html, "video source[src]", "src", base));
    sources
}

fn collect_attr(html: &str, path: &str, attr: &str, base: &Url) -> Vec<String> {
    let selector = Selector::parse(path).unwrap();
    let document = Html::parse_document(html);
    document
        .select(&selector)
        .filter_map(|element| element.value().attr(attr))
        .map(|value| {
            base.join(value)
                .map(|joined| joined.to_string())
                .unwrap_or_else(|_| value.to_string())
        })
        .collect()
}

/// 收集页面中的表格，结构为 表 → 行 → 单元格
pub fn page_tables(html: &str) -> Vec<Vec<Vec<String>>> {
    let table_selector = Selector::parse("table").unwrap();
    let row_selector = Selector::parse("tr").unwrap();
    let cell_selector = Selector::parse("th, td").unwrap();
    let document = Html::parse_document(html);

    document
        .select(&table_selector)
        .map(|table| {
            table
                .select(&row_selector)
                .map(|row| {
                    row.select(&cell_selector)
                        .map(|cell| element_text(&cell))
                        .collect::<Vec<_>>()
                })
                .filter(|cells| !cells.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|rows| !rows.is_empty())
        .collect()
}

/// 收集页面中的无序/有序列表，每个列表一组列表项文本
pub fn page_lists(html: &str) -> Vec<Vec<String>> {
    let list_selector = Selector::parse("ul, ol").unwrap();
    let item_selector = Selector::parse("li").unwrap();
    let document = Html::parse_document(html);

    document
        .select(&list_selector)
        .map(|list| {
            list.select(&item_selector)
                .map(|item| element_text(&item))
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|items| !items.is_empty())
        .collect()
}

/// 提取任务元数据：标题、描述、关键词与元素总数
pub fn page_metadata(html: &str) -> JobMetadata {
    let document = Html::parse_document(html);

    let title_selector = Selector::parse("title").unwrap();
    let description_selector = Selector::parse(r#"meta[name="description"]"#).unwrap();
    let keywords_selector = Selector::parse(r#"meta[name="keywords"]"#).unwrap();
    let all_selector = Selector::parse("*").unwrap();

    let page_title = document
        .select(&title_selector)
        .next()
        .map(|element| element_text(&element))
        .filter(|text| !text.is_empty());

    let page_description = document
        .select(&description_selector)
        .next()
        .and_then(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty());

    let page_keywords = document
        .select(&keywords_selector)
        .next()
        .and_then(|element| element.value().attr("content"))
        .map(|content| {
            content
                .split(',')
                .map(|keyword| keyword.trim().to_string())
                .filter(|keyword| !keyword.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let total_elements = document.select(&all_selector).count() as u64;

    JobMetadata {
        page_title,
        page_description,
        page_keywords,
        total_elements,
    }
}

/// 提取页面标题（批量结果元数据用）
pub fn page_title(html: &str) -> Option<String> {
    let selector = Selector::parse("title").unwrap();
    let document = Html::parse_document(html);
    document
        .select(&selector)
        .next()
        .map(|element| element_text(&element))
        .filter(|text| !text.is_empty())
}
