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

use axum::{
    extract::Multipart,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use url::Url;

use crate::presentation::errors::AppError;

pub async fn upload_urls(mut multipart: Multipart) -> Result<impl IntoResponse, AppError> {
    while let Some(field) = multipart.next_field().await? {
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(|ct| ct.to_string());
        let bytes = field.bytes().await?;

        let candidates = parse_url_file(&bytes, &filename, content_type.as_deref());

        let (valid, invalid): (Vec<String>, Vec<String>) = candidates
            .into_iter()
            .partition(|candidate| is_valid_url(candidate));
        let total_valid = valid.len();
        let total_invalid = invalid.len();

        return Ok((
            StatusCode::OK,
            Json(json!({
                "success": true,
                "validUrls": valid,
                "invalidUrls": invalid,
                "totalValid": total_valid,
                "totalInvalid": total_invalid
            })),
        )
            .into_response());
    }

    Ok((
        StatusCode::BAD_REQUEST,
        Json(json!({
            "success": false,
            "error": "no file field in multipart body"
        })),
    )
        .into_response())
}

fn is_valid_url(candidate: &str) -> bool {
    Url::parse(candidate)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false)
}

/// 按文件类型解析URL清单
///
/// json：字符串数组或`{"urls": [...]}`；csv：每条记录的第一列
/// （跳过`url`表头）；其余按纯文本逐行处理。空行与`#`注释行
/// 被忽略。
pub(crate) fn parse_url_file(bytes: &[u8], filename: &str, content_type: Option<&str>) -> Vec<String> {
    let lower = filename.to_ascii_lowercase();
    let is_json = lower.ends_with(".json")
        || content_type.is_some_and(|ct| ct.contains("json"));
    let is_csv = lower.ends_with(".csv") || content_type.is_some_and(|ct| ct.contains("csv"));

    if is_json {
        return parse_json_urls(bytes);
    }
    if is_csv {
        return parse_csv_urls(bytes);
    }
    parse_text_urls(bytes)
}

fn parse_json_urls(bytes: &[u8]) -> Vec<String> {
    let Ok(value) = serde_json::from_slice::<Value>(bytes) else {
        return Vec::new();
    };

    let items = match &value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("urls") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    items
        .iter()
        .filter_map(|item| item.as_str())
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect()
}

fn parse_csv_urls(bytes: &[u8]) -> Vec<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut urls = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let Ok(record) = record else { continue };
        let Some(first) = record.get(0) else { continue };
        let first = first.trim();
        if first.is_empty() {
            continue;
        }
        // 跳过表头
        if index == 0 && first.eq_ignore_ascii_case("url") {
            continue;
        }
        urls.push(first.to_string());
    }
    urls
}

fn parse_text_urls(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_array_and_wrapper_object_both_parse() {
        let plain = br#"["https://a.example", "https://b.example"]"#;
        assert_eq!(parse_url_file(plain, "urls.json", None).len(), 2);

        let wrapped = br#"{"urls": ["https://a.example"]}"#;
        assert_eq!(parse_url_file(wrapped, "urls.json", None).len(), 1);
    }

    #[test]
    fn csv_takes_first_column_and_skips_header() {
        let bytes = b"url,notes\nhttps://a.example,first\nhttps://b.example,second\n";
        let urls = parse_url_file(bytes, "urls.csv", None);
        assert_eq!(urls, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn text_files_ignore_blank_and_comment_lines() {
        let bytes = b"https://a.example\n\n# comment\nhttps://b.example\n";
        let urls = parse_url_file(bytes, "urls.txt", None);
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn content_type_decides_when_extension_is_missing() {
        let bytes = br#"["https://a.example"]"#;
        let urls = parse_url_file(bytes, "upload", Some("application/json"));
        assert_eq!(urls.len(), 1);
    }

    #[test]
    fn validation_partitions_urls() {
        assert!(is_valid_url("https://example.com/page"));
        assert!(!is_valid_url("not a url"));
        assert!(!is_valid_url("ftp://example.com"));
        assert!(!is_valid_url("/relative/path"));
    }
}
