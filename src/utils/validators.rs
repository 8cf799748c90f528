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

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::models::error::ScrapeError;

/// SQL标识符白名单模式
///
/// 字母或下划线开头，只允许字母、数字、下划线，长度上限63
/// （PostgreSQL标识符长度限制）。
static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").unwrap());

/// 校验SQL标识符
///
/// 表名与列名在被插入任何DDL/DML文本之前必须通过本校验，
/// 不匹配白名单模式的输入一律拒绝。
///
/// # 返回值
///
/// * `Ok(())` - 标识符安全
/// * `Err(ScrapeError::Database)` - 标识符不安全
pub fn validate_identifier(name: &str) -> Result<(), ScrapeError> {
    if IDENTIFIER_RE.is_match(name) {
        Ok(())
    } else {
        Err(ScrapeError::Database(format!(
            "unsafe identifier rejected: {:?}",
            name
        )))
    }
}

/// 清洗导出文件名
///
/// 仅保留`[A-Za-z0-9._-]`，其余字符替换为下划线，去掉前导点，
/// 清洗后为空时退化为`export`。结果只会被用作沙箱导出目录下的
/// 单个路径分量。
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.').to_string();
    if trimmed.is_empty() {
        "export".to_string()
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_identifiers_pass() {
        assert!(validate_identifier("scraped_pages").is_ok());
        assert!(validate_identifier("_private").is_ok());
        assert!(validate_identifier("col_1").is_ok());
    }

    #[test]
    fn injection_payload_is_rejected() {
        assert!(validate_identifier("users; DROP TABLE users;").is_err());
        assert!(validate_identifier("a\"b").is_err());
        assert!(validate_identifier("name with spaces").is_err());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1starts_with_digit").is_err());
    }

    #[test]
    fn overlong_identifier_is_rejected() {
        let long = "a".repeat(64);
        assert!(validate_identifier(&long).is_err());
        let max = "a".repeat(63);
        assert!(validate_identifier(&max).is_ok());
    }

    #[test]
    fn filename_is_reduced_to_safe_charset() {
        assert_eq!(sanitize_filename("report 2025.csv"), "report_2025.csv");
        assert_eq!(sanitize_filename("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_filename("..."), "export");
        assert_eq!(sanitize_filename("results.json"), "results.json");
    }
}
