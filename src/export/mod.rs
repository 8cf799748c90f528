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

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::config::settings::ExportSettings;
use crate::domain::models::error::ScrapeError;
use crate::domain::models::scrape_result::ScrapingResult;
use crate::utils::validators::sanitize_filename;

/// 导出格式枚举
///
/// 封闭的五种导出变体；未知格式在请求反序列化时即被拒绝。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
    Xml,
    Excel,
    Text,
}

impl ExportFormat {
    /// 该格式的文件扩展名
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Xml => "xml",
            ExportFormat::Excel => "xlsx",
            ExportFormat::Text => "txt",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Xml => write!(f, "xml"),
            ExportFormat::Excel => write!(f, "excel"),
            ExportFormat::Text => write!(f, "text"),
        }
    }
}

/// 导出引擎
///
/// 把一组抓取结果序列化为请求的格式并写入沙箱导出目录。
/// 输出位置只由`save_to_public`标志在公开/私有两棵目录树
/// 之间选择，调用方提供的文件名先经过清洗，绝不接受任意
/// 绝对路径。
pub struct Exporter {
    base_dir: PathBuf,
    public_dir: PathBuf,
}

impl Exporter {
    pub fn new(settings: &ExportSettings) -> Self {
        Self {
            base_dir: PathBuf::from(&settings.base_dir),
            public_dir: PathBuf::from(&settings.public_dir),
        }
    }

    /// 导出结果集
    ///
    /// # 参数
    ///
    /// * `results` - 要导出的结果集
    /// * `filename` - 可选文件名（清洗后作为单个路径分量使用）
    /// * `format` - 导出格式
    /// * `save_to_public` - 写入公开目录还是私有目录
    ///
    /// # 返回值
    ///
    /// * `Ok(PathBuf)` - 写入的文件路径
    /// * `Err(ScrapeError)` - 序列化或文件系统错误
    pub async fn export(
        &self,
        results: &[ScrapingResult],
        filename: Option<&str>,
        format: ExportFormat,
        save_to_public: bool,
    ) -> Result<PathBuf, ScrapeError> {
        let directory = if save_to_public {
            &self.public_dir
        } else {
            &self.base_dir
        };
        fs::create_dir_all(directory).await?;

        let stem = match filename {
            Some(name) => sanitize_filename(name),
            None => format!("scrape-export-{}", Utc::now().format("%Y%m%d%H%M%S")),
        };
        let path = directory.join(with_extension(&stem, format.extension()));

        match format {
            ExportFormat::Json => {
                let body = serde_json::to_vec_pretty(results)
                    .map_err(|e| ScrapeError::Filesystem(std::io::Error::other(e)))?;
                fs::write(&path, body).await?;
            }
            ExportFormat::Csv => {
                let body = render_csv(results)?;
                fs::write(&path, body).await?;
            }
            ExportFormat::Xml => {
                let body = render_xml(results);
                fs::write(&path, body).await?;
            }
            ExportFormat::Excel => {
                write_excel(results, &path)?;
            }
            ExportFormat::Text => {
                let body = render_text(results);
                fs::write(&path, body).await?;
            }
        }

        info!("Exported {} results to {}", results.len(), path.display());
        Ok(path)
    }
}

fn with_extension(stem: &str, extension: &str) -> String {
    let suffix = format!(".{}", extension);
    if stem.to_ascii_lowercase().ends_with(&suffix) {
        stem.to_string()
    } else {
        format!("{}{}", stem, suffix)
    }
}

/// 展平一个结果：嵌套对象字段下降一层为`父键_子键`
fn flatten_result(result: &ScrapingResult) -> BTreeMap<String, Value> {
    let value = serde_json::to_value(result).unwrap_or(Value::Null);
    let mut flat = BTreeMap::new();

    if let Value::Object(fields) = value {
        for (key, field) in fields {
            match field {
                Value::Object(children) => {
                    for (child_key, child) in children {
                        flat.insert(format!("{}_{}", key, child_key), child);
                    }
                }
                other => {
                    flat.insert(key, other);
                }
            }
        }
    }

    flat
}

/// 表格单元格渲染：数组拼接为一个字符串，对象退化为紧凑JSON
fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(render_cell)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
        other => other.to_string(),
    }
}

/// 表格列集：全部行展平键的有序并集（确定性输出）
fn column_set(rows: &[BTreeMap<String, Value>]) -> Vec<String> {
    let mut columns = BTreeSet::new();
    for row in rows {
        for key in row.keys() {
            columns.insert(key.clone());
        }
    }
    columns.into_iter().collect()
}

fn render_csv(results: &[ScrapingResult]) -> Result<Vec<u8>, ScrapeError> {
    let rows: Vec<_> = results.iter().map(flatten_result).collect();
    let columns = column_set(&rows);

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(&columns)
        .map_err(|e| ScrapeError::Filesystem(std::io::Error::other(e)))?;

    for row in &rows {
        let record: Vec<String> = columns
            .iter()
            .map(|column| row.get(column).map(render_cell).unwrap_or_default())
            .collect();
        writer
            .write_record(&record)
            .map_err(|e| ScrapeError::Filesystem(std::io::Error::other(e)))?;
    }

    writer
        .into_inner()
        .map_err(|e| ScrapeError::Filesystem(std::io::Error::other(e)))
}

fn write_excel(results: &[ScrapingResult], path: &Path) -> Result<(), ScrapeError> {
    let rows: Vec<_> = results.iter().map(flatten_result).collect();
    let columns = column_set(&rows);

    let mut workbook = rust_xlsxwriter::Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (index, column) in columns.iter().enumerate() {
        worksheet
            .write_string(0, index as u16, column)
            .map_err(|e| ScrapeError::Filesystem(std::io::Error::other(e.to_string())))?;
    }

    for (row_index, row) in rows.iter().enumerate() {
        for (column_index, column) in columns.iter().enumerate() {
            let cell = row.get(column).map(render_cell).unwrap_or_default();
            worksheet
                .write_string(row_index as u32 + 1, column_index as u16, &cell)
                .map_err(|e| ScrapeError::Filesystem(std::io::Error::other(e.to_string())))?;
        }
    }

    workbook
        .save(path)
        .map_err(|e| ScrapeError::Filesystem(std::io::Error::other(e.to_string())))?;
    Ok(())
}

fn render_xml(results: &[ScrapingResult]) -> String {
    let mut output = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<results>\n");

    for result in results {
        output.push_str("  <result>\n");
        for (key, value) in flatten_result(result) {
            let name = html_escape::encode_double_quoted_attribute(&key);
            let text = render_cell(&value);
            output.push_str(&format!(
                "    <field name=\"{}\">{}</field>\n",
                name,
                html_escape::encode_text(&text)
            ));
        }
        output.push_str("  </result>\n");
    }

    output.push_str("</results>\n");
    output
}

fn render_text(results: &[ScrapingResult]) -> String {
    let mut output = String::new();

    for (index, result) in results.iter().enumerate() {
        if index > 0 {
            output.push_str("\n---\n\n");
        }
        for (key, value) in flatten_result(result) {
            output.push_str(&format!("{}: {}\n", key, render_cell(&value)));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::scrape_result::{PageMetadata, SelectorValue};
    use chrono::TimeZone;
    use serde_json::json;

    fn sample_results() -> Vec<ScrapingResult> {
        let timestamp = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut data = BTreeMap::new();
        data.insert(
            "title".to_string(),
            SelectorValue::Values(vec![json!("Example Title")]),
        );
        data.insert(
            "links".to_string(),
            SelectorValue::Values(vec![json!("https://example.com/1"), json!("https://example.com/2")]),
        );

        vec![
            ScrapingResult {
                url: "https://good.example".to_string(),
                timestamp,
                success: true,
                data,
                metadata: PageMetadata {
                    page_title: Some("Example <Title>".to_string()),
                    status_code: 200,
                    content_type: Some("text/html".to_string()),
                    response_time_ms: 120,
                },
                screenshot: None,
                error: None,
            },
            ScrapingResult::failed("https://bad.example", "dns failure"),
        ]
    }

    fn exporter(dir: &tempfile::TempDir) -> Exporter {
        Exporter::new(&ExportSettings {
            base_dir: dir.path().join("private").display().to_string(),
            public_dir: dir.path().join("public").display().to_string(),
        })
    }

    #[tokio::test]
    async fn json_export_round_trips_structurally() {
        let dir = tempfile::tempdir().unwrap();
        let results = sample_results();

        let path = exporter(&dir)
            .export(&results, Some("roundtrip"), ExportFormat::Json, false)
            .await
            .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let reparsed: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(reparsed, serde_json::to_value(&results).unwrap());
    }

    #[tokio::test]
    async fn csv_export_has_deterministic_column_union() {
        let dir = tempfile::tempdir().unwrap();
        let results = sample_results();

        let path = exporter(&dir)
            .export(&results, Some("table"), ExportFormat::Csv, false)
            .await
            .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let mut lines = raw.lines();
        let header = lines.next().unwrap();

        // 两行结果键并集，字母序排列
        let columns: Vec<&str> = header.split(',').collect();
        let mut sorted = columns.clone();
        sorted.sort_unstable();
        assert_eq!(columns, sorted);
        assert!(header.contains("data_title"));
        assert!(header.contains("error"));
        assert!(header.contains("metadata_statusCode"));
        assert_eq!(lines.count(), 2);
    }

    #[tokio::test]
    async fn array_values_are_joined_in_cells() {
        let results = sample_results();
        let flat = flatten_result(&results[0]);
        assert_eq!(
            render_cell(&flat["data_links"]),
            "https://example.com/1, https://example.com/2"
        );
    }

    #[tokio::test]
    async fn xml_export_escapes_markup() {
        let dir = tempfile::tempdir().unwrap();
        let path = exporter(&dir)
            .export(&sample_results(), Some("x"), ExportFormat::Xml, false)
            .await
            .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("<?xml"));
        assert!(raw.contains("Example &lt;Title&gt;"));
        assert!(!raw.contains("Example <Title>"));
    }

    #[tokio::test]
    async fn text_export_writes_key_value_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = exporter(&dir)
            .export(&sample_results(), Some("notes"), ExportFormat::Text, false)
            .await
            .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("url: https://good.example"));
        assert!(raw.contains("\n---\n"));
    }

    #[tokio::test]
    async fn excel_export_writes_a_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = exporter(&dir)
            .export(&sample_results(), Some("sheet"), ExportFormat::Excel, false)
            .await
            .unwrap();

        assert_eq!(path.extension().unwrap(), "xlsx");
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[tokio::test]
    async fn public_flag_selects_the_public_tree() {
        let dir = tempfile::tempdir().unwrap();
        let path = exporter(&dir)
            .export(&sample_results(), Some("open"), ExportFormat::Json, true)
            .await
            .unwrap();
        assert!(path.starts_with(dir.path().join("public")));
    }

    #[tokio::test]
    async fn filename_is_sanitized_before_use() {
        let dir = tempfile::tempdir().unwrap();
        let path = exporter(&dir)
            .export(
                &sample_results(),
                Some("../escape attempt"),
                ExportFormat::Json,
                false,
            )
            .await
            .unwrap();

        assert!(path.starts_with(dir.path().join("private")));
        assert!(!path.to_string_lossy().contains(".."));
    }

    #[test]
    fn unknown_format_fails_deserialization() {
        let parsed: Result<ExportFormat, _> = serde_json::from_str("\"parquet\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn extension_is_appended_once() {
        assert_eq!(with_extension("report", "csv"), "report.csv");
        assert_eq!(with_extension("report.csv", "csv"), "report.csv");
    }
}
