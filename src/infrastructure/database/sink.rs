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

use serde_json::Value;
use sqlx::PgPool;
use tracing::info;

use crate::config::settings::DatabaseSettings;
use crate::domain::models::database::DatabaseConfig;
use crate::domain::models::error::ScrapeError;
use crate::domain::models::scrape_result::{ScrapingResult, SelectorValue};
use crate::infrastructure::database::connection;

/// 元数据附加列，`include_metadata`开启时追加在映射列之后
const METADATA_COLUMNS: [&str; 4] = ["page_title", "status_code", "content_type", "response_time_ms"];

/// 持久化适配器
///
/// 把选择器输出映射到动态形状的关系表：目标表不存在时创建，
/// 成功结果逐行批量写入。表名与列名在拼入任何SQL文本之前
/// 已通过标识符白名单校验，数据值一律走绑定参数。
pub struct DatabaseSink {
    pool: PgPool,
}

impl DatabaseSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 按配置建立连接
    ///
    /// 未配置连接URL时返回`None`，持久化端点会以
    /// `PersistenceUnavailable`拒绝请求。
    pub async fn connect(settings: &DatabaseSettings) -> Result<Option<Self>, ScrapeError> {
        let Some(url) = &settings.url else {
            return Ok(None);
        };
        let pool = connection::create_pool(settings, url).await?;
        Ok(Some(Self::new(pool)))
    }

    /// 确保目标表存在
    ///
    /// 固定的`id`/`url`/`scraped_at`前缀，每个映射选择器一个
    /// 文本列，`include_metadata`开启时附加元数据列。
    pub async fn ensure_table(&self, config: &DatabaseConfig) -> Result<(), ScrapeError> {
        let ddl = create_table_sql(config)?;
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }

    /// 批量写入成功结果
    ///
    /// 每个成功结果一行，失败结果跳过；整批在一个事务内执行，
    /// 任何一行失败都回滚，不会部分提交。
    ///
    /// # 返回值
    ///
    /// * `Ok(u64)` - 写入的行数
    /// * `Err(ScrapeError::Database)` - 写入失败（已回滚）
    pub async fn insert_rows(
        &self,
        config: &DatabaseConfig,
        results: &[ScrapingResult],
    ) -> Result<u64, ScrapeError> {
        let (sql, selector_ids) = insert_sql(config)?;
        let mut transaction = self.pool.begin().await?;
        let mut inserted = 0u64;

        for result in results.iter().filter(|result| result.success) {
            let mut query = sqlx::query(&sql)
                .bind(&result.url)
                .bind(result.timestamp);

            for selector_id in &selector_ids {
                query = query.bind(render_column_value(result.data.get(selector_id)));
            }

            if config.options.include_metadata {
                query = query
                    .bind(result.metadata.page_title.as_deref())
                    .bind(result.metadata.status_code as i64)
                    .bind(result.metadata.content_type.as_deref())
                    .bind(result.metadata.response_time_ms as i64);
            }

            query.execute(&mut *transaction).await?;
            inserted += 1;
        }

        transaction.commit().await?;
        info!(
            "Persisted {} of {} results into table {}",
            inserted,
            results.len(),
            config.table
        );
        Ok(inserted)
    }
}

/// 构造建表DDL
///
/// 调用方提供的全部标识符先通过白名单校验再进入SQL文本。
fn create_table_sql(config: &DatabaseConfig) -> Result<String, ScrapeError> {
    config.validate()?;

    let mut columns = vec![
        "id BIGSERIAL PRIMARY KEY".to_string(),
        "url TEXT NOT NULL".to_string(),
        "scraped_at TIMESTAMPTZ NOT NULL".to_string(),
    ];

    for column in config.columns.values() {
        columns.push(format!("\"{}\" TEXT", column));
    }

    if config.options.include_metadata {
        columns.push("page_title TEXT".to_string());
        columns.push("status_code BIGINT".to_string());
        columns.push("content_type TEXT".to_string());
        columns.push("response_time_ms BIGINT".to_string());
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS \"{}\" ({})",
        config.table,
        columns.join(", ")
    ))
}

/// 构造插入DML与绑定顺序
///
/// 返回SQL文本与选择器id的绑定顺序（映射的确定性迭代序）。
fn insert_sql(config: &DatabaseConfig) -> Result<(String, Vec<String>), ScrapeError> {
    config.validate()?;

    let selector_ids: Vec<String> = config.columns.keys().cloned().collect();

    let mut column_names = vec!["url".to_string(), "scraped_at".to_string()];
    for selector_id in &selector_ids {
        column_names.push(format!("\"{}\"", config.columns[selector_id]));
    }
    if config.options.include_metadata {
        column_names.extend(METADATA_COLUMNS.iter().map(|c| c.to_string()));
    }

    let placeholders: Vec<String> = (1..=column_names.len())
        .map(|index| format!("${}", index))
        .collect();

    let sql = format!(
        "INSERT INTO \"{}\" ({}) VALUES ({})",
        config.table,
        column_names.join(", "),
        placeholders.join(", ")
    );

    Ok((sql, selector_ids))
}

/// 选择器输出到列值的映射：数组拼接为一个字符串，嵌入的
/// 选择器错误写入NULL
fn render_column_value(value: Option<&SelectorValue>) -> Option<String> {
    match value {
        Some(SelectorValue::Values(values)) => Some(
            values
                .iter()
                .map(value_text)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Some(SelectorValue::Failed { .. }) | None => None,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::database::DatabaseOptions;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn config(include_metadata: bool) -> DatabaseConfig {
        let mut columns = BTreeMap::new();
        columns.insert("title".to_string(), "page_heading".to_string());
        columns.insert("links".to_string(), "link_list".to_string());
        DatabaseConfig {
            table: "scraped_pages".to_string(),
            columns,
            options: DatabaseOptions { include_metadata },
        }
    }

    #[test]
    fn ddl_has_fixed_prefix_and_mapped_columns() {
        let ddl = create_table_sql(&config(false)).unwrap();
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS \"scraped_pages\""));
        assert!(ddl.contains("id BIGSERIAL PRIMARY KEY"));
        assert!(ddl.contains("url TEXT NOT NULL"));
        assert!(ddl.contains("\"page_heading\" TEXT"));
        assert!(ddl.contains("\"link_list\" TEXT"));
        assert!(!ddl.contains("page_title"));
    }

    #[test]
    fn metadata_columns_are_appended_when_requested() {
        let ddl = create_table_sql(&config(true)).unwrap();
        assert!(ddl.contains("page_title TEXT"));
        assert!(ddl.contains("response_time_ms BIGINT"));
    }

    #[test]
    fn unsafe_table_name_never_reaches_sql_text() {
        let mut bad = config(false);
        bad.table = "users; DROP TABLE users;".to_string();
        assert!(create_table_sql(&bad).is_err());
        assert!(insert_sql(&bad).is_err());
    }

    #[test]
    fn insert_binds_follow_mapping_order() {
        let (sql, selector_ids) = insert_sql(&config(true)).unwrap();
        // BTreeMap序：links在title之前
        assert_eq!(selector_ids, vec!["links", "title"]);
        assert!(sql.contains("(url, scraped_at, \"link_list\", \"page_heading\", page_title, status_code, content_type, response_time_ms)"));
        assert!(sql.contains("$8"));
        assert!(!sql.contains("$9"));
    }

    #[test]
    fn array_outputs_are_joined_and_errors_become_null() {
        let joined = render_column_value(Some(&SelectorValue::Values(vec![
            json!("a"),
            json!("b"),
        ])));
        assert_eq!(joined.as_deref(), Some("a, b"));

        let failed = render_column_value(Some(&SelectorValue::Failed {
            error: "boom".to_string(),
        }));
        assert!(failed.is_none());
        assert!(render_column_value(None).is_none());
    }
}
