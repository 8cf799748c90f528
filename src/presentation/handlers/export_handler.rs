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
    extract::{Extension, Json},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use crate::application::dto::export_request::{SaveDbRequestDto, SaveFileRequestDto};
use crate::domain::models::error::ScrapeError;
use crate::export::Exporter;
use crate::infrastructure::database::sink::DatabaseSink;
use crate::presentation::errors::AppError;

pub async fn save_file(
    Extension(exporter): Extension<Arc<Exporter>>,
    Json(payload): Json<SaveFileRequestDto>,
) -> Result<impl IntoResponse, AppError> {
    let path = exporter
        .export(
            &payload.results,
            payload.filename.as_deref(),
            payload.format,
            payload.save_to_public,
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "filePath": path.display().to_string(),
        "format": payload.format.to_string()
    })))
}

pub async fn save_db(
    Extension(sink): Extension<Option<Arc<DatabaseSink>>>,
    Json(payload): Json<SaveDbRequestDto>,
) -> Result<impl IntoResponse, AppError> {
    let sink = sink.ok_or(ScrapeError::PersistenceUnavailable)?;

    payload.db_config.validate()?;
    sink.ensure_table(&payload.db_config).await?;

    let total = payload.results.len();
    match sink.insert_rows(&payload.db_config, &payload.results).await {
        Ok(count) => Ok((
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": format!("inserted {} of {} rows", count, total),
                "rowCount": count
            })),
        )
            .into_response()),
        Err(e) => {
            error!("Bulk insert into {} failed: {}", payload.db_config.table, e);
            // 事务已回滚，向调用方报告部分成功状态
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "message": format!("inserted 0 of {} rows: {}", total, e),
                    "rowCount": 0
                })),
            )
                .into_response())
        }
    }
}
