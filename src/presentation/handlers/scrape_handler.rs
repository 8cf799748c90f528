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

use crate::application::dto::scrape_request::{ScrapeRequestDto, TestSelectorRequestDto};
use crate::config::settings::Settings;
use crate::domain::models::scrape_result::SelectorValue;
use crate::domain::models::target::{ScrapeOptions, ScrapeTarget};
use crate::presentation::errors::AppError;
use crate::workers::batch_worker::BatchOrchestrator;

pub async fn scrape_targets(
    Extension(settings): Extension<Arc<Settings>>,
    Json(payload): Json<ScrapeRequestDto>,
) -> impl IntoResponse {
    if payload.targets.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": "targets cannot be empty"
            })),
        )
            .into_response();
    }

    let limit = settings.scraping.max_targets_per_batch;
    if payload.targets.len() > limit {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": format!("too many targets in one batch (limit {})", limit)
            })),
        )
            .into_response();
    }

    let orchestrator = BatchOrchestrator::new(settings.clone());
    match orchestrator.run_batch(&payload.targets).await {
        Ok(results) => (StatusCode::OK, Json(results)).into_response(),
        Err(e) => {
            error!("Batch aborted: {}", e);
            AppError::from(e).into_response()
        }
    }
}

pub async fn test_selector(
    Extension(settings): Extension<Arc<Settings>>,
    Json(payload): Json<TestSelectorRequestDto>,
) -> Result<impl IntoResponse, AppError> {
    payload.selector.validate()?;

    let selector_id = payload.selector.id.clone();
    let target = ScrapeTarget {
        url: payload.url,
        selectors: vec![payload.selector],
        options: ScrapeOptions::default(),
    };
    target.validate()?;

    let orchestrator = BatchOrchestrator::new(settings.clone());
    let targets = [target];
    let mut results = orchestrator.run_batch(&targets).await?;
    let result = results.remove(0);

    if !result.success {
        return Ok(Json(json!({
            "success": false,
            "error": result.error.unwrap_or_else(|| "scrape failed".to_string())
        })));
    }

    match result.data.get(&selector_id) {
        Some(SelectorValue::Values(values)) => Ok(Json(json!({
            "success": true,
            "result": values,
            "count": values.len()
        }))),
        Some(SelectorValue::Failed { error }) => Ok(Json(json!({
            "success": false,
            "error": error
        }))),
        None => Ok(Json(json!({
            "success": false,
            "error": "selector produced no entry"
        }))),
    }
}
