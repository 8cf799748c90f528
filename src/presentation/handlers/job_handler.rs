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
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::analysis::AnalysisProvider;
use crate::application::dto::job_request::{AnalyzeRequestDto, StartJobRequestDto};
use crate::config::settings::Settings;
use crate::domain::models::error::ScrapeError;
use crate::presentation::errors::AppError;
use crate::registry::JobRegistry;
use crate::workers::job_worker::JobRunner;

pub async fn start_job(
    Extension(settings): Extension<Arc<Settings>>,
    Extension(registry): Extension<Arc<JobRegistry>>,
    Json(payload): Json<StartJobRequestDto>,
) -> Result<impl IntoResponse, AppError> {
    let job_id = payload
        .job_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let target = payload.options.into_target();
    target.validate()?;

    registry.create(&job_id, &target.url)?;

    let runner = JobRunner::new(settings.clone(), registry.clone());
    match runner.run(&job_id, &target).await {
        Ok(job) => Ok((
            StatusCode::OK,
            Json(json!({
                "success": true,
                "jobId": job.id,
                "progress": job.progress,
                "metadata": job.metadata
            })),
        )
            .into_response()),
        Err(e) => {
            error!("Job {} failed: {}", job_id, e);
            let progress = registry.get(&job_id).map(|job| job.progress).unwrap_or(0);
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "jobId": job_id,
                    "progress": progress,
                    "error": e.to_string()
                })),
            )
                .into_response())
        }
    }
}

pub async fn get_job(
    Path(job_id): Path<String>,
    Extension(registry): Extension<Arc<JobRegistry>>,
) -> impl IntoResponse {
    match registry.get(&job_id) {
        Some(job) => (StatusCode::OK, Json(job)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "success": false,
                "error": format!("Job not found: {}", job_id)
            })),
        )
            .into_response(),
    }
}

pub async fn analyze(
    Extension(registry): Extension<Arc<JobRegistry>>,
    Extension(provider): Extension<Arc<dyn AnalysisProvider>>,
    Json(payload): Json<AnalyzeRequestDto>,
) -> Result<impl IntoResponse, AppError> {
    let job = registry
        .get(&payload.result_id)
        .ok_or_else(|| ScrapeError::JobNotFound(payload.result_id.clone()))?;

    let options = payload.options.unwrap_or_else(|| json!({}));
    let analysis = provider.analyze(&job, &options).await?;
    let job = registry.attach_analysis(&payload.result_id, analysis)?;

    Ok(Json(json!({
        "success": true,
        "jobId": job.id,
        "progress": job.progress,
        "aiAnalysis": job.ai_analysis
    })))
}
