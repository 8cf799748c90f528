// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::domain::models::error::ScrapeError;

/// 应用错误类型
///
/// 封装所有可能的应用层错误，提供统一的错误处理接口
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_message = self.0.to_string();

        let status = match self.0.downcast_ref::<ScrapeError>() {
            Some(ScrapeError::InvalidUrl(_))
            | Some(ScrapeError::InvalidSelector(_))
            | Some(ScrapeError::UnsupportedExportFormat(_)) => StatusCode::BAD_REQUEST,
            Some(ScrapeError::JobNotFound(_)) => StatusCode::NOT_FOUND,
            Some(ScrapeError::DuplicateJob(_)) | Some(ScrapeError::TerminalJob(_)) => {
                StatusCode::CONFLICT
            }
            Some(ScrapeError::PersistenceUnavailable) => StatusCode::SERVICE_UNAVAILABLE,
            Some(ScrapeError::NavigationTimeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "success": false, "error": error_message }));
        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(error: ScrapeError) -> StatusCode {
        AppError::from(error).into_response().status()
    }

    #[test]
    fn taxonomy_maps_to_http_status_codes() {
        assert_eq!(
            status_of(ScrapeError::InvalidUrl("x".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ScrapeError::JobNotFound("j".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ScrapeError::DuplicateJob("j".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ScrapeError::PersistenceUnavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(ScrapeError::NavigationTimeout {
                url: "https://example.com".to_string(),
                waited_ms: 30_000,
            }),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_of(ScrapeError::Browser("crash".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
