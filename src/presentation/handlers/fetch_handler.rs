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

use axum::{extract::Json, response::IntoResponse};
use serde_json::json;
use std::time::Duration;

use crate::application::dto::scrape_request::FetchRequestDto;
use crate::domain::models::error::ScrapeError;
use crate::engines::validators;
use crate::presentation::errors::AppError;

pub async fn fetch_page(Json(payload): Json<FetchRequestDto>) -> Result<impl IntoResponse, AppError> {
    validators::validate_url(&payload.url)
        .await
        .map_err(|e| ScrapeError::InvalidUrl(e.to_string()))?;

    let html = fetch_html(&payload.url).await?;
    Ok(Json(json!({ "html": html })))
}

/// 抓取单个页面的原始HTML
pub(crate) async fn fetch_html(url: &str) -> Result<String, ScrapeError> {
    // Each request gets a fresh client for cookie isolation
    let client = reqwest::Client::builder()
        .user_agent("Mozilla/5.0 (compatible; extractrs/0.1; +https://extractrs.dev)")
        .timeout(Duration::from_secs(30))
        .cookie_store(true)
        .build()?;

    let response = client.get(url).send().await?;
    let html = response.text().await?;
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetch_returns_raw_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>hi</body></html>"))
            .mount(&server)
            .await;

        let html = fetch_html(&format!("{}/page", server.uri())).await.unwrap();
        assert!(html.contains("hi"));
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error() {
        let result = fetch_html("http://127.0.0.1:1/nope").await;
        assert!(result.is_err());
    }
}
