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
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{info, instrument, warn};
use url::Url;

use crate::config::settings::Settings;
use crate::domain::models::error::ScrapeError;
use crate::domain::models::scrape_result::{PageMetadata, ScrapingResult, SelectorValue};
use crate::domain::models::target::ScrapeTarget;
use crate::engines::browser::BrowserSession;
use crate::engines::extractor;
use crate::engines::pagination::PaginationCrawler;
use crate::engines::validators;

/// 批量编排器
///
/// 用一个浏览器会话按提交顺序依次处理N个目标。顺序执行是
/// 刻意的设计：限制浏览器资源占用并尊重节流配置。单个目标
/// 的任何错误在目标边界被捕获并转换为失败结果，循环始终
/// 继续——一个坏URL绝不中断整个批次。输出顺序与输入一致。
pub struct BatchOrchestrator {
    settings: Arc<Settings>,
}

impl BatchOrchestrator {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    /// 运行一个批次
    ///
    /// 浏览器会话按需打开（首个需要浏览器的目标触发启动），
    /// 在成功与失败路径上都保证关闭。浏览器启动失败是唯一
    /// 向上传播的顶层错误。
    ///
    /// # 返回值
    ///
    /// * `Ok(Vec<ScrapingResult>)` - 与提交目标等长、同序的结果数组
    /// * `Err(ScrapeError::Browser)` - 浏览器启动失败
    #[instrument(skip(self, targets), fields(targets = targets.len()))]
    pub async fn run_batch(
        &self,
        targets: &[ScrapeTarget],
    ) -> Result<Vec<ScrapingResult>, ScrapeError> {
        let mut session: Option<BrowserSession> = None;
        let mut results = Vec::with_capacity(targets.len());

        let outcome = self.drive(&mut session, targets, &mut results).await;

        if let Some(session) = session.take() {
            session.close().await;
        }

        outcome?;

        let failed = results.iter().filter(|result| !result.success).count();
        info!(
            "Batch complete: {} ok, {} failed",
            results.len() - failed,
            failed
        );
        Ok(results)
    }

    async fn drive(
        &self,
        session: &mut Option<BrowserSession>,
        targets: &[ScrapeTarget],
        results: &mut Vec<ScrapingResult>,
    ) -> Result<(), ScrapeError> {
        for (index, target) in targets.iter().enumerate() {
            let result = match self.process_target(session, target).await {
                Ok(result) => result,
                // 浏览器无法启动时整个请求失败，其余错误隔离在目标边界
                Err(error @ ScrapeError::Browser(_)) if session.is_none() => return Err(error),
                Err(error) => {
                    warn!("Target {} failed: {}", target.url, error);
                    ScrapingResult::failed(&target.url, error.to_string())
                }
            };
            results.push(result);

            if index + 1 < targets.len() && target.options.throttle_ms > 0 {
                sleep(Duration::from_millis(target.options.throttle_ms)).await;
            }
        }
        Ok(())
    }

    async fn process_target(
        &self,
        session: &mut Option<BrowserSession>,
        target: &ScrapeTarget,
    ) -> Result<ScrapingResult, ScrapeError> {
        target.validate()?;
        validators::validate_url(&target.url)
            .await
            .map_err(|e| ScrapeError::InvalidUrl(e.to_string()))?;

        if target.options.needs_browser() {
            if session.is_none() {
                *session =
                    Some(BrowserSession::open(&self.settings.browser, target.options.proxy.as_deref()).await?);
            }
            self.process_browser_target(session.as_ref().unwrap(), target)
                .await
        } else {
            self.process_http_target(target).await
        }
    }

    /// 浏览器路径：打开页面、导航、提取、可选分页与截图
    async fn process_browser_target(
        &self,
        session: &BrowserSession,
        target: &ScrapeTarget,
    ) -> Result<ScrapingResult, ScrapeError> {
        let base = Url::parse(&target.url)
            .map_err(|e| ScrapeError::InvalidUrl(format!("{}: {}", target.url, e)))?;
        let page = session.open_page(&base, &target.options).await?;

        let scraping = &self.settings.scraping;
        let navigation_timeout = Duration::from_secs(scraping.navigation_timeout_secs);

        let inner = async {
            let navigation = session
                .navigate(
                    &page,
                    &target.url,
                    &target.options,
                    navigation_timeout,
                    scraping.default_wait_timeout_ms,
                )
                .await?;

            let html = session.content(&page).await?;
            let mut data = extractor::run_selectors(&html, &target.selectors);

            if let Some(next_selector) = &target.options.next_selector {
                if target.options.max_depth > 0 {
                    let crawler = PaginationCrawler::new(
                        session,
                        next_selector,
                        target.options.max_depth,
                        Duration::from_millis(scraping.pagination_delay_ms),
                        navigation_timeout,
                    );
                    for crawled in crawler.crawl(&page).await {
                        let page_data = extractor::run_selectors(&crawled.html, &target.selectors);
                        for (id, value) in page_data {
                            if let SelectorValue::Values(more) = value {
                                match data.get_mut(&id) {
                                    Some(existing) => existing.extend_values(more),
                                    None => {
                                        data.insert(id, SelectorValue::Values(more));
                                    }
                                }
                            }
                        }
                    }
                }
            }

            let screenshot = if target.options.capture_screenshot {
                Some(session.screenshot(&page).await?)
            } else {
                None
            };

            Ok(ScrapingResult {
                url: target.url.clone(),
                timestamp: Utc::now(),
                success: true,
                data,
                metadata: PageMetadata {
                    page_title: extractor::page_title(&html),
                    status_code: navigation.status_code,
                    content_type: navigation.content_type,
                    response_time_ms: navigation.response_time_ms,
                },
                screenshot,
                error: None,
            })
        };

        let result = inner.await;
        session.close_page(page).await;
        result
    }

    /// 纯HTTP路径：不需要JS/截图/等待/分页的目标直接抓取
    async fn process_http_target(
        &self,
        target: &ScrapeTarget,
    ) -> Result<ScrapingResult, ScrapeError> {
        let options = &target.options;
        let timeout = Duration::from_secs(self.settings.scraping.navigation_timeout_secs);

        // Each target gets a fresh client for cookie isolation
        let mut builder = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; extractrs/0.1; +https://extractrs.dev)")
            .timeout(timeout)
            .cookie_store(true);

        if !options.follow_redirects {
            builder = builder.redirect(reqwest::redirect::Policy::none());
        }

        if let Some(proxy) = &options.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        let client = builder.build()?;

        let method = options
            .method
            .as_deref()
            .and_then(|m| reqwest::Method::from_bytes(m.to_ascii_uppercase().as_bytes()).ok())
            .unwrap_or(reqwest::Method::GET);

        let mut headers = HeaderMap::new();
        if let Some(extra) = &options.headers {
            for (key, value) in extra {
                if let (Ok(key), Ok(value)) = (
                    HeaderName::from_bytes(key.as_bytes()),
                    HeaderValue::from_str(value),
                ) {
                    headers.insert(key, value);
                }
            }
        }
        if let Some(cookies) = &options.cookies {
            if let Ok(value) = HeaderValue::from_str(cookies) {
                headers.insert(reqwest::header::COOKIE, value);
            }
        }

        let mut request = client.request(method.clone(), &target.url).headers(headers);
        if method != reqwest::Method::GET {
            if let Some(body) = &options.body {
                request = request.body(body.clone());
            }
        }

        let start = Instant::now();
        let response = request.send().await?;

        let status_code = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let html = response.text().await?;
        let response_time_ms = start.elapsed().as_millis() as u64;

        let data = extractor::run_selectors(&html, &target.selectors);

        Ok(ScrapingResult {
            url: target.url.clone(),
            timestamp: Utc::now(),
            success: true,
            data,
            metadata: PageMetadata {
                page_title: extractor::page_title(&html),
                status_code,
                content_type,
                response_time_ms,
            },
            screenshot: None,
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::selector::{SelectorConfig, SelectorKind};
    use crate::domain::models::target::ScrapeOptions;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings() -> Arc<Settings> {
        Arc::new(Settings::new().unwrap())
    }

    fn http_target(url: &str) -> ScrapeTarget {
        ScrapeTarget {
            url: url.to_string(),
            selectors: vec![SelectorConfig {
                id: "title".to_string(),
                name: None,
                selector: "h1".to_string(),
                kind: SelectorKind::Text,
                attribute: None,
                list_item_selector: None,
            }],
            options: ScrapeOptions {
                enable_javascript: false,
                ..Default::default()
            },
        }
    }

    async fn mock_page_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><head><title>T</title></head><body><h1>Example Title</h1></body></html>")
                    .insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn batch_isolates_per_target_failures() {
        std::env::set_var("EXTRACTRS_DISABLE_SSRF_PROTECTION", "true");
        let server = mock_page_server().await;

        let good = http_target(&format!("{}/page", server.uri()));
        // 不可达端口：连接立即失败
        let bad = http_target("http://127.0.0.1:1/page");

        let orchestrator = BatchOrchestrator::new(settings());
        let results = orchestrator
            .run_batch(&[good.clone(), bad, good])
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[1].data.is_empty());
        assert!(results[1].error.is_some());
        assert!(results[2].success);

        match &results[0].data["title"] {
            SelectorValue::Values(values) => {
                assert_eq!(values, &vec![serde_json::json!("Example Title")]);
            }
            SelectorValue::Failed { error } => panic!("unexpected failure: {}", error),
        }
        assert_eq!(results[0].metadata.status_code, 200);
    }

    #[tokio::test]
    async fn results_keep_submission_order() {
        std::env::set_var("EXTRACTRS_DISABLE_SSRF_PROTECTION", "true");
        let server = mock_page_server().await;

        let first = http_target(&format!("{}/page", server.uri()));
        let second = http_target(&format!("{}/missing", server.uri()));

        let orchestrator = BatchOrchestrator::new(settings());
        let results = orchestrator.run_batch(&[first, second]).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].url.ends_with("/page"));
        assert!(results[1].url.ends_with("/missing"));
    }

    #[tokio::test]
    async fn invalid_target_url_becomes_a_failed_entry() {
        let orchestrator = BatchOrchestrator::new(settings());
        let results = orchestrator
            .run_batch(&[http_target("not a url")])
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert!(!results[0].success);
        assert!(results[0].error.as_deref().unwrap().contains("Invalid URL"));
    }

    #[tokio::test]
    async fn http_path_reports_real_status_codes() {
        std::env::set_var("EXTRACTRS_DISABLE_SSRF_PROTECTION", "true");
        let server = mock_page_server().await;

        let target = http_target(&format!("{}/missing", server.uri()));
        let orchestrator = BatchOrchestrator::new(settings());
        let results = orchestrator.run_batch(&[target]).await.unwrap();

        // 404也是一次成功抓取：页面内容可能仍然有用
        assert!(results[0].success);
        assert_eq!(results[0].metadata.status_code, 404);
    }
}
