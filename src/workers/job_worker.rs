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

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, instrument};
use url::Url;

use crate::config::settings::Settings;
use crate::domain::models::error::ScrapeError;
use crate::domain::models::job::ScrapeJob;
use crate::domain::models::target::ScrapeTarget;
use crate::engines::browser::BrowserSession;
use crate::engines::extractor;
use crate::engines::pagination::PaginationCrawler;
use crate::engines::validators;
use crate::registry::{JobPatch, JobRegistry};

/// 任务执行器
///
/// 驱动单个目标走完长时任务的各个阶段：导航、文本（含分页）、
/// 媒体、表格与列表，每个阶段完成后通过注册表推进进度。任务
/// 在请求内同步执行到完成或失败，之后仍可通过注册表查询。
pub struct JobRunner {
    settings: Arc<Settings>,
    registry: Arc<JobRegistry>,
}

impl JobRunner {
    pub fn new(settings: Arc<Settings>, registry: Arc<JobRegistry>) -> Self {
        Self { settings, registry }
    }

    /// 执行一个已注册的任务
    ///
    /// 成功时置为完成态（进度100），任何阶段失败都把任务置为
    /// 失败态并保留已推进的进度。浏览器会话在两条路径上都被
    /// 关闭。
    ///
    /// # 返回值
    ///
    /// * `Ok(ScrapeJob)` - 终态任务快照
    /// * `Err(ScrapeError)` - 执行失败（任务已标记为失败）
    #[instrument(skip(self, target), fields(job_id = %job_id, url = %target.url))]
    pub async fn run(&self, job_id: &str, target: &ScrapeTarget) -> Result<ScrapeJob, ScrapeError> {
        match self.drive(job_id, target).await {
            Ok(()) => self.registry.complete(job_id),
            Err(e) => {
                error!("Job {} failed: {}", job_id, e);
                if let Err(mark) = self.registry.fail(job_id, e.to_string()) {
                    error!("Failed to mark job {} as failed: {}", job_id, mark);
                }
                Err(e)
            }
        }
    }

    async fn drive(&self, job_id: &str, target: &ScrapeTarget) -> Result<(), ScrapeError> {
        target.validate()?;
        validators::validate_url(&target.url)
            .await
            .map_err(|e| ScrapeError::InvalidUrl(e.to_string()))?;

        let session =
            BrowserSession::open(&self.settings.browser, target.options.proxy.as_deref()).await?;
        let outcome = self.stages(&session, job_id, target).await;
        session.close().await;
        outcome
    }

    async fn stages(
        &self,
        session: &BrowserSession,
        job_id: &str,
        target: &ScrapeTarget,
    ) -> Result<(), ScrapeError> {
        let base = Url::parse(&target.url)
            .map_err(|e| ScrapeError::InvalidUrl(format!("{}: {}", target.url, e)))?;
        let page = session.open_page(&base, &target.options).await?;

        let scraping = &self.settings.scraping;
        let navigation_timeout = Duration::from_secs(scraping.navigation_timeout_secs);

        let inner = async {
            session
                .navigate(
                    &page,
                    &target.url,
                    &target.options,
                    navigation_timeout,
                    scraping.default_wait_timeout_ms,
                )
                .await?;
            let html = session.content(&page).await?;

            self.registry.advance(
                job_id,
                20,
                JobPatch {
                    metadata: Some(extractor::page_metadata(&html)),
                    ..Default::default()
                },
            )?;

            let mut text = extractor::page_text(&html);
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
                        text.extend(crawled.text);
                    }
                }
            }
            self.registry.advance(
                job_id,
                25,
                JobPatch {
                    text,
                    ..Default::default()
                },
            )?;

            self.registry.advance(
                job_id,
                20,
                JobPatch {
                    images: extractor::page_images(&html, &base),
                    videos: extractor::page_videos(&html, &base),
                    ..Default::default()
                },
            )?;

            self.registry.advance(
                job_id,
                20,
                JobPatch {
                    tables: extractor::page_tables(&html),
                    lists: extractor::page_lists(&html),
                    ..Default::default()
                },
            )?;

            Ok(())
        };

        let outcome = inner.await;
        session.close_page(page).await;
        outcome
    }
}
