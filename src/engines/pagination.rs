// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chromiumoxide::Page;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::domain::models::error::ScrapeError;
use crate::engines::browser::BrowserSession;
use crate::engines::extractor;

/// 分页爬取到的单个页面
#[derive(Debug, Clone)]
pub struct CrawledPage {
    /// 页面内容快照
    pub html: String,
    /// 页面中文本承载元素的文本
    pub text: Vec<String>,
}

/// 分页爬虫
///
/// 反复跟随"下一页"控件，把提取扩展到有界的页面序列上。
/// `max_depth`是强制上限而非性能提示；控件消失或导航失败
/// 都终止爬取并保留已累积的页面。
pub struct PaginationCrawler<'a> {
    session: &'a BrowserSession,
    next_selector: String,
    max_depth: u32,
    delay: Duration,
    navigation_timeout: Duration,
}

impl<'a> PaginationCrawler<'a> {
    pub fn new(
        session: &'a BrowserSession,
        next_selector: impl Into<String>,
        max_depth: u32,
        delay: Duration,
        navigation_timeout: Duration,
    ) -> Self {
        Self {
            session,
            next_selector: next_selector.into(),
            max_depth,
            delay,
            navigation_timeout,
        }
    }

    /// 从当前页面开始跟随"下一页"控件
    ///
    /// 返回后续页面的累积序列（不含起始页，起始页由调用方
    /// 自行提取）。最多执行`max_depth`次页面跳转。
    pub async fn crawl(&self, page: &Page) -> Vec<CrawledPage> {
        let session = self.session;
        let selector = self.next_selector.clone();
        let timeout = self.navigation_timeout;

        crawl_with(&self.next_selector, self.max_depth, self.delay, || {
            let selector = selector.clone();
            async move {
                let element = match page.find_element(&selector).await {
                    Ok(element) => element,
                    // 控件不存在：到达终点
                    Err(_) => return Ok(None),
                };

                let step = async {
                    element
                        .click()
                        .await
                        .map_err(|e| ScrapeError::Browser(e.to_string()))?;
                    page.wait_for_navigation()
                        .await
                        .map_err(|e| ScrapeError::Browser(e.to_string()))?;
                    session.content(page).await
                };

                let html = tokio::time::timeout(timeout, step)
                    .await
                    .map_err(|_| ScrapeError::NavigationTimeout {
                        url: selector.clone(),
                        waited_ms: timeout.as_millis() as u64,
                    })??;

                Ok(Some(html))
            }
        })
        .await
    }
}

/// 有界分页循环
///
/// `step`推进到下一页并返回其内容快照：`Ok(None)`表示"下一页"
/// 控件不存在（终止条件），`Err`表示导航失败（终止但保留已
/// 累积的页面）。无论控件是否继续存在，最多执行`max_depth`次。
pub async fn crawl_with<F, Fut>(
    next_selector: &str,
    max_depth: u32,
    delay: Duration,
    mut step: F,
) -> Vec<CrawledPage>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<String>, ScrapeError>>,
{
    let mut pages = Vec::new();

    for depth in 0..max_depth {
        // 页间延迟，避免压垮目标站点
        if !delay.is_zero() {
            sleep(delay).await;
        }

        match step().await {
            Ok(Some(html)) => {
                let text = extractor::page_text(&html);
                pages.push(CrawledPage { html, text });
            }
            Ok(None) => {
                debug!(
                    "Pagination control '{}' no longer present after {} pages",
                    next_selector, depth
                );
                break;
            }
            Err(e) => {
                debug!(
                    "Pagination stopped after {} pages, keeping accumulated results: {}",
                    depth, e
                );
                break;
            }
        }
    }

    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn endless_next_control_is_bounded_by_max_depth() {
        let pages = crawl_with(".next", 3, Duration::ZERO, || async {
            Ok(Some("<p>more</p>".to_string()))
        })
        .await;
        assert_eq!(pages.len(), 3);
    }

    #[tokio::test]
    async fn absent_control_terminates_early() {
        let mut calls = 0;
        let pages = crawl_with(".next", 5, Duration::ZERO, || {
            calls += 1;
            let result = if calls == 1 {
                Ok(Some("<p>page two</p>".to_string()))
            } else {
                Ok(None)
            };
            async move { result }
        })
        .await;
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].text, vec!["page two"]);
    }

    #[tokio::test]
    async fn navigation_failure_keeps_accumulated_pages() {
        let mut calls = 0;
        let pages = crawl_with(".next", 5, Duration::ZERO, || {
            calls += 1;
            let result = if calls <= 2 {
                Ok(Some(format!("<p>page {}</p>", calls)))
            } else {
                Err(ScrapeError::Browser("window closed".to_string()))
            };
            async move { result }
        })
        .await;
        assert_eq!(pages.len(), 2);
    }

    #[tokio::test]
    async fn zero_depth_never_steps() {
        let mut stepped = false;
        let pages = crawl_with(".next", 0, Duration::ZERO, || {
            stepped = true;
            async { Ok(Some(String::new())) }
        })
        .await;
        assert!(pages.is_empty());
        assert!(!stepped);
    }
}
