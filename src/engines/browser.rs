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

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetScriptExecutionDisabledParams,
};
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, Headers, SetExtraHttpHeadersParams};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

use crate::config::settings::BrowserSettings;
use crate::domain::models::error::ScrapeError;
use crate::domain::models::target::ScrapeOptions;

const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 14_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0.3 Mobile/15E148 Safari/604.1";

/// 等待选择器出现时的轮询间隔
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// 浏览器会话
///
/// 持有一个浏览器进程（或远程连接）及其CDP事件处理任务。
/// 每个批量请求独占一个会话，在请求生命周期内打开并在所有
/// 退出路径上关闭；会话从不跨请求共享。
pub struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    remote: bool,
}

/// 导航结果
#[derive(Debug, Clone)]
pub struct NavigationResult {
    /// HTTP状态码
    pub status_code: u16,
    /// 内容类型
    pub content_type: Option<String>,
    /// 响应时间（毫秒）
    pub response_time_ms: u64,
}

impl BrowserSession {
    /// 打开一个新的浏览器会话
    ///
    /// 配置了远程调试地址时连接已有Chrome实例，否则本地启动
    /// 一个无头Chromium。代理作为启动参数应用于整个会话。
    ///
    /// # 参数
    ///
    /// * `settings` - 浏览器配置
    /// * `proxy` - 可选的代理服务器URL
    ///
    /// # 返回值
    ///
    /// * `Ok(BrowserSession)` - 可用的会话
    /// * `Err(ScrapeError::Browser)` - 启动或连接失败
    pub async fn open(
        settings: &BrowserSettings,
        proxy: Option<&str>,
    ) -> Result<Self, ScrapeError> {
        let remote_url = settings
            .remote_url
            .clone()
            .or_else(|| std::env::var("CHROMIUM_REMOTE_DEBUGGING_URL").ok());

        let (browser, mut handler, remote) = if let Some(url) = remote_url {
            debug!("Connecting to remote Chrome instance at {}", url);
            let (browser, handler) = Browser::connect(url.as_str())
                .await
                .map_err(|e| ScrapeError::Browser(format!("failed to connect to remote Chrome: {}", e)))?;
            (browser, handler, true)
        } else {
            let mut builder = BrowserConfig::builder()
                .no_sandbox()
                .request_timeout(Duration::from_secs(settings.request_timeout_secs));

            builder = builder.arg("--disable-gpu").arg("--disable-dev-shm-usage");

            if let Some(proxy) = proxy {
                builder = builder.arg(format!("--proxy-server={}", proxy));
            }

            if let Some(args) = &settings.chrome_args {
                for arg in args {
                    builder = builder.arg(arg);
                }
            }

            let config = builder
                .build()
                .map_err(|e| ScrapeError::Browser(e.to_string()))?;

            let (browser, handler) = Browser::launch(config)
                .await
                .map_err(|e| ScrapeError::Browser(e.to_string()))?;
            (browser, handler, false)
        };

        // Spawn a handler to process browser events
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser,
            handler_task,
            remote,
        })
    }

    /// 为一个目标打开并配置新页面
    ///
    /// 依次应用视口/设备模拟、脚本开关、附加请求头与Cookie。
    pub async fn open_page(
        &self,
        target_url: &Url,
        options: &ScrapeOptions,
    ) -> Result<Page, ScrapeError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;

        let (width, height, mobile) = resolve_viewport(options);
        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(width as i64)
            .height(height as i64)
            .device_scale_factor(1.0)
            .mobile(mobile)
            .build()
            .map_err(ScrapeError::Browser)?;
        page.execute(metrics)
            .await
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;

        if mobile {
            page.set_user_agent(MOBILE_USER_AGENT)
                .await
                .map_err(|e| ScrapeError::Browser(e.to_string()))?;
        }

        if !options.enable_javascript {
            let params = SetScriptExecutionDisabledParams::builder()
                .value(true)
                .build()
                .map_err(ScrapeError::Browser)?;
            page.execute(params)
                .await
                .map_err(|e| ScrapeError::Browser(e.to_string()))?;
        }

        if let Some(headers) = &options.headers {
            if !headers.is_empty() {
                let map = serde_json::to_value(headers)
                    .map_err(|e| ScrapeError::Browser(e.to_string()))?;
                page.execute(SetExtraHttpHeadersParams::new(Headers::new(map)))
                    .await
                    .map_err(|e| ScrapeError::Browser(e.to_string()))?;
            }
        }

        if let Some(cookie_header) = &options.cookies {
            let host = target_url.host_str().unwrap_or_default();
            for (name, value) in parse_cookie_header(cookie_header) {
                let param = CookieParam::builder()
                    .name(name.clone())
                    .value(value)
                    .domain(host)
                    .build();
                match param {
                    Ok(param) => {
                        if let Err(e) = page.set_cookie(param).await {
                            warn!("Failed to set cookie {}: {}", name, e);
                        }
                    }
                    Err(e) => warn!("Failed to build cookie {}: {}", name, e),
                }
            }
        }

        Ok(page)
    }

    /// 导航到目标URL并等待加载完成
    ///
    /// 整个导航包裹在显式超时内；配置了`wait_for_selector`时在
    /// `wait_timeout_ms`内轮询其出现，超时仅作为该目标的
    /// `NavigationTimeout`错误向上传递。
    pub async fn navigate(
        &self,
        page: &Page,
        url: &str,
        options: &ScrapeOptions,
        navigation_timeout: Duration,
        default_wait_ms: u64,
    ) -> Result<NavigationResult, ScrapeError> {
        let start = Instant::now();

        let navigation = async {
            page.goto(url)
                .await
                .map_err(|e| ScrapeError::Browser(e.to_string()))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| ScrapeError::Browser(e.to_string()))?;
            Ok::<(), ScrapeError>(())
        };

        tokio::time::timeout(navigation_timeout, navigation)
            .await
            .map_err(|_| ScrapeError::NavigationTimeout {
                url: url.to_string(),
                waited_ms: navigation_timeout.as_millis() as u64,
            })??;

        if let Some(wait_selector) = &options.wait_for_selector {
            let wait_ms = options.wait_timeout_ms.unwrap_or(default_wait_ms);
            self.wait_for_selector(page, url, wait_selector, wait_ms)
                .await?;
        }

        // goto does not expose the HTTP response here; mirror the load status
        Ok(NavigationResult {
            status_code: 200,
            content_type: Some("text/html".to_string()),
            response_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// 在限定时间内轮询等待选择器出现
    async fn wait_for_selector(
        &self,
        page: &Page,
        url: &str,
        selector: &str,
        wait_ms: u64,
    ) -> Result<(), ScrapeError> {
        let deadline = Instant::now() + Duration::from_millis(wait_ms);
        loop {
            if page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ScrapeError::NavigationTimeout {
                    url: url.to_string(),
                    waited_ms: wait_ms,
                });
            }
            sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    /// 读取页面内容快照
    pub async fn content(&self, page: &Page) -> Result<String, ScrapeError> {
        page.content()
            .await
            .map_err(|e| ScrapeError::Browser(e.to_string()))
    }

    /// 截取整页截图，返回base64编码的JPEG
    pub async fn screenshot(&self, page: &Page) -> Result<String, ScrapeError> {
        let params = chromiumoxide::page::ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Jpeg)
            .quality(80)
            .full_page(true)
            .build();

        let bytes = page
            .screenshot(params)
            .await
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;

        Ok(BASE64.encode(bytes))
    }

    /// 关闭目标页面
    pub async fn close_page(&self, page: Page) {
        if let Err(e) = page.close().await {
            warn!("Failed to close page: {}", e);
        }
    }

    /// 关闭会话
    ///
    /// 成功与失败路径都必须走到这里；本地启动的浏览器进程被
    /// 关闭，远程连接只断开不关闭对端实例。
    pub async fn close(mut self) {
        if !self.remote {
            if let Err(e) = self.browser.close().await {
                warn!("Failed to close browser: {}", e);
            }
        }
        self.handler_task.abort();
    }
}

/// 解析`name=value; name2=value2`格式的Cookie字符串
fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// 解析设备/视口配置，返回（宽，高，是否移动端）
fn resolve_viewport(options: &ScrapeOptions) -> (u32, u32, bool) {
    let mobile = matches!(options.device.as_deref(), Some("mobile") | Some("tablet"));

    if let Some(viewport) = options.viewport {
        return (viewport.width, viewport.height, mobile);
    }

    match options.device.as_deref() {
        Some("mobile") => (390, 844, true),
        Some("tablet") => (820, 1180, true),
        _ => (1366, 768, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::target::Viewport;

    #[test]
    fn cookie_header_is_split_into_pairs() {
        let cookies = parse_cookie_header("session=abc123; theme=dark; broken");
        assert_eq!(
            cookies,
            vec![
                ("session".to_string(), "abc123".to_string()),
                ("theme".to_string(), "dark".to_string()),
            ]
        );
    }

    #[test]
    fn cookie_values_may_contain_equals_signs() {
        let cookies = parse_cookie_header("token=a=b=c");
        assert_eq!(cookies, vec![("token".to_string(), "a=b=c".to_string())]);
    }

    #[test]
    fn device_profiles_pick_default_viewports() {
        let mut options = ScrapeOptions::default();
        assert_eq!(resolve_viewport(&options), (1366, 768, false));

        options.device = Some("mobile".to_string());
        assert_eq!(resolve_viewport(&options), (390, 844, true));

        options.viewport = Some(Viewport {
            width: 1024,
            height: 768,
        });
        assert_eq!(resolve_viewport(&options), (1024, 768, true));
    }
}
