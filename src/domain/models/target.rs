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

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use url::Url;

use crate::domain::models::error::ScrapeError;
use crate::domain::models::selector::SelectorConfig;

/// 抓取目标
///
/// 一次批量抓取中的单个目标：一个绝对URL、应用于该页面的
/// 选择器集合，以及会话级与导航级选项。请求作用域对象，
/// 除非调用方显式调用持久化适配器，否则不会落库。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeTarget {
    /// 目标URL，必须能解析为绝对的http/https地址
    pub url: String,
    /// 应用于该目标的选择器集合，id在集合内必须唯一
    #[serde(default)]
    pub selectors: Vec<SelectorConfig>,
    /// 抓取选项
    #[serde(default)]
    pub options: ScrapeOptions,
}

/// 抓取选项
///
/// 会话配置（请求头、Cookie、代理、视口、JS开关）与导航行为
/// （等待选择器、超时、分页、节流）的组合。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrapeOptions {
    /// 附加HTTP请求头
    pub headers: Option<HashMap<String, String>>,
    /// HTTP方法；设置为GET以外的值时走纯HTTP抓取路径
    pub method: Option<String>,
    /// 请求体，仅在纯HTTP抓取路径下随非GET请求发送
    pub body: Option<String>,
    /// 等待出现的选择器，导航完成后在超时内轮询其存在
    pub wait_for_selector: Option<String>,
    /// 等待超时时间（毫秒），未设置时取配置默认值
    pub wait_timeout_ms: Option<u64>,
    /// 是否启用JavaScript渲染
    #[serde(rename = "enableJavaScript")]
    pub enable_javascript: bool,
    /// 是否跟随重定向（纯HTTP抓取路径）
    pub follow_redirects: bool,
    /// 分页跟随的最大深度（页面跳转次数上限，强制约束）
    pub max_depth: u32,
    /// 分页"下一页"控件的选择器，设置后启用分页爬取
    pub next_selector: Option<String>,
    /// 目标间节流延迟（毫秒），0表示不节流
    pub throttle_ms: u64,
    /// 代理服务器URL
    pub proxy: Option<String>,
    /// Cookie字符串，`name=value; name2=value2`格式，按目标主机名设置
    pub cookies: Option<String>,
    /// 是否截图
    pub capture_screenshot: bool,
    /// 设备模拟档位（desktop/mobile/tablet）
    pub device: Option<String>,
    /// 视口尺寸，优先于设备档位的默认视口
    pub viewport: Option<Viewport>,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            headers: None,
            method: None,
            body: None,
            wait_for_selector: None,
            wait_timeout_ms: None,
            enable_javascript: true,
            follow_redirects: true,
            max_depth: 0,
            next_selector: None,
            throttle_ms: 0,
            proxy: None,
            cookies: None,
            capture_screenshot: false,
            device: None,
            viewport: None,
        }
    }
}

/// 视口尺寸
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    /// 宽度（像素）
    pub width: u32,
    /// 高度（像素）
    pub height: u32,
}

impl ScrapeOptions {
    /// 判断该目标是否需要浏览器会话
    ///
    /// 需要JS渲染、截图、等待选择器或分页的目标走浏览器路径，
    /// 其余目标走纯HTTP抓取路径。
    pub fn needs_browser(&self) -> bool {
        (self.enable_javascript
            || self.capture_screenshot
            || self.wait_for_selector.is_some()
            || self.next_selector.is_some())
            && !self.is_non_get()
    }

    /// 判断是否为非GET请求（只能由纯HTTP路径处理）
    pub fn is_non_get(&self) -> bool {
        self.method
            .as_deref()
            .is_some_and(|m| !m.eq_ignore_ascii_case("get"))
    }
}

impl ScrapeTarget {
    /// 校验抓取目标
    ///
    /// URL必须是绝对的http/https地址，选择器id必须唯一，
    /// 每个选择器自身必须通过校验。
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 目标有效
    /// * `Err(ScrapeError)` - URL或选择器无效
    pub fn validate(&self) -> Result<(), ScrapeError> {
        let parsed = Url::parse(&self.url)
            .map_err(|e| ScrapeError::InvalidUrl(format!("{}: {}", self.url, e)))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ScrapeError::InvalidUrl(format!(
                "{}: unsupported scheme '{}'",
                self.url,
                parsed.scheme()
            )));
        }

        if parsed.host_str().is_none() {
            return Err(ScrapeError::InvalidUrl(format!("{}: missing host", self.url)));
        }

        let mut seen = HashSet::new();
        for selector in &self.selectors {
            selector.validate()?;
            if !seen.insert(selector.id.as_str()) {
                return Err(ScrapeError::InvalidSelector(format!(
                    "duplicate selector id '{}'",
                    selector.id
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::selector::SelectorKind;

    fn target(url: &str) -> ScrapeTarget {
        ScrapeTarget {
            url: url.to_string(),
            selectors: vec![],
            options: ScrapeOptions::default(),
        }
    }

    #[test]
    fn absolute_http_url_is_valid() {
        assert!(target("https://example.com/page").validate().is_ok());
    }

    #[test]
    fn relative_url_is_rejected() {
        assert!(target("/just/a/path").validate().is_err());
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        assert!(target("ftp://example.com").validate().is_err());
        assert!(target("file:///etc/passwd").validate().is_err());
    }

    #[test]
    fn duplicate_selector_ids_are_rejected() {
        let mut t = target("https://example.com");
        let selector = SelectorConfig {
            id: "title".to_string(),
            name: None,
            selector: "h1".to_string(),
            kind: SelectorKind::Text,
            attribute: None,
            list_item_selector: None,
        };
        t.selectors = vec![selector.clone(), selector];
        assert!(t.validate().is_err());
    }

    #[test]
    fn default_options_use_browser_path() {
        assert!(ScrapeOptions::default().needs_browser());
    }

    #[test]
    fn non_get_method_uses_http_path() {
        let options = ScrapeOptions {
            method: Some("POST".to_string()),
            ..Default::default()
        };
        assert!(options.is_non_get());
        assert!(!options.needs_browser());
    }

    #[test]
    fn disabled_javascript_uses_http_path() {
        let options = ScrapeOptions {
            enable_javascript: false,
            ..Default::default()
        };
        assert!(!options.needs_browser());
    }
}
