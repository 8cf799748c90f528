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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// 应用程序配置设置
///
/// 包含服务器、浏览器、抓取行为、导出、数据库和任务注册表等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// 浏览器配置
    pub browser: BrowserSettings,
    /// 抓取行为配置
    pub scraping: ScrapingSettings,
    /// 导出配置
    pub export: ExportSettings,
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 任务注册表配置
    pub jobs: JobSettings,
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// 浏览器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSettings {
    /// 远程调试地址，设置后连接已有Chrome实例而非本地启动
    pub remote_url: Option<String>,
    /// CDP请求超时时间（秒）
    pub request_timeout_secs: u64,
    /// 附加的Chrome启动参数
    pub chrome_args: Option<Vec<String>>,
}

/// 抓取行为配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapingSettings {
    /// 单次导航的超时时间（秒）
    pub navigation_timeout_secs: u64,
    /// 等待选择器出现的默认超时时间（毫秒）
    pub default_wait_timeout_ms: u64,
    /// 分页爬取的页间延迟（毫秒）
    pub pagination_delay_ms: u64,
    /// 单个批次允许的最大目标数
    pub max_targets_per_batch: usize,
}

/// 导出配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ExportSettings {
    /// 私有导出目录
    pub base_dir: String,
    /// 公开导出目录
    pub public_dir: String,
}

/// 数据库配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL，未设置时持久化适配器不可用
    pub url: Option<String>,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
}

/// 任务注册表配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct JobSettings {
    /// 终态任务的保留时间（秒），超过后被清理
    pub ttl_secs: u64,
    /// 清理扫描间隔（秒）
    pub sweep_interval_secs: u64,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从环境变量加载配置，支持默认值
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            // Start with default settings
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            // Default browser settings
            .set_default("browser.request_timeout_secs", 30)?
            // Default scraping settings
            .set_default("scraping.navigation_timeout_secs", 30)?
            .set_default("scraping.default_wait_timeout_ms", 30_000)?
            .set_default("scraping.pagination_delay_ms", 1_000)?
            .set_default("scraping.max_targets_per_batch", 50)?
            // Default export settings
            .set_default("export.base_dir", "./storage/exports")?
            .set_default("export.public_dir", "./public/exports")?
            // Default database pool settings
            .set_default("database.max_connections", 20)?
            .set_default("database.connect_timeout", 10)?
            // Default job registry settings
            .set_default("jobs.ttl_secs", 3_600)?
            .set_default("jobs.sweep_interval_secs", 300)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("EXTRACTRS").separator("__"));

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_any_configuration() {
        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.scraping.pagination_delay_ms, 1_000);
        assert_eq!(settings.jobs.ttl_secs, 3_600);
        assert!(settings.database.url.is_none());
    }
}
