// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

/// 抓取子系统错误类型
///
/// 覆盖选择器校验、浏览器导航、导出、持久化和任务注册表
/// 各个环节可能出现的错误情况。
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// URL无效（无法解析为绝对的http/https地址）
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// 选择器配置无效（缺少该类型必需的子字段或CSS路径不合法）
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// 导航超时（等待页面或目标选择器出现超时）
    #[error("Navigation timed out after {waited_ms}ms for {url}")]
    NavigationTimeout { url: String, waited_ms: u64 },

    /// 不支持的导出格式
    #[error("Unsupported export format: {0}")]
    UnsupportedExportFormat(String),

    /// 持久化不可用（未配置数据库连接）
    #[error("Persistence unavailable: no database connection configured")]
    PersistenceUnavailable,

    /// 文件系统错误
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    /// 任务ID重复
    #[error("Job already exists: {0}")]
    DuplicateJob(String),

    /// 任务不存在
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// 任务已处于终态，拒绝写入
    #[error("Job {0} is terminal and cannot be modified")]
    TerminalJob(String),

    /// 浏览器错误（启动、连接或CDP命令失败）
    #[error("Browser error: {0}")]
    Browser(String),

    /// HTTP请求失败（纯HTTP抓取路径）
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// 数据库错误
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for ScrapeError {
    fn from(err: sqlx::Error) -> Self {
        ScrapeError::Database(err.to_string())
    }
}
