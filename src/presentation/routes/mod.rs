// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::presentation::handlers::{
    export_handler, fetch_handler, job_handler, scrape_handler, upload_handler,
};
use axum::{
    routing::{get, post},
    Router,
};

/// 创建应用路由
///
/// # 返回值
///
/// 返回配置好的路由
pub fn routes() -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/version", get(version));

    let scraping_routes = Router::new()
        .route("/scraping/fetch", post(fetch_handler::fetch_page))
        .route("/scraping/test-selector", post(scrape_handler::test_selector))
        .route("/scraping/scrape", post(scrape_handler::scrape_targets))
        .route("/scraping/save-file", post(export_handler::save_file))
        .route("/scraping/save-db", post(export_handler::save_db))
        .route("/scraping/start-job", post(job_handler::start_job))
        .route("/scraping/analyze", post(job_handler::analyze))
        .route("/scraping/job/{job_id}", get(job_handler::get_job))
        .route("/scraping/upload-urls", post(upload_handler::upload_urls));

    Router::new().merge(public_routes).merge(scraping_routes)
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
///
/// # 返回值
///
/// 返回应用版本号
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
