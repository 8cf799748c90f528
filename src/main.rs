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

use axum::Extension;
use extractrs::analysis::{AnalysisProvider, TextStatsProvider};
use extractrs::config::settings::Settings;
use extractrs::export::Exporter;
use extractrs::infrastructure::database::sink::DatabaseSink;
use extractrs::presentation::routes;
use extractrs::registry::JobRegistry;
use extractrs::utils::telemetry;
use extractrs::workers::eviction_worker::EvictionWorker;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting extractrs...");

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    // 3. Job registry and eviction worker
    let registry = Arc::new(JobRegistry::new(Duration::from_secs(settings.jobs.ttl_secs)));
    let eviction_worker = EvictionWorker::new(
        registry.clone(),
        Duration::from_secs(settings.jobs.sweep_interval_secs),
    );
    eviction_worker.start();

    // 4. Optional persistence adapter
    let sink = DatabaseSink::connect(&settings.database)
        .await?
        .map(Arc::new);
    if sink.is_some() {
        info!("Database connection established");
    } else {
        info!("No database configured, persistence adapter disabled");
    }

    // 5. Export engine and analysis provider
    let exporter = Arc::new(Exporter::new(&settings.export));
    let analysis_provider: Arc<dyn AnalysisProvider> = Arc::new(TextStatsProvider);

    // 6. Start HTTP server
    let app = routes::routes()
        .layer(TraceLayer::new_for_http())
        .layer(Extension(settings.clone()))
        .layer(Extension(registry))
        .layer(Extension(sink))
        .layer(Extension(exporter))
        .layer(Extension(analysis_provider));

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
