// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

use crate::registry::JobRegistry;

/// 任务过期清理工作器
///
/// 负责定期扫描注册表并清理过期的终态任务
pub struct EvictionWorker {
    registry: Arc<JobRegistry>,
    interval: Duration,
}

impl EvictionWorker {
    pub fn new(registry: Arc<JobRegistry>, interval: Duration) -> Self {
        Self { registry, interval }
    }

    /// 运行工作器
    pub async fn run(&self) {
        info!("Job eviction worker started");

        let mut interval = tokio::time::interval(self.interval);

        loop {
            interval.tick().await;

            let evicted = self.registry.evict_expired();
            if evicted > 0 {
                info!(
                    "Evicted {} expired jobs, {} remaining",
                    evicted,
                    self.registry.len()
                );
            }
        }
    }

    /// 启动后台运行
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }
}
