// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{Duration as ChronoDuration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::models::error::ScrapeError;
use crate::domain::models::job::{JobMetadata, JobStatus, ScrapeJob};

/// 任务注册表
///
/// 子系统中唯一跨请求共享的可变结构：按任务id键控的
/// `ScrapeJob`注册表。每个条目有独立的锁，对同一任务的
/// 全部变更被串行化；读取克隆一致的快照，不会观察到
/// 半更新状态。终态任务超过TTL后由后台清理任务移除。
pub struct JobRegistry {
    jobs: DashMap<String, Arc<RwLock<ScrapeJob>>>,
    ttl: Duration,
}

/// 任务阶段补丁
///
/// `advance`调用随进度一并合并的增量数据：数据字段追加，
/// 元数据在补丁携带时整体替换。
#[derive(Debug, Default)]
pub struct JobPatch {
    pub text: Vec<String>,
    pub images: Vec<String>,
    pub videos: Vec<String>,
    pub tables: Vec<Vec<Vec<String>>>,
    pub lists: Vec<Vec<String>>,
    pub metadata: Option<JobMetadata>,
}

impl JobRegistry {
    /// 创建新的任务注册表
    ///
    /// # 参数
    ///
    /// * `ttl` - 终态任务的保留时间
    pub fn new(ttl: Duration) -> Self {
        Self {
            jobs: DashMap::new(),
            ttl,
        }
    }

    /// 创建一个新的待执行任务
    ///
    /// # 返回值
    ///
    /// * `Ok(ScrapeJob)` - 创建的任务快照
    /// * `Err(ScrapeError::DuplicateJob)` - id已存在
    pub fn create(&self, id: &str, url: &str) -> Result<ScrapeJob, ScrapeError> {
        match self.jobs.entry(id.to_string()) {
            Entry::Occupied(_) => Err(ScrapeError::DuplicateJob(id.to_string())),
            Entry::Vacant(entry) => {
                let job = ScrapeJob::new(id, url);
                entry.insert(Arc::new(RwLock::new(job.clone())));
                Ok(job)
            }
        }
    }

    /// 推进任务并合并阶段数据
    ///
    /// 进度单调不减；首次调用将Pending转换为InProgress；
    /// 任务已处于终态时拒绝写入。
    pub fn advance(&self, id: &str, delta: u8, patch: JobPatch) -> Result<ScrapeJob, ScrapeError> {
        let entry = self
            .jobs
            .get(id)
            .ok_or_else(|| ScrapeError::JobNotFound(id.to_string()))?;

        let mut job = entry.write();
        job.advance(delta)?;
        job.data.text.extend(patch.text);
        job.data.images.extend(patch.images);
        job.data.videos.extend(patch.videos);
        job.data.tables.extend(patch.tables);
        job.data.lists.extend(patch.lists);
        if let Some(metadata) = patch.metadata {
            job.metadata = metadata;
        }
        Ok(job.clone())
    }

    /// 完成任务（终态，进度置为100）
    pub fn complete(&self, id: &str) -> Result<ScrapeJob, ScrapeError> {
        let entry = self
            .jobs
            .get(id)
            .ok_or_else(|| ScrapeError::JobNotFound(id.to_string()))?;

        let mut job = entry.write();
        job.complete()?;
        Ok(job.clone())
    }

    /// 标记任务失败（终态，保留已推进的进度）
    pub fn fail(&self, id: &str, error: impl Into<String>) -> Result<ScrapeJob, ScrapeError> {
        let entry = self
            .jobs
            .get(id)
            .ok_or_else(|| ScrapeError::JobNotFound(id.to_string()))?;

        let mut job = entry.write();
        job.fail(error)?;
        Ok(job.clone())
    }

    /// 挂载AI后处理结果
    ///
    /// 与生命周期写入正交：不触碰状态与进度，允许在已完成的
    /// 任务上执行；失败任务没有可分析的数据，予以拒绝。
    pub fn attach_analysis(&self, id: &str, analysis: Value) -> Result<ScrapeJob, ScrapeError> {
        let entry = self
            .jobs
            .get(id)
            .ok_or_else(|| ScrapeError::JobNotFound(id.to_string()))?;

        let mut job = entry.write();
        if job.status == JobStatus::Failed {
            return Err(ScrapeError::TerminalJob(id.to_string()));
        }
        job.ai_analysis = Some(analysis);
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    /// 读取任务快照
    pub fn get(&self, id: &str) -> Option<ScrapeJob> {
        self.jobs.get(id).map(|entry| entry.read().clone())
    }

    /// 清理过期任务
    ///
    /// 移除最后更新时间早于TTL的终态任务；未到终态的任务
    /// 永不清理。返回移除的条目数。
    pub fn evict_expired(&self) -> usize {
        let cutoff = Utc::now()
            - ChronoDuration::from_std(self.ttl).unwrap_or_else(|_| ChronoDuration::seconds(0));
        let before = self.jobs.len();
        self.jobs.retain(|_, entry| {
            let job = entry.read();
            !(job.status.is_terminal() && job.updated_at < cutoff)
        });
        before - self.jobs.len()
    }

    /// 当前注册的任务数
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
