// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::domain::models::error::ScrapeError;

/// 抓取任务实体
///
/// 表示一次长时间运行的单目标提取任务。任务在创建时进入
/// 注册表，由持有它的编排任务随阶段推进就地更新，进度在
/// 到达终态前单调不减。状态转换只能向前：
/// Pending → InProgress → Completed/Failed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeJob {
    /// 任务唯一标识符
    pub id: String,
    /// 目标URL
    pub url: String,
    /// 任务状态
    pub status: JobStatus,
    /// 进度百分比，[0,100]，到达终态前单调不减
    pub progress: u8,
    /// 各阶段累积的提取数据
    pub data: JobData,
    /// 页面元数据
    pub metadata: JobMetadata,
    /// AI后处理结果的挂载点，由分析提供方写入
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<Value>,
    /// 失败原因，仅在`status = Failed`时存在
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 最后更新时间
    pub updated_at: DateTime<Utc>,
}

/// 任务状态枚举
///
/// 状态只向前转换，终态不可再写。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    /// 已创建，尚未开始执行
    #[default]
    Pending,
    /// 执行中
    InProgress,
    /// 已完成，进度固定为100
    Completed,
    /// 已失败
    Failed,
}

impl JobStatus {
    /// 判断是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::InProgress => write!(f, "in-progress"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "in-progress" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(()),
        }
    }
}

/// 任务累积数据
///
/// 文本、图片、视频、表格与列表，随提取阶段逐步追加。
/// 表格为 表→行→单元格 的三层结构，列表为 列表→列表项。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobData {
    #[serde(default)]
    pub text: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub videos: Vec<String>,
    #[serde(default)]
    pub tables: Vec<Vec<Vec<String>>>,
    #[serde(default)]
    pub lists: Vec<Vec<String>>,
}

/// 任务页面元数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMetadata {
    /// 页面标题
    pub page_title: Option<String>,
    /// 页面描述（meta description）
    pub page_description: Option<String>,
    /// 页面关键词（meta keywords）
    #[serde(default)]
    pub page_keywords: Vec<String>,
    /// 页面元素总数
    pub total_elements: u64,
}

impl ScrapeJob {
    /// 创建一个新的待执行任务
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            url: url.into(),
            status: JobStatus::Pending,
            progress: 0,
            data: JobData::default(),
            metadata: JobMetadata::default(),
            ai_analysis: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 推进任务进度
    ///
    /// 首次调用将状态从Pending转换为InProgress。进度饱和累加，
    /// 在完成之前被钳制在99以内，保证单调不减。
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 推进成功
    /// * `Err(ScrapeError::TerminalJob)` - 任务已处于终态
    pub fn advance(&mut self, delta: u8) -> Result<(), ScrapeError> {
        if self.status.is_terminal() {
            return Err(ScrapeError::TerminalJob(self.id.clone()));
        }
        if self.status == JobStatus::Pending {
            self.status = JobStatus::InProgress;
        }
        self.progress = self.progress.saturating_add(delta).min(99);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 完成任务
    ///
    /// 设置终态Completed并将进度置为100。
    pub fn complete(&mut self) -> Result<(), ScrapeError> {
        if self.status.is_terminal() {
            return Err(ScrapeError::TerminalJob(self.id.clone()));
        }
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 标记任务失败
    ///
    /// 设置终态Failed，保留已推进的进度。
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), ScrapeError> {
        if self.status.is_terminal() {
            return Err(ScrapeError::TerminalJob(self.id.clone()));
        }
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_moves_pending_to_in_progress() {
        let mut job = ScrapeJob::new("j1", "https://example.com");
        assert_eq!(job.status, JobStatus::Pending);
        job.advance(20).unwrap();
        assert_eq!(job.status, JobStatus::InProgress);
        assert_eq!(job.progress, 20);
    }

    #[test]
    fn progress_is_capped_below_100_until_completion() {
        let mut job = ScrapeJob::new("j1", "https://example.com");
        job.advance(80).unwrap();
        job.advance(80).unwrap();
        assert_eq!(job.progress, 99);
        job.complete().unwrap();
        assert_eq!(job.progress, 100);
    }

    #[test]
    fn terminal_states_reject_writes() {
        let mut job = ScrapeJob::new("j1", "https://example.com");
        job.advance(10).unwrap();
        job.complete().unwrap();
        assert!(job.advance(10).is_err());
        assert!(job.fail("late").is_err());
        assert!(job.complete().is_err());
    }

    #[test]
    fn failed_job_keeps_progress_below_100() {
        let mut job = ScrapeJob::new("j1", "https://example.com");
        job.advance(40).unwrap();
        job.fail("navigation timed out").unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.progress < 100);
        assert!(job.error.is_some());
    }

    #[test]
    fn status_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(JobStatus::InProgress).unwrap(),
            serde_json::json!("in-progress")
        );
        assert_eq!(JobStatus::from_str("in-progress"), Ok(JobStatus::InProgress));
    }
}
