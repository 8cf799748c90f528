// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::domain::models::job::ScrapeJob;

/// 分析提供方特质
///
/// AI后处理的接入缝：真实的AI/NLP富化服务实现本特质后，
/// 其输出通过注册表挂载到`ScrapeJob.ai_analysis`。子系统
/// 自身只定义挂载点，不关心分析的具体来源。
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// 分析一个任务的累积数据
    async fn analyze(&self, job: &ScrapeJob, options: &Value) -> anyhow::Result<Value>;

    /// 提供方名称
    fn name(&self) -> &'static str;
}

/// 内置的文本统计提供方
///
/// 在没有外部AI服务时使用的确定性实现：词数、高频关键词与
/// 各类内容的数量统计。
pub struct TextStatsProvider;

#[async_trait]
impl AnalysisProvider for TextStatsProvider {
    async fn analyze(&self, job: &ScrapeJob, options: &Value) -> anyhow::Result<Value> {
        let keyword_limit = options
            .get("keywordLimit")
            .and_then(|v| v.as_u64())
            .unwrap_or(10) as usize;

        let combined = job.data.text.join(" ");
        let words: Vec<&str> = combined.split_whitespace().collect();

        let mut frequencies: HashMap<String, usize> = HashMap::new();
        for word in &words {
            let normalized: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();
            if normalized.len() > 3 {
                *frequencies.entry(normalized).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(String, usize)> = frequencies.into_iter().collect();
        // 频次降序，同频按字典序保证确定性
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let keywords: Vec<Value> = ranked
            .into_iter()
            .take(keyword_limit)
            .map(|(word, count)| json!({"word": word, "count": count}))
            .collect();

        let summary: String = combined.chars().take(280).collect();

        Ok(json!({
            "provider": self.name(),
            "wordCount": words.len(),
            "keywords": keywords,
            "imageCount": job.data.images.len(),
            "videoCount": job.data.videos.len(),
            "tableCount": job.data.tables.len(),
            "listCount": job.data.lists.len(),
            "summary": summary,
        }))
    }

    fn name(&self) -> &'static str {
        "text-stats"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_with_text(text: &[&str]) -> ScrapeJob {
        let mut job = ScrapeJob::new("j1", "https://example.com");
        job.data.text = text.iter().map(|s| s.to_string()).collect();
        job
    }

    #[tokio::test]
    async fn word_count_and_keywords_are_computed() {
        let job = job_with_text(&[
            "widgets are great",
            "widgets ship worldwide",
            "worldwide widgets",
        ]);
        let provider = TextStatsProvider;

        let analysis = provider.analyze(&job, &json!({})).await.unwrap();
        assert_eq!(analysis["wordCount"], 8);
        assert_eq!(analysis["keywords"][0]["word"], "widgets");
        assert_eq!(analysis["keywords"][0]["count"], 3);
    }

    #[tokio::test]
    async fn keyword_limit_option_is_honored() {
        let job = job_with_text(&["alpha beta gamma delta alpha beta gamma alpha"]);
        let provider = TextStatsProvider;

        let analysis = provider
            .analyze(&job, &json!({"keywordLimit": 2}))
            .await
            .unwrap();
        assert_eq!(analysis["keywords"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn output_is_deterministic() {
        let job = job_with_text(&["repeat repeat alpha alpha"]);
        let provider = TextStatsProvider;

        let first = provider.analyze(&job, &json!({})).await.unwrap();
        let second = provider.analyze(&job, &json!({})).await.unwrap();
        assert_eq!(first, second);
    }
}
