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
use serde_json::Value;

use crate::domain::models::target::{ScrapeOptions, ScrapeTarget};

/// 任务启动请求数据传输对象
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartJobRequestDto {
    /// 任务ID，未提供时生成UUID
    #[serde(default)]
    pub job_id: Option<String>,
    /// 目标与抓取选项
    pub options: JobOptionsDto,
}

/// 任务目标选项
///
/// `ScrapeTarget`的任务版：URL加抓取选项，没有选择器集合
#[derive(Debug, Deserialize, Serialize)]
pub struct JobOptionsDto {
    /// 目标URL
    pub url: String,
    /// 抓取选项
    #[serde(flatten)]
    pub options: ScrapeOptions,
}

impl JobOptionsDto {
    /// 转换为领域抓取目标
    pub fn into_target(self) -> ScrapeTarget {
        ScrapeTarget {
            url: self.url,
            selectors: Vec::new(),
            options: self.options,
        }
    }
}

/// AI后处理请求数据传输对象
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequestDto {
    /// 要分析的任务ID
    pub result_id: String,
    /// 传给分析提供方的选项
    #[serde(default)]
    pub options: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_options_flatten_scrape_options() {
        let dto: StartJobRequestDto = serde_json::from_str(
            r#"{
                "jobId": "job-1",
                "options": {
                    "url": "https://example.com",
                    "maxDepth": 2,
                    "nextSelector": ".next",
                    "enableJavaScript": true
                }
            }"#,
        )
        .unwrap();

        assert_eq!(dto.job_id.as_deref(), Some("job-1"));
        let target = dto.options.into_target();
        assert_eq!(target.url, "https://example.com");
        assert_eq!(target.options.max_depth, 2);
        assert_eq!(target.options.next_selector.as_deref(), Some(".next"));
    }
}
