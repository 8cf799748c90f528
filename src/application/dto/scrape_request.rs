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

use crate::domain::models::selector::SelectorConfig;
use crate::domain::models::target::ScrapeTarget;

/// 批量抓取请求数据传输对象
#[derive(Debug, Deserialize, Serialize)]
pub struct ScrapeRequestDto {
    /// 要处理的目标列表，按提交顺序执行
    pub targets: Vec<ScrapeTarget>,
}

/// 单页抓取请求数据传输对象
///
/// 用于`fetch`端点，只返回原始HTML
#[derive(Debug, Deserialize, Serialize)]
pub struct FetchRequestDto {
    /// 要抓取的网页URL
    pub url: String,
}

/// 选择器测试请求数据传输对象
///
/// 管理界面在保存选择器配置前用它做一次实时试算
#[derive(Debug, Deserialize, Serialize)]
pub struct TestSelectorRequestDto {
    /// 要测试的网页URL
    pub url: String,
    /// 待测试的选择器配置
    pub selector: SelectorConfig,
}
