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

use crate::domain::models::database::DatabaseConfig;
use crate::domain::models::scrape_result::ScrapingResult;
use crate::export::ExportFormat;

/// 文件导出请求数据传输对象
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFileRequestDto {
    /// 要导出的结果集
    pub results: Vec<ScrapingResult>,
    /// 可选文件名（清洗后使用）
    #[serde(default)]
    pub filename: Option<String>,
    /// 导出格式
    pub format: ExportFormat,
    /// 写入公开目录还是私有目录
    #[serde(default)]
    pub save_to_public: bool,
}

/// 数据库写入请求数据传输对象
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDbRequestDto {
    /// 要写入的结果集
    pub results: Vec<ScrapingResult>,
    /// 目标表配置
    pub db_config: DatabaseConfig,
}
