// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含抓取子系统的核心业务概念：
/// - 领域模型（models）：选择器、抓取目标、抓取结果、任务与表映射
///
/// 领域层不依赖任何外部实现，体现纯粹的业务规则。
pub mod models;
