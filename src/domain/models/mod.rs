// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了抓取子系统的核心实体，包括：
/// - 选择器（selector）：四种提取变体的选择器语言
/// - 抓取目标（target）：URL、选择器集合与抓取选项
/// - 抓取结果（scrape_result）：按目标隔离成败的结果项
/// - 任务（job）：长时间运行提取任务的状态机
/// - 表映射（database）：抓取输出到关系表的列映射
/// - 错误（error）：子系统统一的错误分类
pub mod database;
pub mod error;
pub mod job;
pub mod scrape_result;
pub mod selector;
pub mod target;
