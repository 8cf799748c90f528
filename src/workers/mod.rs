// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 提供批量编排、长时任务执行和注册表清理功能
pub mod batch_worker;
pub mod eviction_worker;
pub mod job_worker;
