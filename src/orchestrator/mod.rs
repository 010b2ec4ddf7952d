//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `cache_coordinator` - 入口
//! - 校验工作项、查询缓存、回写成功结果
//! - 按原始顺序合并结果
//!
//! ### `batch_scheduler` - 批次调度
//! - 切批、分轮，每轮最多 C 个批次并发
//! - 本轮结束后再开始下一轮
//!
//! ### `summary` - 结果汇总
//!
//! ## 层次关系
//!
//! ```text
//! cache_coordinator (处理 Vec<WorkItem>)
//!     ↓
//! batch_scheduler (处理 Vec<Batch>)
//!     ↓
//! workflow::FallbackOrchestrator (处理单个批次)
//!     ↓
//! services (能力层：适配器 / 校验)
//!     ↓
//! clients + infrastructure (模型后端 / 缓存)
//! ```

pub mod batch_scheduler;
pub mod cache_coordinator;
pub mod summary;

pub use batch_scheduler::{BatchScheduler, ScheduleResult, SchedulePlan};
pub use cache_coordinator::{CacheCoordinator, EnrichResponse};
pub use summary::Summary;
