//! # Term Enrich
//!
//! 调用外部大模型为文本块抽取实体、为术语补充多语言翻译的批处理引擎
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure / Clients）
//! - `infrastructure/` - 持有跨请求存活的资源，只暴露能力
//! - `CacheStore` - 内容寻址、带 TTL 的结果缓存
//! - `clients/` - 模型后端（OpenAI 兼容接口、Gemini）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个批次
//! - `ProviderAdapter` - 实体抽取 / 术语增强两类适配器
//! - `validator` - 结果质量校验
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个批次"的完整处理流程
//! - `FallbackOrchestrator` - 主服务 → 校验 → 兜底服务
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/cache_coordinator` - 入口：校验、缓存、归位
//! - `orchestrator/batch_scheduler` - 切批、分轮、有界并发
//! - `orchestrator/summary` - 结果汇总
//!
//! ## 模块结构

pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use config::{Config, EnrichConfig};
pub use error::{AppError, AppResult};
pub use infrastructure::{CacheStore, MemoryCacheStore};
pub use models::{
    BatchReport, CacheKey, EnrichmentOutcome, EnrichmentPayload, TargetRequirements, WorkItem,
};
pub use orchestrator::{CacheCoordinator, EnrichResponse, SchedulePlan, Summary};
pub use services::{ProviderAdapter, ProviderBatchResult};
pub use workflow::FallbackOrchestrator;
