//! 基础设施层
//!
//! 持有跨请求存活的资源，只暴露能力。

pub mod cache_store;

pub use cache_store::{CacheStats, CacheStore, MemoryCacheStore, DEFAULT_CACHE_TTL};
