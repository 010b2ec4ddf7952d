//! 结果缓存
//!
//! 内容寻址、带 TTL 的键值存储。缓存随时可能丢失，只用于减少重复的模型调用。

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::error::CacheError;
use crate::models::{CacheKey, EnrichmentOutcome};

/// 默认 TTL：24 小时
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// 缓存统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// 未过期的条目数
    pub count: usize,
}

/// 缓存存储
///
/// 实现必须支持多个请求并发访问。同一个键的并发写入采用后写覆盖：
/// 键由内容决定，写入的结果形状一致，只是来源 / 置信度可能不同。
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// 读取；未命中或已过期返回 `Ok(None)`
    async fn get(&self, key: &CacheKey) -> Result<Option<EnrichmentOutcome>, CacheError>;

    /// 写入，`ttl` 后过期
    async fn set(
        &self,
        key: &CacheKey,
        outcome: &EnrichmentOutcome,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    async fn delete(&self, key: &CacheKey) -> Result<(), CacheError>;

    async fn clear(&self) -> Result<(), CacheError>;

    /// 键是否存在且未过期
    async fn exists(&self, key: &CacheKey) -> Result<bool, CacheError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn stats(&self) -> Result<CacheStats, CacheError>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    outcome: EnrichmentOutcome,
    /// `None`：TTL 超出时钟可表示范围，视为永不过期
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// 内存缓存
///
/// 进程重启后数据全部丢失。
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<EnrichmentOutcome>, CacheError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.outcome.clone())),
                Some(_) => {}
            }
        }

        // 已过期：升级为写锁后删除（期间可能已被重新写入，需要再检查一次）
        let mut entries = self.entries.write().await;
        if entries.get(key).map(|e| e.is_expired(now)).unwrap_or(false) {
            entries.remove(key);
            debug!("缓存条目已过期: {}", key);
        }
        Ok(entries
            .get(key)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.outcome.clone()))
    }

    async fn set(
        &self,
        key: &CacheKey,
        outcome: &EnrichmentOutcome,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let entry = CacheEntry {
            outcome: outcome.clone(),
            expires_at: Instant::now().checked_add(ttl),
        };
        self.entries.write().await.insert(key.clone(), entry);
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok(CacheStats {
            count: entries.len(),
        })
    }
}
