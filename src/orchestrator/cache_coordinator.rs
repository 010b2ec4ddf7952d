//! 缓存协调器 - 编排层入口
//!
//! ## 职责
//!
//! 1. **调度前校验**：不合法的工作项直接得到失败结果，永远不会发给模型服务
//! 2. **缓存查询**：按内容计算缓存键，拆分命中 / 未命中
//! 3. **调度**：未命中的工作项交给 `BatchScheduler`
//! 4. **回写**：只缓存新产生的成功结果，失败不缓存，重试时还有机会成功
//! 5. **归位**：按原始提交顺序合并命中结果和新结果
//!
//! 缓存读写失败只会降级为未命中，记录日志并计数，不影响整体调用。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::EnrichConfig;
use crate::error::{AppResult, ValidationError};
use crate::infrastructure::CacheStore;
use crate::models::{BatchReport, CacheKey, EnrichmentOutcome, OutcomeError, WorkItem};
use crate::orchestrator::batch_scheduler::BatchScheduler;
use crate::orchestrator::summary::Summary;
use crate::workflow::FallbackOrchestrator;

/// `enrich` 的返回值
#[derive(Debug, Clone, Serialize)]
pub struct EnrichResponse {
    pub report: BatchReport,
    pub summary: Summary,
}

/// 缓存协调器
pub struct CacheCoordinator {
    cache: Arc<dyn CacheStore>,
    scheduler: BatchScheduler,
    cache_errors: AtomicU64,
}

impl CacheCoordinator {
    pub fn new(cache: Arc<dyn CacheStore>, orchestrator: Arc<FallbackOrchestrator>) -> Self {
        Self {
            cache,
            scheduler: BatchScheduler::new(orchestrator),
            cache_errors: AtomicU64::new(0),
        }
    }

    /// 累计的缓存读写失败次数
    pub fn cache_errors(&self) -> u64 {
        self.cache_errors.load(Ordering::Relaxed)
    }

    /// 处理一组工作项
    ///
    /// 只有配置错误会让整个调用失败；单项、单批的问题都体现在对应结果的 `error` 里。
    pub async fn enrich(
        &self,
        items: Vec<WorkItem>,
        config: &EnrichConfig,
    ) -> AppResult<EnrichResponse> {
        config.validate()?;
        let started = Instant::now();
        let requirements = Arc::new(config.target_requirements.clone());
        let expected_kind = requirements.item_kind();

        let mut slots: Vec<Option<EnrichmentOutcome>> = vec![None; items.len()];
        let mut keys: Vec<Option<CacheKey>> = vec![None; items.len()];

        // ========== 调度前校验 ==========
        let mut candidates: Vec<(usize, WorkItem)> = Vec::with_capacity(items.len());
        for (idx, item) in items.into_iter().enumerate() {
            let checked = item.validate().and_then(|_| {
                if item.kind() == expected_kind {
                    Ok(())
                } else {
                    Err(ValidationError::KindMismatch {
                        item_kind: item.kind().as_str(),
                        expected: expected_kind.as_str(),
                    })
                }
            });
            match checked {
                Ok(()) => {
                    keys[idx] = Some(CacheKey::compute(&item, &requirements));
                    candidates.push((idx, item));
                }
                Err(e) => {
                    warn!("⚠️ 工作项 {} 未通过校验: {}", item.preview(30), e);
                    slots[idx] = Some(EnrichmentOutcome::failure(item.id(), OutcomeError::from(&e)));
                }
            }
        }

        // ========== 缓存查询 ==========
        let misses = if config.use_cache {
            self.lookup(candidates, &keys, &mut slots).await
        } else {
            candidates
        };
        let hits = slots.iter().flatten().filter(|o| o.from_cache).count();
        info!(
            "💾 缓存命中 {} 项，待处理 {} 项",
            hits,
            misses.len()
        );

        // ========== 调度 ==========
        let scheduled = self
            .scheduler
            .run(misses, requirements, config.batch_size, config.concurrency)
            .await;

        // ========== 回写 ==========
        if config.use_cache {
            let writes = scheduled
                .outcomes
                .iter()
                .filter(|(_, outcome)| outcome.is_success())
                .filter_map(|(idx, outcome)| keys[*idx].as_ref().map(|key| (key, outcome)))
                .map(|(key, outcome)| async move {
                    (key, self.cache.set(key, outcome, config.cache_ttl).await)
                });
            for (key, result) in join_all(writes).await {
                if let Err(e) = result {
                    self.cache_errors.fetch_add(1, Ordering::Relaxed);
                    warn!("⚠️ 缓存写入失败 ({}): {}", key, e);
                }
            }
        }

        // ========== 归位 ==========
        for (idx, outcome) in scheduled.outcomes {
            slots[idx] = Some(outcome);
        }
        let outcomes = slots
            .into_iter()
            .enumerate()
            .map(|(idx, slot)| {
                slot.unwrap_or_else(|| {
                    // 调度器为每个提交的工作项都会返回结果，这里只兜住意外情况
                    EnrichmentOutcome::failure(
                        format!("#{}", idx),
                        OutcomeError::from(&crate::error::ProviderError::TaskAborted {
                            message: "结果缺失".to_string(),
                        }),
                    )
                })
            })
            .collect();

        let report = BatchReport {
            outcomes,
            fallback_invocations: scheduled.fallback_invocations,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        let summary = Summary::from_report(&report);
        Ok(EnrichResponse { report, summary })
    }

    /// 查询缓存，命中的直接写入 `slots`，返回未命中的工作项
    async fn lookup(
        &self,
        candidates: Vec<(usize, WorkItem)>,
        keys: &[Option<CacheKey>],
        slots: &mut [Option<EnrichmentOutcome>],
    ) -> Vec<(usize, WorkItem)> {
        let lookups = candidates.iter().map(|(idx, _)| async move {
            match &keys[*idx] {
                Some(key) => self.cache.get(key).await,
                None => Ok(None),
            }
        });
        let results = join_all(lookups).await;

        let mut misses = Vec::new();
        for ((idx, item), result) in candidates.into_iter().zip(results) {
            match result {
                Ok(Some(stored)) if stored.is_success() => {
                    debug!("缓存命中: {}", item.id());
                    slots[idx] = Some(stored.as_cache_hit(item.id()));
                }
                Ok(_) => misses.push((idx, item)),
                Err(e) => {
                    self.cache_errors.fetch_add(1, Ordering::Relaxed);
                    warn!("⚠️ 缓存读取失败，按未命中处理: {}", e);
                    misses.push((idx, item));
                }
            }
        }
        misses
    }
}
