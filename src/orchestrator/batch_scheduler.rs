//! 批次调度器 - 编排层
//!
//! 把未命中缓存的工作项切成固定大小的批次，每轮最多并发 C 个批次，
//! 本轮全部结束（成功或失败）后才开始下一轮。
//!
//! 预计耗时 ≈ `ceil(批次数 / C) × 平均批次耗时`。

use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use crate::error::ProviderError;
use crate::models::{EnrichmentOutcome, OutcomeError, TargetRequirements, WorkItem};
use crate::utils::logging::{log_round_complete, log_round_start, log_schedule};
use crate::workflow::{BatchCtx, FallbackOrchestrator};

/// 批次数
pub fn calculate_batch_count(item_count: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        return 0;
    }
    item_count.div_ceil(batch_size)
}

/// 轮次数
pub fn calculate_round_count(batch_count: usize, concurrency: usize) -> usize {
    if concurrency == 0 {
        return 0;
    }
    batch_count.div_ceil(concurrency)
}

/// 调度计划
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulePlan {
    pub item_count: usize,
    pub batch_size: usize,
    pub concurrency: usize,
    pub batch_count: usize,
    pub round_count: usize,
}

impl SchedulePlan {
    pub fn new(item_count: usize, batch_size: usize, concurrency: usize) -> Self {
        let batch_count = calculate_batch_count(item_count, batch_size);
        Self {
            item_count,
            batch_size,
            concurrency,
            batch_count,
            round_count: calculate_round_count(batch_count, concurrency),
        }
    }

    /// 按平均批次耗时估算总耗时
    pub fn estimate(&self, avg_batch_latency: Duration) -> Duration {
        avg_batch_latency * self.round_count as u32
    }
}

/// 调度结果，`outcomes` 里的序号是工作项在原始请求中的位置
#[derive(Debug, Clone)]
pub struct ScheduleResult {
    pub outcomes: Vec<(usize, EnrichmentOutcome)>,
    pub fallback_invocations: usize,
    pub plan: SchedulePlan,
}

/// 批次调度器
pub struct BatchScheduler {
    orchestrator: Arc<FallbackOrchestrator>,
}

impl BatchScheduler {
    pub fn new(orchestrator: Arc<FallbackOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// 执行调度
    ///
    /// `items` 中的序号原样带回；某一批彻底失败不影响同轮或后续批次。
    pub async fn run(
        &self,
        items: Vec<(usize, WorkItem)>,
        requirements: Arc<TargetRequirements>,
        batch_size: usize,
        concurrency: usize,
    ) -> ScheduleResult {
        let batch_size = batch_size.max(1);
        let concurrency = concurrency.max(1);
        let plan = SchedulePlan::new(items.len(), batch_size, concurrency);
        let mut result = ScheduleResult {
            outcomes: Vec::with_capacity(items.len()),
            fallback_invocations: 0,
            plan,
        };
        if items.is_empty() {
            return result;
        }

        log_schedule(
            requirements.item_kind().as_str(),
            plan.item_count,
            plan.batch_count,
            plan.round_count,
        );

        let batches: Vec<Vec<(usize, WorkItem)>> =
            items.chunks(batch_size).map(|chunk| chunk.to_vec()).collect();

        for (round_idx, round_batches) in batches.chunks(concurrency).enumerate() {
            let round = round_idx + 1;
            let first_batch = round_idx * concurrency + 1;
            log_round_start(
                round,
                plan.round_count,
                first_batch,
                first_batch + round_batches.len() - 1,
                plan.batch_count,
            );

            // 为本轮创建并发任务
            let mut round_handles = Vec::with_capacity(round_batches.len());
            for (offset, batch) in round_batches.iter().enumerate() {
                let ctx = BatchCtx::new(round, first_batch + offset, plan.batch_count, batch.len());
                let (indices, batch_items): (Vec<usize>, Vec<WorkItem>) =
                    batch.iter().cloned().unzip();
                let orchestrator = self.orchestrator.clone();
                let requirements = requirements.clone();

                let handle = tokio::spawn(async move {
                    orchestrator
                        .enrich_batch(&ctx, &batch_items, &requirements)
                        .await
                });
                round_handles.push((ctx, indices, batch, handle));
            }

            // 等待本轮所有任务完成
            let mut round_success = 0;
            let mut round_total = 0;
            for (ctx, indices, batch, handle) in round_handles {
                round_total += indices.len();
                match handle.await {
                    Ok(batch_outcome) => {
                        if batch_outcome.fallback_invoked {
                            result.fallback_invocations += 1;
                        }
                        round_success += batch_outcome
                            .outcomes
                            .iter()
                            .filter(|o| o.is_success())
                            .count();
                        result
                            .outcomes
                            .extend(indices.into_iter().zip(batch_outcome.outcomes));
                    }
                    Err(e) => {
                        error!("{} 任务执行失败: {}", ctx, e);
                        let err = OutcomeError::from(&ProviderError::TaskAborted {
                            message: e.to_string(),
                        });
                        result.outcomes.extend(batch.iter().map(|(idx, item)| {
                            (*idx, EnrichmentOutcome::failure(item.id(), err.clone()))
                        }));
                    }
                }
            }

            log_round_complete(round, round_success, round_total);
        }

        result
    }
}
