//! 模型服务适配器
//!
//! 两类适配器（实体抽取、术语增强）共用同一套错误约定，调度层因此不需要区分它们。

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::models::{EnrichmentOutcome, TargetRequirements, WorkItem};

/// 一次批量调用的结果
///
/// 单个工作项的问题不会让整个调用报错，而是落在 `failed` 里。
#[derive(Debug, Clone, Default)]
pub struct ProviderBatchResult {
    pub succeeded: Vec<EnrichmentOutcome>,
    pub failed: Vec<(WorkItem, ProviderError)>,
}

impl ProviderBatchResult {
    /// 整批失败：每个工作项带上同一个原因
    pub fn all_failed(items: &[WorkItem], error: ProviderError) -> Self {
        Self {
            succeeded: Vec::new(),
            failed: items.iter().map(|item| (item.clone(), error.clone())).collect(),
        }
    }
}

/// 模型服务适配器
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// 名称（写入结果的 provider_name）
    fn name(&self) -> &str;

    /// 处理一个批次
    async fn enrich_batch(
        &self,
        items: &[WorkItem],
        requirements: &TargetRequirements,
    ) -> ProviderBatchResult;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TextChunk;

    #[test]
    fn test_all_failed_shares_reason() {
        let items: Vec<WorkItem> = (0..3)
            .map(|i| TextChunk::new(format!("内容 {}", i), i, "doc.pdf").unwrap().into())
            .collect();
        let err = ProviderError::Quota {
            provider: "gpt-4o".to_string(),
            message: "limit".to_string(),
        };

        let result = ProviderBatchResult::all_failed(&items, err.clone());
        assert!(result.succeeded.is_empty());
        assert_eq!(result.failed.len(), 3);
        assert!(result.failed.iter().all(|(_, e)| *e == err));
    }
}
