//! 增强结果

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, QualityError, ValidationError};
use crate::models::entity::ExtractedEntity;

/// 模型服务角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderRole {
    /// 首选（质量更高）
    Primary,
    /// 兜底
    Secondary,
}

impl std::fmt::Display for ProviderRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderRole::Primary => write!(f, "primary"),
            ProviderRole::Secondary => write!(f, "secondary"),
        }
    }
}

/// 结果内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnrichmentPayload {
    /// 实体列表（文本块抽取）
    Entities { entities: Vec<ExtractedEntity> },
    /// 语言代码 → 译文（术语增强）
    Translations { translations: BTreeMap<String, String> },
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Provider,
    Quality,
}

/// 单条结果中的错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ValidationError> for OutcomeError {
    fn from(err: &ValidationError) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: err.to_string(),
        }
    }
}

impl From<&ProviderError> for OutcomeError {
    fn from(err: &ProviderError) -> Self {
        Self {
            kind: ErrorKind::Provider,
            message: err.to_string(),
        }
    }
}

impl From<&QualityError> for OutcomeError {
    fn from(err: &QualityError) -> Self {
        Self {
            kind: ErrorKind::Quality,
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for OutcomeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// 单个工作项的增强结果
///
/// `payload` 与 `error` 恰好有一个存在，只能通过 `success` / `failure` 构造。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentOutcome {
    pub work_item_id: String,
    pub payload: Option<EnrichmentPayload>,
    /// 产生结果的角色；调度前被拒绝的工作项为 None
    pub source_provider: Option<ProviderRole>,
    /// 具体模型名称（如 gpt-4o）
    pub provider_name: Option<String>,
    pub confidence: f32,
    pub evidence: Vec<String>,
    pub from_cache: bool,
    pub elapsed_ms: u64,
    pub error: Option<OutcomeError>,
}

impl EnrichmentOutcome {
    /// 成功结果，置信度会被限制在 [0, 1]
    pub fn success(
        work_item_id: impl Into<String>,
        payload: EnrichmentPayload,
        provider_name: impl Into<String>,
        confidence: f32,
        evidence: Vec<String>,
    ) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            work_item_id: work_item_id.into(),
            payload: Some(payload),
            source_provider: None,
            provider_name: Some(provider_name.into()),
            confidence,
            evidence,
            from_cache: false,
            elapsed_ms: 0,
            error: None,
        }
    }

    /// 失败结果
    pub fn failure(work_item_id: impl Into<String>, error: OutcomeError) -> Self {
        Self {
            work_item_id: work_item_id.into(),
            payload: None,
            source_provider: None,
            provider_name: None,
            confidence: 0.0,
            evidence: Vec::new(),
            from_cache: false,
            elapsed_ms: 0,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.payload.is_some() && self.error.is_none()
    }

    /// 标记产生结果的角色
    pub fn with_role(mut self, role: ProviderRole) -> Self {
        self.source_provider = Some(role);
        self
    }

    pub fn with_elapsed(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    /// 将缓存中的结果转为本次请求的命中结果
    ///
    /// 同一内容可能对应不同的工作项标识（如不同文件中的同一段文字）。
    pub fn as_cache_hit(&self, work_item_id: impl Into<String>) -> Self {
        let mut hit = self.clone();
        hit.work_item_id = work_item_id.into();
        hit.from_cache = true;
        hit.elapsed_ms = 0;
        hit
    }
}

/// 一次调用的完整报告
///
/// 每个提交的工作项恰好对应一条结果，顺序与提交顺序一致。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: Vec<EnrichmentOutcome>,
    /// 进入兜底的批次数
    pub fallback_invocations: usize,
    /// 整个调用的耗时
    pub elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_one_of_payload_or_error() {
        let ok = EnrichmentOutcome::success(
            "a#0",
            EnrichmentPayload::Entities { entities: vec![] },
            "gpt-4o",
            1.7,
            vec![],
        );
        assert!(ok.is_success());
        assert!(ok.error.is_none());
        assert_eq!(ok.confidence, 1.0);

        let err = EnrichmentOutcome::failure(
            "a#1",
            OutcomeError::from(&ValidationError::EmptyContent { field: "content" }),
        );
        assert!(!err.is_success());
        assert!(err.payload.is_none());
        assert_eq!(err.error.as_ref().map(|e| e.kind), Some(ErrorKind::Validation));
    }

    #[test]
    fn test_cache_hit_rewrites_identity() {
        let stored = EnrichmentOutcome::success(
            "old.pdf#4",
            EnrichmentPayload::Entities { entities: vec![] },
            "gpt-4o",
            0.9,
            vec![],
        )
        .with_role(ProviderRole::Secondary)
        .with_elapsed(1200);

        let hit = stored.as_cache_hit("new.pdf#0");
        assert_eq!(hit.work_item_id, "new.pdf#0");
        assert!(hit.from_cache);
        assert_eq!(hit.elapsed_ms, 0);
        assert_eq!(hit.source_provider, Some(ProviderRole::Secondary));
        assert_eq!(hit.payload, stored.payload);
    }
}
