//! 术语增强适配器
//!
//! 为术语补充多语言翻译和网络出处。返回的 `enhanced_terms` 按顺序与输入对应。

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::clients::ChatBackend;
use crate::error::ProviderError;
use crate::models::language;
use crate::models::{
    EnhancementRequirements, EnrichmentOutcome, EnrichmentPayload, TargetRequirements, WorkItem,
};
use crate::services::provider::{ProviderAdapter, ProviderBatchResult};
use crate::services::response_parser::{normalize_confidence, parse_json};

const DEFAULT_CONFIDENCE: f32 = 0.8;

const SYSTEM_PROMPT: &str = "你是一个多语言术语专家。\
请结合网络上可查证的资料，为每个术语给出准确的翻译，并附上参考来源 URL。\
只返回 JSON，不要任何解释。";

#[derive(Debug, Deserialize)]
struct EnhancementResponse {
    #[serde(default)]
    enhanced_terms: Vec<EnhancedTerm>,
}

#[derive(Debug, Deserialize)]
struct EnhancedTerm {
    #[serde(default)]
    original_term: String,
    #[serde(default)]
    translations: BTreeMap<String, String>,
    #[serde(default)]
    web_sources: Vec<String>,
    confidence_score: Option<f64>,
}

/// 术语增强适配器
pub struct TermEnhancementAdapter {
    backend: Arc<dyn ChatBackend>,
}

impl TermEnhancementAdapter {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    fn build_prompt(&self, items: &[WorkItem], req: &EnhancementRequirements) -> String {
        let terms: Vec<Value> = items
            .iter()
            .filter_map(|item| match item {
                WorkItem::Term(term) => Some(json!({
                    "term": term.surface_form,
                    "category": term.category,
                    "domain": term.domain_tag,
                    "context": term.context,
                })),
                WorkItem::TextChunk(_) => None,
            })
            .collect();

        let languages: Vec<String> = req
            .target_languages
            .iter()
            .map(|code| match language::display_name(code) {
                Some(name) => format!("{} ({})", code, name),
                None => code.clone(),
            })
            .collect();

        format!(
            "目标语言: {}\n\
             按输入顺序返回，每个术语一项，translations 的键使用语言代码。\n\n\
             返回格式:\n\
             {{\"enhanced_terms\": [{{\"original_term\": \"...\", \"translations\": {{\"en\": \"...\"}}, \
             \"web_sources\": [\"https://...\"], \"confidence_score\": 0.9}}]}}\n\n\
             术语列表:\n{}",
            languages.join(", "),
            Value::Array(terms)
        )
    }

    fn map_response(
        &self,
        items: &[WorkItem],
        req: &EnhancementRequirements,
        response: EnhancementResponse,
    ) -> ProviderBatchResult {
        let provider = self.backend.model_name();
        if response.enhanced_terms.len() > items.len() {
            warn!(
                "[{}] 返回术语数 ({}) 多于输入 ({})，多余部分被忽略",
                provider,
                response.enhanced_terms.len(),
                items.len()
            );
        }

        let mut results = response.enhanced_terms.into_iter();
        let mut batch = ProviderBatchResult::default();
        for item in items {
            let Some(enhanced) = results.next() else {
                batch.failed.push((
                    item.clone(),
                    ProviderError::MissingItem {
                        provider: provider.to_string(),
                        work_item_id: item.id(),
                    },
                ));
                continue;
            };

            if !enhanced.original_term.is_empty()
                && enhanced.original_term.trim().to_lowercase() != item.id()
            {
                debug!(
                    "[{}] 术语顺序可能不一致: 期望 '{}', 返回 '{}'",
                    provider,
                    item.id(),
                    enhanced.original_term
                );
            }

            let translations: BTreeMap<String, String> = enhanced
                .translations
                .into_iter()
                .map(|(code, text)| (code.trim().to_string(), text.trim().to_string()))
                .filter(|(code, text)| !text.is_empty() && req.target_languages.contains(code))
                .collect();
            let evidence: Vec<String> = enhanced
                .web_sources
                .into_iter()
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty())
                .collect();

            batch.succeeded.push(EnrichmentOutcome::success(
                item.id(),
                EnrichmentPayload::Translations { translations },
                provider,
                normalize_confidence(enhanced.confidence_score, DEFAULT_CONFIDENCE),
                evidence,
            ));
        }
        batch
    }
}

#[async_trait]
impl ProviderAdapter for TermEnhancementAdapter {
    fn name(&self) -> &str {
        self.backend.model_name()
    }

    async fn enrich_batch(
        &self,
        items: &[WorkItem],
        requirements: &TargetRequirements,
    ) -> ProviderBatchResult {
        let req = match requirements {
            TargetRequirements::Enhancement(req) => req,
            TargetRequirements::Extraction(_) => {
                return ProviderBatchResult::all_failed(
                    items,
                    ProviderError::request(self.name(), "术语增强适配器不处理实体抽取请求"),
                );
            }
        };

        let prompt = self.build_prompt(items, req);
        debug!(
            "[{}] 增强 {} 个术语，目标语言 {} 种",
            self.name(),
            items.len(),
            req.target_languages.len()
        );

        let response = match self.backend.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(text) => text,
            Err(e) => return ProviderBatchResult::all_failed(items, e),
        };

        match parse_json::<EnhancementResponse>(self.name(), &response) {
            Ok(parsed) => self.map_response(items, req, parsed),
            Err(e) => {
                warn!("[{}] 增强结果解析失败: {}", self.name(), e);
                ProviderBatchResult::all_failed(items, e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Term;

    struct CannedBackend(Result<String, ProviderError>);

    #[async_trait]
    impl ChatBackend for CannedBackend {
        fn model_name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _system: &str, _user: &str) -> Result<String, ProviderError> {
            self.0.clone()
        }
    }

    fn terms(names: &[&str]) -> Vec<WorkItem> {
        names
            .iter()
            .map(|name| {
                Term::new(*name, "technical_term", "AI", "", vec![])
                    .unwrap()
                    .into()
            })
            .collect()
    }

    fn requirements() -> TargetRequirements {
        TargetRequirements::Enhancement(EnhancementRequirements::new(&["en", "ko"]).unwrap())
    }

    #[tokio::test]
    async fn test_maps_by_position() {
        let response = r#"{"enhanced_terms": [
            {"original_term": "Transformer",
             "translations": {"en": "Transformer", "ko": "트랜스포머", "fr": "Transformeur", "ja": " "},
             "web_sources": ["https://arxiv.org/abs/1706.03762", ""],
             "confidence_score": 0.95}
        ]}"#;
        let adapter = TermEnhancementAdapter::new(Arc::new(CannedBackend(Ok(response.to_string()))));
        let items = terms(&["Transformer", "Attention"]);

        let result = adapter.enrich_batch(&items, &requirements()).await;

        assert_eq!(result.succeeded.len(), 1);
        let outcome = &result.succeeded[0];
        assert_eq!(outcome.work_item_id, "transformer");
        assert_eq!(outcome.evidence, vec!["https://arxiv.org/abs/1706.03762".to_string()]);
        match &outcome.payload {
            Some(EnrichmentPayload::Translations { translations }) => {
                assert_eq!(translations.len(), 2);
                assert_eq!(translations["ko"], "트랜스포머");
            }
            other => panic!("unexpected payload: {:?}", other),
        }

        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].0.id(), "attention");
    }

    #[tokio::test]
    async fn test_default_confidence() {
        let response = r#"{"enhanced_terms": [{"translations": {"en": "x", "ko": "y"}}]}"#;
        let adapter = TermEnhancementAdapter::new(Arc::new(CannedBackend(Ok(response.to_string()))));
        let result = adapter.enrich_batch(&terms(&["x"]), &requirements()).await;
        assert_eq!(result.succeeded[0].confidence, DEFAULT_CONFIDENCE);
        assert!(result.succeeded[0].evidence.is_empty());
    }

    #[tokio::test]
    async fn test_backend_error_fails_every_item() {
        let err = ProviderError::Auth {
            provider: "canned".to_string(),
            message: "invalid key".to_string(),
        };
        let adapter = TermEnhancementAdapter::new(Arc::new(CannedBackend(Err(err.clone()))));
        let result = adapter.enrich_batch(&terms(&["a", "b", "c"]), &requirements()).await;
        assert!(result.succeeded.is_empty());
        assert!(result.failed.iter().all(|(_, e)| *e == err));
    }

    #[tokio::test]
    async fn test_rejects_extraction_requests() {
        let adapter = TermEnhancementAdapter::new(Arc::new(CannedBackend(Ok("{}".to_string()))));
        let result = adapter
            .enrich_batch(&terms(&["a"]), &TargetRequirements::default())
            .await;
        assert_eq!(result.failed.len(), 1);
    }
}
