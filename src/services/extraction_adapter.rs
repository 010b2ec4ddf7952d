//! 实体抽取适配器
//!
//! 一个批次只发一次请求，模型按 `chunk_id`（批内序号）返回每个文本块的实体。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::clients::ChatBackend;
use crate::error::ProviderError;
use crate::models::{
    EnrichmentOutcome, EnrichmentPayload, ExtractedEntity, ExtractionRequirements,
    TargetRequirements, WorkItem,
};
use crate::services::provider::{ProviderAdapter, ProviderBatchResult};
use crate::services::response_parser::{normalize_confidence, parse_json};

/// 模型未给出置信度时的默认值
const DEFAULT_CONFIDENCE: f32 = 0.8;

const SYSTEM_PROMPT: &str = "你是一个专业的术语抽取助手。\
从给定的文本块中识别人名(person)、公司或机构(company)、产品(product)和技术术语(technical_term)。\
只返回 JSON，不要任何解释。";

#[derive(Debug, Deserialize)]
struct ExtractionResponse {
    #[serde(default)]
    results: Vec<ChunkResult>,
}

#[derive(Debug, Deserialize)]
struct ChunkResult {
    chunk_id: Value,
    #[serde(default)]
    extracted_entities: Vec<RawEntity>,
    confidence: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEntity {
    term: String,
    #[serde(rename = "type")]
    entity_type: String,
    primary_domain: String,
    tags: Vec<String>,
    context: String,
}

/// 实体抽取适配器
pub struct EntityExtractionAdapter {
    backend: Arc<dyn ChatBackend>,
}

impl EntityExtractionAdapter {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    fn build_prompt(&self, items: &[WorkItem], req: &ExtractionRequirements) -> String {
        let chunks: Vec<Value> = items
            .iter()
            .enumerate()
            .filter_map(|(idx, item)| match item {
                WorkItem::TextChunk(chunk) => Some(json!({
                    "chunk_id": idx,
                    "content": chunk.content,
                })),
                WorkItem::Term(_) => None,
            })
            .collect();

        let mut rules = vec![
            format!("模板: {}", req.template),
            "每个实体字段: term, type, primary_domain, tags(最多 5 个, 以 # 开头), context".to_string(),
            "term 不超过 100 字符, primary_domain 不超过 50 字符, context 不超过 200 字符".to_string(),
        ];
        if let Some(filter) = &req.type_filter {
            if let Some(include) = &filter.include {
                let names: Vec<&str> = include.iter().map(|t| t.as_str()).collect();
                rules.push(format!("只抽取以下类型: {}", names.join(", ")));
            }
            if !filter.exclude.is_empty() {
                let names: Vec<&str> = filter.exclude.iter().map(|t| t.as_str()).collect();
                rules.push(format!("不要抽取以下类型: {}", names.join(", ")));
            }
        }
        if let Some(max) = req.max_entities {
            rules.push(format!("每个文本块最多 {} 个实体", max));
        }
        if !req.include_context {
            rules.push("context 字段留空".to_string());
        }

        format!(
            "{}\n\n返回格式:\n{{\"results\": [{{\"chunk_id\": 0, \"confidence\": 0.9, \"extracted_entities\": [...]}}]}}\n\n文本块:\n{}",
            rules.join("\n"),
            Value::Array(chunks)
        )
    }

    /// 把原始实体转换为合法实体：不合法的逐个丢弃，再按过滤器和数量上限裁剪
    fn collect_entities(raw: Vec<RawEntity>, req: &ExtractionRequirements) -> Vec<ExtractedEntity> {
        let mut entities = Vec::with_capacity(raw.len());
        for raw_entity in raw {
            let context = if req.include_context {
                raw_entity.context.as_str()
            } else {
                ""
            };
            match ExtractedEntity::create(
                &raw_entity.term,
                &raw_entity.entity_type,
                &raw_entity.primary_domain,
                &raw_entity.tags,
                context,
            ) {
                Ok(entity) => {
                    let keep = req
                        .type_filter
                        .as_ref()
                        .map(|f| f.matches(entity.entity_type))
                        .unwrap_or(true);
                    if keep {
                        entities.push(entity);
                    }
                }
                Err(e) => debug!("丢弃不合法的实体 '{}': {}", raw_entity.term, e),
            }
        }
        if let Some(max) = req.max_entities {
            entities.truncate(max);
        }
        entities
    }

    fn chunk_index(value: &Value) -> Option<usize> {
        match value {
            Value::Number(n) => n.as_u64().map(|n| n as usize),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn map_response(
        &self,
        items: &[WorkItem],
        req: &ExtractionRequirements,
        response: ExtractionResponse,
    ) -> ProviderBatchResult {
        let provider = self.backend.model_name();
        let mut by_index: HashMap<usize, ChunkResult> = HashMap::new();
        for result in response.results {
            match Self::chunk_index(&result.chunk_id) {
                Some(idx) if idx < items.len() => {
                    by_index.entry(idx).or_insert(result);
                }
                _ => warn!("[{}] 忽略未知的 chunk_id: {}", provider, result.chunk_id),
            }
        }

        let mut batch = ProviderBatchResult::default();
        for (idx, item) in items.iter().enumerate() {
            match by_index.remove(&idx) {
                Some(result) => {
                    let entities = Self::collect_entities(result.extracted_entities, req);
                    batch.succeeded.push(EnrichmentOutcome::success(
                        item.id(),
                        EnrichmentPayload::Entities { entities },
                        provider,
                        normalize_confidence(result.confidence, DEFAULT_CONFIDENCE),
                        Vec::new(),
                    ));
                }
                None => batch.failed.push((
                    item.clone(),
                    ProviderError::MissingItem {
                        provider: provider.to_string(),
                        work_item_id: item.id(),
                    },
                )),
            }
        }
        batch
    }
}

#[async_trait]
impl ProviderAdapter for EntityExtractionAdapter {
    fn name(&self) -> &str {
        self.backend.model_name()
    }

    async fn enrich_batch(
        &self,
        items: &[WorkItem],
        requirements: &TargetRequirements,
    ) -> ProviderBatchResult {
        let req = match requirements {
            TargetRequirements::Extraction(req) => req,
            TargetRequirements::Enhancement(_) => {
                return ProviderBatchResult::all_failed(
                    items,
                    ProviderError::request(self.name(), "实体抽取适配器不处理术语增强请求"),
                );
            }
        };

        let prompt = self.build_prompt(items, req);
        debug!("[{}] 抽取 {} 个文本块", self.name(), items.len());

        let response = match self.backend.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(text) => text,
            Err(e) => return ProviderBatchResult::all_failed(items, e),
        };

        match parse_json::<ExtractionResponse>(self.name(), &response) {
            Ok(parsed) => self.map_response(items, req, parsed),
            Err(e) => {
                warn!("[{}] 抽取结果解析失败: {}", self.name(), e);
                ProviderBatchResult::all_failed(items, e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityType, EntityTypeFilter, TextChunk};

    struct CannedBackend(String);

    #[async_trait]
    impl ChatBackend for CannedBackend {
        fn model_name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _system: &str, _user: &str) -> Result<String, ProviderError> {
            Ok(self.0.clone())
        }
    }

    fn chunks(n: usize) -> Vec<WorkItem> {
        (0..n)
            .map(|i| TextChunk::new(format!("第 {} 段", i), i, "doc.pdf").unwrap().into())
            .collect()
    }

    fn adapter(response: &str) -> EntityExtractionAdapter {
        EntityExtractionAdapter::new(Arc::new(CannedBackend(response.to_string())))
    }

    #[tokio::test]
    async fn test_missing_chunk_fails_only_that_item() {
        let response = r#"```json
        {"results": [
            {"chunk_id": 0, "extracted_entities": [
                {"term": "Rust", "type": "technical_term", "primary_domain": "编程", "tags": ["lang"]}
            ]},
            {"chunk_id": "2", "confidence": 0.6, "extracted_entities": []}
        ]}
        ```"#;
        let items = chunks(3);
        let result = adapter(response)
            .enrich_batch(&items, &TargetRequirements::default())
            .await;

        assert_eq!(result.succeeded.len(), 2);
        assert_eq!(result.succeeded[0].work_item_id, "doc.pdf#0");
        assert_eq!(result.succeeded[0].confidence, DEFAULT_CONFIDENCE);
        assert_eq!(result.succeeded[1].confidence, 0.6);
        match &result.succeeded[0].payload {
            Some(EnrichmentPayload::Entities { entities }) => {
                assert_eq!(entities[0].tags, vec!["#lang".to_string()]);
            }
            other => panic!("unexpected payload: {:?}", other),
        }

        assert_eq!(result.failed.len(), 1);
        assert!(matches!(result.failed[0].1, ProviderError::MissingItem { .. }));
        assert_eq!(result.failed[0].0.id(), "doc.pdf#1");
    }

    #[tokio::test]
    async fn test_filter_truncation_and_bad_entities() {
        let response = r#"{"results": [{"chunk_id": 0, "extracted_entities": [
            {"term": "", "type": "person", "primary_domain": "x"},
            {"term": "张三", "type": "person", "primary_domain": "人物"},
            {"term": "OpenAI", "type": "company", "primary_domain": "AI"},
            {"term": "GPT", "type": "product", "primary_domain": "AI"},
            {"term": "Tokio", "type": "technical_term", "primary_domain": "Rust"},
            {"term": "Mystery", "type": "alien", "primary_domain": "?"}
        ]}]}"#;
        let req = ExtractionRequirements {
            max_entities: Some(2),
            type_filter: Some(EntityTypeFilter {
                include: None,
                exclude: vec![EntityType::Person],
            }),
            ..ExtractionRequirements::default()
        };

        let result = adapter(response)
            .enrich_batch(&chunks(1), &TargetRequirements::Extraction(req))
            .await;
        assert!(result.failed.is_empty());
        match &result.succeeded[0].payload {
            Some(EnrichmentPayload::Entities { entities }) => {
                let terms: Vec<&str> = entities.iter().map(|e| e.term.as_str()).collect();
                assert_eq!(terms, vec!["OpenAI", "GPT"]);
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unparseable_response_fails_whole_batch() {
        let result = adapter("抱歉，我无法完成")
            .enrich_batch(&chunks(2), &TargetRequirements::default())
            .await;
        assert!(result.succeeded.is_empty());
        assert_eq!(result.failed.len(), 2);
    }
}
