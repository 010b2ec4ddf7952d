//! 结果质量校验
//!
//! 纯函数：模型调用"成功"不代表结果可用，不通过校验的结果按失败处理并触发兜底。

use crate::error::QualityError;
use crate::models::{
    EnhancementRequirements, EnrichmentOutcome, EnrichmentPayload, ExtractionRequirements,
    TargetRequirements,
};

/// 校验结果，返回第一个不满足的条件
pub fn validate(
    outcome: &EnrichmentOutcome,
    requirements: &TargetRequirements,
) -> Result<(), QualityError> {
    let work_item_id = || outcome.work_item_id.clone();
    let payload = outcome
        .payload
        .as_ref()
        .ok_or_else(|| QualityError::MissingPayload {
            work_item_id: work_item_id(),
        })?;

    match (requirements, payload) {
        (TargetRequirements::Extraction(req), EnrichmentPayload::Entities { entities }) => {
            validate_entities(outcome, req, entities)
        }
        (TargetRequirements::Enhancement(req), EnrichmentPayload::Translations { translations }) => {
            validate_translations(outcome, req, translations)
        }
        _ => Err(QualityError::WrongPayload {
            work_item_id: work_item_id(),
        }),
    }
}

/// 是否可用
pub fn is_valid(outcome: &EnrichmentOutcome, requirements: &TargetRequirements) -> bool {
    validate(outcome, requirements).is_ok()
}

fn validate_entities(
    outcome: &EnrichmentOutcome,
    req: &ExtractionRequirements,
    entities: &[crate::models::ExtractedEntity],
) -> Result<(), QualityError> {
    if let Some(max) = req.max_entities {
        if entities.len() > max {
            return Err(QualityError::TooManyEntities {
                work_item_id: outcome.work_item_id.clone(),
                count: entities.len(),
                max,
            });
        }
    }
    for entity in entities {
        entity.check().map_err(|e| QualityError::MalformedEntity {
            work_item_id: outcome.work_item_id.clone(),
            reason: format!("{}: {}", entity.term, e),
        })?;
        if let Some(filter) = &req.type_filter {
            if !filter.matches(entity.entity_type) {
                return Err(QualityError::MalformedEntity {
                    work_item_id: outcome.work_item_id.clone(),
                    reason: format!("{}: 类型 {} 被过滤器排除", entity.term, entity.entity_type),
                });
            }
        }
    }
    Ok(())
}

fn validate_translations(
    outcome: &EnrichmentOutcome,
    req: &EnhancementRequirements,
    translations: &std::collections::BTreeMap<String, String>,
) -> Result<(), QualityError> {
    let missing: Vec<&str> = req
        .target_languages
        .iter()
        .filter(|code| {
            translations
                .get(code.as_str())
                .map(|text| text.trim().is_empty())
                .unwrap_or(true)
        })
        .map(|code| code.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(QualityError::MissingTranslations {
            work_item_id: outcome.work_item_id.clone(),
            missing: missing.join(","),
        });
    }

    if outcome.confidence < req.min_confidence {
        return Err(QualityError::LowConfidence {
            work_item_id: outcome.work_item_id.clone(),
            confidence: outcome.confidence,
            min: req.min_confidence,
        });
    }

    let found = outcome
        .evidence
        .iter()
        .filter(|url| !url.trim().is_empty())
        .count();
    if found < req.min_evidence {
        return Err(QualityError::MissingEvidence {
            work_item_id: outcome.work_item_id.clone(),
            found,
            min: req.min_evidence,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityType, EntityTypeFilter, ExtractedEntity};
    use std::collections::BTreeMap;

    fn enhancement() -> TargetRequirements {
        TargetRequirements::Enhancement(EnhancementRequirements::new(&["en", "ja"]).unwrap())
    }

    fn translated(pairs: &[(&str, &str)], confidence: f32, evidence: &[&str]) -> EnrichmentOutcome {
        let translations: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnrichmentOutcome::success(
            "transformer",
            EnrichmentPayload::Translations { translations },
            "gpt-4o",
            confidence,
            evidence.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn entity(term: &str, entity_type: &str) -> ExtractedEntity {
        ExtractedEntity::create(term, entity_type, "AI", &[], "").unwrap()
    }

    #[test]
    fn test_enhancement_rules() {
        let req = enhancement();
        let good = translated(&[("en", "Transformer"), ("ja", "トランスフォーマー")], 0.9, &["https://a"]);
        assert!(is_valid(&good, &req));

        let missing = translated(&[("en", "Transformer")], 0.9, &["https://a"]);
        assert!(matches!(
            validate(&missing, &req),
            Err(QualityError::MissingTranslations { ref missing, .. }) if missing.as_str() == "ja"
        ));

        let low = translated(&[("en", "a"), ("ja", "b")], 0.4, &["https://a"]);
        assert!(matches!(validate(&low, &req), Err(QualityError::LowConfidence { .. })));

        let boundary = translated(&[("en", "a"), ("ja", "b")], 0.5, &["https://a"]);
        assert!(is_valid(&boundary, &req));

        let no_sources = translated(&[("en", "a"), ("ja", "b")], 0.9, &[" "]);
        assert!(matches!(
            validate(&no_sources, &req),
            Err(QualityError::MissingEvidence { found: 0, min: 1, .. })
        ));
    }

    #[test]
    fn test_extraction_rules() {
        let req = ExtractionRequirements {
            max_entities: Some(2),
            type_filter: Some(EntityTypeFilter {
                include: Some(vec![EntityType::Company, EntityType::Product]),
                exclude: vec![],
            }),
            ..ExtractionRequirements::default()
        };
        let target = TargetRequirements::Extraction(req);
        let outcome = |entities: Vec<ExtractedEntity>| {
            EnrichmentOutcome::success(
                "doc.pdf#0",
                EnrichmentPayload::Entities { entities },
                "gpt-4o",
                0.9,
                vec![],
            )
        };

        assert!(is_valid(&outcome(vec![]), &target));
        assert!(is_valid(&outcome(vec![entity("OpenAI", "company")]), &target));

        let too_many = outcome(vec![
            entity("OpenAI", "company"),
            entity("GPT", "product"),
            entity("Claude", "product"),
        ]);
        assert!(matches!(
            validate(&too_many, &target),
            Err(QualityError::TooManyEntities { count: 3, max: 2, .. })
        ));

        let filtered_out = outcome(vec![entity("张三", "person")]);
        assert!(matches!(
            validate(&filtered_out, &target),
            Err(QualityError::MalformedEntity { .. })
        ));

        let mut broken = entity("Rust", "technical_term");
        broken.primary_domain = String::new();
        assert!(!is_valid(&outcome(vec![broken]), &target));
    }

    #[test]
    fn test_payload_kind_must_match() {
        let entities = EnrichmentOutcome::success(
            "doc.pdf#0",
            EnrichmentPayload::Entities { entities: vec![] },
            "gpt-4o",
            0.9,
            vec![],
        );
        assert!(matches!(
            validate(&entities, &enhancement()),
            Err(QualityError::WrongPayload { .. })
        ));

        let failed = EnrichmentOutcome::failure(
            "doc.pdf#0",
            crate::models::OutcomeError {
                kind: crate::models::ErrorKind::Provider,
                message: "boom".to_string(),
            },
        );
        assert!(matches!(
            validate(&failed, &enhancement()),
            Err(QualityError::MissingPayload { .. })
        ));
    }
}
