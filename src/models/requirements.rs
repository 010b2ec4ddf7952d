//! 目标要求
//!
//! 描述一次请求希望得到什么结果，同时决定质量校验的标准和缓存键的配置部分。

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::entity::EntityTypeFilter;
use crate::models::language;
use crate::models::work_item::WorkItemKind;

/// 默认抽取模板
pub const DEFAULT_TEMPLATE: &str = "extract_terms";
/// 联网增强的最低置信度
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;
/// 联网增强的最少出处数量
pub const DEFAULT_MIN_EVIDENCE: usize = 1;

/// 实体抽取要求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRequirements {
    /// 提示词模板 ID
    pub template: String,
    /// 每个文本块最多保留的实体数量
    pub max_entities: Option<usize>,
    /// 实体类型过滤
    pub type_filter: Option<EntityTypeFilter>,
    /// 是否要求模型给出上下文说明
    pub include_context: bool,
}

impl Default for ExtractionRequirements {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            max_entities: None,
            type_filter: None,
            include_context: true,
        }
    }
}

/// 术语联网增强要求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancementRequirements {
    /// 目标语言（已规范化：排序、去重）
    pub target_languages: Vec<String>,
    pub min_confidence: f32,
    pub min_evidence: usize,
}

impl EnhancementRequirements {
    /// 根据语言列表创建，空列表表示全部支持的语言
    pub fn new<S: AsRef<str>>(target_languages: &[S]) -> Result<Self, ConfigError> {
        Ok(Self {
            target_languages: language::normalize_languages(target_languages)?,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            min_evidence: DEFAULT_MIN_EVIDENCE,
        })
    }
}

/// 目标要求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetRequirements {
    Extraction(ExtractionRequirements),
    Enhancement(EnhancementRequirements),
}

impl TargetRequirements {
    /// 该要求适用的工作项类别
    pub fn item_kind(&self) -> WorkItemKind {
        match self {
            TargetRequirements::Extraction(_) => WorkItemKind::TextChunk,
            TargetRequirements::Enhancement(_) => WorkItemKind::Term,
        }
    }

    /// 校验要求本身是否合法
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            TargetRequirements::Extraction(req) => {
                if req.template.trim().is_empty() {
                    return Err(ConfigError::Missing { name: "template" });
                }
                if req.max_entities == Some(0) {
                    return Err(ConfigError::Invalid {
                        name: "max_entities",
                        reason: "必须大于 0".to_string(),
                    });
                }
                Ok(())
            }
            TargetRequirements::Enhancement(req) => {
                if req.target_languages.is_empty() {
                    return Err(ConfigError::Missing {
                        name: "target_languages",
                    });
                }
                for code in &req.target_languages {
                    if !language::is_supported(code) {
                        return Err(ConfigError::UnsupportedLanguage { code: code.clone() });
                    }
                }
                if !(0.0..=1.0).contains(&req.min_confidence) {
                    return Err(ConfigError::Invalid {
                        name: "min_confidence",
                        reason: format!("{} 不在 [0, 1] 内", req.min_confidence),
                    });
                }
                Ok(())
            }
        }
    }

    /// 配置指纹（参与缓存键计算）
    ///
    /// 任何会改变结果的配置都必须体现在这里。
    pub fn fingerprint(&self) -> String {
        match self {
            TargetRequirements::Extraction(req) => format!(
                "extraction|template={}|max={}|filter={}|context={}",
                req.template.trim(),
                req.max_entities
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "*".to_string()),
                req.type_filter
                    .as_ref()
                    .map(|f| f.fingerprint())
                    .unwrap_or_else(|| "*".to_string()),
                req.include_context
            ),
            TargetRequirements::Enhancement(req) => {
                let mut langs = req.target_languages.clone();
                langs.sort();
                langs.dedup();
                format!(
                    "enhancement|langs={}|min_conf={}|min_ev={}",
                    langs.join(","),
                    req.min_confidence,
                    req.min_evidence
                )
            }
        }
    }
}

impl Default for TargetRequirements {
    fn default() -> Self {
        TargetRequirements::Extraction(ExtractionRequirements::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_order_does_not_change_fingerprint() {
        let a = TargetRequirements::Enhancement(EnhancementRequirements::new(&["en", "ko"]).unwrap());
        let b = TargetRequirements::Enhancement(EnhancementRequirements::new(&["ko", "en"]).unwrap());
        assert_eq!(a.fingerprint(), b.fingerprint());

        let c = TargetRequirements::Enhancement(EnhancementRequirements::new(&["en"]).unwrap());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_quality_thresholds_change_fingerprint() {
        let base = EnhancementRequirements::new(&["en"]).unwrap();
        let loose = TargetRequirements::Enhancement(base.clone());

        let strict = TargetRequirements::Enhancement(EnhancementRequirements {
            min_confidence: 0.95,
            ..base.clone()
        });
        assert_ne!(loose.fingerprint(), strict.fingerprint());

        let more_sources = TargetRequirements::Enhancement(EnhancementRequirements {
            min_evidence: base.min_evidence + 1,
            ..base
        });
        assert_ne!(loose.fingerprint(), more_sources.fingerprint());
    }

    #[test]
    fn test_extraction_validate() {
        let mut req = ExtractionRequirements::default();
        assert!(TargetRequirements::Extraction(req.clone()).validate().is_ok());
        req.max_entities = Some(0);
        assert!(TargetRequirements::Extraction(req).validate().is_err());
    }

    #[test]
    fn test_item_kind() {
        assert_eq!(TargetRequirements::default().item_kind(), WorkItemKind::TextChunk);
    }
}
