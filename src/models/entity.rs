//! 抽取出的实体

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// 实体名称最大长度
pub const MAX_ENTITY_TERM_CHARS: usize = 100;
/// 领域最大长度
pub const MAX_ENTITY_DOMAIN_CHARS: usize = 50;
/// 标签最大数量
pub const MAX_ENTITY_TAGS: usize = 5;
/// 上下文说明最大长度
pub const MAX_ENTITY_CONTEXT_CHARS: usize = 200;

/// 实体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// 人名
    Person,
    /// 组织、公司、机构
    Company,
    /// 产品、服务、品牌
    Product,
    /// 技术术语
    TechnicalTerm,
}

impl EntityType {
    /// 字符串表示
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Person => "person",
            EntityType::Company => "company",
            EntityType::Product => "product",
            EntityType::TechnicalTerm => "technical_term",
        }
    }

    /// 从字符串解析（忽略大小写）
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.trim().to_lowercase().as_str() {
            "person" => Ok(EntityType::Person),
            "company" => Ok(EntityType::Company),
            "product" => Ok(EntityType::Product),
            "technical_term" => Ok(EntityType::TechnicalTerm),
            _ => Err(ValidationError::UnknownEntityType {
                value: value.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 实体类型过滤器
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTypeFilter {
    /// 只保留这些类型（None 表示全部）
    pub include: Option<Vec<EntityType>>,
    /// 排除这些类型
    #[serde(default)]
    pub exclude: Vec<EntityType>,
}

impl EntityTypeFilter {
    /// 从字符串列表构建过滤器
    pub fn from_strings(
        include: Option<&[String]>,
        exclude: &[String],
    ) -> Result<Self, ValidationError> {
        let include = match include {
            Some(values) => Some(
                values
                    .iter()
                    .map(|v| EntityType::parse(v))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            None => None,
        };
        let exclude = exclude
            .iter()
            .map(|v| EntityType::parse(v))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { include, exclude })
    }

    /// 判断类型是否通过过滤
    pub fn matches(&self, entity_type: EntityType) -> bool {
        if self.exclude.contains(&entity_type) {
            return false;
        }
        match &self.include {
            Some(include) => include.contains(&entity_type),
            None => true,
        }
    }

    /// 用于缓存键的稳定描述
    pub fn fingerprint(&self) -> String {
        let mut include: Vec<&str> = self
            .include
            .as_ref()
            .map(|types| types.iter().map(|t| t.as_str()).collect())
            .unwrap_or_default();
        include.sort_unstable();
        let mut exclude: Vec<&str> = self.exclude.iter().map(|t| t.as_str()).collect();
        exclude.sort_unstable();
        format!(
            "include={}|exclude={}",
            if self.include.is_some() {
                include.join(",")
            } else {
                "*".to_string()
            },
            exclude.join(",")
        )
    }
}

/// 抽取出的实体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub term: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub primary_domain: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub context: String,
}

impl ExtractedEntity {
    /// 创建并校验实体
    ///
    /// 标签会统一补上 `#` 前缀，空标签被丢弃。
    pub fn create(
        term: &str,
        type_value: &str,
        primary_domain: &str,
        tags: &[String],
        context: &str,
    ) -> Result<Self, ValidationError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(ValidationError::EmptyContent { field: "term" });
        }
        check_len("term", term, MAX_ENTITY_TERM_CHARS)?;

        let entity_type = EntityType::parse(type_value)?;

        let primary_domain = primary_domain.trim();
        if primary_domain.is_empty() {
            return Err(ValidationError::EmptyContent {
                field: "primary_domain",
            });
        }
        check_len("primary_domain", primary_domain, MAX_ENTITY_DOMAIN_CHARS)?;

        if tags.len() > MAX_ENTITY_TAGS {
            return Err(ValidationError::ContentTooLong {
                field: "tags",
                len: tags.len(),
                max: MAX_ENTITY_TAGS,
            });
        }
        let tags = tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(|t| {
                if t.starts_with('#') {
                    t.to_string()
                } else {
                    format!("#{}", t)
                }
            })
            .collect();

        let context = context.trim();
        check_len("context", context, MAX_ENTITY_CONTEXT_CHARS)?;

        Ok(Self {
            term: term.to_string(),
            entity_type,
            primary_domain: primary_domain.to_string(),
            tags,
            context: context.to_string(),
        })
    }

    /// 检查实体是否满足格式约束（用于校验缓存或外部构造的实体）
    pub fn check(&self) -> Result<(), ValidationError> {
        Self::create(
            &self.term,
            self.entity_type.as_str(),
            &self.primary_domain,
            &self.tags,
            &self.context,
        )
        .map(|_| ())
    }
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len > max {
        return Err(ValidationError::ContentTooLong { field, len, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_normalizes_tags() {
        let entity = ExtractedEntity::create(
            " Rust ",
            "Technical_Term",
            "programming",
            &["lang".to_string(), "#systems".to_string(), " ".to_string()],
            "a language",
        )
        .unwrap();
        assert_eq!(entity.term, "Rust");
        assert_eq!(entity.entity_type, EntityType::TechnicalTerm);
        assert_eq!(entity.tags, vec!["#lang", "#systems"]);
    }

    #[test]
    fn test_create_rejects_bad_fields() {
        assert!(ExtractedEntity::create("", "person", "x", &[], "").is_err());
        assert!(ExtractedEntity::create("a", "planet", "x", &[], "").is_err());
        let long_domain = "d".repeat(MAX_ENTITY_DOMAIN_CHARS + 1);
        assert!(ExtractedEntity::create("a", "person", &long_domain, &[], "").is_err());
        let tags: Vec<String> = (0..6).map(|i| format!("t{}", i)).collect();
        assert!(ExtractedEntity::create("a", "person", "x", &tags, "").is_err());
    }

    #[test]
    fn test_filter() {
        let filter = EntityTypeFilter::from_strings(
            Some(&["person".to_string(), "company".to_string()]),
            &["company".to_string()],
        )
        .unwrap();
        assert!(filter.matches(EntityType::Person));
        assert!(!filter.matches(EntityType::Company));
        assert!(!filter.matches(EntityType::Product));
        assert!(EntityTypeFilter::default().matches(EntityType::Product));
    }

    #[test]
    fn test_filter_fingerprint_is_order_independent() {
        let a = EntityTypeFilter::from_strings(
            Some(&["person".to_string(), "product".to_string()]),
            &[],
        )
        .unwrap();
        let b = EntityTypeFilter::from_strings(
            Some(&["product".to_string(), "person".to_string()]),
            &[],
        )
        .unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), EntityTypeFilter::default().fingerprint());
    }
}
