//! 工作项
//!
//! 由上游（文档解析、分块）产生，进入引擎后不可变。

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// 文本块最大字符数
pub const MAX_CHUNK_CHARS: usize = 10_000;
/// 术语最大字符数
pub const MAX_TERM_CHARS: usize = 100;
/// 领域标签最大字符数
pub const MAX_DOMAIN_CHARS: usize = 100;

/// 工作项类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemKind {
    /// 文本块（实体抽取）
    TextChunk,
    /// 术语（联网增强 / 翻译）
    Term,
}

impl WorkItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkItemKind::TextChunk => "chunk",
            WorkItemKind::Term => "term",
        }
    }
}

/// 文本块
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub content: String,
    pub sequence_index: usize,
    pub source_id: String,
}

/// 术语
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub surface_form: String,
    pub category: String,
    pub domain_tag: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// 工作项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkItem {
    TextChunk(TextChunk),
    Term(Term),
}

impl TextChunk {
    /// 创建并校验文本块，内容两端空白会被去除
    pub fn new(
        content: impl Into<String>,
        sequence_index: usize,
        source_id: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let chunk = Self {
            content: content.into().trim().to_string(),
            sequence_index,
            source_id: source_id.into().trim().to_string(),
        };
        chunk.validate()?;
        Ok(chunk)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        non_empty("content", &self.content)?;
        max_chars("content", &self.content, MAX_CHUNK_CHARS)?;
        non_empty("source_id", &self.source_id)
    }
}

impl Term {
    /// 创建并校验术语
    ///
    /// 类别和领域统一转为小写。
    pub fn new(
        surface_form: impl Into<String>,
        category: impl Into<String>,
        domain_tag: impl Into<String>,
        context: impl Into<String>,
        tags: Vec<String>,
    ) -> Result<Self, ValidationError> {
        let term = Self {
            surface_form: surface_form.into().trim().to_string(),
            category: category.into().trim().to_lowercase(),
            domain_tag: domain_tag.into().trim().to_lowercase(),
            context: context.into().trim().to_string(),
            tags,
        };
        term.validate()?;
        Ok(term)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        non_empty("surface_form", &self.surface_form)?;
        max_chars("surface_form", self.surface_form.trim(), MAX_TERM_CHARS)?;
        non_empty("category", &self.category)?;
        non_empty("domain_tag", &self.domain_tag)?;
        max_chars("domain_tag", self.domain_tag.trim(), MAX_DOMAIN_CHARS)
    }
}

impl WorkItem {
    /// 工作项类别
    pub fn kind(&self) -> WorkItemKind {
        match self {
            WorkItem::TextChunk(_) => WorkItemKind::TextChunk,
            WorkItem::Term(_) => WorkItemKind::Term,
        }
    }

    /// 请求内的稳定标识
    ///
    /// - 文本块：`source_id#sequence_index`
    /// - 术语：规范化后的术语
    pub fn id(&self) -> String {
        match self {
            WorkItem::TextChunk(chunk) => {
                format!("{}#{}", chunk.source_id.trim(), chunk.sequence_index)
            }
            WorkItem::Term(term) => normalize_term(&term.surface_form),
        }
    }

    /// 用于缓存键的规范化内容
    pub fn normalized_content(&self) -> String {
        match self {
            WorkItem::TextChunk(chunk) => chunk.content.trim().to_string(),
            WorkItem::Term(term) => normalize_term(&term.surface_form),
        }
    }

    /// 调度前的校验
    ///
    /// 通过 serde 或字段直接构造的工作项也会在这里被检查。
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            WorkItem::TextChunk(chunk) => chunk.validate(),
            WorkItem::Term(term) => term.validate(),
        }
    }

    /// 日志用的内容预览
    pub fn preview(&self, max_len: usize) -> String {
        let text = match self {
            WorkItem::TextChunk(chunk) => chunk.content.as_str(),
            WorkItem::Term(term) => term.surface_form.as_str(),
        };
        crate::utils::logging::truncate_text(text, max_len)
    }
}

impl From<TextChunk> for WorkItem {
    fn from(chunk: TextChunk) -> Self {
        WorkItem::TextChunk(chunk)
    }
}

impl From<Term> for WorkItem {
    fn from(term: Term) -> Self {
        WorkItem::Term(term)
    }
}

/// 术语规范化：去空白并转小写
pub fn normalize_term(surface_form: &str) -> String {
    surface_form.trim().to_lowercase()
}

fn non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyContent { field });
    }
    Ok(())
}

fn max_chars(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len > max {
        return Err(ValidationError::ContentTooLong { field, len, max });
    }
    Ok(())
}
