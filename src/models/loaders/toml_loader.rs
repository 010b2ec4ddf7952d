use crate::error::{AppError, AppResult, ConfigError};
use crate::models::entity::EntityTypeFilter;
use crate::models::requirements::{
    EnhancementRequirements, ExtractionRequirements, TargetRequirements, DEFAULT_TEMPLATE,
};
use crate::models::work_item::{Term, TextChunk, WorkItem};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 工作文件（上游分块后的产物）
///
/// ```toml
/// [[chunks]]
/// source_id = "report.pdf"
/// sequence_index = 0
/// content = "..."
///
/// [[terms]]
/// surface_form = "Partido Popular"
/// category = "company"
/// domain_tag = "politics"
///
/// [enhancement]
/// target_languages = ["ko", "en"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkFile {
    #[serde(default)]
    pub chunks: Vec<TextChunk>,
    #[serde(default)]
    pub terms: Vec<Term>,
    #[serde(default)]
    pub extraction: ExtractionSection,
    #[serde(default)]
    pub enhancement: EnhancementSection,
    /// 来源文件路径（加载后填充）
    #[serde(skip)]
    pub file_path: Option<String>,
}

/// `[extraction]` 配置段
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractionSection {
    pub template: Option<String>,
    pub max_entities: Option<usize>,
    pub include_types: Option<Vec<String>>,
    #[serde(default)]
    pub exclude_types: Vec<String>,
    pub include_context: Option<bool>,
}

/// `[enhancement]` 配置段
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnhancementSection {
    #[serde(default)]
    pub target_languages: Vec<String>,
}

impl WorkFile {
    /// 文本块工作项（原样保留，校验交给引擎）
    pub fn chunk_items(&self) -> Vec<WorkItem> {
        self.chunks.iter().cloned().map(WorkItem::TextChunk).collect()
    }

    /// 术语工作项
    pub fn term_items(&self) -> Vec<WorkItem> {
        self.terms.iter().cloned().map(WorkItem::Term).collect()
    }

    /// 抽取要求
    pub fn extraction_requirements(&self) -> AppResult<TargetRequirements> {
        let section = &self.extraction;
        let type_filter = if section.include_types.is_some() || !section.exclude_types.is_empty()
        {
            let filter = EntityTypeFilter::from_strings(
                section.include_types.as_deref(),
                &section.exclude_types,
            )
            .map_err(|e| ConfigError::Invalid {
                name: "extraction.include_types/exclude_types",
                reason: e.to_string(),
            })?;
            Some(filter)
        } else {
            None
        };

        let defaults = ExtractionRequirements::default();
        Ok(TargetRequirements::Extraction(ExtractionRequirements {
            template: section
                .template
                .clone()
                .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string()),
            max_entities: section.max_entities,
            type_filter,
            include_context: section.include_context.unwrap_or(defaults.include_context),
        }))
    }

    /// 联网增强要求
    pub fn enhancement_requirements(&self) -> AppResult<TargetRequirements> {
        let req = EnhancementRequirements::new(&self.enhancement.target_languages)?;
        Ok(TargetRequirements::Enhancement(req))
    }

    /// 合并另一个工作文件的工作项（配置段以自身为准）
    pub fn merge(&mut self, other: WorkFile) {
        self.chunks.extend(other.chunks);
        self.terms.extend(other.terms);
    }
}

/// 从 TOML 文件加载工作文件
pub async fn load_work_file(toml_file_path: &Path) -> AppResult<WorkFile> {
    let path_str = toml_file_path.display().to_string();
    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|e| AppError::io(&path_str, e))?;

    let mut work: WorkFile =
        toml::from_str(&content).map_err(|e| AppError::toml(&path_str, e))?;

    work.file_path = Some(path_str);

    Ok(work)
}

/// 从文件夹中加载所有 TOML 工作文件
///
/// 单个文件加载失败只记录警告，不影响其他文件。
pub async fn load_all_work_files(folder_path: &str) -> AppResult<Vec<WorkFile>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        return Err(AppError::io(
            folder_path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "文件夹不存在"),
        ));
    }

    let mut work_files = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .map_err(|e| AppError::io(folder_path, e))?;

    let mut paths = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AppError::io(folder_path, e))?
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            paths.push(path);
        }
    }
    // 目录遍历顺序不稳定，排序后结果可复现
    paths.sort();

    for path in paths {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_work_file(&path).await {
            Ok(work) => {
                tracing::info!(
                    "成功加载 {} 个文本块, {} 个术语",
                    work.chunks.len(),
                    work.terms.len()
                );
                work_files.push(work);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {}", path.display(), e);
            }
        }
    }

    Ok(work_files)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
[[chunks]]
source_id = "report.pdf"
sequence_index = 0
content = "Tokio is an async runtime."

[[chunks]]
source_id = "report.pdf"
sequence_index = 1
content = ""

[[terms]]
surface_form = "Partido Popular"
category = "company"
domain_tag = "politics"
tags = ["#PP"]

[extraction]
max_entities = 10
include_types = ["person", "company"]

[enhancement]
target_languages = ["en", "ko"]
"##;

    #[test]
    fn test_parse_work_file() {
        let work: WorkFile = toml::from_str(SAMPLE).unwrap();
        assert_eq!(work.chunks.len(), 2);
        assert_eq!(work.terms.len(), 1);
        // 空内容的文本块被原样保留，由引擎产出校验失败结果
        assert!(work.chunk_items()[1].validate().is_err());

        match work.extraction_requirements().unwrap() {
            TargetRequirements::Extraction(req) => {
                assert_eq!(req.max_entities, Some(10));
                assert_eq!(req.template, DEFAULT_TEMPLATE);
                assert!(req.type_filter.is_some());
            }
            other => panic!("unexpected requirements: {:?}", other),
        }
        match work.enhancement_requirements().unwrap() {
            TargetRequirements::Enhancement(req) => {
                assert_eq!(req.target_languages, vec!["en", "ko"]);
            }
            other => panic!("unexpected requirements: {:?}", other),
        }
    }

    #[test]
    fn test_bad_entity_type_is_config_error() {
        let work: WorkFile = toml::from_str(
            r#"
[extraction]
include_types = ["planet"]
"#,
        )
        .unwrap();
        assert!(matches!(
            work.extraction_requirements(),
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = load_work_file(Path::new("definitely/not/here.toml")).await;
        assert!(matches!(result, Err(AppError::Io { .. })));
    }
}
