use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::infrastructure::{CacheStats, CacheStore, MemoryCacheStore};
use crate::models::{load_all_work_files, load_work_file, TargetRequirements, WorkFile, WorkItem, WorkItemKind};
use crate::orchestrator::{CacheCoordinator, EnrichResponse};
use crate::services::{adapters_for, build_backends, BackendPair};
use crate::utils::logging::{log_startup, print_final_stats};
use crate::workflow::FallbackOrchestrator;

/// 应用主结构
///
/// 两条流水线（实体抽取、术语增强）共用同一个缓存，缓存键按工作项类别区分。
pub struct App {
    config: Config,
    cache: Arc<MemoryCacheStore>,
    extraction: CacheCoordinator,
    enhancement: CacheCoordinator,
}

/// 写入磁盘的报告
#[derive(Debug, Serialize)]
struct RunReport {
    extraction: Option<EnrichResponse>,
    enhancement: Option<EnrichResponse>,
    cache: CacheStats,
    cache_errors: u64,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate().context("配置校验失败")?;
        log_startup(config.batch_size, config.concurrency);

        let backends = build_backends(&config).context("模型服务初始化失败")?;
        let cache = Arc::new(MemoryCacheStore::new());

        let extraction = Self::pipeline(&config, &backends, WorkItemKind::TextChunk, cache.clone());
        let enhancement = Self::pipeline(&config, &backends, WorkItemKind::Term, cache.clone());

        Ok(Self {
            config,
            cache,
            extraction,
            enhancement,
        })
    }

    fn pipeline(
        config: &Config,
        backends: &BackendPair,
        kind: WorkItemKind,
        cache: Arc<MemoryCacheStore>,
    ) -> CacheCoordinator {
        let adapters = adapters_for(kind, backends);
        let orchestrator = FallbackOrchestrator::new(adapters.primary, adapters.secondary)
            .with_timeouts(config.primary_timeout(), config.secondary_timeout())
            .with_fallback_delay(config.fallback_delay());
        CacheCoordinator::new(cache, Arc::new(orchestrator))
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        let work = self.load_work().await?;

        let chunks = work.chunk_items();
        let terms = work.term_items();
        if chunks.is_empty() && terms.is_empty() {
            warn!("⚠️ 工作文件中没有文本块或术语，程序结束");
            return Ok(());
        }
        info!("✓ 加载 {} 个文本块，{} 个术语", chunks.len(), terms.len());

        let extraction = if chunks.is_empty() {
            None
        } else {
            let requirements = work.extraction_requirements()?;
            Some(self.run_pipeline("实体抽取", &self.extraction, chunks, requirements).await?)
        };

        let enhancement = if terms.is_empty() {
            None
        } else {
            let mut section = work.clone();
            if section.enhancement.target_languages.is_empty() {
                section.enhancement.target_languages = self.config.target_languages.clone();
            }
            let requirements = section.enhancement_requirements()?;
            Some(self.run_pipeline("术语增强", &self.enhancement, terms, requirements).await?)
        };

        let report = RunReport {
            extraction,
            enhancement,
            cache: self.cache.stats().await?,
            cache_errors: self.extraction.cache_errors() + self.enhancement.cache_errors(),
        };
        self.write_report(&report).await?;

        Ok(())
    }

    async fn run_pipeline(
        &self,
        name: &str,
        coordinator: &CacheCoordinator,
        items: Vec<WorkItem>,
        requirements: TargetRequirements,
    ) -> Result<EnrichResponse> {
        info!("\n▶️ 开始{}: {} 项", name, items.len());
        let enrich_config = self.config.enrich_config(requirements);
        let response = coordinator
            .enrich(items, &enrich_config)
            .await
            .with_context(|| format!("{}失败", name))?;

        for outcome in response.report.outcomes.iter().filter(|o| !o.is_success()) {
            if let Some(err) = &outcome.error {
                warn!("[{}] ❌ {}: {}", name, outcome.work_item_id, err);
            }
        }
        print_final_stats(name, &response.summary);
        Ok(response)
    }

    /// 加载工作文件（单个文件或整个目录）
    async fn load_work(&self) -> Result<WorkFile> {
        let path = Path::new(&self.config.work_path);
        info!("\n📁 正在加载工作文件: {}", path.display());

        if path.is_dir() {
            let files = load_all_work_files(&self.config.work_path).await?;
            let mut iter = files.into_iter();
            let mut merged = iter.next().unwrap_or_default();
            for file in iter {
                merged.merge(file);
            }
            Ok(merged)
        } else {
            Ok(load_work_file(path).await?)
        }
    }

    async fn write_report(&self, report: &RunReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        tokio::fs::write(&self.config.report_path, json)
            .await
            .with_context(|| format!("写入报告失败: {}", self.config.report_path))?;
        info!("\n报告已保存至: {}", self.config.report_path);
        Ok(())
    }
}
