use std::time::Duration;

use crate::error::ConfigError;
use crate::infrastructure::DEFAULT_CACHE_TTL;
use crate::models::TargetRequirements;

/// 批大小允许范围
pub const BATCH_SIZE_RANGE: (usize, usize) = (1, 50);
/// 并发数允许范围
pub const CONCURRENCY_RANGE: (usize, usize) = (1, 10);
/// 缓存 TTL 上限：一年
pub const MAX_CACHE_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- 模型服务 ---
    /// 主服务：openai | gemini
    pub primary_provider: String,
    /// 兜底服务：openai | gemini
    pub secondary_provider: String,
    pub openai_api_key: String,
    pub openai_api_base_url: String,
    pub openai_model_name: String,
    pub gemini_api_key: String,
    pub gemini_api_base_url: String,
    pub gemini_model_name: String,
    /// 主服务单次调用超时（秒）
    pub primary_timeout_secs: u64,
    /// 兜底服务单次调用超时（秒）
    pub secondary_timeout_secs: u64,
    /// 切换到兜底服务前的等待（毫秒）
    pub fallback_delay_ms: u64,

    // --- 调度 ---
    pub batch_size: usize,
    pub concurrency: usize,
    pub use_cache: bool,
    /// 缓存 TTL（秒）
    pub cache_ttl_secs: u64,
    /// 术语增强的目标语言（为空表示全部）
    pub target_languages: Vec<String>,

    // --- 输入输出 ---
    /// 工作文件（TOML）或目录
    pub work_path: String,
    /// 结果报告（JSON）
    pub report_path: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            primary_provider: "openai".to_string(),
            secondary_provider: "gemini".to_string(),
            openai_api_key: String::new(),
            openai_api_base_url: "https://api.openai.com/v1".to_string(),
            openai_model_name: "gpt-4o".to_string(),
            gemini_api_key: String::new(),
            gemini_api_base_url: crate::clients::DEFAULT_GEMINI_BASE_URL.to_string(),
            gemini_model_name: "gemini-2.0-flash-exp".to_string(),
            primary_timeout_secs: 60,
            secondary_timeout_secs: 30,
            fallback_delay_ms: 0,
            batch_size: 5,
            concurrency: 3,
            use_cache: true,
            cache_ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
            target_languages: Vec::new(),
            work_path: "work".to_string(),
            report_path: "enrich_report.json".to_string(),
            verbose_logging: false,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            primary_provider: std::env::var("PRIMARY_PROVIDER").unwrap_or(default.primary_provider),
            secondary_provider: std::env::var("SECONDARY_PROVIDER").unwrap_or(default.secondary_provider),
            openai_api_key: std::env::var("OPENAI_API_KEY").unwrap_or(default.openai_api_key),
            openai_api_base_url: std::env::var("OPENAI_API_BASE_URL").unwrap_or(default.openai_api_base_url),
            openai_model_name: std::env::var("OPENAI_MODEL_NAME").unwrap_or(default.openai_model_name),
            gemini_api_key: std::env::var("GEMINI_API_KEY").unwrap_or(default.gemini_api_key),
            gemini_api_base_url: std::env::var("GEMINI_API_BASE_URL").unwrap_or(default.gemini_api_base_url),
            gemini_model_name: std::env::var("GEMINI_MODEL_NAME").unwrap_or(default.gemini_model_name),
            primary_timeout_secs: env_parse("PRIMARY_TIMEOUT_SECS", default.primary_timeout_secs),
            secondary_timeout_secs: env_parse("SECONDARY_TIMEOUT_SECS", default.secondary_timeout_secs),
            fallback_delay_ms: env_parse("FALLBACK_DELAY_MS", default.fallback_delay_ms),
            batch_size: env_parse("BATCH_SIZE", default.batch_size),
            concurrency: env_parse("CONCURRENCY", default.concurrency),
            use_cache: env_parse("USE_CACHE", default.use_cache),
            cache_ttl_secs: env_parse("CACHE_TTL_SECS", default.cache_ttl_secs),
            target_languages: std::env::var("TARGET_LANGUAGES")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(default.target_languages),
            work_path: std::env::var("WORK_PATH").unwrap_or(default.work_path),
            report_path: std::env::var("REPORT_PATH").unwrap_or(default.report_path),
            verbose_logging: env_parse("VERBOSE_LOGGING", default.verbose_logging),
        }
    }

    /// 启动前检查（不检查 API key，缺失时在构建服务时报错）
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("batch_size", self.batch_size, BATCH_SIZE_RANGE)?;
        check_range("concurrency", self.concurrency, CONCURRENCY_RANGE)?;
        crate::models::language::normalize_languages(&self.target_languages)?;
        if self.use_cache {
            check_ttl(Duration::from_secs(self.cache_ttl_secs))?;
        }
        if self.primary_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "primary_timeout_secs",
                reason: "必须大于 0".to_string(),
            });
        }
        if self.secondary_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "secondary_timeout_secs",
                reason: "必须大于 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn primary_timeout(&self) -> Duration {
        Duration::from_secs(self.primary_timeout_secs)
    }

    pub fn secondary_timeout(&self) -> Duration {
        Duration::from_secs(self.secondary_timeout_secs)
    }

    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_delay_ms)
    }

    /// 按本配置生成一次调用的参数
    pub fn enrich_config(&self, target_requirements: TargetRequirements) -> EnrichConfig {
        EnrichConfig {
            batch_size: self.batch_size,
            concurrency: self.concurrency,
            use_cache: self.use_cache,
            target_requirements,
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
        }
    }
}

/// 单次 `enrich` 调用的参数
#[derive(Clone, Debug, PartialEq)]
pub struct EnrichConfig {
    pub batch_size: usize,
    pub concurrency: usize,
    pub use_cache: bool,
    pub target_requirements: TargetRequirements,
    pub cache_ttl: Duration,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            concurrency: 3,
            use_cache: true,
            target_requirements: TargetRequirements::default(),
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl EnrichConfig {
    pub fn new(target_requirements: TargetRequirements) -> Self {
        Self {
            target_requirements,
            ..Self::default()
        }
    }

    pub fn with_batching(mut self, batch_size: usize, concurrency: usize) -> Self {
        self.batch_size = batch_size;
        self.concurrency = concurrency;
        self
    }

    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// 调用级校验；失败是 `enrich` 唯一会整体报错的情况
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("batch_size", self.batch_size, BATCH_SIZE_RANGE)?;
        check_range("concurrency", self.concurrency, CONCURRENCY_RANGE)?;
        if self.use_cache {
            check_ttl(self.cache_ttl)?;
        }
        self.target_requirements.validate()
    }
}

fn check_ttl(ttl: Duration) -> Result<(), ConfigError> {
    if ttl.is_zero() {
        return Err(ConfigError::Invalid {
            name: "cache_ttl",
            reason: "启用缓存时 TTL 必须大于 0".to_string(),
        });
    }
    if ttl > MAX_CACHE_TTL {
        return Err(ConfigError::Invalid {
            name: "cache_ttl",
            reason: format!("{} 秒超过上限 {} 秒", ttl.as_secs(), MAX_CACHE_TTL.as_secs()),
        });
    }
    Ok(())
}

fn check_range(name: &'static str, value: usize, (min, max): (usize, usize)) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EnhancementRequirements, ExtractionRequirements};

    #[test]
    fn test_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
        assert!(EnrichConfig::default().validate().is_ok());
        let config = Config::default();
        assert_eq!(config.primary_timeout(), Duration::from_secs(60));
        assert_eq!(config.secondary_timeout(), Duration::from_secs(30));
        assert_eq!(config.fallback_delay(), Duration::ZERO);
    }

    #[test]
    fn test_batch_and_concurrency_bounds() {
        for (batch, concurrency, ok) in [(1, 1, true), (50, 10, true), (0, 3, false), (51, 3, false), (5, 0, false), (5, 11, false)] {
            let config = EnrichConfig::default().with_batching(batch, concurrency);
            assert_eq!(config.validate().is_ok(), ok, "batch={} concurrency={}", batch, concurrency);
        }
    }

    #[test]
    fn test_target_requirements_are_checked() {
        let bad_langs = EnrichConfig::new(TargetRequirements::Enhancement(EnhancementRequirements {
            target_languages: vec!["xx".to_string()],
            min_confidence: 0.5,
            min_evidence: 1,
        }));
        assert!(matches!(
            bad_langs.validate(),
            Err(ConfigError::UnsupportedLanguage { .. })
        ));

        let zero_max = EnrichConfig::new(TargetRequirements::Extraction(ExtractionRequirements {
            max_entities: Some(0),
            ..ExtractionRequirements::default()
        }));
        assert!(zero_max.validate().is_err());
    }

    #[test]
    fn test_cache_ttl_bounds() {
        let config = Config {
            cache_ttl_secs: u64::MAX,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { name: "cache_ttl", .. })
        ));
        assert!(matches!(
            config.enrich_config(TargetRequirements::default()).validate(),
            Err(ConfigError::Invalid { name: "cache_ttl", .. })
        ));

        let with_ttl = |ttl| EnrichConfig {
            cache_ttl: ttl,
            ..EnrichConfig::default()
        };
        assert!(with_ttl(MAX_CACHE_TTL).validate().is_ok());
        assert!(with_ttl(Duration::ZERO).validate().is_err());
        // 不使用缓存时 TTL 不参与校验
        assert!(with_ttl(Duration::MAX).with_cache(false).validate().is_ok());
    }

    #[test]
    fn test_enrich_config_from_config() {
        let config = Config {
            batch_size: 7,
            concurrency: 2,
            use_cache: false,
            cache_ttl_secs: 60,
            ..Config::default()
        };
        let enrich = config.enrich_config(TargetRequirements::default());
        assert_eq!(enrich.batch_size, 7);
        assert_eq!(enrich.concurrency, 2);
        assert!(!enrich.use_cache);
        assert_eq!(enrich.cache_ttl, Duration::from_secs(60));
    }
}
