//! 按配置显式构建模型服务
//!
//! 主服务和兜底服务在启动时各构建一次，通过构造函数注入到流程层。

use std::sync::Arc;

use tracing::info;

use crate::clients::{ChatBackend, GeminiChatClient, OpenAiChatClient};
use crate::config::Config;
use crate::error::ConfigError;
use crate::models::{ProviderRole, WorkItemKind};
use crate::services::enhancement_adapter::TermEnhancementAdapter;
use crate::services::extraction_adapter::EntityExtractionAdapter;
use crate::services::provider::ProviderAdapter;

/// 支持的模型服务
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Gemini,
}

impl ProviderKind {
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" => Ok(ProviderKind::Gemini),
            _ => Err(ConfigError::UnknownProvider {
                name: name.to_string(),
            }),
        }
    }
}

/// 主 / 兜底两个后端
pub struct BackendPair {
    pub primary: Arc<dyn ChatBackend>,
    pub secondary: Arc<dyn ChatBackend>,
}

/// 主 / 兜底两个适配器
pub struct AdapterPair {
    pub primary: Arc<dyn ProviderAdapter>,
    pub secondary: Arc<dyn ProviderAdapter>,
}

/// 构建一个后端
pub fn build_backend(
    kind: ProviderKind,
    role: ProviderRole,
    config: &Config,
) -> Result<Arc<dyn ChatBackend>, ConfigError> {
    let timeout = match role {
        ProviderRole::Primary => config.primary_timeout(),
        ProviderRole::Secondary => config.secondary_timeout(),
    };

    match kind {
        ProviderKind::OpenAi => {
            if config.openai_api_key.trim().is_empty() {
                return Err(ConfigError::Missing {
                    name: "OPENAI_API_KEY",
                });
            }
            Ok(Arc::new(OpenAiChatClient::new(
                config.openai_api_key.trim(),
                &config.openai_api_base_url,
                config.openai_model_name.clone(),
            )))
        }
        ProviderKind::Gemini => {
            if config.gemini_api_key.trim().is_empty() {
                return Err(ConfigError::Missing {
                    name: "GEMINI_API_KEY",
                });
            }
            let client = GeminiChatClient::new(
                config.gemini_api_key.clone(),
                &config.gemini_api_base_url,
                config.gemini_model_name.clone(),
                timeout,
            )
            .map_err(|e| ConfigError::Invalid {
                name: "gemini",
                reason: e.to_string(),
            })?;
            Ok(Arc::new(client))
        }
    }
}

/// 按配置构建主 / 兜底后端
pub fn build_backends(config: &Config) -> Result<BackendPair, ConfigError> {
    let primary_kind = ProviderKind::parse(&config.primary_provider)?;
    let secondary_kind = ProviderKind::parse(&config.secondary_provider)?;

    let primary = build_backend(primary_kind, ProviderRole::Primary, config)?;
    let secondary = build_backend(secondary_kind, ProviderRole::Secondary, config)?;
    info!(
        "🤖 主服务: {} | 兜底服务: {}",
        primary.model_name(),
        secondary.model_name()
    );

    Ok(BackendPair { primary, secondary })
}

/// 为某一类工作项包装适配器
pub fn adapters_for(kind: WorkItemKind, backends: &BackendPair) -> AdapterPair {
    let wrap = |backend: &Arc<dyn ChatBackend>| -> Arc<dyn ProviderAdapter> {
        match kind {
            WorkItemKind::TextChunk => Arc::new(EntityExtractionAdapter::new(backend.clone())),
            WorkItemKind::Term => Arc::new(TermEnhancementAdapter::new(backend.clone())),
        }
    };
    AdapterPair {
        primary: wrap(&backends.primary),
        secondary: wrap(&backends.secondary),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider_names() {
        assert_eq!(ProviderKind::parse("OpenAI").unwrap(), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::parse(" gemini ").unwrap(), ProviderKind::Gemini);
        assert!(matches!(
            ProviderKind::parse("claude"),
            Err(ConfigError::UnknownProvider { .. })
        ));
    }

    #[test]
    fn test_missing_api_key() {
        let config = Config::default();
        assert!(matches!(
            build_backends(&config),
            Err(ConfigError::Missing { name: "OPENAI_API_KEY" })
        ));
    }

    #[test]
    fn test_build_and_wrap() {
        let config = Config {
            openai_api_key: "sk-test".to_string(),
            gemini_api_key: "g-test".to_string(),
            ..Config::default()
        };
        let backends = build_backends(&config).unwrap();
        assert_eq!(backends.primary.model_name(), "gpt-4o");
        assert_eq!(backends.secondary.model_name(), "gemini-2.0-flash-exp");

        let adapters = adapters_for(WorkItemKind::Term, &backends);
        assert_eq!(adapters.primary.name(), "gpt-4o");
        assert_eq!(adapters.secondary.name(), "gemini-2.0-flash-exp");
    }
}
