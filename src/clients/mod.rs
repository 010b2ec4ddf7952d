//! 模型后端客户端
//!
//! 只负责"发一条消息、拿回一段文本"，不关心批次、校验和兜底。

use async_trait::async_trait;

use crate::error::ProviderError;

pub mod gemini_client;
pub mod llm_client;

pub use gemini_client::{GeminiChatClient, DEFAULT_GEMINI_BASE_URL};
pub use llm_client::OpenAiChatClient;

/// 聊天补全后端
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// 模型名称（用于日志和结果中的 provider_name）
    fn model_name(&self) -> &str;

    /// 发送一次请求，返回去除首尾空白的文本
    async fn complete(
        &self,
        system_message: &str,
        user_message: &str,
    ) -> Result<String, ProviderError>;
}
