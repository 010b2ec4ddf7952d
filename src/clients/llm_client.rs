/// OpenAI 兼容的聊天补全客户端
///
/// 使用 `async-openai`，兼容 OpenAI API 的服务（Azure、Doubao 等）都可以通过 base url 接入。
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::clients::ChatBackend;
use crate::error::ProviderError;

/// OpenAI 聊天客户端
pub struct OpenAiChatClient {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiChatClient {
    /// 创建新的客户端
    pub fn new(api_key: &str, api_base_url: &str, model_name: impl Into<String>) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: model_name.into(),
            temperature: 0.3,
            max_tokens: 4000,
        }
    }

    /// 调整采样温度和最大输出长度
    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    fn build_request(
        &self,
        system_message: &str,
        user_message: &str,
    ) -> Result<async_openai::types::chat::CreateChatCompletionRequest, OpenAIError> {
        let mut messages = Vec::new();

        if !system_message.is_empty() {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(system_message)
                .build()?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
    }

    fn classify_error(&self, err: OpenAIError) -> ProviderError {
        let provider = self.model_name.clone();
        match err {
            OpenAIError::ApiError(api_err) => {
                let code = api_err.code.clone().unwrap_or_default();
                match code.as_str() {
                    "invalid_api_key" | "invalid_authentication" => ProviderError::Auth {
                        provider,
                        message: api_err.message,
                    },
                    "insufficient_quota" | "rate_limit_exceeded" => ProviderError::Quota {
                        provider,
                        message: api_err.message,
                    },
                    _ => ProviderError::request(provider, api_err.message),
                }
            }
            other => ProviderError::request(provider, other),
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAiChatClient {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(
        &self,
        system_message: &str,
        user_message: &str,
    ) -> Result<String, ProviderError> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let request = self
            .build_request(system_message, user_message)
            .map_err(|e| ProviderError::request(&self.model_name, e))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            self.classify_error(e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ProviderError::EmptyResponse {
                provider: self.model_name.clone(),
            })?;

        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_client() -> OpenAiChatClient {
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        OpenAiChatClient::new(&api_key, "https://api.openai.com/v1", "gpt-4o")
    }

    #[test]
    fn test_build_request() {
        let client = create_test_client().with_sampling(0.1, 256);
        let request = client.build_request("你是一个简洁的助手", "你好").unwrap();
        assert_eq!(request.model, "gpt-4o");
        assert_eq!(request.messages.len(), 2);

        let without_system = client.build_request("", "你好").unwrap();
        assert_eq!(without_system.messages.len(), 1);
    }

    /// 测试真实 API 连通性
    ///
    /// 运行方式：
    /// ```bash
    /// OPENAI_API_KEY=... cargo test test_openai_live -- --ignored --nocapture
    /// ```
    #[tokio::test]
    #[ignore]
    async fn test_openai_live() {
        let _ = tracing_subscriber::fmt::try_init();

        let client = create_test_client();
        let result = client
            .complete("你是一个简洁的助手，回答要简短。", "用一个词回答：Rust 是什么？")
            .await;

        match result {
            Ok(response) => {
                println!("LLM 响应: {}", response);
                assert!(!response.is_empty());
            }
            Err(e) => panic!("LLM 调用失败: {}", e),
        }
    }
}
