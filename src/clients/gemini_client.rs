/// Gemini `generateContent` 客户端
///
/// API key 通过查询参数传递，错误响应形如
/// `{"error": {"code": 400, "message": "...", "status": "INVALID_ARGUMENT"}}`。
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::clients::ChatBackend;
use crate::error::ProviderError;

/// 默认 API 地址
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini 客户端
pub struct GeminiChatClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model_name: String,
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiChatClient {
    /// 创建新的客户端
    ///
    /// `request_timeout` 是 HTTP 层的超时，调用方仍会在外层施加各自的时间预算。
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        model_name: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let model_name = model_name.into();
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ProviderError::request(&model_name, e))?;

        Ok(Self {
            http,
            api_key: api_key.into().trim().to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model_name,
            temperature: 0.3,
            max_output_tokens: 4000,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model_name
        )
    }

    fn build_payload(&self, system_message: &str, user_message: &str) -> Value {
        let mut payload = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": user_message }]
            }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_output_tokens
            }
        });
        if !system_message.is_empty() {
            payload["systemInstruction"] = json!({ "parts": [{ "text": system_message }] });
        }
        payload
    }
}

/// 解析成功响应，拼接第一个候选的所有文本片段
fn parse_response_text(provider: &str, body: &str) -> Result<String, ProviderError> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::malformed(provider, e))?;

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::malformed(provider, "响应中没有 candidates"))?;

    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
    if parts.is_empty() {
        return Err(ProviderError::malformed(provider, "响应中没有 content parts"));
    }

    let text: String = parts.into_iter().filter_map(|p| p.text).collect();
    if text.trim().is_empty() {
        return Err(ProviderError::EmptyResponse {
            provider: provider.to_string(),
        });
    }
    Ok(text.trim().to_string())
}

/// 解析错误响应，返回 `STATUS: message`，无法解析时返回正文前 200 个字符
fn parse_error_detail(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(error) = value.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("未知错误");
            return match error.get("status").and_then(|s| s.as_str()) {
                Some(status) if !status.is_empty() => format!("{}: {}", status, message),
                _ => message.to_string(),
            };
        }
    }
    body.chars().take(200).collect()
}

#[async_trait]
impl ChatBackend for GeminiChatClient {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(
        &self,
        system_message: &str,
        user_message: &str,
    ) -> Result<String, ProviderError> {
        debug!("调用 Gemini API，模型: {}", self.model_name);

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&self.build_payload(system_message, user_message))
            .send()
            .await
            .map_err(|e| {
                warn!("Gemini API 调用失败: {}", e);
                if e.is_timeout() {
                    ProviderError::Timeout {
                        provider: self.model_name.clone(),
                        budget_ms: 0,
                    }
                } else {
                    ProviderError::request(&self.model_name, e)
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::request(&self.model_name, e))?;

        if !status.is_success() {
            let detail = parse_error_detail(&body);
            warn!("Gemini API 返回错误 ({}): {}", status, detail);
            return Err(ProviderError::from_status(
                &self.model_name,
                status.as_u16(),
                detail,
            ));
        }

        debug!("Gemini API 调用成功");
        parse_response_text(&self.model_name, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_joins_parts() {
        let body = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "{\"a\":"}, {"text": " 1}"}], "role": "model"},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 10}
        }"#;
        assert_eq!(parse_response_text("gemini", body).unwrap(), r#"{"a": 1}"#);
    }

    #[test]
    fn test_parse_response_without_candidates() {
        let err = parse_response_text("gemini", r#"{"candidates": []}"#).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse { .. }));
    }

    #[test]
    fn test_parse_error_detail() {
        let body = r#"{"error": {"code": 403, "message": "API key invalid", "status": "PERMISSION_DENIED"}}"#;
        assert_eq!(parse_error_detail(body), "PERMISSION_DENIED: API key invalid");
        assert_eq!(parse_error_detail("gateway down"), "gateway down");
    }

    #[test]
    fn test_payload_shape() {
        let client = GeminiChatClient::new(
            " key ",
            "https://example.com/",
            "gemini-2.0-flash-exp",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "https://example.com/v1beta/models/gemini-2.0-flash-exp:generateContent"
        );
        let payload = client.build_payload("sys", "hello");
        assert_eq!(payload["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(payload["systemInstruction"]["parts"][0]["text"], "sys");
        assert!(client.build_payload("", "hello").get("systemInstruction").is_none());
    }
}
