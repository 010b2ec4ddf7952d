//! 模型响应解析
//!
//! 模型经常把 JSON 包在 Markdown 代码块里，或者在前后加几句说明。

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::ProviderError;

fn code_fence() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").ok())
        .as_ref()
}

/// 取出响应中的 JSON 文本
///
/// 优先取代码块内容；否则截取第一个 `{` 到最后一个 `}`。
pub fn extract_json_text(response: &str) -> &str {
    if let Some(inner) = code_fence()
        .and_then(|re| re.captures(response))
        .and_then(|c| c.get(1))
    {
        return inner.as_str();
    }
    let trimmed = response.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// 解析为目标结构
pub fn parse_json<T: DeserializeOwned>(provider: &str, response: &str) -> Result<T, ProviderError> {
    let text = extract_json_text(response);
    if text.is_empty() {
        return Err(ProviderError::EmptyResponse {
            provider: provider.to_string(),
        });
    }
    serde_json::from_str(text).map_err(|e| ProviderError::malformed(provider, e))
}

/// 解析置信度：缺失时取默认值，结果限制在 [0, 1]
pub fn normalize_confidence(value: Option<f64>, default: f32) -> f32 {
    match value {
        Some(v) if v.is_finite() => (v as f32).clamp(0.0, 1.0),
        _ => default,
    }
}
