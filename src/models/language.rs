//! 支持的目标语言

use phf::phf_map;

use crate::error::ConfigError;

/// 支持的语言代码 → 显示名称
static SUPPORTED_LANGUAGES: phf::Map<&'static str, &'static str> = phf_map! {
    "ko" => "한국어",
    "zh-CN" => "中文(简体)",
    "zh-TW" => "中文(繁體)",
    "en" => "English",
    "ja" => "日本語",
    "fr" => "Français",
    "ru" => "Русский",
    "it" => "Italiano",
    "vi" => "Tiếng Việt",
    "ar" => "العربية",
    "es" => "Español",
};

/// 默认目标语言（请求未指定时使用全部语言）
pub const DEFAULT_LANGUAGES: [&str; 11] = [
    "ko", "zh-CN", "zh-TW", "en", "ja", "fr", "ru", "it", "vi", "ar", "es",
];

/// 是否为支持的语言代码
pub fn is_supported(code: &str) -> bool {
    SUPPORTED_LANGUAGES.contains_key(code)
}

/// 获取语言显示名称
pub fn display_name(code: &str) -> Option<&'static str> {
    SUPPORTED_LANGUAGES.get(code).copied()
}

/// 规范化目标语言列表
///
/// 去除空白、去重并排序，保证语言顺序不影响缓存键。
/// 列表为空时返回全部默认语言。
pub fn normalize_languages<S: AsRef<str>>(codes: &[S]) -> Result<Vec<String>, ConfigError> {
    let mut normalized: Vec<String> = Vec::with_capacity(codes.len());
    for code in codes {
        let code = code.as_ref().trim();
        if !is_supported(code) {
            return Err(ConfigError::UnsupportedLanguage {
                code: code.to_string(),
            });
        }
        normalized.push(code.to_string());
    }

    if normalized.is_empty() {
        normalized = DEFAULT_LANGUAGES.iter().map(|c| c.to_string()).collect();
    }

    normalized.sort();
    normalized.dedup();
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_sorts_and_dedups() {
        let langs = normalize_languages(&["en", "ko", " en "]).unwrap();
        assert_eq!(langs, vec!["en".to_string(), "ko".to_string()]);
    }

    #[test]
    fn test_normalize_empty_uses_defaults() {
        let empty: [&str; 0] = [];
        let langs = normalize_languages(&empty).unwrap();
        assert_eq!(langs.len(), DEFAULT_LANGUAGES.len());
    }

    #[test]
    fn test_unsupported_language() {
        let err = normalize_languages(&["en", "de"]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnsupportedLanguage {
                code: "de".to_string()
            }
        );
        assert_eq!(display_name("zh-CN"), Some("中文(简体)"));
    }
}
