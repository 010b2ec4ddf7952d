use thiserror::Error;

/// 应用程序错误类型
///
/// 只有配置错误会让一次 `enrich` 调用整体失败；
/// 其余错误都以单条结果的形式嵌入 BatchReport。
#[derive(Debug, Error)]
pub enum AppError {
    /// 工作项校验错误
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// 模型服务错误
    #[error("模型服务错误: {0}")]
    Provider(#[from] ProviderError),
    /// 结果质量不合格
    #[error("质量校验失败: {0}")]
    Quality(#[from] QualityError),
    /// 缓存错误
    #[error("缓存错误: {0}")]
    Cache(#[from] CacheError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件读写错误
    #[error("文件错误 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// JSON 序列化/解析失败
    #[error("JSON处理失败: {0}")]
    Json(#[from] serde_json::Error),
}

/// 工作项校验错误（调度前拒绝，绝不会发送给模型）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 内容为空
    #[error("{field} 不能为空")]
    EmptyContent { field: &'static str },
    /// 内容超长
    #[error("{field} 超出长度限制 ({len} > {max})")]
    ContentTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
    /// 工作项类型与请求要求不符
    #[error("工作项类型 {item_kind} 与请求类型 {expected} 不匹配")]
    KindMismatch {
        item_kind: &'static str,
        expected: &'static str,
    },
    /// 不支持的实体类型
    #[error("不支持的实体类型: {value}")]
    UnknownEntityType { value: String },
}

/// 模型服务错误（网络 / 鉴权 / 配额 / 超时 / 响应格式）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// 网络请求失败
    #[error("[{provider}] 请求失败: {message}")]
    Request { provider: String, message: String },
    /// 鉴权失败
    #[error("[{provider}] 鉴权失败: {message}")]
    Auth { provider: String, message: String },
    /// 配额耗尽或请求频率限制
    #[error("[{provider}] 配额不足或被限流: {message}")]
    Quota { provider: String, message: String },
    /// 调用超时
    #[error("[{provider}] 调用超时 (超过 {budget_ms}ms)")]
    Timeout { provider: String, budget_ms: u64 },
    /// 返回内容为空
    #[error("[{provider}] 返回内容为空")]
    EmptyResponse { provider: String },
    /// 响应无法解析
    #[error("[{provider}] 响应解析失败: {message}")]
    MalformedResponse { provider: String, message: String },
    /// 响应中缺少某个工作项的结果
    #[error("[{provider}] 响应中缺少工作项 {work_item_id} 的结果")]
    MissingItem {
        provider: String,
        work_item_id: String,
    },
    /// 批次任务异常终止
    #[error("批次任务异常终止: {message}")]
    TaskAborted { message: String },
}

/// 结果质量校验失败
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QualityError {
    /// 结果类型与请求不符
    #[error("工作项 {work_item_id} 的结果类型与请求不符")]
    WrongPayload { work_item_id: String },
    /// 缺少结果内容
    #[error("工作项 {work_item_id} 缺少结果内容")]
    MissingPayload { work_item_id: String },
    /// 缺少目标语言的翻译
    #[error("工作项 {work_item_id} 缺少翻译: {missing}")]
    MissingTranslations {
        work_item_id: String,
        missing: String,
    },
    /// 置信度过低
    #[error("工作项 {work_item_id} 置信度过低: {confidence:.2} < {min:.2}")]
    LowConfidence {
        work_item_id: String,
        confidence: f32,
        min: f32,
    },
    /// 缺少出处链接
    #[error("工作项 {work_item_id} 出处数量不足: {found} < {min}")]
    MissingEvidence {
        work_item_id: String,
        found: usize,
        min: usize,
    },
    /// 实体数量超限
    #[error("工作项 {work_item_id} 实体数量超限: {count} > {max}")]
    TooManyEntities {
        work_item_id: String,
        count: usize,
        max: usize,
    },
    /// 实体格式不合法
    #[error("工作项 {work_item_id} 含有不合法的实体: {reason}")]
    MalformedEntity {
        work_item_id: String,
        reason: String,
    },
}

/// 缓存错误（读取时降级为未命中，绝不阻塞流程）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// 存储不可用
    #[error("缓存存储不可用: {message}")]
    Unavailable { message: String },
    /// 缓存内容无法解析
    #[error("缓存内容损坏 ({key}): {message}")]
    Corrupted { key: String, message: String },
}

/// 配置错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// 数值超出允许范围
    #[error("{name} 超出范围: {value} (允许 {min}..={max})")]
    OutOfRange {
        name: &'static str,
        value: usize,
        min: usize,
        max: usize,
    },
    /// 不支持的语言代码
    #[error("不支持的语言代码: {code}")]
    UnsupportedLanguage { code: String },
    /// 不支持的模型服务
    #[error("不支持的模型服务: {name} (可选: openai, gemini)")]
    UnknownProvider { name: String },
    /// 缺少必填项
    #[error("缺少配置项: {name}")]
    Missing { name: &'static str },
    /// 不合法的值
    #[error("配置项 {name} 不合法: {reason}")]
    Invalid { name: &'static str, reason: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.into(),
            source,
        }
    }

    /// 创建 TOML 解析错误
    pub fn toml(path: impl Into<String>, source: toml::de::Error) -> Self {
        AppError::Toml {
            path: path.into(),
            source,
        }
    }
}

impl ProviderError {
    /// 创建请求失败错误
    pub fn request(provider: impl Into<String>, message: impl ToString) -> Self {
        ProviderError::Request {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    /// 创建响应解析错误
    pub fn malformed(provider: impl Into<String>, message: impl ToString) -> Self {
        ProviderError::MalformedResponse {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    /// 根据 HTTP 状态码归类错误
    pub fn from_status(provider: impl Into<String>, status: u16, message: impl ToString) -> Self {
        let provider = provider.into();
        let message = message.to_string();
        match status {
            401 | 403 => ProviderError::Auth { provider, message },
            429 => ProviderError::Quota { provider, message },
            _ => ProviderError::Request {
                provider,
                message: format!("status {}: {}", status, message),
            },
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
