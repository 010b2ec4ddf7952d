//! 内容寻址的缓存键

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::requirements::TargetRequirements;
use crate::models::work_item::WorkItem;

/// 缓存键
///
/// 由（规范化内容，工作项类别，目标配置指纹）计算 SHA-256 得到。
/// 同一工作项 + 同一配置 ⇒ 同一个键；配置有任何差异 ⇒ 不同的键。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// 为工作项计算缓存键
    pub fn compute(item: &WorkItem, requirements: &TargetRequirements) -> Self {
        let discriminator = item.kind().as_str();

        let mut hasher = Sha256::new();
        hasher.update(discriminator.as_bytes());
        hasher.update([0u8]);
        hasher.update(item.normalized_content().as_bytes());
        hasher.update([0u8]);
        hasher.update(requirements.fingerprint().as_bytes());

        CacheKey(format!("{}:{}", discriminator, hex::encode(hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        CacheKey(value.to_string())
    }
}
