//! 结果汇总
//!
//! 只从 `BatchReport` 推导，不单独存储。

use serde::{Deserialize, Serialize};

use crate::models::BatchReport;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cache_hits: usize,
    /// 命中数 / 总数；总数为 0 时为 0
    pub cache_hit_rate: f64,
    pub fallback_invocations: usize,
    pub elapsed_ms: u64,
}

impl Summary {
    pub fn from_report(report: &BatchReport) -> Self {
        let total = report.outcomes.len();
        let succeeded = report.outcomes.iter().filter(|o| o.is_success()).count();
        let cache_hits = report.outcomes.iter().filter(|o| o.from_cache).count();
        let cache_hit_rate = if total == 0 {
            0.0
        } else {
            cache_hits as f64 / total as f64
        };

        Self {
            total,
            succeeded,
            failed: total - succeeded,
            cache_hits,
            cache_hit_rate,
            fallback_invocations: report.fallback_invocations,
            elapsed_ms: report.elapsed_ms,
        }
    }

    /// 成功率（百分比）
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.succeeded as f64 / self.total as f64 * 100.0
        }
    }
}

impl From<&BatchReport> for Summary {
    fn from(report: &BatchReport) -> Self {
        Self::from_report(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EnrichmentOutcome, EnrichmentPayload, ErrorKind, OutcomeError};

    fn ok(id: &str) -> EnrichmentOutcome {
        EnrichmentOutcome::success(
            id,
            EnrichmentPayload::Entities { entities: vec![] },
            "gpt-4o",
            0.9,
            vec![],
        )
    }

    #[test]
    fn test_empty_report() {
        let summary = Summary::from_report(&BatchReport::default());
        assert_eq!(summary.total, 0);
        assert_eq!(summary.cache_hit_rate, 0.0);
        assert_eq!(summary.success_rate(), 0.0);
    }

    #[test]
    fn test_counts() {
        let report = BatchReport {
            outcomes: vec![
                ok("a#0").as_cache_hit("a#0"),
                ok("a#1"),
                EnrichmentOutcome::failure(
                    "a#2",
                    OutcomeError {
                        kind: ErrorKind::Provider,
                        message: "timeout".to_string(),
                    },
                ),
                ok("a#3").as_cache_hit("a#3"),
            ],
            fallback_invocations: 2,
            elapsed_ms: 1500,
        };

        let summary = Summary::from(&report);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.cache_hits, 2);
        assert_eq!(summary.cache_hit_rate, 0.5);
        assert_eq!(summary.fallback_invocations, 2);
        assert_eq!(summary.elapsed_ms, 1500);
        assert_eq!(summary.success_rate(), 75.0);
    }
}
