//! 批次上下文
//!
//! 封装"我正在处理第几轮的第几批"这一信息，只用于日志。

use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchCtx {
    /// 轮次（从1开始）
    pub round: usize,

    /// 批次编号（从1开始，全局计数）
    pub batch_number: usize,

    /// 批次总数
    pub total_batches: usize,

    /// 本批工作项数量
    pub item_count: usize,
}

impl BatchCtx {
    pub fn new(round: usize, batch_number: usize, total_batches: usize, item_count: usize) -> Self {
        Self {
            round,
            batch_number,
            total_batches,
            item_count,
        }
    }
}

impl Display for BatchCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[轮次#{} 批次#{}/{}]",
            self.round, self.batch_number, self.total_batches
        )
    }
}
