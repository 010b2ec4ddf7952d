/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::orchestrator::summary::Summary;

/// 初始化日志
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 `debug` 或 `info`。
/// 重复调用不会报错（测试中常见）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `batch_size`: 每批工作项数量
/// - `concurrency`: 每轮并发批次数
pub fn log_startup(batch_size: usize, concurrency: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量增强模式");
    info!(
        "📊 批大小: {} | 并发批次: {} | 时间: {}",
        batch_size,
        concurrency,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
}

/// 记录调度计划
pub fn log_schedule(pipeline: &str, items: usize, batches: usize, rounds: usize) {
    info!(
        "📋 [{}] {} 个待处理项 → {} 批 → {} 轮",
        pipeline, items, batches, rounds
    );
}

/// 记录轮次开始信息
///
/// # 参数
/// - `round`: 轮次编号
/// - `total_rounds`: 轮次总数
/// - `first_batch` / `last_batch`: 本轮批次范围
/// - `total_batches`: 批次总数
pub fn log_round_start(
    round: usize,
    total_rounds: usize,
    first_batch: usize,
    last_batch: usize,
    total_batches: usize,
) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始第 {}/{} 轮", round, total_rounds);
    info!(
        "📄 本轮批次: {}-{} / 共 {} 批",
        first_batch, last_batch, total_batches
    );
    info!("{}", "=".repeat(60));
}

/// 记录轮次完成信息
pub fn log_round_complete(round: usize, success: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 轮完成: 成功 {}/{}", round, success, total);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(pipeline: &str, summary: &Summary) {
    info!("\n{}", "=".repeat(60));
    info!("📊 [{}] 处理完成统计", pipeline);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", summary.succeeded, summary.total);
    info!("❌ 失败: {}", summary.failed);
    info!(
        "💾 缓存命中: {} ({:.1}%)",
        summary.cache_hits,
        summary.cache_hit_rate * 100.0
    );
    info!("🔁 兜底次数: {}", summary.fallback_invocations);
    info!("⏱️ 耗时: {} ms", summary.elapsed_ms);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符数）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
