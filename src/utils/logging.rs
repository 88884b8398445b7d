/// 日志工具模块
///
/// 提供日志初始化和输出的辅助函数
use crate::config::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化 tracing 日志
///
/// 优先使用 `RUST_LOG`；未设置时按 `verbose` 选择 debug 或 info。
/// 重复调用不会报错（测试中会多次初始化）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 Math Mandala 启动");
    match &config.local_capture_dir {
        Some(dir) => info!("📂 图片来源: 本地目录 {}", dir),
        None => info!("🌐 图片来源: {}", config.upload_base_url),
    }
    info!(
        "⏱️ 等待超时: {} 秒, 轮询间隔: {} 秒",
        config.poll_timeout_secs, config.poll_interval_secs
    );
    info!("📚 历史目录: {}", config.history_dir);
    info!("{}", "=".repeat(60));
}

/// 记录会话完成信息
///
/// # 参数
/// - `label`: 会话标识
/// - `detected`: 识别到答案的题目数
/// - `total`: 题目总数
pub fn log_session_complete(label: &str, detected: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ {} 完成: 识别到 {}/{} 题答案", label, detected, total);
    info!("{}", "─".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
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
