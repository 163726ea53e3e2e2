/// 日志工具模块
///
/// 提供订阅器初始化和探测过程的格式化输出
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::models::report::QASummary;

/// 初始化日志订阅器
///
/// # 参数
/// - `verbose`: 是否默认输出 debug 级别
pub fn init(verbose: bool) {
    let default_directive = if verbose {
        "web_qa_probe=debug"
    } else {
        "web_qa_probe=info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    // 重复初始化（多个测试共用一个进程）按已初始化处理
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(target_url: &str, suite_mode: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 浏览器探测模式");
    info!("🎯 目标应用: {}", target_url);
    info!("📋 套件模式: {}", suite_mode);
    info!("{}", "=".repeat(60));
}

/// 记录探测项开始
pub fn log_probe_start(name: &str) {
    info!("\n{}", "─".repeat(30));
    info!("🔍 开始探测: {}", name);
}

/// 打印最终汇总
pub fn log_summary(summary: &QASummary) {
    info!("\n{}", "=".repeat(60));
    info!("📊 探测完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 通过: {}/{}", summary.passed, summary.total_tests);
    info!("❌ 失败: {}", summary.failed);
    info!(
        "🧾 问题: {} (critical {}, major {}, minor {})",
        summary.issues.len(),
        summary.severity_counts.critical,
        summary.severity_counts.major,
        summary.severity_counts.minor
    );
    for recommendation in &summary.recommendations {
        info!("💡 {}", recommendation);
    }
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("0123456789abc", 10), "0123456789...");
        // 按字符数而不是字节数截断
        assert_eq!(truncate_text("中文文本超长测试", 4), "中文文本...");
    }
}
