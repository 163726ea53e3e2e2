use serde::{Deserialize, Serialize};

/// 视口尺寸
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// 视口名称（用于日志和信号定位）
    pub label: String,
    pub width: u32,
    pub height: u32,
    /// 是否按移动端模拟
    pub mobile: bool,
}

impl Viewport {
    pub fn new(label: impl Into<String>, width: u32, height: u32, mobile: bool) -> Self {
        Self {
            label: label.into(),
            width,
            height,
            mobile,
        }
    }

    /// 默认桌面视口
    pub fn desktop() -> Self {
        Self::new("desktop", 1280, 720, false)
    }
}

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 目标应用地址
    pub target_url: String,
    /// 套件模式（basic / auth / forms / navigation / responsive / comprehensive）
    pub suite_mode: String,
    /// 自定义流程 TOML 文件存放目录
    pub flows_folder: String,
    /// 截图留证输出目录
    pub evidence_dir: String,
    /// 浏览器可执行文件路径（不设置则自动探测）
    pub chrome_executable: Option<String>,
    /// 默认视口
    pub default_viewport: Viewport,
    /// 响应式检查使用的视口序列
    pub responsive_viewports: Vec<Viewport>,
    /// 初始导航超时（超时则整次探测失败）
    pub initial_nav_timeout_ms: u64,
    /// 单个交互步骤超时
    pub step_timeout_ms: u64,
    /// 单条链接探测超时
    pub link_timeout_ms: u64,
    /// 链接探测数量上限
    pub nav_link_cap: usize,
    /// 收尾前等待迟到事件的时间
    pub settle_ms: u64,
    /// 可读性检查的最小字号（px）
    pub min_font_px: f64,
    /// 页面加载时间预算（超出记性能信号）
    pub load_time_budget_ms: u64,
    /// JS 堆占用预算（超出记性能信号）
    pub heap_budget_bytes: u64,
    /// 端点批量检查的并发数
    pub endpoint_concurrency: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_url: "http://localhost:3000".to_string(),
            suite_mode: "comprehensive".to_string(),
            flows_folder: "flows".to_string(),
            evidence_dir: "evidence".to_string(),
            chrome_executable: None,
            default_viewport: Viewport::desktop(),
            responsive_viewports: vec![
                Viewport::new("mobile", 375, 667, true),
                Viewport::new("tablet", 768, 1024, true),
                Viewport::new("desktop", 1280, 720, false),
            ],
            initial_nav_timeout_ms: 20_000,
            step_timeout_ms: 10_000,
            link_timeout_ms: 5_000,
            nav_link_cap: 10,
            settle_ms: 500,
            min_font_px: 12.0,
            load_time_budget_ms: 3_000,
            heap_budget_bytes: 50 * 1024 * 1024,
            endpoint_concurrency: 5,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        let default_viewport = Viewport::new(
            "desktop",
            env_parse("VIEWPORT_WIDTH", default.default_viewport.width),
            env_parse("VIEWPORT_HEIGHT", default.default_viewport.height),
            false,
        );
        Self {
            target_url: std::env::var("TARGET_URL").unwrap_or(default.target_url),
            suite_mode: std::env::var("SUITE_MODE").unwrap_or(default.suite_mode),
            flows_folder: std::env::var("FLOWS_FOLDER").unwrap_or(default.flows_folder),
            evidence_dir: std::env::var("EVIDENCE_DIR").unwrap_or(default.evidence_dir),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok(),
            default_viewport,
            responsive_viewports: default.responsive_viewports,
            initial_nav_timeout_ms: env_parse(
                "INITIAL_NAV_TIMEOUT_MS",
                default.initial_nav_timeout_ms,
            ),
            step_timeout_ms: env_parse("STEP_TIMEOUT_MS", default.step_timeout_ms),
            link_timeout_ms: env_parse("LINK_TIMEOUT_MS", default.link_timeout_ms),
            nav_link_cap: env_parse("NAV_LINK_CAP", default.nav_link_cap),
            settle_ms: env_parse("SETTLE_MS", default.settle_ms),
            min_font_px: env_parse("MIN_FONT_PX", default.min_font_px),
            load_time_budget_ms: env_parse("LOAD_TIME_BUDGET_MS", default.load_time_budget_ms),
            heap_budget_bytes: env_parse("HEAP_BUDGET_BYTES", default.heap_budget_bytes),
            endpoint_concurrency: env_parse("ENDPOINT_CONCURRENCY", default.endpoint_concurrency),
            verbose_logging: env_parse("VERBOSE_LOGGING", default.verbose_logging),
        }
    }
}

fn env_parse<T: std::str::FromStr>(var_name: &str, default: T) -> T {
    std::env::var(var_name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_viewports() {
        let config = Config::default();
        assert_eq!(config.default_viewport.width, 1280);
        assert_eq!(config.default_viewport.height, 720);
        assert_eq!(config.responsive_viewports.len(), 3);
        assert_eq!(config.responsive_viewports[0].label, "mobile");
        assert_eq!(config.responsive_viewports[0].width, 375);
        assert_eq!(config.responsive_viewports[1].height, 1024);
        assert!(!config.responsive_viewports[2].mobile);
    }

    #[test]
    fn test_default_policy_knobs() {
        let config = Config::default();
        assert_eq!(config.nav_link_cap, 10);
        assert_eq!(config.load_time_budget_ms, 3_000);
        assert_eq!(config.heap_budget_bytes, 50 * 1024 * 1024);
        assert_eq!(config.min_font_px, 12.0);
    }
}
