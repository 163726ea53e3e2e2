use std::fmt;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 会话级错误（浏览器无法打开 / 初始导航失败）
    Session(SessionError),
    /// 单个探测项错误（只影响该探测项）
    Probe(ProbeError),
    /// 单个交互步骤错误（只影响该步骤）
    Step(StepError),
    /// 配置错误
    Config(ConfigError),
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Session(e) => write!(f, "会话错误: {}", e),
            AppError::Probe(e) => write!(f, "探测错误: {}", e),
            AppError::Step(e) => write!(f, "步骤错误: {}", e),
            AppError::Config(e) => write!(f, "配置错误: {}", e),
            AppError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Session(e) => Some(e),
            AppError::Probe(e) => Some(e),
            AppError::Step(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// 会话级错误
///
/// 这一类错误意味着浏览器会话本身不可用，整次探测只能带着
/// 连通性问题返回（但依然返回一份结果，不向上抛未处理异常）。
#[derive(Debug)]
pub enum SessionError {
    /// 启动浏览器进程失败
    LaunchFailed { reason: String },
    /// 创建页面失败
    PageCreationFailed { reason: String },
    /// 初始导航失败（携带原始传输错误文本）
    NavigationFailed { url: String, reason: String },
    /// 初始导航超时
    NavigationTimeout { url: String, timeout_ms: u64 },
    /// 设置视口失败
    ViewportFailed { reason: String },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::LaunchFailed { reason } => {
                write!(f, "启动浏览器失败: {}", reason)
            }
            SessionError::PageCreationFailed { reason } => {
                write!(f, "创建页面失败: {}", reason)
            }
            SessionError::NavigationFailed { url, reason } => {
                write!(f, "导航到 {} 失败: {}", url, reason)
            }
            SessionError::NavigationTimeout { url, timeout_ms } => {
                write!(f, "导航到 {} 超时 ({} ms)", url, timeout_ms)
            }
            SessionError::ViewportFailed { reason } => {
                write!(f, "设置视口失败: {}", reason)
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// 单个探测项错误
///
/// 被编排层就地捕获：该探测项记为失败的 TestResult，其余探测继续执行。
#[derive(Debug)]
pub enum ProbeError {
    /// 页面脚本执行失败
    EvalFailed {
        probe: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 截图留证失败
    EvidenceCaptureFailed { reason: String },
    /// 探测返回的数据无法解析
    ResultParseFailed {
        probe: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::EvalFailed { probe, source } => {
                write!(f, "探测项 {} 执行脚本失败: {}", probe, source)
            }
            ProbeError::EvidenceCaptureFailed { reason } => {
                write!(f, "截图留证失败: {}", reason)
            }
            ProbeError::ResultParseFailed { probe, source } => {
                write!(f, "探测项 {} 结果解析失败: {}", probe, source)
            }
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProbeError::EvalFailed { source, .. } | ProbeError::ResultParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            ProbeError::EvidenceCaptureFailed { .. } => None,
        }
    }
}

/// 单个交互步骤错误
///
/// 只标记该步骤（以及所属流程）失败，流程按继续执行策略推进。
#[derive(Debug)]
pub enum StepError {
    /// 等待定位器出现超时
    LocatorTimeout { selector: String, timeout_ms: u64 },
    /// 步骤整体超时
    Timeout { action: String, timeout_ms: u64 },
    /// 步骤内导航失败
    NavigationFailed { url: String, reason: String },
    /// 元素操作失败（点击 / 输入）
    ActionFailed { action: String, reason: String },
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepError::LocatorTimeout {
                selector,
                timeout_ms,
            } => {
                write!(f, "等待元素 {} 出现超时 ({} ms)", selector, timeout_ms)
            }
            StepError::Timeout { action, timeout_ms } => {
                write!(f, "步骤 {} 超时 ({} ms)", action, timeout_ms)
            }
            StepError::NavigationFailed { url, reason } => {
                write!(f, "导航到 {} 失败: {}", url, reason)
            }
            StepError::ActionFailed { action, reason } => {
                write!(f, "步骤 {} 执行失败: {}", action, reason)
            }
        }
    }
}

impl std::error::Error for StepError {}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 环境变量解析失败
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 套件模式无法识别
    UnknownSuiteMode { mode: String },
    /// 自定义流程文件解析失败
    FlowParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EnvVarParseFailed {
                var_name,
                value,
                expected_type,
            } => {
                write!(
                    f,
                    "环境变量 {} 解析失败: 值 '{}' 无法转换为 {}",
                    var_name, value, expected_type
                )
            }
            ConfigError::UnknownSuiteMode { mode } => {
                write!(f, "无法识别的套件模式: {}", mode)
            }
            ConfigError::FlowParseFailed { path, source } => {
                write!(f, "流程文件解析失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::FlowParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

// ========== 从常见错误类型转换 ==========
// 注意：不需要手动实现 From<AppError> for anyhow::Error，
// 因为 anyhow 已经为所有实现了 std::error::Error 的类型提供了自动实现

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Probe(ProbeError::EvalFailed {
            probe: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Probe(ProbeError::ResultParseFailed {
            probe: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(ConfigError::FlowParseFailed {
            path: String::new(), // TOML 错误本身不携带路径信息
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Other(err.to_string())
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建脚本执行失败错误
    pub fn eval_failed(
        probe: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Probe(ProbeError::EvalFailed {
            probe: probe.into(),
            source: Box::new(source),
        })
    }

    /// 创建定位器超时错误
    pub fn locator_timeout(selector: impl Into<String>, timeout_ms: u64) -> Self {
        AppError::Step(StepError::LocatorTimeout {
            selector: selector.into(),
            timeout_ms,
        })
    }

    /// 创建步骤内导航失败错误
    pub fn step_navigation_failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Step(StepError::NavigationFailed {
            url: url.into(),
            reason: reason.into(),
        })
    }

    /// 创建元素操作失败错误
    pub fn action_failed(action: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Step(StepError::ActionFailed {
            action: action.into(),
            reason: reason.into(),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
