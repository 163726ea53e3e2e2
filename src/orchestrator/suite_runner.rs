//! 套件执行器 - 编排层
//!
//! ## 职责
//!
//! 1. **会话生命周期**：打开会话，探测结束后无条件关闭（失败路径也关闭）
//! 2. **套件选择**：按模式决定跑哪些探测项、按什么固定顺序跑
//! 3. **失败遏制**：单个探测项 / 流程失败只记入结果，不中断其余探测
//! 4. **结果汇聚**：信号快照 → 分类 → 聚合成 QASummary
//!
//! ## 设计特点
//!
//! - 连通性永远先检查；初始导航失败时仍返回一份（几乎为空的）汇总
//! - 顺序敏感：链接探测和响应式探测会移动页面状态并负责恢复，
//!   因此 comprehensive 的子套件顺序是固定的

use std::str::FromStr;

use anyhow::Result;
use serde_json::json;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

use crate::config::{Config, Viewport};
use crate::error::{AppError, ConfigError, SessionError};
use crate::infrastructure::session::ProbeSession;
use crate::models::flow::Flow;
use crate::models::report::{IssueRecord, QASummary, Severity, TestResult};
use crate::models::signal::Signal;
use crate::models::loaders::load_all_flows;
use crate::services::aggregator;
use crate::services::classifier;
use crate::services::collectors::{attach_collectors, CollectorFilter};
use crate::services::dom_probes::DomProbes;
use crate::utils::logging;
use crate::workflow::flow_runner::FlowRunner;

/// 套件模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuiteMode {
    Basic,
    /// 声明但未实现：返回单个通过的占位结果（文档化的限制，不是静默跳过）
    Auth,
    Forms,
    Navigation,
    Responsive,
    #[default]
    Comprehensive,
}

impl SuiteMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SuiteMode::Basic => "basic",
            SuiteMode::Auth => "auth",
            SuiteMode::Forms => "forms",
            SuiteMode::Navigation => "navigation",
            SuiteMode::Responsive => "responsive",
            SuiteMode::Comprehensive => "comprehensive",
        }
    }
}

impl FromStr for SuiteMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(SuiteMode::Basic),
            "auth" => Ok(SuiteMode::Auth),
            "forms" => Ok(SuiteMode::Forms),
            "navigation" => Ok(SuiteMode::Navigation),
            "responsive" => Ok(SuiteMode::Responsive),
            "comprehensive" | "" => Ok(SuiteMode::Comprehensive),
            other => Err(AppError::Config(ConfigError::UnknownSuiteMode {
                mode: other.to_string(),
            })),
        }
    }
}

/// 套件执行器
pub struct SuiteRunner {
    config: Config,
}

impl SuiteRunner {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// 执行一个套件，永远返回一份 QASummary
    ///
    /// 唯一的致命路径是初始导航失败；即便如此也返回带单条
    /// critical 连通性问题的汇总，而不是向上抛错。
    pub async fn run_suite(
        &self,
        url: &str,
        mode: SuiteMode,
        custom_flows: &[Flow],
        viewport: Option<Viewport>,
    ) -> QASummary {
        let viewport = viewport.unwrap_or_else(|| self.config.default_viewport.clone());
        info!("📋 套件模式: {} -> {}", mode.as_str(), url);

        let mut session = match ProbeSession::open(&self.config, url, viewport).await {
            Ok(session) => session,
            Err(e) => {
                error!("会话打开失败: {}", e);
                return connectivity_failure_summary(url, &e);
            }
        };

        let (results, signals) = self.run_probes(&session, mode, custom_flows).await;

        // 无条件关闭：探测期间无论发生什么，这里都会执行一次
        session.close().await;

        let issues = classifier::classify_all(&signals);
        aggregator::build_summary(results, issues)
    }

    /// 按模式跑完全部探测项（不返回错误：逐项遏制）
    async fn run_probes(
        &self,
        session: &ProbeSession,
        mode: SuiteMode,
        custom_flows: &[Flow],
    ) -> (Vec<TestResult>, Vec<Signal>) {
        let mut results: Vec<TestResult> = Vec::new();

        // ========== 连通性（永远最先） ==========
        results.push(self.connectivity_result(session).await);

        // ========== 常驻采集器 ==========
        let guard = match attach_collectors(
            session.page(),
            &session.hub(),
            CollectorFilter::default(),
        )
        .await
        {
            Ok(guard) => Some(guard),
            Err(e) => {
                warn!("采集器挂载失败: {}", e);
                results.push(TestResult::failed(
                    "collectors",
                    json!({}),
                    e.to_string(),
                ));
                None
            }
        };

        let probes = DomProbes::new(session, &self.config);

        // ========== 按模式执行，顺序固定 ==========
        match mode {
            SuiteMode::Basic => {
                self.record(&mut results, "page-basics", probes.check_page_basics().await);
                self.record(
                    &mut results,
                    "broken-images",
                    probes.check_broken_images().await,
                );
            }
            SuiteMode::Auth => {
                results.push(auth_placeholder_result());
            }
            SuiteMode::Forms => {
                self.record(
                    &mut results,
                    "form-structure",
                    probes.check_form_structure().await,
                );
            }
            SuiteMode::Navigation => {
                self.record(
                    &mut results,
                    "navigation-links",
                    probes.check_navigation_links().await,
                );
            }
            SuiteMode::Responsive => {
                self.record(&mut results, "responsive", probes.check_responsive().await);
            }
            SuiteMode::Comprehensive => {
                // basic → navigation → forms → responsive → 界面质量 → 性能
                // 链接探测和响应式探测各自恢复页面状态，后续探测假定回到原页
                self.record(&mut results, "page-basics", probes.check_page_basics().await);
                self.record(
                    &mut results,
                    "broken-images",
                    probes.check_broken_images().await,
                );
                self.record(
                    &mut results,
                    "navigation-links",
                    probes.check_navigation_links().await,
                );
                self.record(
                    &mut results,
                    "form-structure",
                    probes.check_form_structure().await,
                );
                self.record(&mut results, "responsive", probes.check_responsive().await);
                self.record(&mut results, "ui-quality", probes.check_ui_quality().await);
                self.record(
                    &mut results,
                    "performance",
                    probes.assess_performance().await,
                );
            }
        }

        // ========== 自定义流程（所有模式都在探测项之后执行） ==========
        if !custom_flows.is_empty() {
            let runner = FlowRunner::new(session, &self.config);
            for (index, flow) in custom_flows.iter().enumerate() {
                results.push(runner.run(flow, index + 1).await);
            }
        }

        // 等待迟到的采集器事件，再拷出信号
        sleep(Duration::from_millis(self.config.settle_ms)).await;
        drop(guard);
        let signals = session.hub().snapshot();

        info!(
            "📦 探测完成: {} 项检查, {} 条信号",
            results.len(),
            signals.len()
        );
        (results, signals)
    }

    /// 把单个探测项的结局折叠进结果列表（失败遏制点）
    fn record(&self, results: &mut Vec<TestResult>, name: &str, outcome: Result<TestResult>) {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => {
                error!("探测项 {} 执行失败: {}", name, e);
                results.push(TestResult::failed(name, json!({}), e.to_string()));
            }
        }
    }

    async fn connectivity_result(&self, session: &ProbeSession) -> TestResult {
        logging::log_probe_start("connectivity");
        let url = session.current_url().await.unwrap_or_default();
        let title = session
            .page()
            .get_title()
            .await
            .ok()
            .flatten()
            .unwrap_or_default();
        TestResult::passed(
            "connectivity",
            json!({
                "url": url,
                "title": title,
                "viewport": session.viewport().label,
            }),
        )
    }
}

/// 初始导航失败时的汇总：恰好一条 critical 连通性问题，
/// 除连通性检查外没有任何探测结果。
pub(crate) fn connectivity_failure_summary(url: &str, error: &SessionError) -> QASummary {
    let result = TestResult::failed("connectivity", json!({"url": url}), error.to_string());
    let issue = IssueRecord {
        severity: Severity::Critical,
        category: "Connectivity".to_string(),
        issue: format!("无法访问目标应用: {}", url),
        recommendation: "确认目标应用已启动且地址可达".to_string(),
        details: Some(json!({"url": url, "error": error.to_string()})),
    };
    aggregator::build_summary(vec![result], vec![issue])
}

fn auth_placeholder_result() -> TestResult {
    TestResult::passed(
        "auth-flows",
        json!({
            "implemented": false,
            "note": "认证流程探测尚未实现，这里返回占位结果；需要时用自定义流程描述登录步骤",
        }),
    )
}

/// 应用主结构
///
/// 一次运行 = 一次套件探测：加载配置和自定义流程，跑完输出汇总。
pub struct App {
    config: Config,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config.target_url, &config.suite_mode);
        Ok(Self { config })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<QASummary> {
        let mode = match self.config.suite_mode.parse::<SuiteMode>() {
            Ok(mode) => mode,
            Err(e) => {
                warn!("{}，回退到 comprehensive", e);
                SuiteMode::Comprehensive
            }
        };

        // 加载自定义流程（可选输入）
        let flows = load_all_flows(&self.config.flows_folder).await?;
        if !flows.is_empty() {
            info!("✓ 加载了 {} 个自定义流程", flows.len());
        }

        let runner = SuiteRunner::new(self.config.clone());
        let summary = runner
            .run_suite(&self.config.target_url, mode, &flows, None)
            .await;

        logging::log_summary(&summary);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suite_mode_parsing() {
        assert_eq!("basic".parse::<SuiteMode>().ok(), Some(SuiteMode::Basic));
        assert_eq!(
            "Comprehensive".parse::<SuiteMode>().ok(),
            Some(SuiteMode::Comprehensive)
        );
        assert_eq!(
            " navigation ".parse::<SuiteMode>().ok(),
            Some(SuiteMode::Navigation)
        );
        assert!("does-not-exist".parse::<SuiteMode>().is_err());
        assert_eq!(SuiteMode::default(), SuiteMode::Comprehensive);
    }

    #[test]
    fn test_connectivity_failure_summary_shape() {
        let error = SessionError::NavigationTimeout {
            url: "http://localhost:3000".to_string(),
            timeout_ms: 20_000,
        };
        let summary = connectivity_failure_summary("http://localhost:3000", &error);

        // 恰好一条 critical 连通性问题，除连通性检查外没有别的结果
        assert_eq!(summary.total_tests, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.issues.len(), 1);
        assert_eq!(summary.issues[0].severity, Severity::Critical);
        assert_eq!(summary.issues[0].category, "Connectivity");
        assert_eq!(summary.test_results[0].name, "connectivity");
        assert_eq!(summary.passed + summary.failed, summary.total_tests);
    }

    #[test]
    fn test_auth_placeholder_is_documented() {
        let result = auth_placeholder_result();
        assert!(result.passed);
        assert_eq!(result.details["implemented"], false);
        assert!(result.details["note"].as_str().is_some_and(|n| !n.is_empty()));
    }
}
