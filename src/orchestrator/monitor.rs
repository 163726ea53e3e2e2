//! 被动监听操作 - 编排层
//!
//! 在有界时间窗内只挂采集器、不跑主动探测；可选地穿插一个
//! 交互流程（复用流程执行器）。过滤开关在捕获时生效，
//! 被关掉的类别根本不会产生信号，而不是事后剔除。

use serde_json::json;
use tokio::time::{sleep, Duration, Instant};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::infrastructure::session::ProbeSession;
use crate::models::flow::Flow;
use crate::models::report::{MonitorReport, TestResult};
use crate::services::aggregator;
use crate::services::classifier;
use crate::services::collectors::{attach_collectors, CollectorFilter};
use crate::services::dom_probes::DomProbes;
use crate::workflow::flow_runner::FlowRunner;

/// 监听选项
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// 监听窗口时长
    pub duration_ms: u64,
    /// 采集类别开关
    pub filter: CollectorFilter,
    /// 窗口内穿插执行的交互流程
    pub interaction: Option<Flow>,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            duration_ms: 10_000,
            filter: CollectorFilter::default(),
            interaction: None,
        }
    }
}

/// 被动监听一段时间，返回分类汇总和原始信号
///
/// 与套件探测一致：会话打不开也返回一份带连通性问题的报告。
pub async fn monitor_signals(
    config: &Config,
    url: &str,
    options: MonitorOptions,
) -> MonitorReport {
    info!("🎧 开始监听 {} ({} ms)", url, options.duration_ms);

    let viewport = config.default_viewport.clone();
    let mut session = match ProbeSession::open(config, url, viewport).await {
        Ok(session) => session,
        Err(e) => {
            error!("会话打开失败: {}", e);
            let summary = super::suite_runner::connectivity_failure_summary(url, &e);
            return MonitorReport {
                duration_ms: options.duration_ms,
                summary,
                signals: Vec::new(),
            };
        }
    };

    let mut results: Vec<TestResult> = Vec::new();
    let guard = match attach_collectors(session.page(), &session.hub(), options.filter).await {
        Ok(guard) => Some(guard),
        Err(e) => {
            warn!("采集器挂载失败: {}", e);
            results.push(TestResult::failed("collectors", json!({}), e.to_string()));
            None
        }
    };

    let started = Instant::now();

    // 可选的交互穿插
    if let Some(flow) = &options.interaction {
        let runner = FlowRunner::new(&session, config);
        results.push(runner.run(flow, 1).await);
    }

    // 睡满剩余窗口
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if elapsed_ms < options.duration_ms {
        sleep(Duration::from_millis(options.duration_ms - elapsed_ms)).await;
    }

    // 窗口结束时采一次性能样本
    if options.filter.performance {
        let probes = DomProbes::new(&session, config);
        match probes.assess_performance().await {
            Ok(result) => results.push(result),
            Err(e) => {
                warn!("性能采样失败: {}", e);
                results.push(TestResult::failed("performance", json!({}), e.to_string()));
            }
        }
    }

    drop(guard);
    let signals = session.hub().snapshot();
    session.close().await;

    info!("🎧 监听结束: {} 条信号", signals.len());

    let issues = classifier::classify_all(&signals);
    let summary = aggregator::build_summary(results, issues);

    MonitorReport {
        duration_ms: options.duration_ms,
        summary,
        signals,
    }
}
