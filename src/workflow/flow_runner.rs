//! 流程执行器 - 流程层
//!
//! 核心职责：按顺序执行一个具名流程的全部步骤
//!
//! 失败策略：
//! 1. 单步失败只标记该步和所属流程，后续步骤继续执行（收集式折叠，
//!    不用异常展开做控制流），让后面的校验步骤仍能贡献诊断信息
//! 2. 例外：navigate 步骤失败意味着目标页面不可用，跳过剩余步骤
//! 3. 每个失败流程恰好产生一条 InteractionFailure 信号（与逐步记录无关）

use anyhow::Result;
use chromiumoxide::element::Element;
use serde_json::json;
use tokio::time::{sleep, timeout, Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, StepError};
use crate::infrastructure::session::ProbeSession;
use crate::models::flow::{Flow, FlowStep};
use crate::models::report::{StepOutcome, TestResult};
use crate::models::signal::{Signal, SignalKind};
use crate::utils::logging::truncate_text;
use crate::workflow::flow_ctx::FlowCtx;

/// 元素轮询间隔
const POLL_INTERVAL_MS: u64 = 100;

/// 单步执行的中间结果
struct StepEval {
    passed: bool,
    expected: Option<String>,
    actual: Option<String>,
    evidence: Option<String>,
}

impl StepEval {
    fn ok() -> Self {
        Self {
            passed: true,
            expected: None,
            actual: None,
            evidence: None,
        }
    }
}

/// 流程执行器
///
/// - 不持有任何资源（page），只借用会话能力
/// - 不决定跑哪些流程（编排层的事）
pub struct FlowRunner<'a> {
    session: &'a ProbeSession,
    config: &'a Config,
}

impl<'a> FlowRunner<'a> {
    pub fn new(session: &'a ProbeSession, config: &'a Config) -> Self {
        Self { session, config }
    }

    /// 执行一个流程，返回该流程的 TestResult
    ///
    /// 永不返回错误：步骤级故障都折叠进结果里。
    pub async fn run(&self, flow: &Flow, flow_index: usize) -> TestResult {
        let ctx = FlowCtx::new(flow.name.clone(), flow_index, flow.steps.len());
        info!("▶️ {} 开始执行", ctx);

        let mut outcomes: Vec<StepOutcome> = Vec::new();
        let mut evidence: Vec<String> = Vec::new();
        let mut skipped = 0usize;

        for (index, step) in flow.steps.iter().enumerate() {
            let outcome = self.run_step(index, step, &ctx, &mut evidence).await;
            let navigate_failed = !outcome.passed && matches!(step, FlowStep::Navigate { .. });
            outcomes.push(outcome);

            if navigate_failed {
                // 目标页面不可用，剩余步骤没有执行意义
                skipped = flow.steps.len() - index - 1;
                warn!("{} 导航步骤失败，跳过剩余 {} 步", ctx, skipped);
                break;
            }
        }

        let result = summarize_flow(&flow.name, outcomes, skipped, evidence);

        if result.passed {
            info!("{} ✅ 全部步骤通过", ctx);
        } else {
            // 流程级信号：每个失败流程恰好一条
            if let Some(failing) = result.steps.iter().find(|s| !s.passed) {
                self.session.hub().push(
                    Signal::new(
                        SignalKind::InteractionFailure,
                        format!(
                            "流程 \"{}\" 失败于第 {} 步 ({})",
                            flow.name,
                            failing.step_index + 1,
                            failing.action
                        ),
                    )
                    .with_detail(json!({
                        "flow": flow.name,
                        "failed_step": failing.step_index,
                        "action": failing.action,
                        "error": failing.error,
                    })),
                );
            }
            warn!("{} ❌ 流程未通过", ctx);
        }

        result
    }

    async fn run_step(
        &self,
        index: usize,
        step: &FlowStep,
        ctx: &FlowCtx,
        evidence: &mut Vec<String>,
    ) -> StepOutcome {
        let action = step.action_name();
        info!("{} 第 {}/{} 步: {}", ctx, index + 1, ctx.total_steps, action);

        let step_timeout = self.step_timeout(step);
        // 外层超时比内层动作预算略宽，让内层先产出更具体的错误
        let evaluation = timeout(
            Duration::from_millis(step_timeout + 500),
            self.execute_step(step, ctx),
        )
        .await;

        let (passed, expected, actual, error) = match evaluation {
            Err(_) => {
                let e = StepError::Timeout {
                    action: action.to_string(),
                    timeout_ms: step_timeout,
                };
                (false, None, None, Some(e.to_string()))
            }
            Ok(Err(e)) => (false, None, None, Some(e.to_string())),
            Ok(Ok(eval)) => {
                if let Some(path) = &eval.evidence {
                    evidence.push(path.clone());
                }
                (eval.passed, eval.expected, eval.actual, None)
            }
        };

        if passed {
            debug!("{} ✓ 第 {} 步通过", ctx, index + 1);
        } else {
            warn!(
                "{} ✗ 第 {} 步未通过: {}",
                ctx,
                index + 1,
                error.as_deref().unwrap_or("校验不匹配")
            );
        }

        StepOutcome {
            step_index: index,
            action: action.to_string(),
            passed,
            expected_value: expected,
            actual_value: actual,
            error,
        }
    }

    fn step_timeout(&self, step: &FlowStep) -> u64 {
        match step {
            // 固定等待允许超过常规步骤预算
            FlowStep::Wait { ms } => ms + 1_000,
            _ => self.config.step_timeout_ms,
        }
    }

    async fn execute_step(&self, step: &FlowStep, ctx: &FlowCtx) -> Result<StepEval> {
        match step {
            FlowStep::Navigate { url } => {
                self.session
                    .navigate(url, self.config.step_timeout_ms)
                    .await?;
                Ok(StepEval::ok())
            }
            FlowStep::Click { selector } => {
                let element = self.require_element(selector).await?;
                element
                    .click()
                    .await
                    .map_err(|e| AppError::action_failed("click", e.to_string()))?;
                Ok(StepEval::ok())
            }
            FlowStep::Type { selector, text } => {
                let element = self.require_element(selector).await?;
                // 先聚焦再输入
                element
                    .click()
                    .await
                    .map_err(|e| AppError::action_failed("type", e.to_string()))?;
                element
                    .type_str(text)
                    .await
                    .map_err(|e| AppError::action_failed("type", e.to_string()))?;
                Ok(StepEval::ok())
            }
            FlowStep::Wait { ms } => {
                sleep(Duration::from_millis(*ms)).await;
                Ok(StepEval::ok())
            }
            FlowStep::Screenshot { name } => {
                let label = name.clone().unwrap_or_else(|| ctx.flow_name.clone());
                let path = self.session.capture_evidence(&label).await?;
                Ok(StepEval {
                    passed: true,
                    expected: None,
                    actual: None,
                    evidence: Some(path),
                })
            }
            FlowStep::Verify { selector, expected } => {
                // 元素缺失不是错误：记为未通过，actual 留空
                let budget = self.config.step_timeout_ms.saturating_sub(1_000).max(500);
                match self.wait_for_element(selector, budget).await {
                    None => Ok(StepEval {
                        passed: false,
                        expected: Some(expected.clone()),
                        actual: None,
                        evidence: None,
                    }),
                    Some(element) => {
                        let text = element
                            .inner_text()
                            .await
                            .ok()
                            .flatten()
                            .unwrap_or_default();
                        let passed = text.contains(expected.as_str());
                        Ok(StepEval {
                            passed,
                            expected: Some(expected.clone()),
                            actual: Some(truncate_text(&text, 200)),
                            evidence: None,
                        })
                    }
                }
            }
        }
    }

    async fn require_element(&self, selector: &str) -> Result<Element> {
        self.wait_for_element(selector, self.config.step_timeout_ms)
            .await
            .ok_or_else(|| {
                AppError::locator_timeout(selector, self.config.step_timeout_ms).into()
            })
    }

    /// 轮询等待元素出现
    async fn wait_for_element(&self, selector: &str, timeout_ms: u64) -> Option<Element> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if let Ok(element) = self.session.page().find_element(selector).await {
                return Some(element);
            }
            if Instant::now() >= deadline {
                return None;
            }
            sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
        }
    }
}

/// 把逐步结局折叠成流程级 TestResult（纯函数，便于单测）
fn summarize_flow(
    name: &str,
    outcomes: Vec<StepOutcome>,
    skipped: usize,
    evidence: Vec<String>,
) -> TestResult {
    let failed = outcomes.iter().filter(|o| !o.passed).count();
    let passed = failed == 0 && skipped == 0;
    let error = outcomes
        .iter()
        .find(|o| !o.passed)
        .map(|o| {
            o.error.clone().unwrap_or_else(|| {
                format!("第 {} 步 ({}) 校验未通过", o.step_index + 1, o.action)
            })
        });

    TestResult {
        name: name.to_string(),
        passed,
        details: json!({
            "steps_total": outcomes.len() + skipped,
            "steps_executed": outcomes.len(),
            "steps_failed": failed,
            "steps_skipped": skipped,
            "evidence": evidence,
        }),
        error,
        steps: outcomes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(index: usize, action: &str, passed: bool) -> StepOutcome {
        StepOutcome {
            step_index: index,
            action: action.to_string(),
            passed,
            expected_value: None,
            actual_value: None,
            error: if passed {
                None
            } else {
                Some("等待元素 #missing 出现超时 (10000 ms)".to_string())
            },
        }
    }

    #[test]
    fn test_summarize_all_passed() {
        let result = summarize_flow(
            "登录",
            vec![outcome(0, "navigate", true), outcome(1, "verify", true)],
            0,
            Vec::new(),
        );
        assert!(result.passed);
        assert!(result.error.is_none());
        assert_eq!(result.steps.len(), 2);
    }

    #[test]
    fn test_summarize_mid_step_failure_keeps_later_steps() {
        // [navigate 通过, click 超时, verify 通过] → 三步都有记录，流程未通过
        let result = summarize_flow(
            "下单",
            vec![
                outcome(0, "navigate", true),
                outcome(1, "click", false),
                outcome(2, "verify", true),
            ],
            0,
            Vec::new(),
        );
        assert!(!result.passed);
        assert_eq!(result.steps.len(), 3);
        assert!(result.steps[0].passed);
        assert!(!result.steps[1].passed);
        assert!(result.steps[2].passed);
        assert!(result
            .error
            .as_deref()
            .is_some_and(|e| e.contains("#missing")));
        assert_eq!(result.details["steps_failed"], 1);
    }

    #[test]
    fn test_summarize_navigation_failure_skips_rest() {
        let result = summarize_flow("跳转", vec![outcome(0, "navigate", false)], 2, Vec::new());
        assert!(!result.passed);
        assert_eq!(result.details["steps_total"], 3);
        assert_eq!(result.details["steps_executed"], 1);
        assert_eq!(result.details["steps_skipped"], 2);
    }

    #[test]
    fn test_summarize_verify_failure_without_error_text() {
        let mut verify = outcome(1, "verify", false);
        verify.error = None;
        verify.expected_value = Some("欢迎".to_string());
        verify.actual_value = None;
        let result = summarize_flow("校验", vec![outcome(0, "navigate", true), verify], 0, Vec::new());
        assert!(!result.passed);
        assert!(result.error.as_deref().is_some_and(|e| e.contains("第 2 步")));
    }
}
