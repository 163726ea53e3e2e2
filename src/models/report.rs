//! 结果模型
//!
//! TestResult 记录单项检查 / 流程的结局，IssueRecord 是分类后的信号，
//! QASummary 是一次探测的终端聚合，构建完成后只读。

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::models::signal::Signal;

/// 问题严重度（统一词表，不混用 high/medium/low）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Major => "major",
            Severity::Minor => "minor",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 分类后的问题记录
///
/// 每条记录都可追溯到具体的信号产出步骤，不允许凭空推测问题。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRecord {
    pub severity: Severity,
    /// 问题归类（如 "JavaScript" / "Accessibility" / "Navigation"）
    pub category: String,
    /// 简短描述
    pub issue: String,
    /// 可执行的修复建议
    pub recommendation: String,
    /// 透传的结构化数据（聚合类记录携带 count / locators）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

/// 单个交互步骤的结局
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step_index: usize,
    pub action: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 单项检查 / 流程的结局
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub details: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 流程类检查的逐步结局（普通检查为空）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepOutcome>,
}

impl TestResult {
    pub fn passed(name: impl Into<String>, details: JsonValue) -> Self {
        Self {
            name: name.into(),
            passed: true,
            details,
            error: None,
            steps: Vec::new(),
        }
    }

    pub fn failed(name: impl Into<String>, details: JsonValue, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            details,
            error: Some(error.into()),
            steps: Vec::new(),
        }
    }
}

/// 严重度计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub major: usize,
    pub minor: usize,
}

impl SeverityCounts {
    pub fn bump(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::Major => self.major += 1,
            Severity::Minor => self.minor += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.major + self.minor
    }
}

/// 一次探测的终端聚合
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QASummary {
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    /// 采集顺序，不按严重度重排
    pub issues: Vec<IssueRecord>,
    pub severity_counts: SeverityCounts,
    /// 去重后的下一步建议（顺序固定）
    pub recommendations: Vec<String>,
    /// 逐项检查结局
    pub test_results: Vec<TestResult>,
}

/// 被动监听操作的返回
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorReport {
    pub duration_ms: u64,
    pub summary: QASummary,
    /// 原始信号（未分类形态，供调用方自行加工）
    pub signals: Vec<Signal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_severity_counts() {
        let mut counts = SeverityCounts::default();
        counts.bump(Severity::Critical);
        counts.bump(Severity::Major);
        counts.bump(Severity::Major);
        counts.bump(Severity::Minor);
        assert_eq!(counts.critical, 1);
        assert_eq!(counts.major, 2);
        assert_eq!(counts.minor, 1);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn test_test_result_constructors() {
        let ok = TestResult::passed("connectivity", json!({"url": "http://localhost:3000"}));
        assert!(ok.passed);
        assert!(ok.error.is_none());
        assert!(ok.steps.is_empty());

        let bad = TestResult::failed("forms", json!({}), "执行脚本失败");
        assert!(!bad.passed);
        assert_eq!(bad.error.as_deref(), Some("执行脚本失败"));
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        let text = serde_json::to_string(&Severity::Critical).expect("序列化不应失败");
        assert_eq!(text, "\"critical\"");
    }
}
