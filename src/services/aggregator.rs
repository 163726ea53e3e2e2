//! 结果聚合器 - 业务能力层
//!
//! 把所有 TestResult 和分类后的 IssueRecord 合成一份 QASummary。
//! 建议生成是确定性的：全局横幅 → 按归类逐条 → 零问题确认。

use crate::models::report::{IssueRecord, QASummary, SeverityCounts, TestResult};
use crate::services::classifier::category_advice;

/// 构建终端聚合
pub fn build_summary(results: Vec<TestResult>, issues: Vec<IssueRecord>) -> QASummary {
    let total_tests = results.len();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = total_tests - passed;

    let mut severity_counts = SeverityCounts::default();
    // 首次出现顺序的归类计数
    let mut category_counts: Vec<(String, usize)> = Vec::new();
    for issue in &issues {
        severity_counts.bump(issue.severity);
        match category_counts
            .iter_mut()
            .find(|(category, _)| *category == issue.category)
        {
            Some((_, count)) => *count += 1,
            None => category_counts.push((issue.category.clone(), 1)),
        }
    }

    let recommendations = build_recommendations(&severity_counts, &category_counts);

    QASummary {
        total_tests,
        passed,
        failed,
        issues,
        severity_counts,
        recommendations,
        test_results: results,
    }
}

fn build_recommendations(
    severity_counts: &SeverityCounts,
    category_counts: &[(String, usize)],
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if severity_counts.critical > 0 {
        recommendations.push(format!(
            "发现 {} 个 critical 问题，建议修复后再发布",
            severity_counts.critical
        ));
    }
    if severity_counts.major > 0 {
        recommendations.push(format!(
            "发现 {} 个 major 问题，建议优先安排修复",
            severity_counts.major
        ));
    }
    if severity_counts.minor > 0 {
        recommendations.push(format!(
            "发现 {} 个 minor 问题，可在后续迭代中处理",
            severity_counts.minor
        ));
    }

    for (category, count) in category_counts {
        match category_advice(category) {
            Some(advice) => recommendations.push(format!(
                "重点关注 {}: {} 个问题（{}）",
                category, count, advice
            )),
            None => recommendations.push(format!("重点关注 {}: {} 个问题", category, count)),
        }
    }

    if severity_counts.total() == 0 {
        recommendations.push("未发现问题，各项检查均通过".to_string());
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::report::Severity;
    use serde_json::json;

    fn issue(severity: Severity, category: &str) -> IssueRecord {
        IssueRecord {
            severity,
            category: category.to_string(),
            issue: "测试问题".to_string(),
            recommendation: "测试建议".to_string(),
            details: None,
        }
    }

    #[test]
    fn test_counts_invariant() {
        let results = vec![
            TestResult::passed("a", json!({})),
            TestResult::failed("b", json!({}), "出错"),
            TestResult::passed("c", json!({})),
        ];
        let summary = build_summary(results, Vec::new());
        assert_eq!(summary.total_tests, 3);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.passed + summary.failed, summary.total_tests);
    }

    #[test]
    fn test_recommendation_order() {
        let issues = vec![
            issue(Severity::Minor, "Accessibility"),
            issue(Severity::Critical, "JavaScript"),
            issue(Severity::Major, "Navigation"),
            issue(Severity::Minor, "Accessibility"),
        ];
        let summary = build_summary(Vec::new(), issues);
        assert_eq!(summary.severity_counts.critical, 1);
        assert_eq!(summary.severity_counts.major, 1);
        assert_eq!(summary.severity_counts.minor, 2);

        // 横幅顺序：critical → major → minor，然后按首次出现的归类
        assert!(summary.recommendations[0].contains("critical"));
        assert!(summary.recommendations[1].contains("major"));
        assert!(summary.recommendations[2].contains("minor"));
        assert!(summary.recommendations[3].contains("Accessibility"));
        assert!(summary.recommendations[3].contains("2 个问题"));
        assert!(summary.recommendations[4].contains("JavaScript"));
        assert!(summary.recommendations[5].contains("Navigation"));
    }

    #[test]
    fn test_zero_issue_confirmation() {
        let summary = build_summary(vec![TestResult::passed("a", json!({}))], Vec::new());
        assert_eq!(summary.recommendations.len(), 1);
        assert!(summary.recommendations[0].contains("未发现问题"));
    }

    #[test]
    fn test_issue_order_is_collection_order() {
        let issues = vec![
            issue(Severity::Minor, "SEO"),
            issue(Severity::Critical, "JavaScript"),
        ];
        let summary = build_summary(Vec::new(), issues);
        // 不按严重度重排
        assert_eq!(summary.issues[0].category, "SEO");
        assert_eq!(summary.issues[1].category, "JavaScript");
    }
}
