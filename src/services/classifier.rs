//! 问题分类器 - 业务能力层
//!
//! Signal → IssueRecord 的纯映射：固定规则表按信号种类全覆盖匹配，
//! 子条件读取 detail 字段。分类永不失败，无法细分的信号落入
//! minor / "General" 兜底分支。

use std::collections::HashMap;

use phf::phf_map;
use serde_json::json;

use crate::models::report::{IssueRecord, Severity};
use crate::models::signal::{Signal, SignalKind};

/// 分类归集时保留的定位样本数量
const LOCATOR_SAMPLE_CAP: usize = 10;

/// 各归类的修复建议
static CATEGORY_ADVICE: phf::Map<&'static str, &'static str> = phf_map! {
    "JavaScript" => "打开浏览器控制台定位堆栈，优先修复未捕获异常",
    "Server" => "检查服务端日志，5xx 意味着后端逻辑或依赖出错",
    "Navigation" => "修复或移除失效链接，确认路由与后端一致",
    "Forms" => "核对表单提交地址与后端校验逻辑",
    "Network" => "确认接口地址可达，关注 DNS / 端口 / 证书问题",
    "Security" => "排查混合内容与跨域配置，避免带安全隐患上线",
    "Accessibility" => "为输入控件补标签、为图片补 alt，保证辅助技术可用",
    "SEO" => "补全页面标题等基础元信息",
    "Responsive Design" => "检查溢出容器的宽度约束，补充断点样式",
    "Content" => "修复图片资源路径或移除失效资源",
    "User Flows" => "按失败步骤回放流程，修复交互断点",
    "Performance" => "压缩资源、按需加载，控制首屏开销",
    "Connectivity" => "确认目标应用已启动且地址可达",
    "General" => "结合信号详情逐条排查",
};

/// 查询归类建议
pub fn category_advice(category: &str) -> Option<&'static str> {
    CATEGORY_ADVICE.get(category).copied()
}

/// 单条信号分类（纯函数，1:1）
pub fn classify(signal: &Signal) -> IssueRecord {
    let (severity, category, issue) = match signal.kind {
        SignalKind::ScriptError => (
            Severity::Critical,
            "JavaScript",
            format!("脚本错误: {}", signal.message),
        ),
        SignalKind::NetworkFailure => (
            Severity::Major,
            if signal.check() == Some("broken-link") {
                "Navigation"
            } else {
                "Network"
            },
            signal.message.clone(),
        ),
        SignalKind::HttpErrorStatus => {
            let status = signal.status().unwrap_or(0);
            if status >= 500 {
                // 状态码冲突时就高不就低：表单端点上的 500 也按 Server 记
                (
                    Severity::Critical,
                    "Server",
                    format!("服务端错误 (HTTP {})", status),
                )
            } else {
                let category = match signal.origin() {
                    Some("forms") => "Forms",
                    Some("navigation") => "Navigation",
                    _ => "Network",
                };
                (
                    Severity::Major,
                    category,
                    format!("请求返回 HTTP {}", status),
                )
            }
        }
        SignalKind::SecurityWarning => (
            Severity::Major,
            "Security",
            format!("安全警告: {}", signal.message),
        ),
        SignalKind::AccessibilityViolation => match signal.check() {
            // 交互控件的问题比纯内容问题严重
            Some("form-label") | Some("form-no-submit") => {
                (Severity::Major, "Accessibility", signal.message.clone())
            }
            Some("alt-text") | Some("text-size") => {
                (Severity::Minor, "Accessibility", signal.message.clone())
            }
            Some("missing-title") => (Severity::Minor, "SEO", signal.message.clone()),
            _ => (Severity::Minor, "General", signal.message.clone()),
        },
        SignalKind::LayoutViolation => match signal.check() {
            Some("broken-image") => (Severity::Major, "Content", signal.message.clone()),
            Some("horizontal-overflow") | Some("zero-area") => {
                (Severity::Major, "Responsive Design", signal.message.clone())
            }
            _ => (Severity::Minor, "General", signal.message.clone()),
        },
        SignalKind::InteractionFailure => (Severity::Major, "User Flows", signal.message.clone()),
        SignalKind::PerformanceMetric => match signal.metric() {
            Some("load-time") => (Severity::Major, "Performance", signal.message.clone()),
            Some("heap") => (Severity::Minor, "Performance", signal.message.clone()),
            _ => (Severity::Minor, "Performance", signal.message.clone()),
        },
    };

    let recommendation = category_advice(category)
        .unwrap_or("结合信号详情逐条排查")
        .to_string();

    let mut details = signal.detail.clone().unwrap_or_else(|| json!({}));
    if let (Some(locator), Some(object)) = (&signal.locator, details.as_object_mut()) {
        object
            .entry("locator")
            .or_insert_with(|| json!(locator.clone()));
    }

    IssueRecord {
        severity,
        category: category.to_string(),
        issue,
        recommendation,
        details: Some(details),
    }
}

/// 批量分类
///
/// 保持采集顺序。逐元素的批量检查（同一 kind + 同一 check 标记）
/// 归并为一条记录，count 与定位样本写入 details，首次出现的位置
/// 决定记录顺序；其余信号保持 1:1。
pub fn classify_all(signals: &[Signal]) -> Vec<IssueRecord> {
    let mut records: Vec<IssueRecord> = Vec::new();
    let mut grouped: HashMap<(SignalKind, String), usize> = HashMap::new();

    for signal in signals {
        match group_key(signal) {
            None => records.push(classify(signal)),
            Some(key) => {
                if let Some(&index) = grouped.get(&key) {
                    bump_grouped(&mut records[index], signal);
                } else {
                    let mut record = classify(signal);
                    record.details = Some(json!({
                        "check": key.1,
                        "count": 1,
                        "locators": locator_sample(signal),
                    }));
                    grouped.insert(key, records.len());
                    records.push(record);
                }
            }
        }
    }

    // 聚合条目补上数量后缀
    for &index in grouped.values() {
        let record = &mut records[index];
        let count = record
            .details
            .as_ref()
            .and_then(|d| d.get("count"))
            .and_then(|c| c.as_u64())
            .unwrap_or(1);
        if count > 1 {
            record.issue = format!("{} (共 {} 处)", record.issue, count);
        }
    }

    records
}

/// 可归并的信号类别
fn group_key(signal: &Signal) -> Option<(SignalKind, String)> {
    let check = signal.check()?;
    let batchable = matches!(
        check,
        "broken-link"
            | "broken-image"
            | "form-label"
            | "form-no-submit"
            | "alt-text"
            | "text-size"
            | "horizontal-overflow"
            | "zero-area"
    );
    if batchable {
        Some((signal.kind, check.to_string()))
    } else {
        None
    }
}

fn bump_grouped(record: &mut IssueRecord, signal: &Signal) {
    let Some(details) = record.details.as_mut().and_then(|d| d.as_object_mut()) else {
        return;
    };
    let count = details
        .get("count")
        .and_then(|c| c.as_u64())
        .unwrap_or(1);
    details.insert("count".to_string(), json!(count + 1));
    if let Some(locators) = details.get_mut("locators").and_then(|l| l.as_array_mut()) {
        if locators.len() < LOCATOR_SAMPLE_CAP {
            if let Some(locator) = &signal.locator {
                locators.push(json!(locator));
            }
        }
    }
}

fn locator_sample(signal: &Signal) -> Vec<String> {
    signal.locator.iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(kind: SignalKind, message: &str) -> Signal {
        Signal::new(kind, message)
    }

    #[test]
    fn test_script_error_is_critical_javascript() {
        let record = classify(&signal(SignalKind::ScriptError, "TypeError: x is undefined"));
        assert_eq!(record.severity, Severity::Critical);
        assert_eq!(record.category, "JavaScript");
        assert!(!record.recommendation.is_empty());
    }

    #[test]
    fn test_server_error_wins_over_forms_origin() {
        // 表单端点上的 500 按更高严重度归入 Server
        let record = classify(
            &signal(SignalKind::HttpErrorStatus, "HTTP 500")
                .with_detail(json!({"status": 500, "origin": "forms"})),
        );
        assert_eq!(record.severity, Severity::Critical);
        assert_eq!(record.category, "Server");
    }

    #[test]
    fn test_client_error_category_follows_origin() {
        let nav = classify(
            &signal(SignalKind::HttpErrorStatus, "HTTP 404")
                .with_detail(json!({"status": 404, "origin": "navigation"})),
        );
        assert_eq!(nav.severity, Severity::Major);
        assert_eq!(nav.category, "Navigation");

        let forms = classify(
            &signal(SignalKind::HttpErrorStatus, "HTTP 422")
                .with_detail(json!({"status": 422, "origin": "forms"})),
        );
        assert_eq!(forms.category, "Forms");

        let network = classify(
            &signal(SignalKind::HttpErrorStatus, "HTTP 403")
                .with_detail(json!({"status": 403, "origin": "network"})),
        );
        assert_eq!(network.category, "Network");
    }

    #[test]
    fn test_accessibility_severity_split() {
        let label = classify(
            &signal(SignalKind::AccessibilityViolation, "输入控件缺少标签")
                .with_detail(json!({"check": "form-label"})),
        );
        assert_eq!(label.severity, Severity::Major);
        assert_eq!(label.category, "Accessibility");

        let alt = classify(
            &signal(SignalKind::AccessibilityViolation, "图片缺少 alt 属性")
                .with_detail(json!({"check": "alt-text"})),
        );
        assert_eq!(alt.severity, Severity::Minor);
        assert_eq!(alt.category, "Accessibility");

        let title = classify(
            &signal(SignalKind::AccessibilityViolation, "页面缺少标题")
                .with_detail(json!({"check": "missing-title"})),
        );
        assert_eq!(title.severity, Severity::Minor);
        assert_eq!(title.category, "SEO");
    }

    #[test]
    fn test_unknown_check_defaults_to_minor_general() {
        let record = classify(
            &signal(SignalKind::AccessibilityViolation, "未知检查项")
                .with_detail(json!({"check": "something-new"})),
        );
        assert_eq!(record.severity, Severity::Minor);
        assert_eq!(record.category, "General");
    }

    #[test]
    fn test_performance_metrics() {
        let load = classify(
            &signal(SignalKind::PerformanceMetric, "加载超时")
                .with_detail(json!({"metric": "load-time", "value_ms": 4200})),
        );
        assert_eq!(load.severity, Severity::Major);
        assert_eq!(load.category, "Performance");

        let heap = classify(
            &signal(SignalKind::PerformanceMetric, "堆超预算")
                .with_detail(json!({"metric": "heap"})),
        );
        assert_eq!(heap.severity, Severity::Minor);
    }

    #[test]
    fn test_classify_all_groups_broken_links() {
        // 3 条站内链接，2 条正常（不产生信号），1 条 404
        let signals = vec![signal(SignalKind::HttpErrorStatus, "站内链接返回 HTTP 404")
            .with_locator("http://localhost:3000/missing")
            .with_detail(json!({"status": 404, "origin": "navigation", "check": "broken-link"}))];
        let records = classify_all(&signals);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, "Navigation");
        let count = records[0]
            .details
            .as_ref()
            .and_then(|d| d.get("count"))
            .and_then(|c| c.as_u64());
        assert_eq!(count, Some(1));
    }

    #[test]
    fn test_classify_all_aggregates_per_element_signals() {
        // 2 张缺 alt 的图片 + 1 个缺标签的输入控件 → 两条记录
        let signals = vec![
            signal(SignalKind::AccessibilityViolation, "图片缺少 alt 属性")
                .with_locator("/a.png")
                .with_detail(json!({"check": "alt-text"})),
            signal(SignalKind::AccessibilityViolation, "图片缺少 alt 属性")
                .with_locator("/b.png")
                .with_detail(json!({"check": "alt-text"})),
            signal(SignalKind::AccessibilityViolation, "输入控件缺少标签或可访问名称")
                .with_locator("input[name=\"email\"]")
                .with_detail(json!({"check": "form-label"})),
        ];
        let records = classify_all(&signals);
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].severity, Severity::Minor);
        assert!(records[0].issue.contains("共 2 处"));
        let locators = records[0]
            .details
            .as_ref()
            .and_then(|d| d.get("locators"))
            .and_then(|l| l.as_array())
            .map(|l| l.len());
        assert_eq!(locators, Some(2));

        assert_eq!(records[1].severity, Severity::Major);
        assert_eq!(records[1].category, "Accessibility");
    }

    #[test]
    fn test_classify_all_keeps_collection_order() {
        let signals = vec![
            signal(SignalKind::PerformanceMetric, "慢")
                .with_detail(json!({"metric": "load-time"})),
            signal(SignalKind::ScriptError, "boom"),
        ];
        let records = classify_all(&signals);
        assert_eq!(records[0].category, "Performance");
        assert_eq!(records[1].category, "JavaScript");
    }
}
