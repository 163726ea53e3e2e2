//! 原始信号模型
//!
//! Signal 是一次未经判定的原子观察，由采集器或探测项产出，
//! 创建后不可变；严重度判定完全交给下游分类器。

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// 信号种类（封闭枚举，分类器对其做全覆盖匹配）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalKind {
    /// 未捕获异常 / console.error 输出
    ScriptError,
    /// 请求传输失败（DNS / 连接 / 中断）
    NetworkFailure,
    /// 传输成功但状态码 >= 400
    HttpErrorStatus,
    /// 控制台安全关键词命中
    SecurityWarning,
    /// 可访问性违规
    AccessibilityViolation,
    /// 布局违规
    LayoutViolation,
    /// 交互流程失败
    InteractionFailure,
    /// 性能指标超预算
    PerformanceMetric,
}

/// 一次原子观察
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub message: String,
    /// 定位信息（选择器 / URL / 视口名）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
    /// 结构化附加数据（分类器的子条件来源）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<JsonValue>,
    pub timestamp: DateTime<Local>,
}

impl Signal {
    pub fn new(kind: SignalKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            locator: None,
            detail: None,
            timestamp: Local::now(),
        }
    }

    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.locator = Some(locator.into());
        self
    }

    pub fn with_detail(mut self, detail: JsonValue) -> Self {
        self.detail = Some(detail);
        self
    }

    /// 读取 detail 中的检查项标记
    pub fn check(&self) -> Option<&str> {
        self.detail.as_ref()?.get("check")?.as_str()
    }

    /// 读取 detail 中的 HTTP 状态码
    pub fn status(&self) -> Option<u64> {
        self.detail.as_ref()?.get("status")?.as_u64()
    }

    /// 读取 detail 中的来源探测标记
    pub fn origin(&self) -> Option<&str> {
        self.detail.as_ref()?.get("origin")?.as_str()
    }

    /// 读取 detail 中的性能指标名
    pub fn metric(&self) -> Option<&str> {
        self.detail.as_ref()?.get("metric")?.as_str()
    }
}

/// 会话内共享的信号存储
///
/// 职责：
/// - 只追加，不修改、不重排
/// - 允许多个采集器任务并发写入（单个采集器内保持事件顺序）
/// - 随会话创建，探测结束前快照拷出
#[derive(Clone, Default)]
pub struct SignalHub {
    inner: Arc<Mutex<Vec<Signal>>>,
}

impl SignalHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条信号
    pub fn push(&self, signal: Signal) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(signal);
    }

    /// 追加多条信号
    pub fn extend(&self, signals: impl IntoIterator<Item = Signal>) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(signals);
    }

    /// 拷出当前全部信号（采集顺序）
    pub fn snapshot(&self) -> Vec<Signal> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_signal_detail_accessors() {
        let signal = Signal::new(SignalKind::HttpErrorStatus, "GET /missing 返回 404")
            .with_locator("http://localhost:3000/missing")
            .with_detail(json!({"status": 404, "origin": "navigation", "check": "broken-link"}));
        assert_eq!(signal.status(), Some(404));
        assert_eq!(signal.origin(), Some("navigation"));
        assert_eq!(signal.check(), Some("broken-link"));
        assert_eq!(signal.metric(), None);
    }

    #[test]
    fn test_hub_preserves_insertion_order() {
        let hub = SignalHub::new();
        hub.push(Signal::new(SignalKind::ScriptError, "a"));
        hub.extend(vec![
            Signal::new(SignalKind::NetworkFailure, "b"),
            Signal::new(SignalKind::SecurityWarning, "c"),
        ]);
        let snapshot = hub.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].message, "a");
        assert_eq!(snapshot[2].message, "c");
        // 快照是拷贝，继续追加不影响已拷出的数据
        hub.push(Signal::new(SignalKind::ScriptError, "d"));
        assert_eq!(snapshot.len(), 3);
        assert_eq!(hub.len(), 4);
    }

    #[test]
    fn test_concurrent_append() {
        let hub = SignalHub::new();
        let mut handles = Vec::new();
        for i in 0..8 {
            let hub_clone = hub.clone();
            handles.push(std::thread::spawn(move || {
                for j in 0..100 {
                    hub_clone.push(Signal::new(
                        SignalKind::ScriptError,
                        format!("worker-{} event-{}", i, j),
                    ));
                }
            }));
        }
        for handle in handles {
            handle.join().expect("写入线程不应 panic");
        }
        assert_eq!(hub.len(), 800);
    }
}
