//! 信号采集器 - 业务能力层
//!
//! 被动监听浏览器事件流，把原始事件转成 Signal 写入共享存储。
//! 只负责捕获，不做任何严重度判定。
//!
//! 采集器实例随会话创建、随守卫销毁而解除，不使用进程级单例，
//! 并发的两次探测各自持有独立的监听任务。

use std::collections::HashMap;

use anyhow::Result;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, EventLoadingFailed, EventRequestWillBeSent,
    EventResponseReceived,
};
use chromiumoxide::cdp::js_protocol::runtime::{
    ConsoleApiCalledType, EnableParams as RuntimeEnableParams, EventConsoleApiCalled,
    EventExceptionThrown, RemoteObject,
};
use chromiumoxide::Page;
use futures::StreamExt;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::models::signal::{Signal, SignalHub, SignalKind};
use crate::utils::logging::truncate_text;

/// 控制台安全关键词
const SECURITY_PATTERN: &str = r"(?i)mixed[\s_-]?content|insecure|cors|csp|xss";

/// 信号消息的最大长度
const MESSAGE_MAX_LEN: usize = 300;

/// 采集类别开关（捕获时生效，而不是事后过滤）
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CollectorFilter {
    /// 未捕获异常与 console.error
    pub errors: bool,
    /// console.warn 文本是否进入安全匹配
    pub warnings: bool,
    /// 请求失败与错误状态码
    pub network: bool,
    /// 性能采样（由调用方在窗口结束时执行）
    pub performance: bool,
    /// 控制台安全关键词匹配
    pub security: bool,
}

impl Default for CollectorFilter {
    fn default() -> Self {
        Self {
            errors: true,
            warnings: true,
            network: true,
            performance: true,
            security: true,
        }
    }
}

/// 采集器守卫
///
/// 持有所有监听任务的句柄，随会话结束 drop 时中止任务，
/// 保证监听不跨会话存活。
pub struct CollectorGuard {
    handles: Vec<JoinHandle<()>>,
}

impl Drop for CollectorGuard {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
        debug!("采集器已解除 ({} 个监听任务)", self.handles.len());
    }
}

/// 给页面挂上事件采集器
///
/// 每类事件流一个后台任务；单个流内信号顺序即事件顺序，
/// 跨流之间不保证相对顺序（下游也不依赖）。
pub async fn attach_collectors(
    page: &Page,
    hub: &SignalHub,
    filter: CollectorFilter,
) -> Result<CollectorGuard> {
    // 尽力开启相关 CDP 域；失败不阻断会话
    let _ = page.execute(RuntimeEnableParams::default()).await;
    let _ = page.execute(NetworkEnableParams::default()).await;

    let mut handles = Vec::new();

    // ========== 脚本异常 ==========
    if filter.errors {
        let mut stream = page.event_listener::<EventExceptionThrown>().await?;
        let hub = hub.clone();
        handles.push(tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                let details = &event.exception_details;
                let message = details
                    .exception
                    .as_ref()
                    .and_then(|e| e.description.clone())
                    .unwrap_or_else(|| details.text.clone());
                let mut signal = Signal::new(
                    SignalKind::ScriptError,
                    truncate_text(&message, MESSAGE_MAX_LEN),
                )
                .with_detail(json!({
                    "source": "exception",
                    "line": details.line_number,
                    "column": details.column_number,
                }));
                if let Some(url) = &details.url {
                    signal = signal.with_locator(url.clone());
                }
                hub.push(signal);
            }
        }));
    }

    // ========== 控制台输出（错误级 + 安全匹配） ==========
    if filter.errors || filter.security {
        let matcher = Regex::new(SECURITY_PATTERN)?;
        let mut stream = page.event_listener::<EventConsoleApiCalled>().await?;
        let hub = hub.clone();
        handles.push(tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                let text = console_text(&event.args);
                if text.is_empty() {
                    continue;
                }
                let is_error = matches!(event.r#type, ConsoleApiCalledType::Error);
                let is_warning = matches!(event.r#type, ConsoleApiCalledType::Warning);

                // 同一条输出可能同时产生脚本错误信号和安全警告信号：
                // 两类信号各有消费方，不做去重（重复本身有诊断价值）
                if filter.errors && is_error {
                    hub.push(
                        Signal::new(
                            SignalKind::ScriptError,
                            truncate_text(&text, MESSAGE_MAX_LEN),
                        )
                        .with_detail(json!({"source": "console"})),
                    );
                }
                if filter.security && (!is_warning || filter.warnings) {
                    if let Some(hit) = matcher.find(&text) {
                        hub.push(
                            Signal::new(
                                SignalKind::SecurityWarning,
                                truncate_text(&text, MESSAGE_MAX_LEN),
                            )
                            .with_detail(json!({
                                "keyword": hit.as_str().to_lowercase(),
                                "level": format!("{:?}", event.r#type).to_lowercase(),
                            })),
                        );
                    }
                }
            }
        }));
    }

    // ========== 网络（传输失败 + 错误状态码） ==========
    if filter.network {
        let mut request_stream = page.event_listener::<EventRequestWillBeSent>().await?;
        let mut failed_stream = page.event_listener::<EventLoadingFailed>().await?;
        let mut response_stream = page.event_listener::<EventResponseReceived>().await?;
        let hub = hub.clone();
        handles.push(tokio::spawn(async move {
            // request_id → url，用于给 loadingFailed 补回地址
            let mut urls: HashMap<String, String> = HashMap::new();
            loop {
                tokio::select! {
                    request = request_stream.next() => {
                        let Some(request) = request else { break };
                        if urls.len() >= 2048 {
                            urls.clear();
                        }
                        urls.insert(
                            request.request_id.inner().clone(),
                            request.request.url.clone(),
                        );
                    }
                    failed = failed_stream.next() => {
                        let Some(failed) = failed else { break };
                        // 页面切换导致的主动取消不算故障
                        if failed.canceled == Some(true) {
                            continue;
                        }
                        let url = urls
                            .get(failed.request_id.inner())
                            .cloned()
                            .unwrap_or_default();
                        let mut signal = Signal::new(
                            SignalKind::NetworkFailure,
                            format!("请求失败: {}", failed.error_text),
                        )
                        .with_detail(json!({
                            "origin": "network",
                            "resource": format!("{:?}", failed.r#type),
                        }));
                        if !url.is_empty() {
                            signal = signal.with_locator(url);
                        }
                        hub.push(signal);
                    }
                    response = response_stream.next() => {
                        let Some(response) = response else { break };
                        let status = response.response.status;
                        if status >= 400 {
                            hub.push(
                                Signal::new(
                                    SignalKind::HttpErrorStatus,
                                    format!("HTTP {} : {}", status, response.response.url),
                                )
                                .with_locator(response.response.url.clone())
                                .with_detail(json!({
                                    "status": status,
                                    "origin": "network",
                                    "resource": format!("{:?}", response.r#type),
                                })),
                            );
                        }
                    }
                }
            }
        }));
    }

    debug!("采集器已挂载 ({} 个监听任务)", handles.len());
    Ok(CollectorGuard { handles })
}

/// 把控制台参数拼成可读文本
fn console_text(args: &[RemoteObject]) -> String {
    args.iter()
        .filter_map(|arg| {
            arg.value
                .as_ref()
                .map(|value| match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .or_else(|| arg.description.clone())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_pattern() {
        let matcher = Regex::new(SECURITY_PATTERN).expect("内置模式应能编译");
        assert!(matcher.is_match("Mixed Content: the page was loaded over HTTPS"));
        assert!(matcher.is_match("mixed-content warning"));
        assert!(matcher.is_match("Blocked by CORS policy"));
        assert!(matcher.is_match("Refused to execute: CSP violation"));
        assert!(matcher.is_match("possible XSS detected"));
        assert!(matcher.is_match("insecure form action"));
        assert!(!matcher.is_match("page rendered in 120ms"));
    }

    #[test]
    fn test_filter_default_enables_everything() {
        let filter = CollectorFilter::default();
        assert!(filter.errors && filter.warnings && filter.network);
        assert!(filter.performance && filter.security);
    }
}
