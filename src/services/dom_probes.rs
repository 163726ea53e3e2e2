//! DOM 探测项 - 业务能力层
//!
//! 每个探测项都是编排层显式调用的一次"查询并判定"，不常驻运行。
//! 发现的问题逐元素写入 Signal（保持可追溯），聚合成单条问题记录
//! 是分类器的事；探测项自身只返回该项的 TestResult。

use anyhow::Result;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::infrastructure::session::ProbeSession;
use crate::models::report::TestResult;
use crate::models::signal::{Signal, SignalKind};

/// DOM 探测项集合
///
/// 职责：
/// - 借用会话的 JS 执行能力做同步查询
/// - 产出 Signal + TestResult
/// - 不决定执行顺序（编排层的事）
pub struct DomProbes<'a> {
    session: &'a ProbeSession,
    config: &'a Config,
}

#[derive(Debug, Deserialize)]
struct PageBasics {
    title: String,
    lang: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct FormIssue {
    check: String,
    locator: String,
}

#[derive(Debug, Deserialize)]
struct FormReport {
    form_count: usize,
    field_count: usize,
    issues: Vec<FormIssue>,
}

#[derive(Debug, Deserialize)]
struct LinkProbeOutcome {
    status: Option<u64>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ViewportReport {
    scroll_width: i64,
    inner_width: i64,
    overflow: bool,
    zero: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SmallText {
    locator: String,
    size: f64,
}

#[derive(Debug, Deserialize)]
struct UiReport {
    small: Vec<SmallText>,
    no_alt: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MemoryInfo {
    used_js_heap_size: u64,
    total_js_heap_size: u64,
}

#[derive(Debug, Deserialize)]
struct PerfReport {
    load_time: f64,
    memory: Option<MemoryInfo>,
}

impl<'a> DomProbes<'a> {
    pub fn new(session: &'a ProbeSession, config: &'a Config) -> Self {
        Self { session, config }
    }

    fn emit(&self, signal: Signal) {
        self.session.hub().push(signal);
    }

    /// 页面基础检查：标题存在且非空
    pub async fn check_page_basics(&self) -> Result<TestResult> {
        info!("🔍 页面基础检查");
        let basics: PageBasics = self
            .session
            .executor()
            .eval_as(
                r#"(() => ({
                    title: document.title || '',
                    lang: document.documentElement.getAttribute('lang') || '',
                    url: location.href,
                }))()"#,
            )
            .await?;

        let missing_title = basics.title.trim().is_empty();
        if missing_title {
            self.emit(
                Signal::new(SignalKind::AccessibilityViolation, "页面缺少标题")
                    .with_locator(basics.url.clone())
                    .with_detail(json!({"check": "missing-title"})),
            );
        }

        Ok(TestResult {
            name: "page-basics".to_string(),
            passed: !missing_title,
            details: json!({
                "title": basics.title,
                "lang": basics.lang,
                "url": basics.url,
            }),
            error: None,
            steps: Vec::new(),
        })
    }

    /// 失败图片检查：加载未完成或固有高度为 0 视为损坏
    pub async fn check_broken_images(&self) -> Result<TestResult> {
        info!("🔍 图片加载检查");
        let broken: Vec<String> = self
            .session
            .executor()
            .eval_as(
                r#"Array.from(document.images)
                    .filter((img) => !img.complete || img.naturalHeight === 0)
                    .map((img) => img.currentSrc || img.src || (img.outerHTML || '').slice(0, 120))"#,
            )
            .await?;

        for src in &broken {
            self.emit(
                Signal::new(SignalKind::LayoutViolation, "图片加载失败")
                    .with_locator(src.clone())
                    .with_detail(json!({"check": "broken-image"})),
            );
        }

        let count = broken.len();
        Ok(TestResult {
            name: "broken-images".to_string(),
            passed: count == 0,
            details: json!({"broken_count": count, "samples": broken.iter().take(5).collect::<Vec<_>>()}),
            error: None,
            steps: Vec::new(),
        })
    }

    /// 表单结构检查：缺提交控件的表单、缺标签的输入控件
    pub async fn check_form_structure(&self) -> Result<TestResult> {
        info!("🔍 表单结构检查");
        let report: FormReport = self
            .session
            .executor()
            .eval_as(
                r#"(() => {
                    const describe = (el, index) => {
                        const tag = (el.tagName || '').toLowerCase();
                        if (el.id) return tag + '#' + el.id;
                        const name = el.getAttribute && el.getAttribute('name');
                        if (name) return tag + '[name="' + name + '"]';
                        return tag + ':nth-of-type(' + (index + 1) + ')';
                    };
                    const issues = [];
                    const forms = Array.from(document.querySelectorAll('form'));
                    forms.forEach((form, fi) => {
                        const submit = form.querySelector(
                            'button[type="submit"], input[type="submit"], button:not([type])'
                        );
                        if (!submit) {
                            issues.push({ check: 'form-no-submit', locator: describe(form, fi) });
                        }
                    });
                    const fields = Array.from(document.querySelectorAll(
                        'input:not([type=hidden]):not([type=submit]):not([type=button]), textarea, select'
                    ));
                    fields.forEach((el, i) => {
                        const id = el.getAttribute('id');
                        const labelled =
                            (id && document.querySelector('label[for="' + id + '"]')) ||
                            el.closest('label') ||
                            el.getAttribute('aria-label') ||
                            el.getAttribute('aria-labelledby');
                        if (!labelled) {
                            issues.push({ check: 'form-label', locator: describe(el, i) });
                        }
                    });
                    return { form_count: forms.length, field_count: fields.length, issues };
                })()"#,
            )
            .await?;

        for issue in &report.issues {
            let message = match issue.check.as_str() {
                "form-no-submit" => "表单缺少可提交控件",
                _ => "输入控件缺少标签或可访问名称",
            };
            self.emit(
                Signal::new(SignalKind::AccessibilityViolation, message)
                    .with_locator(issue.locator.clone())
                    .with_detail(json!({"check": issue.check})),
            );
        }

        Ok(TestResult {
            name: "form-structure".to_string(),
            passed: report.issues.is_empty(),
            details: json!({
                "form_count": report.form_count,
                "field_count": report.field_count,
                "flagged": report.issues.len(),
            }),
            error: None,
            steps: Vec::new(),
        })
    }

    /// 站内链接检查
    ///
    /// 收集同源、非自指的链接，最多探测 nav_link_cap 条；
    /// 无论结果如何，结束时恢复原始地址。
    pub async fn check_navigation_links(&self) -> Result<TestResult> {
        info!("🔍 站内链接检查");
        let original_url = self.session.current_url().await?;

        let links: Vec<String> = self
            .session
            .executor()
            .eval_as(
                r#"(() => {
                    const origin = location.origin;
                    const here = location.href.split('#')[0];
                    const seen = new Set();
                    for (const a of document.querySelectorAll('a[href]')) {
                        let url;
                        try { url = new URL(a.getAttribute('href'), location.href); }
                        catch { continue; }
                        if (url.origin !== origin) continue;
                        const clean = url.href.split('#')[0];
                        if (clean === here) continue;
                        seen.add(clean);
                    }
                    return Array.from(seen);
                })()"#,
            )
            .await?;

        let cap = self.config.nav_link_cap;
        let probed: Vec<&String> = links.iter().take(cap).collect();
        if links.len() > cap {
            debug!("链接数 {} 超过上限 {}，只探测前 {} 条", links.len(), cap, cap);
        }

        let mut broken = 0usize;
        for link in &probed {
            let outcome = self.probe_one_link(link.as_str()).await;
            match outcome {
                Ok(LinkProbeOutcome {
                    status: Some(status),
                    ..
                }) if (200..400).contains(&status) => {
                    debug!("✓ {} -> {}", link, status);
                }
                Ok(LinkProbeOutcome {
                    status: Some(status),
                    ..
                }) => {
                    broken += 1;
                    self.emit(
                        Signal::new(
                            SignalKind::HttpErrorStatus,
                            format!("站内链接返回 HTTP {}", status),
                        )
                        .with_locator((*link).clone())
                        .with_detail(json!({
                            "status": status,
                            "origin": "navigation",
                            "check": "broken-link",
                        })),
                    );
                }
                Ok(LinkProbeOutcome { error, .. }) => {
                    broken += 1;
                    self.emit(
                        Signal::new(
                            SignalKind::NetworkFailure,
                            format!(
                                "站内链接无法访问: {}",
                                error.unwrap_or_else(|| "未知传输错误".to_string())
                            ),
                        )
                        .with_locator((*link).clone())
                        .with_detail(json!({
                            "origin": "navigation",
                            "check": "broken-link",
                        })),
                    );
                }
                Err(e) => {
                    broken += 1;
                    warn!("链接探测执行失败 {}: {}", link, e);
                    self.emit(
                        Signal::new(SignalKind::NetworkFailure, format!("站内链接探测失败: {}", e))
                            .with_locator((*link).clone())
                            .with_detail(json!({
                                "origin": "navigation",
                                "check": "broken-link",
                            })),
                    );
                }
            }
        }

        // 位置恢复：探测过程若移动了当前地址（重定向、页面脚本跳转），回到原页
        let now = self.session.current_url().await.unwrap_or_default();
        if now != original_url {
            if let Err(e) = self
                .session
                .navigate(&original_url, self.config.step_timeout_ms)
                .await
            {
                warn!("恢复原始地址失败: {}", e);
            }
        }

        Ok(TestResult {
            name: "navigation-links".to_string(),
            passed: broken == 0,
            details: json!({
                "links_found": links.len(),
                "links_probed": probed.len(),
                "broken": broken,
            }),
            error: None,
            steps: Vec::new(),
        })
    }

    async fn probe_one_link(&self, url: &str) -> Result<LinkProbeOutcome> {
        let js_code = format!(
            r#"
            (async () => {{
                const controller = new AbortController();
                const timer = setTimeout(() => controller.abort(), {timeout});
                try {{
                    const response = await fetch({url}, {{
                        redirect: 'follow',
                        credentials: 'include',
                        signal: controller.signal,
                    }});
                    return {{ status: response.status, error: null }};
                }} catch (error) {{
                    return {{ status: null, error: String((error && error.message) || error) }};
                }} finally {{
                    clearTimeout(timer);
                }}
            }})()
            "#,
            timeout = self.config.link_timeout_ms,
            url = serde_json::to_string(url)?,
        );
        self.session.executor().eval_as(js_code).await
    }

    /// 响应式检查：逐档视口重载页面，找横向溢出和零面积元素
    pub async fn check_responsive(&self) -> Result<TestResult> {
        info!("🔍 响应式检查");
        let mut violations = 0usize;
        let mut per_viewport = Vec::new();

        for viewport in &self.config.responsive_viewports {
            self.session.set_viewport(viewport).await?;
            if let Err(e) = self.session.reload(self.config.step_timeout_ms).await {
                warn!("视口 {} 重载失败: {}", viewport.label, e);
                per_viewport.push(json!({"viewport": viewport.label, "error": e.to_string()}));
                continue;
            }

            let report: ViewportReport = self
                .session
                .executor()
                .eval_as(
                    r#"(() => {
                        const doc = document.documentElement;
                        const zero = [];
                        for (const el of document.querySelectorAll(
                            'img, button, input, select, textarea, a'
                        )) {
                            const style = window.getComputedStyle(el);
                            if (style.display === 'none' || style.visibility === 'hidden') continue;
                            if (el.offsetWidth === 0 || el.offsetHeight === 0) {
                                const tag = (el.tagName || '').toLowerCase();
                                zero.push(el.id ? tag + '#' + el.id : tag);
                                if (zero.length >= 20) break;
                            }
                        }
                        return {
                            scroll_width: doc.scrollWidth,
                            inner_width: window.innerWidth,
                            overflow: doc.scrollWidth > window.innerWidth,
                            zero,
                        };
                    })()"#,
                )
                .await?;

            if report.overflow {
                violations += 1;
                self.emit(
                    Signal::new(
                        SignalKind::LayoutViolation,
                        format!(
                            "视口 {} ({}x{}) 出现横向溢出: 内容宽 {} > 视口宽 {}",
                            viewport.label,
                            viewport.width,
                            viewport.height,
                            report.scroll_width,
                            report.inner_width
                        ),
                    )
                    .with_locator(viewport.label.clone())
                    .with_detail(json!({
                        "check": "horizontal-overflow",
                        "viewport": viewport.label,
                        "scroll_width": report.scroll_width,
                        "inner_width": report.inner_width,
                    })),
                );
            }
            for locator in &report.zero {
                violations += 1;
                self.emit(
                    Signal::new(
                        SignalKind::LayoutViolation,
                        format!("视口 {} 下存在零面积元素", viewport.label),
                    )
                    .with_locator(locator.clone())
                    .with_detail(json!({
                        "check": "zero-area",
                        "viewport": viewport.label,
                    })),
                );
            }

            per_viewport.push(json!({
                "viewport": viewport.label,
                "overflow": report.overflow,
                "zero_area": report.zero.len(),
            }));
        }

        // 恢复默认视口，后续探测假定初始布局
        self.session
            .set_viewport(&self.config.default_viewport)
            .await?;
        if let Err(e) = self.session.reload(self.config.step_timeout_ms).await {
            warn!("恢复默认视口后重载失败: {}", e);
        }

        Ok(TestResult {
            name: "responsive".to_string(),
            passed: violations == 0,
            details: json!({"violations": violations, "viewports": per_viewport}),
            error: None,
            steps: Vec::new(),
        })
    }

    /// 界面质量检查：过小文本和缺失 alt 的图片
    pub async fn check_ui_quality(&self) -> Result<TestResult> {
        info!("🔍 界面质量检查");
        let js_code = format!(
            r#"
            (() => {{
                const min_font = {min_font};
                const small = [];
                const seen = new Set();
                const walker = document.createTreeWalker(document.body, NodeFilter.SHOW_TEXT);
                let node;
                while ((node = walker.nextNode())) {{
                    if (!node.textContent || !node.textContent.trim()) continue;
                    const el = node.parentElement;
                    if (!el || seen.has(el)) continue;
                    seen.add(el);
                    const size = parseFloat(window.getComputedStyle(el).fontSize);
                    if (size && size < min_font) {{
                        const tag = (el.tagName || '').toLowerCase();
                        small.push({{
                            locator: el.id ? tag + '#' + el.id : tag,
                            size,
                        }});
                        if (small.length >= 50) break;
                    }}
                }}
                const no_alt = Array.from(document.querySelectorAll('img:not([alt])'))
                    .map((img) => img.currentSrc || img.src || 'inline image');
                return {{ small, no_alt }};
            }})()
            "#,
            min_font = self.config.min_font_px,
        );
        let report: UiReport = self.session.executor().eval_as(js_code).await?;

        for item in &report.small {
            self.emit(
                Signal::new(
                    SignalKind::AccessibilityViolation,
                    format!("文本字号过小 ({:.1}px)", item.size),
                )
                .with_locator(item.locator.clone())
                .with_detail(json!({"check": "text-size", "size_px": item.size})),
            );
        }
        for src in &report.no_alt {
            self.emit(
                Signal::new(SignalKind::AccessibilityViolation, "图片缺少 alt 属性")
                    .with_locator(src.clone())
                    .with_detail(json!({"check": "alt-text"})),
            );
        }

        let flagged = report.small.len() + report.no_alt.len();
        Ok(TestResult {
            name: "ui-quality".to_string(),
            passed: flagged == 0,
            details: json!({
                "small_text": report.small.len(),
                "missing_alt": report.no_alt.len(),
            }),
            error: None,
            steps: Vec::new(),
        })
    }

    /// 性能评估：加载耗时与 JS 堆占用
    ///
    /// 只有超出预算才产生信号；原始数值始终写入 TestResult。
    pub async fn assess_performance(&self) -> Result<TestResult> {
        info!("🔍 性能评估");
        let report: PerfReport = self
            .session
            .executor()
            .eval_as(
                r#"(() => {
                    const nav = performance.getEntriesByType('navigation')[0];
                    let load_time = 0;
                    if (nav && nav.loadEventEnd > 0) {
                        load_time = nav.loadEventEnd - nav.startTime;
                    } else if (performance.timing && performance.timing.loadEventEnd > 0) {
                        load_time =
                            performance.timing.loadEventEnd - performance.timing.navigationStart;
                    }
                    const memory = performance.memory
                        ? {
                              used_js_heap_size: performance.memory.usedJSHeapSize,
                              total_js_heap_size: performance.memory.totalJSHeapSize,
                          }
                        : null;
                    return { load_time: Math.max(0, Math.round(load_time)), memory };
                })()"#,
            )
            .await?;

        let load_ms = report.load_time as u64;
        let mut over_budget = false;

        if load_ms > self.config.load_time_budget_ms {
            over_budget = true;
            self.emit(
                Signal::new(
                    SignalKind::PerformanceMetric,
                    format!(
                        "页面加载耗时 {} ms，超出预算 {} ms",
                        load_ms, self.config.load_time_budget_ms
                    ),
                )
                .with_detail(json!({
                    "metric": "load-time",
                    "value_ms": load_ms,
                    "budget_ms": self.config.load_time_budget_ms,
                })),
            );
        }

        if let Some(memory) = &report.memory {
            if memory.used_js_heap_size > self.config.heap_budget_bytes {
                over_budget = true;
                self.emit(
                    Signal::new(
                        SignalKind::PerformanceMetric,
                        format!(
                            "JS 堆占用 {:.1} MB，超出预算 {:.1} MB",
                            memory.used_js_heap_size as f64 / 1024.0 / 1024.0,
                            self.config.heap_budget_bytes as f64 / 1024.0 / 1024.0
                        ),
                    )
                    .with_detail(json!({
                        "metric": "heap",
                        "value_bytes": memory.used_js_heap_size,
                        "budget_bytes": self.config.heap_budget_bytes,
                    })),
                );
            }
        }

        Ok(TestResult {
            name: "performance".to_string(),
            passed: !over_budget,
            details: json!({
                "load_time_ms": load_ms,
                "used_js_heap_size": report.memory.as_ref().map(|m| m.used_js_heap_size),
                "total_js_heap_size": report.memory.as_ref().map(|m| m.total_js_heap_size),
            }),
            error: None,
            steps: Vec::new(),
        })
    }
}
