//! 探测会话 - 基础设施层
//!
//! 一次顶层调用对应一个会话：一个独立的浏览器进程、一个页面、
//! 一个共享信号存储。会话由编排层独占持有，结束时无条件关闭。

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, ReloadParams,
};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, Page};
use chrono::{DateTime, Local};
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use crate::browser::launcher;
use crate::config::{Config, Viewport};
use crate::error::SessionError;
use crate::infrastructure::js_executor::JsExecutor;
use crate::models::signal::SignalHub;

/// 探测会话
///
/// 职责：
/// - 持有 Browser 与 Page（经由 JsExecutor）这两个稀缺资源
/// - 初始导航带超时，失败即会话级错误
/// - close() 幂等，任何退出路径都不泄漏浏览器进程
pub struct ProbeSession {
    target_url: String,
    viewport: Viewport,
    created_at: DateTime<Local>,
    browser: Option<Browser>,
    executor: JsExecutor,
    hub: SignalHub,
    evidence_dir: PathBuf,
}

impl ProbeSession {
    /// 打开会话：启动浏览器、应用视口、执行初始导航
    ///
    /// 初始导航超时或传输失败返回 SessionError（携带原始错误文本），
    /// 返回前已关闭刚启动的浏览器。
    pub async fn open(
        config: &Config,
        target_url: &str,
        viewport: Viewport,
    ) -> Result<Self, SessionError> {
        let (browser, page) = launcher::launch_headless_browser(config, &viewport).await?;

        if let Err(e) = apply_viewport(&page, &viewport).await {
            close_browser(browser).await;
            return Err(SessionError::ViewportFailed {
                reason: e.to_string(),
            });
        }

        info!("🌐 初始导航: {}", target_url);
        let nav_timeout = config.initial_nav_timeout_ms;
        let navigation = async {
            page.goto(target_url).await?;
            page.wait_for_navigation().await?;
            Ok::<(), chromiumoxide::error::CdpError>(())
        };
        match timeout(Duration::from_millis(nav_timeout), navigation).await {
            Err(_) => {
                close_browser(browser).await;
                return Err(SessionError::NavigationTimeout {
                    url: target_url.to_string(),
                    timeout_ms: nav_timeout,
                });
            }
            Ok(Err(e)) => {
                close_browser(browser).await;
                return Err(SessionError::NavigationFailed {
                    url: target_url.to_string(),
                    reason: e.to_string(),
                });
            }
            Ok(Ok(())) => {}
        }
        debug!("初始导航完成");

        Ok(Self {
            target_url: target_url.to_string(),
            viewport,
            created_at: Local::now(),
            browser: Some(browser),
            executor: JsExecutor::new(page),
            hub: SignalHub::new(),
            evidence_dir: PathBuf::from(&config.evidence_dir),
        })
    }

    pub fn executor(&self) -> &JsExecutor {
        &self.executor
    }

    pub fn page(&self) -> &Page {
        self.executor.page()
    }

    /// 会话内共享的信号存储句柄
    pub fn hub(&self) -> SignalHub {
        self.hub.clone()
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    /// 会话内导航（带超时），用于链接探测后的位置恢复和流程步骤
    pub async fn navigate(&self, url: &str, timeout_ms: u64) -> Result<()> {
        let page = self.page();
        let navigation = async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok::<(), chromiumoxide::error::CdpError>(())
        };
        match timeout(Duration::from_millis(timeout_ms), navigation).await {
            Err(_) => Err(anyhow!("导航到 {} 超时 ({} ms)", url, timeout_ms)),
            Ok(Err(e)) => Err(anyhow!("导航到 {} 失败: {}", url, e)),
            Ok(Ok(())) => Ok(()),
        }
    }

    /// 调整视口（响应式检查逐档使用）
    pub async fn set_viewport(&self, viewport: &Viewport) -> Result<()> {
        apply_viewport(self.page(), viewport).await
    }

    /// 重新加载当前页面并等待加载完成
    pub async fn reload(&self, timeout_ms: u64) -> Result<()> {
        let page = self.page();
        let reload = async {
            page.execute(ReloadParams::default()).await?;
            page.wait_for_navigation().await?;
            Ok::<(), chromiumoxide::error::CdpError>(())
        };
        match timeout(Duration::from_millis(timeout_ms), reload).await {
            Err(_) => Err(anyhow!("页面重载超时 ({} ms)", timeout_ms)),
            Ok(Err(e)) => Err(anyhow!("页面重载失败: {}", e)),
            Ok(Ok(())) => Ok(()),
        }
    }

    /// 当前页面地址
    pub async fn current_url(&self) -> Result<String> {
        Ok(self.page().url().await?.unwrap_or_default())
    }

    /// 截图留证，返回文件路径（路径被调用方当作不透明字符串使用）
    pub async fn capture_evidence(&self, name: &str) -> Result<String> {
        tokio::fs::create_dir_all(&self.evidence_dir)
            .await
            .with_context(|| format!("无法创建留证目录: {}", self.evidence_dir.display()))?;

        let file_name = format!(
            "{}_{}.png",
            Local::now().format("%Y%m%d_%H%M%S%.3f"),
            sanitize_name(name)
        );
        let path = self.evidence_dir.join(file_name);

        self.page()
            .save_screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
                &path,
            )
            .await
            .with_context(|| format!("截图失败: {}", path.display()))?;

        debug!("📸 留证已保存: {}", path.display());
        Ok(path.to_string_lossy().to_string())
    }

    /// 关闭会话（幂等）
    ///
    /// 不返回错误：关闭失败只记录日志，不影响已采集的结果。
    pub async fn close(&mut self) {
        if let Some(browser) = self.browser.take() {
            info!("🧹 关闭浏览器会话");
            close_browser(browser).await;
        } else {
            debug!("会话已关闭，忽略重复 close");
        }
    }
}

async fn close_browser(mut browser: Browser) {
    if let Err(e) = browser.close().await {
        warn!("关闭浏览器失败: {}", e);
    }
    if let Err(e) = browser.wait().await {
        warn!("等待浏览器进程退出失败: {}", e);
    }
}

async fn apply_viewport(page: &Page, viewport: &Viewport) -> Result<()> {
    let params = SetDeviceMetricsOverrideParams::builder()
        .width(viewport.width as i64)
        .height(viewport.height as i64)
        .device_scale_factor(1.0)
        .mobile(viewport.mobile)
        .build()
        .map_err(|e| anyhow!("构造视口参数失败: {}", e))?;
    page.execute(params).await?;
    Ok(())
}

fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "evidence".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("登录流程 step/3"), "登录流程_step_3");
        assert_eq!(sanitize_name("checkout-page_1"), "checkout-page_1");
        assert_eq!(sanitize_name("///"), "___");
        assert_eq!(sanitize_name(""), "evidence");
    }
}
