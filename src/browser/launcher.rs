use std::path::Path;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::{Config, Viewport};
use crate::error::SessionError;

/// 启动无头浏览器并创建空白页面
///
/// 每次调用启动一个独立的浏览器进程，进程随会话关闭而退出，
/// 并发调用之间不共享任何浏览器状态。
pub async fn launch_headless_browser(
    config: &Config,
    viewport: &Viewport,
) -> Result<(Browser, Page), SessionError> {
    info!("🚀 启动无头浏览器...");
    debug!("视口: {}x{}", viewport.width, viewport.height);

    // 配置无头浏览器
    let mut builder = BrowserConfig::builder()
        .new_headless_mode()
        .window_size(viewport.width, viewport.height)
        .args(vec![
            "--disable-gpu",             // 无头模式下禁用 GPU
            "--no-sandbox",              // 禁用沙盒，防止权限问题导致的崩溃
            "--disable-dev-shm-usage",   // 防止共享内存不足
            "--remote-debugging-port=0", // 让浏览器自动选择端口
        ]);

    if let Some(executable) = &config.chrome_executable {
        debug!("使用指定的浏览器可执行文件: {}", executable);
        builder = builder.chrome_executable(Path::new(executable));
    }

    let browser_config = builder.build().map_err(|e| {
        error!("配置无头浏览器失败: {}", e);
        SessionError::LaunchFailed { reason: e }
    })?;

    // 启动浏览器
    let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
        error!("启动无头浏览器失败: {}", e);
        SessionError::LaunchFailed {
            reason: e.to_string(),
        }
    })?;
    debug!("无头浏览器启动成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    // 创建空白页面，初始导航由会话管理器带超时执行
    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建页面失败: {}", e);
        SessionError::PageCreationFailed {
            reason: e.to_string(),
        }
    })?;

    info!("✅ 无头浏览器就绪");

    Ok((browser, page))
}
