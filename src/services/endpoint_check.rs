//! 端点批量检查 - 业务能力层
//!
//! 与浏览器会话无关的无状态扇出：按固定并发分批请求一组端点，
//! 记录状态码和耗时。不做问题分类，结果直接交给上层展示。

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// 单个端点的检查结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointCheckResult {
    pub url: String,
    pub status: Option<u16>,
    pub ok: bool,
    pub response_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 批量检查端点
///
/// # 参数
/// - `base_url`: 目标应用根地址
/// - `endpoints`: 相对路径列表（也接受完整 URL）
/// - `concurrency`: 每批并发数量，每批完成后再开始下一批
pub async fn check_endpoints(
    base_url: &str,
    endpoints: &[String],
    concurrency: usize,
    request_timeout_ms: u64,
) -> Vec<EndpointCheckResult> {
    let client = reqwest::Client::new();
    let batch_size = concurrency.max(1);
    let mut results = Vec::with_capacity(endpoints.len());

    info!(
        "📡 端点批量检查: {} 个端点，每批 {} 个",
        endpoints.len(),
        batch_size
    );

    for batch in endpoints.chunks(batch_size) {
        let mut handles = Vec::new();
        for endpoint in batch {
            let url = join_url(base_url, endpoint);
            let client = client.clone();
            handles.push(tokio::spawn(async move {
                check_one(&client, url, request_timeout_ms).await
            }));
        }

        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!("端点检查任务执行失败: {}", e);
                }
            }
        }
    }

    results
}

async fn check_one(
    client: &reqwest::Client,
    url: String,
    request_timeout_ms: u64,
) -> EndpointCheckResult {
    let started = Instant::now();
    let response = client
        .get(&url)
        .timeout(Duration::from_millis(request_timeout_ms))
        .send()
        .await;
    let response_ms = started.elapsed().as_millis() as u64;

    match response {
        Ok(response) => {
            let status = response.status().as_u16();
            let ok = response.status().is_success() || response.status().is_redirection();
            debug!("✓ {} -> {} ({} ms)", url, status, response_ms);
            EndpointCheckResult {
                url,
                status: Some(status),
                ok,
                response_ms,
                error: None,
            }
        }
        Err(e) => {
            debug!("✗ {} -> {}", url, e);
            EndpointCheckResult {
                url,
                status: None,
                ok: false,
                response_ms,
                error: Some(e.to_string()),
            }
        }
    }
}

/// 拼接根地址与端点路径
fn join_url(base_url: &str, endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_endpoints_report_errors() {
        // 指向一个未被监听的本地端口：连接被拒绝，但每个端点都有结果
        let endpoints = vec!["/health".to_string(), "/api/ping".to_string()];
        let results = check_endpoints("http://127.0.0.1:59998", &endpoints, 2, 1_000).await;
        assert_eq!(results.len(), 2);
        for result in &results {
            assert!(!result.ok);
            assert!(result.status.is_none());
            assert!(result.error.is_some());
        }
    }

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("http://localhost:3000", "/api/health"),
            "http://localhost:3000/api/health"
        );
        assert_eq!(
            join_url("http://localhost:3000/", "api/health"),
            "http://localhost:3000/api/health"
        );
        assert_eq!(
            join_url("http://localhost:3000", "https://example.com/ping"),
            "https://example.com/ping"
        );
    }
}
