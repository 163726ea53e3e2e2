use crate::models::flow::Flow;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 TOML 文件加载单个流程定义
pub async fn load_flow_from_toml(toml_file_path: &Path) -> Result<Flow> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取流程文件: {}", toml_file_path.display()))?;

    let flow: Flow = toml::from_str(&content)
        .with_context(|| format!("无法解析流程文件: {}", toml_file_path.display()))?;

    Ok(flow)
}

/// 从文件夹中加载所有流程定义
///
/// 自定义流程是可选输入：目录不存在时返回空列表而不报错。
pub async fn load_all_flows(folder_path: &str) -> Result<Vec<Flow>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        tracing::debug!("流程目录 {} 不存在，跳过自定义流程", folder_path);
        return Ok(Vec::new());
    }

    let mut flows = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            tracing::info!(
                "正在加载流程: {}",
                path.file_name().unwrap_or_default().to_string_lossy()
            );

            match load_flow_from_toml(&path).await {
                Ok(flow) => {
                    tracing::info!("成功加载流程 {} ({} 个步骤)", flow.name, flow.steps.len());
                    flows.push(flow);
                }
                Err(e) => {
                    tracing::warn!("加载流程文件失败 {}: {}", path.display(), e);
                }
            }
        }
    }

    Ok(flows)
}
