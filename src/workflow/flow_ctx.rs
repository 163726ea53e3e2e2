//! 流程执行上下文
//!
//! 封装"我正在跑哪个流程的第几步"这一信息

use std::fmt::Display;

/// 流程执行上下文
#[derive(Debug, Clone)]
pub struct FlowCtx {
    /// 流程名称
    pub flow_name: String,

    /// 流程序号（仅用于日志显示，从 1 开始）
    pub flow_index: usize,

    /// 步骤总数
    pub total_steps: usize,
}

impl FlowCtx {
    pub fn new(flow_name: String, flow_index: usize, total_steps: usize) -> Self {
        Self {
            flow_name,
            flow_index,
            total_steps,
        }
    }
}

impl Display for FlowCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[流程 {} \"{}\" 共{}步]",
            self.flow_index, self.flow_name, self.total_steps
        )
    }
}
