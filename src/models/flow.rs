//! 交互流程模型
//!
//! 一个流程是具名的有序步骤列表，可由调用方直接构造，
//! 也可从 TOML 文件加载（见 loaders）。

use serde::{Deserialize, Serialize};

/// 具名交互流程
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    pub name: String,
    pub steps: Vec<FlowStep>,
}

/// 单个交互步骤
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FlowStep {
    /// 导航到指定地址（失败则跳过流程剩余步骤）
    Navigate { url: String },
    /// 等待元素出现后点击
    Click { selector: String },
    /// 等待元素出现后输入文本
    Type { selector: String, text: String },
    /// 固定等待
    Wait { ms: u64 },
    /// 截图留证
    Screenshot {
        #[serde(default)]
        name: Option<String>,
    },
    /// 校验元素文本包含期望子串（元素缺失不算错误，记为未通过）
    Verify { selector: String, expected: String },
}

impl FlowStep {
    /// 动作名（用于日志和步骤结局记录）
    pub fn action_name(&self) -> &'static str {
        match self {
            FlowStep::Navigate { .. } => "navigate",
            FlowStep::Click { .. } => "click",
            FlowStep::Type { .. } => "type",
            FlowStep::Wait { .. } => "wait",
            FlowStep::Screenshot { .. } => "screenshot",
            FlowStep::Verify { .. } => "verify",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_from_toml() {
        let text = r##"
            name = "登录流程"

            [[steps]]
            action = "navigate"
            url = "http://localhost:3000/login"

            [[steps]]
            action = "type"
            selector = "#username"
            text = "demo"

            [[steps]]
            action = "click"
            selector = "button[type=submit]"

            [[steps]]
            action = "verify"
            selector = ".welcome"
            expected = "欢迎"
        "##;
        let flow: Flow = toml::from_str(text).expect("流程定义应能解析");
        assert_eq!(flow.name, "登录流程");
        assert_eq!(flow.steps.len(), 4);
        assert_eq!(flow.steps[0].action_name(), "navigate");
        assert!(matches!(
            &flow.steps[3],
            FlowStep::Verify { selector, expected }
                if selector == ".welcome" && expected == "欢迎"
        ));
    }

    #[test]
    fn test_screenshot_name_optional() {
        let text = r#"
            name = "截图"

            [[steps]]
            action = "screenshot"
        "#;
        let flow: Flow = toml::from_str(text).expect("流程定义应能解析");
        assert!(matches!(&flow.steps[0], FlowStep::Screenshot { name: None }));
    }
}
