//! # Web QA Probe
//!
//! 一个驱动无头浏览器对本地 Web 应用做探测与诊断的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Browser / Page），只暴露能力
//! - `ProbeSession` - 会话管理：打开、视口、初始导航、幂等关闭
//! - `JsExecutor` - 唯一的 page 出口，提供 eval() 能力
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，彼此独立、与套件无关
//! - `collectors` - 被动事件采集（脚本错误 / 网络 / 安全关键词）
//! - `dom_probes` - 主动 DOM 查询（图片 / 表单 / 链接 / 响应式 / 性能）
//! - `classifier` - Signal → IssueRecord 的固定规则表
//! - `aggregator` - TestResult + IssueRecord → QASummary
//! - `endpoint_check` - 与会话无关的端点批量检查
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个交互流程"的完整执行
//! - `FlowCtx` - 上下文封装（流程名 + 序号）
//! - `FlowRunner` - 逐步执行（navigate → click → type → verify ...）
//!
//! ## ④ 编排层（Orchestration）
//! - `orchestrator/suite_runner` - 套件选择、会话生命周期、失败遏制
//! - `orchestrator/monitor` - 被动监听操作
//!
//! ## 数据流向
//!
//! 会话 → {采集器, DOM 探测, 流程执行} → Signal / TestResult
//! → 分类器 → 聚合器 → QASummary，单向流动，聚合后只读。

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::launch_headless_browser;
pub use config::{Config, Viewport};
pub use error::{AppError, AppResult, SessionError};
pub use infrastructure::{JsExecutor, ProbeSession};
pub use models::{
    Flow, FlowStep, IssueRecord, MonitorReport, QASummary, Severity, Signal, SignalHub,
    SignalKind, TestResult,
};
pub use orchestrator::{monitor_signals, App, MonitorOptions, SuiteMode, SuiteRunner};
pub use services::{CollectorFilter, EndpointCheckResult};
pub use workflow::{FlowCtx, FlowRunner};
