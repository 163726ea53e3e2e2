//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责套件选择和探测调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `suite_runner` - 套件执行器
//! - 管理会话生命周期（打开、探测、无条件关闭）
//! - 按模式选择探测项，按固定顺序执行
//! - 遏制单项失败，汇聚 TestResult 与 Signal
//! - `App`: 应用入口（加载配置与自定义流程，跑一次套件）
//!
//! ### `monitor` - 被动监听操作
//! - 有界时间窗内只挂采集器
//! - 可选穿插一个交互流程
//! - 捕获时过滤，返回分类汇总 + 原始信号
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator (选套件、管会话、汇结果)
//!     ↓
//! workflow::FlowRunner (跑单个流程)
//!     ↓
//! services (能力层：collectors / dom_probes / classifier / aggregator)
//!     ↓
//! infrastructure (基础设施：ProbeSession / JsExecutor)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：suite_runner 管主动探测，monitor 管被动监听
//! 2. **资源隔离**：只有编排层持有 ProbeSession 的所有权
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure
//! 4. **失败遏制**：除初始导航外，任何失败都折叠进结果而不是中断

pub mod monitor;
pub mod suite_runner;

// 重新导出主要类型
pub use monitor::{monitor_signals, MonitorOptions};
pub use suite_runner::{App, SuiteMode, SuiteRunner};
