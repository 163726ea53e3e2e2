pub mod flow;
pub mod loaders;
pub mod report;
pub mod signal;

pub use flow::{Flow, FlowStep};
pub use loaders::{load_all_flows, load_flow_from_toml};
pub use report::{
    IssueRecord, MonitorReport, QASummary, Severity, SeverityCounts, StepOutcome, TestResult,
};
pub use signal::{Signal, SignalHub, SignalKind};
