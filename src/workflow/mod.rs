pub mod flow_ctx;
pub mod flow_runner;

pub use flow_ctx::FlowCtx;
pub use flow_runner::FlowRunner;
