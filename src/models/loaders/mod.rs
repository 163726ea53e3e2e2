pub mod toml_loader;

pub use toml_loader::{load_all_flows, load_flow_from_toml};
