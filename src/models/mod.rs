pub mod config;
pub mod pull_request;

pub use config::PrCheckConfig;
pub use pull_request::{parse_kinds, PrKind, PullRequest, SelectionError};
