//! HTTP handlers for REST API endpoints

pub mod logs;

pub use logs::{get_index_logs, get_logs, LogsQuery};
