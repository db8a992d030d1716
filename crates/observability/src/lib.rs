//! Process-wide logging setup shared by every binary and test harness.

pub mod tracing;

pub use crate::tracing::{LogConfig, LogFormat, init};
