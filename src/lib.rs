//! Select data files from a folder, order them by timestamp and hand them to
//! an external analysis script in one synchronous call.

pub mod app;
pub mod config;
pub mod error;
pub mod fs_scan;
pub mod plan;
pub mod runner;
pub mod types;

pub use error::{BatchError, Result};
pub use types::{ExecutionResult, FileEntry, Folder, InvocationPlan, Layout, RunMode, TimestampPolicy};
