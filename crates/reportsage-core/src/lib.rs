//! ReportSage Core — configuration and shared error types.

pub mod config;
pub mod error;

pub use config::{DataPaths, ReportSageConfig};
pub use error::{Error, Result};
