//! # fm-core
//!
//! Shared foundation for the ffmatrix workspace: the unified [`Error`] type,
//! the crate-wide [`Result`] alias, and application [`config`] types.

pub mod config;
pub mod error;

pub use config::{Config, MatrixConfig, ToolsConfig};
pub use error::{Error, Result};
