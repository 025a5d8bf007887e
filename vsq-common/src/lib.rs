//! # VSQ Common Library
//!
//! Shared code for the VSQ vehicle services:
//! - Common error type
//! - TOML configuration loading and config file discovery
//! - Tracing initialisation

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
