//! Configuration module for veles.
//!
//! This module provides all configuration types and parsing logic:
//! - `Config` - Root configuration container
//! - `Server` - Front-end server settings
//! - `Limits` - Connection and resource limits

mod parser;
mod types;

pub use parser::load_config;
pub use types::*;

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &str) -> std::io::Result<Self> {
        parser::load_config(path)
    }
}
