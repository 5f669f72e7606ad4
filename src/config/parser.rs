//! Configuration file parser.
//!
//! Parses TOML-style configuration files with a custom lightweight parser.

use super::types::*;
use std::{fs, io};

/// Load configuration from a file path.
pub fn load_config(path: &str) -> io::Result<Config> {
    let s = fs::read_to_string(path)?;
    parse_config(&s)
}

/// Parse configuration from a string.
fn parse_config(s: &str) -> io::Result<Config> {
    let mut cfg = Config::default();
    let mut section = String::new();

    for (lineno, line) in s.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            section = name.trim().to_string();
            continue;
        }
        let Some((lhs, rhs)) = line.split_once('=') else {
            continue;
        };
        let key = lhs.trim();
        let mut val = rhs.trim();
        if let Some((v, _)) = val.split_once('#') {
            val = v.trim();
        }

        set_config_value(&section, key, val, &mut cfg).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line {}: {}", lineno + 1, e),
            )
        })?;
    }

    Ok(cfg)
}

/// Set a configuration value based on section, key, and value strings.
fn set_config_value(section: &str, key: &str, val: &str, cfg: &mut Config) -> Result<(), String> {
    macro_rules! parse {
        (s) => {
            val.trim_matches('"').to_string()
        };
        (u32_) => {
            val.parse::<u32>().map_err(|e| e.to_string())?
        };
        (usize_) => {
            val.parse::<usize>().map_err(|e| e.to_string())?
        };
    }

    match (section, key) {
        ("server", "bind_addr") => cfg.server.bind_addr = parse!(s),
        ("server", "server_version") => cfg.server.server_version = parse!(s),
        ("server", "process_id") => cfg.server.process_id = parse!(u32_),
        ("server", "secret_key") => cfg.server.secret_key = parse!(u32_),
        ("limits", "max_active_conns") => cfg.limits.max_active_conns = parse!(usize_),
        ("limits", "max_buffered_bytes") => cfg.limits.max_buffered_bytes = parse!(usize_),
        _ => return Err(format!("unknown key {section}.{key}")),
    }

    Ok(())
}
