//! Configuration type definitions.

/// Front-end server settings.
#[derive(Clone, Debug)]
pub struct Server {
    pub bind_addr: String,
    /// Value announced through ParameterStatus as `server_version` during
    /// startup. Clients treat it as opaque; an empty string disables the
    /// announcement.
    pub server_version: String,
    /// Process id reported in BackendKeyData. Query cancellation is not
    /// wired through, so the value only has to look distinct.
    pub process_id: u32,
    /// Secret key reported in BackendKeyData.
    pub secret_key: u32,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5432".into(),
            server_version: "16.3".into(),
            process_id: 1,
            secret_key: 2,
        }
    }
}

/// Connection and resource limits.
#[derive(Clone, Debug)]
pub struct Limits {
    pub max_active_conns: usize,
    /// Ceiling on bytes buffered for one connection while a message is still
    /// incomplete; the connection is closed once it is exceeded.
    pub max_buffered_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_active_conns: 2048,
            max_buffered_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Root configuration container.
#[derive(Clone, Debug, Default)]
pub struct Config {
    pub server: Server,
    pub limits: Limits,
}
