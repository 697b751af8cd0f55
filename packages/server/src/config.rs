//! Server configuration.

use std::path::PathBuf;

/// Listen backlog observed for both servers
pub const DEFAULT_BACKLOG: u32 = 5;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_CHAT_PORT: u16 = 9000;
pub const DEFAULT_FILE_PORT: u16 = 9001;
pub const DEFAULT_SHARED_DIR: &str = "shared_files";

/// Listening socket configuration shared by the chat and file servers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,
    /// Port to bind to; 0 lets the OS pick one
    pub port: u16,
    /// Pending-connection queue length passed to `listen`
    pub backlog: u32,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            backlog: DEFAULT_BACKLOG,
        }
    }

    pub fn with_backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog;
        self
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_CHAT_PORT)
    }
}

/// File server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileServerConfig {
    pub server: ServerConfig,
    /// Directory whose regular files are listed and served
    pub shared_dir: PathBuf,
}

impl FileServerConfig {
    pub fn new(server: ServerConfig, shared_dir: impl Into<PathBuf>) -> Self {
        Self {
            server,
            shared_dir: shared_dir.into(),
        }
    }
}

impl Default for FileServerConfig {
    fn default() -> Self {
        Self::new(
            ServerConfig::new(DEFAULT_HOST, DEFAULT_FILE_PORT),
            DEFAULT_SHARED_DIR,
        )
    }
}
