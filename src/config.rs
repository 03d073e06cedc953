use std::path::PathBuf;

pub const ENV_LOG: &str = "GRADEDESKD_LOG";
pub const ENV_WORKSPACE: &str = "GRADEDESKD_WORKSPACE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    /// `tracing_subscriber::EnvFilter` directive string.
    pub log_filter: String,
    /// Workspace opened before the first request, if any.
    pub workspace: Option<PathBuf>,
}

impl DaemonConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let log_filter = lookup(ENV_LOG)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "info".to_string());
        let workspace = lookup(ENV_WORKSPACE)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        Self {
            log_filter,
            workspace,
        }
    }
}

/// Logs go to stderr; stdout carries the IPC stream.
pub fn init_logging(cfg: &DaemonConfig) {
    let filter = tracing_subscriber::EnvFilter::try_new(&cfg.log_filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
