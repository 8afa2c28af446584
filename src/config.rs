//! Provider identity, environment-derived configuration, and binary
//! resolution.
//!
//! Everything here is resolved once, before the child process is spawned.

use clap::ValueEnum;
use std::fmt;
use std::path::PathBuf;

/// Override path for the real claude binary.
pub const ENV_REAL_CLAUDE_BIN: &str = "PRISM_REAL_CLAUDE_BIN";
/// Override path for the real codex binary.
pub const ENV_REAL_CODEX_BIN: &str = "PRISM_REAL_CODEX_BIN";
/// Terminal transcript toggle (default: enabled).
pub const ENV_TTY: &str = "PRISM_TTY";
/// Permit the transcript to fall back to stderr when no terminal device is
/// available (default: disabled).
pub const ENV_TTY_STDERR: &str = "PRISM_TTY_STDERR";

/// Which real tool the bridge wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    Claude,
    Codex,
}

impl Provider {
    /// Name the real tool is installed under.
    pub fn command_name(self) -> &'static str {
        match self {
            Provider::Claude => "claude",
            Provider::Codex => "codex",
        }
    }

    fn bin_override_var(self) -> &'static str {
        match self {
            Provider::Claude => ENV_REAL_CLAUDE_BIN,
            Provider::Codex => ENV_REAL_CODEX_BIN,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command_name())
    }
}

/// Boolean environment toggle. Unset means `default`; `0`, `false`, `no` and
/// `off` (case-insensitive) disable, anything else enables.
pub fn env_enabled(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => !matches!(
            value.to_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ),
        Err(_) => default,
    }
}

/// Locate the real binary for `provider`: the environment override wins when
/// it points at an existing path, otherwise fall back to PATH lookup.
pub fn resolve_real_binary(provider: Provider) -> Option<PathBuf> {
    if let Ok(overridden) = std::env::var(provider.bin_override_var()) {
        let path = PathBuf::from(overridden);
        if path.exists() {
            return Some(path);
        }
        tracing::debug!(
            "{} is set but {} does not exist, falling back to PATH",
            provider.bin_override_var(),
            path.display()
        );
    }
    which::which(provider.command_name()).ok()
}

/// Everything needed for one bridged run. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub provider: Provider,
    pub real_bin: PathBuf,
    pub args: Vec<String>,
    /// Written to the child's stdin (claude only; codex takes its prompt from
    /// the argument list).
    pub prompt_text: String,
    /// Display tag prefixed to every live transcript line.
    pub worker_label: String,
}
