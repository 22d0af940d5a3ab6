//! Configuration loading and validation
//!
//! Handles TOML configuration parsing with strict validation.
//! No runtime mutation - configuration is immutable after load.

pub mod file;
mod validation;

pub use file::load_from_path;
pub use validation::validate;

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tor: TorConfig,
    pub service: ServiceConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Tor daemon connection
#[derive(Clone, Deserialize)]
pub struct TorConfig {
    #[serde(default = "default_control_host")]
    pub control_host: String,
    #[serde(default = "default_control_port")]
    pub control_port: u16,
    /// Plain-text password matching Tor's HashedControlPassword
    pub control_password: Option<String>,
    /// Cookie file to use instead of the one Tor advertises
    pub cookie_path: Option<PathBuf>,
    /// Upper bound for a single command/reply exchange
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

impl TorConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

impl Default for TorConfig {
    fn default() -> Self {
        Self {
            control_host: default_control_host(),
            control_port: default_control_port(),
            control_password: None,
            cookie_path: None,
            command_timeout_secs: default_command_timeout(),
        }
    }
}

// Hand-written so the password never reaches logs
impl std::fmt::Debug for TorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TorConfig")
            .field("control_host", &self.control_host)
            .field("control_port", &self.control_port)
            .field(
                "control_password",
                &self.control_password.as_ref().map(|_| "<redacted>"),
            )
            .field("cookie_path", &self.cookie_path)
            .field("command_timeout_secs", &self.command_timeout_secs)
            .finish()
    }
}

fn default_control_host() -> String {
    "127.0.0.1".to_string()
}
fn default_control_port() -> u16 {
    9051
}
fn default_command_timeout() -> u64 {
    10
}

/// The onion service to keep registered
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Virtual port clients connect to
    pub onion_port: u16,
    /// Local `host:port` Tor forwards connections to
    pub target: String,
    /// Where the provisioned identity and client auth keys are kept
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
}

fn default_state_path() -> PathBuf {
    PathBuf::from("/var/lib/onion-keeper/state.toml")
}

/// Startup reconciliation timing
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Delay between startup and the reconciliation pass
    #[serde(default = "default_startup_delay")]
    pub startup_delay_secs: u64,
}

impl ScheduleConfig {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            startup_delay_secs: default_startup_delay(),
        }
    }
}

fn default_startup_delay() -> u64 {
    5
}
