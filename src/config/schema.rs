//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for `hookd`.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the hook daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HookdConfig {
    /// Logging settings.
    pub observability: ObservabilityConfig,

    /// Hook run once when the process exits.
    pub exit: HookConfig,

    /// Hooks bound to individual signals.
    pub signals: Vec<SignalHookConfig>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Output format ("pretty" or "json").
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

/// A hook: a description plus the commands it runs.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HookConfig {
    /// Free-form description.
    pub description: String,

    /// Commands run when the hook executes.
    pub callbacks: Vec<CommandHookConfig>,
}

/// A hook bound to a signal.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignalHookConfig {
    /// Signal name ("SIGHUP", "usr1") or number.
    pub signal: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub callbacks: Vec<CommandHookConfig>,
}

/// A command run as a callback reaction.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandHookConfig {
    /// Unique name within the hook.
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Program followed by its arguments.
    pub command: Vec<String>,

    /// Run on its own thread instead of waiting for the command.
    #[serde(default)]
    pub concurrent: bool,

    /// Priority (higher = runs earlier).
    #[serde(default)]
    pub weight: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let config: HookdConfig = toml::from_str("").unwrap();
        assert_eq!(config.observability.log_level, "info");
        assert!(config.exit.callbacks.is_empty());
        assert!(config.signals.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config: HookdConfig = toml::from_str(
            r#"
            [observability]
            log_level = "debug"
            log_format = "json"

            [exit]
            description = "Process shutdown"
            [[exit.callbacks]]
            name = "flush"
            command = ["sync"]
            weight = 100

            [[signals]]
            signal = "SIGHUP"
            [[signals.callbacks]]
            name = "reload"
            command = ["sh", "-c", "echo reload"]
            concurrent = true
            "#,
        )
        .unwrap();

        assert_eq!(config.observability.log_format, "json");
        assert_eq!(config.exit.callbacks[0].weight, 100);
        assert!(!config.exit.callbacks[0].concurrent);
        assert_eq!(config.signals[0].signal, "SIGHUP");
        assert!(config.signals[0].callbacks[0].concurrent);
        assert_eq!(config.signals[0].callbacks[0].weight, 0);
    }
}
