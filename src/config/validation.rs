//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Signals must be known and interceptable, each bound at most once
//! - Callback names unique per hook, commands non-empty
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: HookdConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::{CommandHookConfig, HookdConfig};
use crate::lifecycle::Signal;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "json"];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown log level \"{0}\"")]
    UnknownLogLevel(String),

    #[error("unknown log format \"{0}\"")]
    UnknownLogFormat(String),

    #[error("unknown signal \"{0}\"")]
    UnknownSignal(String),

    #[error("{0} cannot be intercepted")]
    ForbiddenSignal(Signal),

    #[error("{0} is bound more than once")]
    DuplicateSignal(Signal),

    #[error("hook \"{hook}\" has a callback with an empty name")]
    EmptyCallbackName { hook: String },

    #[error("hook \"{hook}\" has more than one callback named \"{name}\"")]
    DuplicateCallback { hook: String, name: String },

    #[error("callback \"{name}\" in hook \"{hook}\" has an empty command")]
    EmptyCommand { hook: String, name: String },
}

/// Check `config` for semantic problems.
pub fn validate_config(config: &HookdConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(config.observability.log_level.clone()));
    }
    let format = config.observability.log_format.to_ascii_lowercase();
    if !LOG_FORMATS.contains(&format.as_str()) {
        errors.push(ValidationError::UnknownLogFormat(config.observability.log_format.clone()));
    }

    validate_callbacks("exit", &config.exit.callbacks, &mut errors);

    let mut bound = HashSet::new();
    for hook in &config.signals {
        match hook.signal.parse::<Signal>() {
            Ok(signal) if signal.is_forbidden() => {
                errors.push(ValidationError::ForbiddenSignal(signal));
            }
            Ok(signal) => {
                if !bound.insert(signal) {
                    errors.push(ValidationError::DuplicateSignal(signal));
                }
            }
            Err(_) => errors.push(ValidationError::UnknownSignal(hook.signal.clone())),
        }
        validate_callbacks(&hook.signal, &hook.callbacks, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_callbacks(hook: &str, callbacks: &[CommandHookConfig], errors: &mut Vec<ValidationError>) {
    let mut names = HashSet::new();
    for callback in callbacks {
        if callback.name.is_empty() {
            errors.push(ValidationError::EmptyCallbackName { hook: hook.to_string() });
        } else if !names.insert(callback.name.as_str()) {
            errors.push(ValidationError::DuplicateCallback {
                hook: hook.to_string(),
                name: callback.name.clone(),
            });
        }

        if callback.command.first().map_or(true, |program| program.is_empty()) {
            errors.push(ValidationError::EmptyCommand {
                hook: hook.to_string(),
                name: callback.name.clone(),
            });
        }
    }
}
