//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → HookdConfig (validated, immutable)
//!     → lifecycle::startup builds the dispatcher from it
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{CommandHookConfig, HookConfig, HookdConfig, ObservabilityConfig, SignalHookConfig};
pub use validation::{validate_config, ValidationError};
