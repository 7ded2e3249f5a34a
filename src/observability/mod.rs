//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! hooks, lifecycle, startup produce:
//!     → tracing events (registration, execution passes, signals, exit)
//!
//! logging.rs:
//!     → EnvFilter → fmt layer (pretty or JSON) → stdout
//! ```

pub mod logging;

pub use logging::{init_logging, LoggingError};
