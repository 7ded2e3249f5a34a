//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     HookdConfig → registries per signal + exit registry → SignalDispatcher
//!
//! Signals (dispatcher.rs, backend.rs):
//!     bound signal → execute its hook → keep listening
//!     SIGINT/SIGTERM/SIGQUIT → execute its hook (if any) → exit sequence
//!
//! Exit sequence (dispatcher.rs):
//!     first request only → exit hook → restore default handling → exit(code)
//! ```
//!
//! # Design Decisions
//! - One backend owns the process's signal disposition
//! - Exit is idempotent: racing triggers run cleanup once
//! - Shutdown (shutdown.rs) bridges the exit hook to async tasks

pub mod backend;
pub mod dispatcher;
pub mod shutdown;
pub mod signal;
pub mod startup;

pub use backend::{OsSignals, SignalBackend, SignalStream};
pub use dispatcher::{DispatchError, DispatcherState, SignalDispatcher};
pub use shutdown::Shutdown;
pub use signal::{ParseSignalError, Signal};
pub use startup::{build_dispatcher, StartupError};
