//! Weighted lifecycle hooks driven by OS signals.

pub mod config;
pub mod hooks;
pub mod lifecycle;
pub mod observability;

pub use config::HookdConfig;
pub use hooks::{CallbackReaction, HookRegistry, NotificationReaction};
pub use lifecycle::{Shutdown, Signal, SignalDispatcher};
