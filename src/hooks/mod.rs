//! Hooks subsystem.
//!
//! # Data Flow
//! ```text
//! register_callback / register_notification
//!     → registry.rs (validate, reject duplicate names, mark order stale)
//!
//! execute()
//!     → registry.rs (re-sort by descending weight if needed, snapshot)
//!     → notifications: notify.rs sinks, then optional ack wait
//!     → callbacks: inline, or on their own thread when concurrent
//! ```
//!
//! # Design Decisions
//! - Notifications run before callbacks so external listeners can flush
//!   state before in-process cleanup starts
//! - Weight is a sort key only; equal weights keep registration order
//! - No timeouts: a blocking notification needs a responsive listener

pub mod notify;
pub mod reaction;
pub mod registry;

pub use notify::{ack_channel, rendezvous, AckSource, Delivery, Disconnected, NotifySink};
pub use reaction::{Action, CallbackBuilder, CallbackReaction, NotificationBuilder, NotificationReaction};
pub use registry::{HookRegistry, ReactionInfo, ReactionKind, RegistryError};
