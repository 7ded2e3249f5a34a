//! Process signal disposition.
//!
//! # Responsibilities
//! - Start intercepting a set of signals and stream their deliveries
//! - Restore the default disposition during the exit sequence
//! - Terminate the process
//!
//! # Design Decisions
//! - `SignalBackend` is the only writer of the process's signal disposition
//! - Defaults are restored only by the terminal exit sequence
//! - Tests swap in a scripted backend; production uses `OsSignals`

use std::collections::VecDeque;
use std::io;
use std::sync::{Mutex, PoisonError};

use signal_hook::iterator::{Handle, Signals};

use super::signal::Signal;

/// Blocking stream of delivered signals. Ends when interception is closed.
pub type SignalStream = Box<dyn Iterator<Item = Signal> + Send>;

/// Owner of the process's signal handling.
pub trait SignalBackend: Send + Sync {
    /// Start intercepting `signals`.
    fn listen(&self, signals: &[Signal]) -> io::Result<SignalStream>;

    /// Stop intercepting and hand `signals` back to the OS default.
    fn restore_defaults(&self, signals: &[Signal]);

    /// End the process with `code`.
    fn terminate(&self, code: i32) -> !;
}

/// Real OS signals via `signal-hook`.
#[derive(Default)]
pub struct OsSignals {
    handles: Mutex<Vec<Handle>>,
}

impl OsSignals {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SignalBackend for OsSignals {
    fn listen(&self, signals: &[Signal]) -> io::Result<SignalStream> {
        let raw: Vec<i32> = signals.iter().map(Signal::as_raw).collect();
        let signals = Signals::new(&raw)?;

        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(signals.handle());

        Ok(Box::new(OsSignalStream {
            signals,
            pending: VecDeque::new(),
        }))
    }

    fn restore_defaults(&self, signals: &[Signal]) {
        for handle in self.handles.lock().unwrap_or_else(PoisonError::into_inner).drain(..) {
            handle.close();
        }

        for signal in signals {
            // SAFETY: SIG_DFL is always a valid disposition, and nothing
            // relies on our handlers once the exit sequence has started.
            let previous = unsafe { libc::signal(signal.as_raw(), libc::SIG_DFL) };
            if previous == libc::SIG_ERR {
                tracing::warn!(signal = %signal, "Failed to restore default signal handling");
            }
        }
    }

    fn terminate(&self, code: i32) -> ! {
        std::process::exit(code)
    }
}

struct OsSignalStream {
    signals: Signals,
    pending: VecDeque<i32>,
}

impl Iterator for OsSignalStream {
    type Item = Signal;

    fn next(&mut self) -> Option<Signal> {
        loop {
            if let Some(raw) = self.pending.pop_front() {
                return Some(Signal::from_raw(raw));
            }
            if self.signals.is_closed() {
                return None;
            }
            self.pending.extend(self.signals.wait());
        }
    }
}
