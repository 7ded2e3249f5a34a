//! Signal identifiers.
//!
//! `Signal` wraps the raw OS signal number so any signal can be bound to a
//! hook, while the common ones get names and constants.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// An OS signal number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signal(i32);

/// Named signals, used for parsing and display.
const NAMED: &[(Signal, &str)] = &[
    (Signal::HANGUP, "SIGHUP"),
    (Signal::INTERRUPT, "SIGINT"),
    (Signal::QUIT, "SIGQUIT"),
    (Signal::TERMINATE, "SIGTERM"),
    (Signal::USER1, "SIGUSR1"),
    (Signal::USER2, "SIGUSR2"),
    (Signal::ALARM, "SIGALRM"),
    (Signal::CHILD, "SIGCHLD"),
    (Signal::PIPE, "SIGPIPE"),
    (Signal::WINDOW_CHANGE, "SIGWINCH"),
    (Signal::KILL, "SIGKILL"),
    (Signal::STOP, "SIGSTOP"),
];

impl Signal {
    pub const HANGUP: Signal = Signal(libc::SIGHUP);
    pub const INTERRUPT: Signal = Signal(libc::SIGINT);
    pub const QUIT: Signal = Signal(libc::SIGQUIT);
    pub const TERMINATE: Signal = Signal(libc::SIGTERM);
    pub const USER1: Signal = Signal(libc::SIGUSR1);
    pub const USER2: Signal = Signal(libc::SIGUSR2);
    pub const ALARM: Signal = Signal(libc::SIGALRM);
    pub const CHILD: Signal = Signal(libc::SIGCHLD);
    pub const PIPE: Signal = Signal(libc::SIGPIPE);
    pub const WINDOW_CHANGE: Signal = Signal(libc::SIGWINCH);
    pub const KILL: Signal = Signal(libc::SIGKILL);
    pub const STOP: Signal = Signal(libc::SIGSTOP);

    /// Signals that always start the exit sequence.
    pub const TERMINATION: [Signal; 3] = [Signal::INTERRUPT, Signal::TERMINATE, Signal::QUIT];

    pub const fn from_raw(raw: i32) -> Self {
        Signal(raw)
    }

    pub const fn as_raw(&self) -> i32 {
        self.0
    }

    /// Interrupt, terminate or quit.
    pub fn is_termination(&self) -> bool {
        Self::TERMINATION.contains(self)
    }

    /// Signals the process is not allowed to intercept (SIGKILL, SIGSTOP,
    /// and the synchronous fault signals).
    pub fn is_forbidden(&self) -> bool {
        signal_hook::consts::FORBIDDEN.contains(&self.0)
    }

    /// Conventional name, if the signal is one of the named ones.
    pub fn name(&self) -> Option<&'static str> {
        NAMED.iter().find(|(s, _)| s == self).map(|(_, n)| *n)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "signal {}", self.0),
        }
    }
}

/// Unrecognized signal name or number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown signal \"{0}\"")]
pub struct ParseSignalError(pub String);

impl FromStr for Signal {
    type Err = ParseSignalError;

    /// Accepts `SIGHUP`, `HUP`, `hup` or a positive number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(raw) = trimmed.parse::<i32>() {
            return if raw > 0 {
                Ok(Signal(raw))
            } else {
                Err(ParseSignalError(s.to_string()))
            };
        }

        let upper = trimmed.to_ascii_uppercase();
        let full = if upper.starts_with("SIG") {
            upper
        } else {
            format!("SIG{}", upper)
        };

        NAMED
            .iter()
            .find(|(_, name)| *name == full)
            .map(|(signal, _)| *signal)
            .ok_or_else(|| ParseSignalError(s.to_string()))
    }
}
