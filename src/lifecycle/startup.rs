//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn validated configuration into hook registries
//! - Bind each registry to its signal, plus the exit registry
//! - Wrap configured commands as callback actions
//!
//! # Design Decisions
//! - Fail fast: any registration error is returned before the loop starts
//! - Command failures are logged by the action, never propagated

use std::process::Command;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{CommandHookConfig, HookdConfig};
use crate::hooks::{Action, CallbackReaction, HookRegistry, RegistryError};
use crate::lifecycle::backend::SignalBackend;
use crate::lifecycle::dispatcher::{DispatchError, SignalDispatcher};
use crate::lifecycle::signal::{ParseSignalError, Signal};

/// Error raised while wiring configuration into a dispatcher.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Signal(#[from] ParseSignalError),

    #[error("hook \"{hook}\": {source}")]
    Registry {
        hook: String,
        #[source]
        source: RegistryError,
    },

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Build a dispatcher for `config` on top of `backend`.
pub fn build_dispatcher(
    config: &HookdConfig,
    backend: Arc<dyn SignalBackend>,
) -> Result<SignalDispatcher, StartupError> {
    let dispatcher = SignalDispatcher::with_backend(backend);

    let exit_description = if config.exit.description.is_empty() {
        "Handle exit"
    } else {
        config.exit.description.as_str()
    };
    let exit = build_registry("exit", exit_description, &config.exit.callbacks)?;
    dispatcher.register_exit(Arc::new(exit))?;

    for hook in &config.signals {
        let signal: Signal = hook.signal.parse()?;
        let registry = build_registry(&signal.to_string(), &hook.description, &hook.callbacks)?;
        dispatcher.register_for_signal(signal, Arc::new(registry))?;
    }

    tracing::info!(
        signals = config.signals.len(),
        exit_callbacks = config.exit.callbacks.len(),
        "Dispatcher configured"
    );
    Ok(dispatcher)
}

fn build_registry(
    name: &str,
    description: &str,
    callbacks: &[CommandHookConfig],
) -> Result<HookRegistry, StartupError> {
    let registry = HookRegistry::new(name, description);
    for callback in callbacks {
        CallbackReaction::builder()
            .name(&callback.name)
            .description(&callback.description)
            .shared_action(command_action(callback))
            .concurrent(callback.concurrent)
            .weight(callback.weight)
            .build()
            .and_then(|reaction| registry.register_callback(reaction))
            .map_err(|source| StartupError::Registry {
                hook: name.to_string(),
                source,
            })?;
    }
    Ok(registry)
}

/// Action that runs the configured command and logs how it ended.
pub fn command_action(callback: &CommandHookConfig) -> Action {
    let name = callback.name.clone();
    let argv = callback.command.clone();

    Arc::new(move || {
        let Some((program, args)) = argv.split_first() else {
            tracing::warn!(callback = %name, "Callback has no command");
            return;
        };

        match Command::new(program).args(args).status() {
            Ok(status) if status.success() => {
                tracing::debug!(callback = %name, "Command finished");
            }
            Ok(status) => {
                tracing::warn!(callback = %name, status = %status, "Command failed");
            }
            Err(e) => {
                tracing::error!(callback = %name, program = %program, error = %e, "Command could not start");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::lifecycle::backend::SignalStream;
    use std::io;

    struct InertBackend;

    impl SignalBackend for InertBackend {
        fn listen(&self, _signals: &[Signal]) -> io::Result<SignalStream> {
            Ok(Box::new(std::iter::empty()))
        }

        fn restore_defaults(&self, _signals: &[Signal]) {}

        fn terminate(&self, code: i32) -> ! {
            panic!("terminate({code}) not expected in this test")
        }
    }

    #[test]
    fn test_builds_registries_from_config() {
        let config = parse_config(
            r#"
            [exit]
            description = "shutdown"
            [[exit.callbacks]]
            name = "low"
            command = ["true"]
            weight = 1
            [[exit.callbacks]]
            name = "high"
            command = ["true"]
            weight = 9

            [[signals]]
            signal = "usr1"
            description = "dump state"
            [[signals.callbacks]]
            name = "dump"
            command = ["true"]
            concurrent = true
            "#,
        )
        .unwrap();

        let dispatcher = build_dispatcher(&config, Arc::new(InertBackend)).unwrap();

        let exit = dispatcher.exit_registry().unwrap();
        assert_eq!(exit.description(), "shutdown");
        let plan: Vec<_> = exit.plan().into_iter().map(|step| step.name).collect();
        assert_eq!(plan, vec!["high", "low"]);

        let usr1 = dispatcher.registry(Signal::USER1).unwrap();
        assert_eq!(usr1.name(), "SIGUSR1");
        assert!(usr1.plan()[0].concurrent);
    }

    #[test]
    fn test_empty_config_still_has_exit_hook() {
        let dispatcher = build_dispatcher(&HookdConfig::default(), Arc::new(InertBackend)).unwrap();
        let exit = dispatcher.exit_registry().unwrap();
        assert!(exit.is_empty());
        assert_eq!(exit.description(), "Handle exit");
    }

    #[test]
    fn test_unvalidated_duplicate_is_reported() {
        let mut config = HookdConfig::default();
        let callback = CommandHookConfig {
            name: "twice".into(),
            description: String::new(),
            command: vec!["true".into()],
            concurrent: false,
            weight: 0,
        };
        config.exit.callbacks = vec![callback.clone(), callback];

        let err = build_dispatcher(&config, Arc::new(InertBackend)).unwrap_err();
        assert!(matches!(
            err,
            StartupError::Registry {
                source: RegistryError::DuplicateName { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_command_action_runs_program() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let callback = CommandHookConfig {
            name: "touch".into(),
            description: String::new(),
            command: vec!["touch".into(), marker.display().to_string()],
            concurrent: false,
            weight: 0,
        };

        command_action(&callback)();
        assert!(marker.exists());
    }

    #[test]
    fn test_command_action_survives_missing_program() {
        let callback = CommandHookConfig {
            name: "missing".into(),
            description: String::new(),
            command: vec!["/no/such/program".into()],
            concurrent: false,
            weight: 0,
        };
        command_action(&callback)();
    }
}
