//! hookd: run configured commands on OS signals and at process exit.
//!
//! ```text
//!                 ┌───────────────────────────────────────────────┐
//!                 │                    hookd                      │
//!   hookd.toml ──▶│ config ──▶ lifecycle::startup                 │
//!                 │               │                               │
//!                 │               ▼                               │
//!   SIGHUP ──────▶│ SignalDispatcher ──▶ HookRegistry (SIGHUP)    │
//!   SIGUSR1 ─────▶│       │          ──▶ HookRegistry (SIGUSR1)   │
//!   SIGTERM ─────▶│       └─ exit ──▶ HookRegistry (exit) ──▶ exit│
//!                 └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use hookloop::config::{load_config, HookdConfig};
use hookloop::lifecycle::{build_dispatcher, OsSignals, SignalDispatcher};
use hookloop::observability::init_logging;

#[derive(Parser)]
#[command(name = "hookd")]
#[command(about = "Run weighted hooks on OS signals and at exit", long_about = None)]
struct Cli {
    /// Path to the TOML configuration.
    #[arg(short, long, default_value = "hookd.toml")]
    config: PathBuf,

    /// Override the configured log level.
    #[arg(short, long, value_parser = ["trace", "debug", "info", "warn", "error"])]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen for signals until a termination signal arrives
    Run,
    /// Validate the configuration and print the execution plan
    Check {
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }

    match cli.command {
        Commands::Run => {
            init_logging(&config.observability)?;
            tracing::info!(config = %cli.config.display(), "hookd v0.1.0 starting");

            let dispatcher = build_dispatcher(&config, Arc::new(OsSignals::new()))?;
            dispatcher.run()?;

            tracing::info!("Signal loop stopped");
        }
        Commands::Check { json } => {
            let dispatcher = build_dispatcher(&config, Arc::new(OsSignals::new()))?;
            print_plan(&config, &dispatcher, json)?;
        }
    }

    Ok(())
}

fn print_plan(
    config: &HookdConfig,
    dispatcher: &SignalDispatcher,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut hooks = Vec::new();
    if let Some(exit) = dispatcher.exit_registry() {
        hooks.push(("exit".to_string(), exit));
    }
    for signal in dispatcher.watched_signals() {
        if let Some(registry) = dispatcher.registry(signal) {
            hooks.push((signal.to_string(), registry));
        }
    }

    if json {
        let plan: serde_json::Map<String, serde_json::Value> = hooks
            .iter()
            .map(|(name, registry)| Ok((name.clone(), serde_json::to_value(registry.plan())?)))
            .collect::<Result<_, serde_json::Error>>()?;
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!(
        "{} signal hook(s), watching: {}",
        config.signals.len(),
        dispatcher
            .watched_signals()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    for (name, registry) in &hooks {
        println!("\n[{}] {}", name, registry.description());
        for step in registry.plan() {
            let mode = if step.concurrent { "concurrent" } else { "sequential" };
            println!("  {:>5}  {:<24} {}", step.weight, step.name, mode);
        }
    }
    Ok(())
}
