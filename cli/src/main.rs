//! CLI entrypoint for agentsh
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use agentsh_application::{AgentShell, ShellEvent, ShellEventSink};
use agentsh_domain::{SessionKey, SystemClock};
use agentsh_infrastructure::{
    ChangeOutcome, CommandToolLoader, ConfigLoader, FileConfig, FileSessionStore, ToolChange,
    ToolRegistry, ToolWatcher, build_runtime, init_logging,
};
use agentsh_presentation::{
    Cli, ConsoleSink, RuntimeEnvironment, ShellRepl, SystemPromptBuilder, collect_tasks,
    report_shell_error, run_tasks,
};
use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(());
    }

    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };
    apply_cli_overrides(&mut config, &cli);

    let _log_guard = init_logging(cli.verbose, cli.quiet, &config.logging);
    config.validate().context("Invalid configuration")?;

    info!("Starting agentsh");

    let working_dir = std::env::current_dir().context("Cannot determine working directory")?;
    let tools_dir = resolve(&working_dir, &config.tools.dir);
    let sessions_dir = resolve(&working_dir, &config.session.dir);

    let events = Arc::new(ConsoleSink::new().with_quiet(cli.quiet));

    // === Tools ===
    if let Err(e) = std::fs::create_dir_all(&tools_dir) {
        warn!(path = %tools_dir.display(), error = %e, "Cannot create tools directory");
    }
    let registry = Arc::new(
        ToolRegistry::new().register_loader(CommandToolLoader::new().with_working_dir(&working_dir)),
    );
    let report = registry.load(&tools_dir);
    for error in &report.errors {
        events.emit(ShellEvent::warning(format!("Skipped tool unit {}", error)));
    }

    let watcher = if config.tools.watch {
        start_watcher(
            &tools_dir,
            config.tools.debounce(),
            Arc::clone(&registry),
            events.clone(),
        )
    } else {
        None
    };

    // === Session and runtime ===
    let store = Arc::new(FileSessionStore::new(&sessions_dir));
    let key = SessionKey::resolve(&config.session.prefix, &SystemClock);
    let runtime = build_runtime(&config.runtime).context("Failed to create reasoning runtime")?;

    let system_prompt = SystemPromptBuilder::new(
        &working_dir,
        RuntimeEnvironment {
            tools_dir: tools_dir.clone(),
            hot_reload: watcher.is_some(),
            session_key: key.to_string(),
            provider: runtime.name().to_string(),
            working_dir: working_dir.clone(),
        },
    )
    .with_extra(std::env::var("SYSTEM_PROMPT").ok())
    .build();

    let shell = Arc::new(
        AgentShell::new(runtime, registry.clone(), store, key)
            .with_events(events.clone())
            .with_system_prompt(system_prompt),
    );

    if let Err(e) = shell.resume().await {
        report_shell_error(&e);
    }

    // === Input modes ===
    let stdin_is_terminal = std::io::stdin().is_terminal();
    let piped = if stdin_is_terminal {
        None
    } else {
        let mut input = String::new();
        match tokio::io::stdin().read_to_string(&mut input).await {
            Ok(_) => Some(input),
            Err(e) => {
                warn!(error = %e, "Failed to read piped input");
                None
            }
        }
    };
    let query = cli.query_text();
    let tasks = collect_tasks(piped.as_deref(), query.as_deref());

    let result = if !tasks.is_empty() {
        let summary = run_tasks(&shell, &tasks).await;
        info!(
            completed = summary.completed,
            failed = summary.failed,
            "Tasks finished"
        );
        Ok(())
    } else if !stdin_is_terminal {
        // Empty pipe: nothing to do and no terminal to prompt on
        Ok(())
    } else {
        ShellRepl::new(Arc::clone(&shell))
            .with_history_file(config.repl.history_path())
            .with_welcome(config.repl.show_welcome && !cli.quiet)
            .with_tools_dir(&tools_dir, watcher.is_some())
            .run()
            .await
            .context("REPL failed")
    };

    if let Some(watcher) = watcher {
        watcher.stop().await;
    }

    result
}

/// Command-line flags override every configuration source.
fn apply_cli_overrides(config: &mut FileConfig, cli: &Cli) {
    if let Some(provider) = &cli.provider {
        config.runtime.provider = provider.clone();
    }
    if let Some(model) = &cli.model {
        config.runtime.model = model.clone();
    }
    if cli.no_stream {
        config.runtime.stream = false;
    }
    if let Some(dir) = &cli.tools_dir {
        config.tools.dir = dir.clone();
    }
    if let Some(dir) = &cli.sessions_dir {
        config.session.dir = dir.clone();
    }
    if let Some(prefix) = &cli.session_prefix {
        config.session.prefix = prefix.clone();
    }
    if cli.no_watch {
        config.tools.watch = false;
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Watch the tools directory, feeding every settled change into the registry.
///
/// Observation starts from the files the registry already holds, so a unit
/// written after the initial scan still arrives. Failure to watch degrades
/// to the tool set loaded at startup.
fn start_watcher(
    tools_dir: &Path,
    debounce: Duration,
    registry: Arc<ToolRegistry>,
    events: Arc<ConsoleSink>,
) -> Option<ToolWatcher> {
    let sink = Arc::clone(&events);
    let known = registry.tracked_paths();
    let started = ToolWatcher::start_from(tools_dir, debounce, known, move |change: ToolChange| {
        let outcome = registry.apply_change(&change.path, change.kind);
        let error = match &outcome {
            ChangeOutcome::Ignored => return,
            ChangeOutcome::Failed { error, .. } => Some(error.to_string()),
            ChangeOutcome::Loaded { .. } | ChangeOutcome::Removed { .. } => None,
        };
        let snapshot = registry.snapshot();
        sink.emit(ShellEvent::ToolsReloaded {
            generation: snapshot.generation(),
            tool_count: snapshot.len(),
            change: outcome.to_string(),
            error,
        });
    });

    match started {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            warn!(error = %e, "Tool hot reload unavailable");
            events.emit(ShellEvent::warning(format!(
                "Hot reload disabled ({}); using the tools loaded at startup",
                e
            )));
            None
        }
    }
}
