mod cli;
mod error_fmt;
mod run;
mod sink;
mod source;

use clap::Parser;
use cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use reptrack_config::Logging;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

fn init_tracing(json: bool, level: &str, logging: &Logging) {
    // RUST_LOG wins over --log-level
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(console_filter)
            .boxed()
    };

    let file_layer = logging.file.as_ref().map(|path| {
        let path = std::path::Path::new(path);
        let dir = path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        let name = path.file_name().map_or_else(|| "reptrack.log".into(), |n| n.to_os_string());
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let file_filter = EnvFilter::new(logging.level.as_deref().unwrap_or("info"));
        fmt::layer()
            .json()
            .with_writer(writer)
            .with_filter(file_filter)
    });

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init();
}

fn dispatch(cli: Cli, shutdown: Arc<AtomicBool>) -> eyre::Result<()> {
    let cfg = run::load_config(cli.config.as_deref())?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging);
    tracing::debug!(config = ?cli.config, "config loaded");
    let ctx = run::Ctx::new(cfg, cli.json, cli.history, shutdown)?;

    match cli.cmd {
        Commands::Replay { exercise, input } => run::replay(&ctx, &exercise, &input),
        Commands::Timed {
            input,
            exercise,
            sets,
            seed,
        } => run::timed(&ctx, &input, exercise, sets, seed),
        Commands::Ladder {
            exercise,
            input,
            feed,
            preview,
            weight,
        } => match input {
            Some(input) if !preview => run::ladder(&ctx, &exercise, &input, feed, weight),
            _ => {
                ctx.registry.require(&exercise)?;
                run::ladder_preview(&ctx)
            }
        },
        Commands::Plan {
            plan,
            input,
            feed,
            dry_run,
        } => match input {
            Some(input) if !dry_run => run::plan(&ctx, &plan, &input, feed),
            _ => run::plan_dry_run(&ctx, &plan),
        },
        Commands::Exercises => run::exercises(&ctx),
    }
}

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        if let Err(e) = ctrlc::set_handler(move || shutdown.store(true, Ordering::Relaxed)) {
            eprintln!("warning: could not install Ctrl-C handler: {e}");
        }
    }

    if let Err(err) = dispatch(cli, shutdown) {
        tracing::error!(error = %err, "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", error_fmt::format_error_json(&err));
        } else {
            eprintln!("{}", error_fmt::humanize(&err));
        }
        std::process::exit(error_fmt::exit_code_for_error(&err));
    }
}
