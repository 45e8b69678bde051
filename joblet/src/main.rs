use std::process;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::BufReader;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use joblet::{Dispatcher, PoolConfig, ProcessSpawner};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let capacity_arg = match parse_args(&args) {
        Ok(v) => v,
        Err(msg) => {
            if !msg.is_empty() {
                eprintln!("error: {msg}");
                eprintln!();
            }
            eprintln!("Usage: joblet [capacity]");
            eprintln!();
            eprintln!("Reads one shell command per line from standard input and runs each");
            eprintln!("as an OS process, with at most <capacity> running at once.");
            eprintln!();
            eprintln!("Arguments:");
            eprintln!("  [capacity]    Maximum concurrent jobs [default: available parallelism]");
            process::exit(2);
        }
    };

    init_tracing();

    let config = match PoolConfig::from_arg(capacity_arg.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run(config) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn parse_args(args: &[String]) -> Result<Option<String>, String> {
    let mut capacity: Option<String> = None;

    for arg in &args[1..] {
        match arg.as_str() {
            "--help" | "-h" => return Err("".to_string()),
            // A leading dash that parses as a number is a (bad) capacity
            // argument, handled by config resolution, not an unknown flag.
            arg if arg.starts_with('-') && arg.parse::<i64>().is_err() => {
                return Err(format!("unknown flag: {arg}"));
            }
            arg => {
                if capacity.is_some() {
                    return Err(format!("unexpected argument: {arg}"));
                }
                capacity = Some(arg.to_string());
            }
        }
    }

    Ok(capacity)
}

/// Initialize tracing with JOBLET_LOG and LOG_FORMAT support.
fn init_tracing() {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match std::env::var("JOBLET_LOG").as_deref() {
            Ok("debug") => "debug",
            Ok("warn") | Ok("warning") => "warn",
            Ok("error") => "error",
            _ => "info",
        };
        EnvFilter::new(format!("joblet={level}"))
    };

    let use_json = std::env::var("LOG_FORMAT").as_deref() == Ok("json");

    if use_json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    }
}

fn run(config: PoolConfig) -> anyhow::Result<()> {
    // Single-threaded control: all parallelism comes from the spawned jobs.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;

    runtime.block_on(async {
        tracing::info!(
            capacity = config.capacity,
            "joblet {}",
            env!("CARGO_PKG_VERSION")
        );

        let mut dispatcher = Dispatcher::new(&config, Arc::new(ProcessSpawner));
        dispatcher
            .run(BufReader::new(tokio::io::stdin()))
            .await
            .context("reading job input")
    })
}
