//! Socks-Bridge Daemon - manages the socks-forwarder unit via Unix socket.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use socks_bridge::config::Settings;
use socks_bridge::socket::SocketListener;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");

const DEFAULT_CONFIG_PATH: &str = "/etc/socks-bridge/daemon.toml";

fn main() -> ExitCode {
    // Parse command line arguments (simple std::env approach)
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return ExitCode::SUCCESS;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("{} {}", NAME, VERSION);
        return ExitCode::SUCCESS;
    }

    let config_path = config_path_from_args(&args);

    let settings = match Settings::load(&config_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&settings) {
        eprintln!("Error initializing logging: {}", e);
        return ExitCode::FAILURE;
    }

    info!(
        config = %config_path,
        socket = %settings.socket.path.display(),
        unit = %settings.forwarder.unit,
        "Starting {} v{}",
        NAME,
        VERSION
    );

    let runtime = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");
    match runtime.block_on(run_daemon(settings, config_path)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Daemon failed");
            ExitCode::FAILURE
        }
    }
}

/// Bind the listener, serve until a termination signal arrives, then
/// drain connections. SIGHUP revalidates the configuration file.
async fn run_daemon(
    settings: Settings,
    config_path: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = Arc::new(SocketListener::bind(Arc::new(settings)).await?);

    let shutdown = Arc::new(Notify::new());
    let mut server = {
        let listener = Arc::clone(&listener);
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move { listener.run(shutdown).await })
    };

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    loop {
        tokio::select! {
            result = &mut server => {
                // The listener only exits on its own if it failed
                return match result {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => {
                        error!(error = %e, "Socket listener failed");
                        Err(e.into())
                    }
                    Err(e) => {
                        error!(error = %e, "Listener task panicked");
                        Err(e.into())
                    }
                };
            }
            _ = sigint.recv() => {
                info!("SIGINT received, initiating graceful shutdown...");
                break;
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received, initiating graceful shutdown...");
                break;
            }
            _ = sighup.recv() => {
                info!("SIGHUP received, reloading configuration...");
                match Settings::load(&config_path) {
                    // The bound listener keeps its settings until restart
                    Ok(_) => info!("Configuration reloaded successfully"),
                    Err(e) => {
                        error!(error = %e, "Failed to reload configuration, keeping existing settings");
                    }
                }
            }
        }
    }

    shutdown.notify_waiters();

    let drain_timeout = Duration::from_secs(30);
    match tokio::time::timeout(drain_timeout, listener.wait_for_drain()).await {
        Ok(()) => info!("Graceful shutdown complete"),
        Err(_) => warn!(
            "Shutdown timeout after {}s, some connections may be terminated",
            drain_timeout.as_secs()
        ),
    }

    let _ = server.await;
    info!("Daemon stopped");
    Ok(())
}

/// Print usage message.
fn print_usage() {
    println!(
        r#"{} {}
Daemon managing the socks-forwarder unit and HCI diagnostics via Unix socket.

USAGE:
    {} [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file
                           [default: {}]
    -h, --help             Print help information
    -V, --version          Print version information
"#,
        NAME, VERSION, NAME, DEFAULT_CONFIG_PATH
    );
}

/// Get configuration file path from command line arguments.
fn config_path_from_args(args: &[String]) -> String {
    for (i, arg) in args.iter().enumerate() {
        if (arg == "--config" || arg == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return path.to_string();
        }
    }
    DEFAULT_CONFIG_PATH.to_string()
}

/// Initialize logging based on settings.
fn init_logging(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    match settings.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            // Default to pretty format
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
