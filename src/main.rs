//! MIDI Gamepad
//!
//! Turns MIDI controllers into virtual gamepads.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use midi_gamepad::config::{default_config_path, AppConfig};
use midi_gamepad::controller::{Controller, ControllerList};
use midi_gamepad::sink::SinkBackend;
use midi_gamepad::source::discovery;

/// MIDI Gamepad - Use MIDI controllers as virtual gamepads
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "MIDI_GAMEPAD_CONFIG")]
    config: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Shorthand for --log-level debug
    #[arg(long)]
    debug: bool,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,

    /// Log gamepad actions instead of creating virtual devices
    #[arg(long)]
    dry_run: bool,

    /// Validate the configuration and print the mapping tables
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = if args.debug { "debug" } else { args.log_level.as_str() };
    init_logging(level)?;

    if args.list_ports {
        discovery::print_ports()?;
        return Ok(());
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| default_config_path().to_string_lossy().into_owned());

    info!("Starting MIDI Gamepad v{}...", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", config_path);

    let config = AppConfig::load(&config_path).await?;
    info!(
        "Configuration loaded ({} controllers)",
        config.controller.len()
    );

    if args.check {
        print_mappings(&config)?;
        return Ok(());
    }

    let backend = if args.dry_run {
        warn!("Dry run: gamepad actions will only be logged");
        SinkBackend::DryRun
    } else {
        SinkBackend::Uinput
    };

    let controllers = start_controllers(&config, backend).await?;
    info!("{} controllers running, press Ctrl+C to exit", controllers.len());

    shutdown_signal().await;

    controllers.stop_all().await;
    info!("MIDI Gamepad shutdown complete");
    Ok(())
}

/// Open every configured controller
///
/// On the first failure the controllers opened so far are stopped.
async fn start_controllers(config: &AppConfig, backend: SinkBackend) -> Result<ControllerList> {
    let mut controllers = ControllerList::new();

    for controller_config in &config.controller {
        debug!("Opening controller '{}'", controller_config.port_name);

        match Controller::start(controller_config.clone(), backend).await {
            Ok(controller) => controllers.push(controller),
            Err(e) => {
                controllers.stop_all().await;
                return Err(e).with_context(|| {
                    format!(
                        "Failed to start controller '{}'",
                        controller_config.port_name
                    )
                });
            }
        }
    }

    Ok(controllers)
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        return;
    }
    info!("Shutdown signal received");
}

fn print_mappings(config: &AppConfig) -> Result<()> {
    use colored::*;

    println!("\n{}", "=== Mapping Tables ===".bold().cyan());

    for controller in &config.controller {
        let mappings = controller
            .build_mappings()
            .with_context(|| format!("Invalid mappings for '{}'", controller.port_name))?;
        let identity = controller.identity();

        println!(
            "\n{} {}",
            controller.port_name.bold(),
            format!(
                "({:04x}:{:04x}, {} mappings)",
                identity.vendor_id,
                identity.product_id,
                mappings.len()
            )
            .dimmed()
        );

        for (i, mapping) in mappings.iter().enumerate() {
            println!("  {:>3}. {}", i, mapping.to_string().green());
        }
    }
    println!();

    Ok(())
}
