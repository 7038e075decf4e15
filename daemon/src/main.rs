//! hapticd
//!
//! A Linux daemon that plays named haptic effects on a force-feedback
//! actuator and exposes the playback engine over D-Bus.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use hapticd::{
    config::Config,
    dbus::{init_dbus_service, VibratorService, DBUS_NAME, DBUS_PATH},
    engine::new_shared_engine,
    evdev::list_devices,
    touch::{BusTouchLocator, TouchFeatureClient},
};

/// hapticd - haptic effect playback service
#[derive(Parser, Debug)]
#[command(name = "hapticd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/hapticd/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// List all input devices with their force-feedback capabilities and exit
    #[arg(long)]
    list_devices: bool,

    /// Write the effective configuration to the config file and exit
    #[arg(long)]
    write_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("hapticd starting...");

    let loaded = match &args.config {
        Some(path) => Config::load(path),
        None => Config::load_default(),
    };

    if args.write_config {
        // A file that failed to load is never overwritten with defaults
        loaded?.save()?;
        return Ok(());
    }

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load config, using defaults: {}", e);
            Config::default()
        }
    };

    if args.list_devices {
        print_devices(&config);
        return Ok(());
    }

    // Device discovery happens once; a missing device disables playback
    let engine = new_shared_engine(config.firmware.to_dirs());
    {
        let mut engine = engine
            .lock()
            .map_err(|e| format!("playback engine lock poisoned: {}", e))?;
        match engine.initialize(&config.device.input_dir, &config.device.driver_name) {
            Ok(()) => {
                if let Some(device) = engine.device() {
                    let info = device.info();
                    info!(
                        path = %info.path.display(),
                        capabilities = %info.ff_capabilities.join(","),
                        "Haptics device ready"
                    );
                }
            }
            Err(e) => warn!("Haptics device unavailable, every play will fail: {}", e),
        }
    }

    let touch = Arc::new(TouchFeatureClient::new(BusTouchLocator::new(
        config.service.bus,
        config.service.touch_service.clone(),
    )));

    let service = VibratorService::new(Arc::clone(&engine), config.device.clone(), touch);
    let _connection = match init_dbus_service(config.service.bus, service).await {
        Ok(conn) => {
            info!(name = DBUS_NAME, path = DBUS_PATH, "D-Bus service initialized successfully");
            conn
        }
        Err(e) => {
            error!("Failed to initialize D-Bus service: {}", e);
            return Err(e.into());
        }
    };

    info!("hapticd ready");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting...");

    if let Ok(mut engine) = engine.lock() {
        engine.turn_off();
    }

    Ok(())
}

/// Print every input device and its force-feedback capabilities
fn print_devices(config: &Config) {
    let input_dir = &config.device.input_dir;
    println!("Scanning {} for input devices...\n", input_dir.display());

    let devices = list_devices(input_dir);

    if devices.is_empty() {
        println!("No readable input devices found.");
        println!("\nTroubleshooting:");
        println!("  - Run as a user that can open {}/event*", input_dir.display());
        println!("  - Check the haptics driver is loaded");
        return;
    }

    println!("Found {} device(s):\n", devices.len());

    for (i, device) in devices.iter().enumerate() {
        let marker = if device.name == config.device.driver_name && device.is_haptic() {
            " [haptics]"
        } else {
            ""
        };
        println!("{}. {}{}", i + 1, device.name, marker);
        println!("   Path:           {:?}", device.path);
        if device.ff_capabilities.is_empty() {
            println!("   Force feedback: none");
        } else {
            println!("   Force feedback: {}", device.ff_capabilities.join(", "));
        }
        println!();
    }
}
