use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use speedswap::SpeedSwapPlugin;
use speedswap_host::{Host, HostConfig};
use tokio::io::AsyncBufReadExt;
use tracing::info;

const CONFIG_PATH: &str = "host.toml";
const PLUGIN_DIR: &str = "plugins";

#[tokio::main]
async fn main() {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| CONFIG_PATH.into());
    let config = match HostConfig::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            std::process::exit(1);
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        "{} v{} starting ({} ticks/s)",
        config.server.name,
        env!("CARGO_PKG_VERSION"),
        config.server.tick_rate
    );
    info!(
        "World: {} (seed: {}, max worlds: {})",
        config.world.name,
        config.world.seed,
        config
            .world
            .max_worlds
            .map_or_else(|| "unlimited".to_string(), |n| n.to_string())
    );

    let mut host = Host::from_config(&config);
    host.register_plugin(Box::new(SpeedSwapPlugin::new()));
    host.load_plugin_configs(Path::new(PLUGIN_DIR));
    host.enable_plugins();

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    // Handle Ctrl+C
    let shutdown_tx_ctrlc = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received");
        let _ = shutdown_tx_ctrlc.send(true);
    });

    // Console REPL: read lines from stdin
    let (console_tx, mut console_rx) = tokio::sync::mpsc::channel::<String>(32);
    tokio::spawn(async move {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.send(line).await.is_err() {
                break;
            }
        }
    });

    let mut tick_interval = tokio::time::interval(Duration::from_millis(config.tick_millis()));
    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                host.game_tick();
            }
            Some(line) = console_rx.recv() => {
                let result = host.handle_console_command(&line);
                for message in &result.messages {
                    println!("{message}");
                }
                if result.should_stop {
                    let _ = shutdown_tx.send(true);
                }
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    host.shutdown();
    info!("Host shut down.");
}
