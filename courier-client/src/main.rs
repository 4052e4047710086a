//! courier-probe - connect to a dispatcher as a gate or game and log traffic
//!
//! Useful for checking dispatcher reachability and watching reconnects.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use courier_client::config::{new_config_handle, ConfigHandle, DEFAULT_CONFIG_TOML};
use courier_client::{
    CallbackDelegate, ConfigLoader, ConnectionManager, DispatcherConnection, ManagerOptions,
    TcpConnector,
};
use courier_protocol::{MsgType, Packet};
use courier_utils::{config_file, init_logging_with_config, Result};
use tracing::{info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if args.print_default_config {
        print!("{}", DEFAULT_CONFIG_TOML);
        return Ok(());
    }

    init_logging_with_config(args.log_config())?;
    info!("courier-probe starting");
    tracing::debug!("CLI args: {:?}", args);

    match run(args).await {
        Ok(()) => {
            info!("courier-probe exiting normally");
            Ok(())
        }
        Err(e) => {
            tracing::error!("courier-probe error: {}", e);
            eprintln!("Error: {}", e);
            Err(e)
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config_path = args.config.clone().unwrap_or_else(config_file);
    let config = match &args.config {
        Some(path) => {
            let config = ConfigLoader::load_from_path(path)?;
            ConfigLoader::validate(&config)?;
            config
        }
        None => ConfigLoader::load_and_validate()?,
    };
    let config = new_config_handle(config);

    spawn_reload_on_hangup(config_path, Arc::clone(&config));

    let dispatcher_id = args.dispatcher;
    let delegate = CallbackDelegate::new(
        move |msg_type: MsgType, payload: Bytes| {
            info!(dispatcher_id, %msg_type, len = payload.len(), "Packet from dispatcher");
        },
        move || {
            warn!(dispatcher_id, "Lost dispatcher connection");
        },
    );

    let options = ManagerOptions::new(args.kind.into(), dispatcher_id).restoring(args.restore);
    let manager = Arc::new(ConnectionManager::new(
        options,
        TcpConnector::new(config),
        delegate,
    ));
    manager.set_local_id(args.id);

    info!(%manager, kind = %manager.kind(), local_id = args.id, "Connecting");
    manager.connect().await;

    if let Some(interval) = args.ping_interval() {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let mut seq: u64 = 0;
            loop {
                ticker.tick().await;
                seq += 1;
                let packet = Packet::new(MsgType::FIRST_APPLICATION, seq.to_be_bytes().to_vec());
                match manager.current_connection_for_send() {
                    Some(conn) => {
                        if let Err(e) = conn.send_packet(packet) {
                            warn!(seq, error = %e, "Ping not sent");
                        }
                    }
                    None => warn!(seq, "No dispatcher connection available"),
                }
            }
        });
    }

    tokio::signal::ctrl_c().await?;
    info!("Interrupted, shutting down");
    Ok(())
}

#[cfg(unix)]
fn spawn_reload_on_hangup(path: PathBuf, config: ConfigHandle) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            warn!(error = %e, "SIGHUP handler unavailable, config reload disabled");
            return;
        }
    };

    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            if let Err(e) = ConfigLoader::reload(&path, &config) {
                warn!(path = %path.display(), error = %e, "Config reload failed, keeping previous");
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_reload_on_hangup(_path: PathBuf, _config: ConfigHandle) {}
