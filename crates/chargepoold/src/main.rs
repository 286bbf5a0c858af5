//! chargepoold - The chargepool background service
//!
//! This is the main entry point for the chargepoold service.
//! It wires together all the components:
//! - Configuration loading
//! - Audit store
//! - Allocation and billing runtime
//! - IPC server

use anyhow::{Context, Result};
use chargepool_api::{Event, EventPayload};
use chargepool_config::load_config;
use chargepool_core::Runtime;
use chargepool_ipc::{EventPublisher, Incoming, IpcServer};
use chargepool_store::{AuditEventType, SqliteStore, Store};
use chargepool_util::{default_config_path, SystemClock};
use chargepoold::{audit, handle_command};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// chargepoold - Charger allocation and billing service
#[derive(Parser, Debug)]
#[command(name = "chargepoold")]
#[command(about = "Charger allocation and billing service", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/chargepool/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set CHARGEPOOL_SOCKET env var)
    #[arg(short, long, env = "CHARGEPOOL_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set CHARGEPOOL_DATA_DIR env var)
    #[arg(short, long, env = "CHARGEPOOL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main service state
struct Service {
    runtime: Runtime<SystemClock>,
    ipc: IpcServer,
    store: Arc<dyn Store>,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let config = load_config(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            model = %config.pool.model,
            chargers = config.pool.chargers,
            cost_per_unit = config.pool.cost_per_unit,
            "Configuration loaded"
        );

        let socket_path = args
            .socket
            .clone()
            .unwrap_or_else(|| config.service.socket_path.clone());

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| config.service.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join("chargepoold.db");
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        audit(&*store, AuditEventType::ServiceStarted);
        audit(
            &*store,
            AuditEventType::ConfigLoaded {
                model: config.pool.model,
                chargers: config.pool.chargers,
                cost_per_unit: config.pool.cost_per_unit,
            },
        );

        let runtime = Runtime::from_config(&config, SystemClock)
            .context("Failed to initialize charger pool")?;

        let ipc = IpcServer::bind(&socket_path)
            .with_context(|| format!("Failed to bind socket {:?}", socket_path))?;

        info!(socket_path = %socket_path.display(), "IPC server started");

        Ok(Self {
            runtime,
            ipc,
            store,
        })
    }

    async fn run(self) -> Result<()> {
        let events = self.ipc.publisher();
        let (inbound_tx, mut inbound) = mpsc::unbounded_channel();
        tokio::spawn(self.ipc.serve(inbound_tx));

        // Operations are serialized through this lock
        let runtime = Mutex::new(self.runtime);
        let store = self.store;

        let mut sigterm = signal(SignalKind::terminate())
            .context("Failed to create SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt())
            .context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup())
            .context("Failed to create SIGHUP handler")?;

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                Some(msg) = inbound.recv() => {
                    Self::handle_incoming(&runtime, &events, &store, msg).await;
                }
            }
        }

        info!("Shutting down chargepoold");

        events.publish(Event::new(EventPayload::Shutdown));
        audit(&*store, AuditEventType::ServiceStopped);

        info!("Shutdown complete");
        Ok(())
    }

    async fn handle_incoming(
        runtime: &Mutex<Runtime<SystemClock>>,
        events: &EventPublisher,
        store: &Arc<dyn Store>,
        msg: Incoming,
    ) {
        match msg {
            Incoming::Request {
                peer,
                request,
                reply,
            } => {
                let dispatch = {
                    let mut runtime = runtime.lock().await;
                    handle_command(
                        &mut *runtime,
                        &**store,
                        peer.info(),
                        request.request_id,
                        request.command,
                    )
                };

                for event in dispatch.events {
                    events.publish(event);
                }

                if reply.send(dispatch.response).is_err() {
                    debug!(account = %peer.account(), "Client left before its reply");
                }
            }

            Incoming::Connected { peer } => {
                audit(
                    &**store,
                    AuditEventType::ClientConnected {
                        client_id: peer.client_id().to_string(),
                        uid: peer.info().uid,
                    },
                );
            }

            Incoming::Disconnected { peer } => {
                info!(client_id = %peer.client_id(), account = %peer.account(), "Client disconnected");

                audit(
                    &**store,
                    AuditEventType::ClientDisconnected {
                        client_id: peer.client_id().to_string(),
                    },
                );
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "chargepoold starting"
    );

    let service = Service::new(&args).await?;
    service.run().await
}
