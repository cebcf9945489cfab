//! The Observatory world server binary.
//!
//! Wires the kernel together: one world state, one event ledger, one
//! trade book, one message bus, one lifecycle manager, one tick engine,
//! and the two HTTP surfaces (agent gateway + read-only observer) merged
//! onto a single port. No implicit module-level state anywhere -- every
//! singleton is constructed here and threaded through handler state.
//!
//! # Startup sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Resolve configuration from `OBSERVATORY_*` environment variables
//! 3. Load or initialize the world snapshot
//! 4. Open the event ledger (replaying persisted ids)
//! 5. Construct the economy, messaging, and lifecycle singletons
//! 6. Start the tick engine
//! 7. Serve the merged router until ctrl-c, then stop the engine

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use observatory_agents::{LifecycleManager, MessageBus};
use observatory_core::TickEngine;
use observatory_economy::{TradeBook, TransactionLog};
use observatory_gateway::GatewayState;
use observatory_ledger::{EventLedger, ReplayEngine};
use observatory_observer::ObserverState;
use observatory_world::WorldState;

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logging. OBSERVATORY_DEBUG widens the default filter; RUST_LOG
    // still wins when set.
    dotenvy::dotenv().ok();
    let config = ServerConfig::from_env();
    let default_filter = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(true)
        .init();

    info!("observatory-server starting");
    info!(
        state_file = %config.state_file,
        ledger_file = %config.ledger_file,
        tick_duration = ?config.tick_duration,
        domain = %config.domain,
        "Configuration resolved"
    );

    // 2. The canonical world.
    let world = Arc::new(WorldState::load_or_init(&config.state_file));
    world.save()?;
    info!(tick = world.current_tick(), "World ready");

    // 3. The append-only ledger.
    let ledger = Arc::new(EventLedger::open(&config.ledger_file));
    info!(events = ledger.count(), latest_tick = ledger.latest_tick(), "Event ledger ready");

    // 4. Economy, messaging, lifecycle.
    let accounting = Arc::new(TransactionLog::new());
    let trades = Arc::new(TradeBook::new(Arc::clone(&accounting)));
    let messages = Arc::new(MessageBus::new());
    let lifecycle = Arc::new(LifecycleManager::new(Arc::clone(&world)));
    let replay = Arc::new(ReplayEngine::new(Arc::clone(&ledger)));

    // 5. The tick engine.
    let engine = Arc::new(TickEngine::new(
        Arc::clone(&world),
        Arc::clone(&ledger),
        Arc::clone(&trades),
        Arc::clone(&messages),
        config.tick_duration,
    ));
    Arc::clone(&engine).start();

    // 6. HTTP surfaces, merged on one port. The surfaces share the
    // kernel but never credentials: the observer router is GET-only.
    let gateway = observatory_gateway::build_router(Arc::new(GatewayState {
        world: Arc::clone(&world),
        engine: Arc::clone(&engine),
        ledger: Arc::clone(&ledger),
        lifecycle,
        trades,
        messages: Arc::clone(&messages),
        domain: config.domain.clone(),
    }));
    let observer = observatory_observer::build_router(Arc::new(ObserverState {
        world: Arc::clone(&world),
        ledger: Arc::clone(&ledger),
        replay,
        accounting,
        messages,
    }));
    let app = gateway.merge(observer);

    // 7. Serve until ctrl-c.
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Observatory listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    engine.stop();
    info!("observatory-server stopped");
    Ok(())
}
