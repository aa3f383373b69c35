//! Composition root: config → ledger → gateway → control loop → HTTP.

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use autopilot::{
    auth::ApiKey,
    config::Config,
    control::{RunFlag, Shutdown},
    engine::{ControlLoop, LoopConfig, LoopStats},
    events::EventBus,
    gateway::Gateway,
    ledger,
    routes,
    state::build_state,
    surface::ControlSurface,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load .env ──────────────────────────────────────────────────────────
    dotenvy::dotenv().ok();

    // ── 2. Structured logging ─────────────────────────────────────────────────
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("autopilot=debug".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    info!(r#"

  ╔═══════════════════════════════════════════════════════╗
  ║           AUTOPILOT — Position Manager                ║
  ║  Gateway · State Machine · Ledger · Control Surface   ║
  ╚═══════════════════════════════════════════════════════╝"#);

    // ── 3. Config ─────────────────────────────────────────────────────────────
    let config = Config::from_env().context("Failed to load config")?;
    info!(
        pair     = %config.pair,
        interval = %config.bar_interval,
        market   = %config.market_url,
        forecast = config.forecast_url.as_deref().unwrap_or("built-in trend"),
        running  = config.start_enabled,
        "Config loaded"
    );

    // ── 4. Collaborators ──────────────────────────────────────────────────────
    let ledger   = ledger::open(&config).await?;
    let client   = reqwest::Client::new();
    let gateway  = Gateway::from_config(&config, client);
    let run_flag = RunFlag::new(config.start_enabled);
    let stats    = Arc::new(LoopStats::new());
    let events   = EventBus::default();

    if !config.start_enabled {
        info!("Loop starts paused. POST /api/control/toggle {{\"state\":\"on\"}} to start");
    }

    // ── 5. Control loop task ──────────────────────────────────────────────────
    let (shutdown, shutdown_rx) = Shutdown::new();
    let control_loop = ControlLoop::new(
        LoopConfig::from_config(&config),
        gateway.clone(),
        ledger.clone(),
        run_flag.clone(),
        stats.clone(),
        events.clone(),
    );
    let loop_handle = control_loop.spawn(shutdown_rx);

    // ── 6. Control surface ────────────────────────────────────────────────────
    let surface = ControlSurface::new(
        run_flag,
        gateway,
        ledger,
        stats,
        events,
        config.pair.clone(),
        config.ledger_max_limit,
    );
    let app = routes::router(build_state(surface), ApiKey::from_env());

    // ── 7. Bind & Serve ───────────────────────────────────────────────────────
    info!(addr = ?config.bind_addr, "🚀 Autopilot server starting");
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    // Ctrl-C flips the shared signal; the server and the loop both watch it.
    let shutdown = Arc::new(shutdown);
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Ctrl-C received, shutting down");
                    shutdown.trigger();
                }
                Err(e) => error!(error = %e, "Failed to listen for Ctrl-C"),
            }
        });
    }

    let mut server_shutdown = shutdown.subscribe();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            // Err means the sender is gone, which is also a stop.
            let _ = server_shutdown.changed().await;
        })
        .await;

    // ── 8. Stop the loop (a started ledger append finishes first) ─────────────
    shutdown.trigger();
    if let Err(e) = loop_handle.await {
        error!(error = %e, "Control loop task ended abnormally");
    }

    served.context("HTTP server error")?;
    info!("👋 Autopilot stopped");
    Ok(())
}
