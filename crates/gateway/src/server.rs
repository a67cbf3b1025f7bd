use std::{net::SocketAddr, sync::Arc, time::Instant};

use {
    axum::{
        Router,
        extract::{ConnectInfo, Path, State, WebSocketUpgrade},
        response::{IntoResponse, Json},
        routing::{get, post},
    },
    tower_http::{
        cors::{Any, CorsLayer},
        services::{ServeDir, ServeFile},
    },
    tracing::{debug, info, warn},
};

use padlink_config::PadlinkConfig;

use crate::{state::GatewayState, ws::handle_connection};

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
struct AppState {
    gateway: Arc<GatewayState>,
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(state: Arc<GatewayState>, config: &PadlinkConfig) -> Router {
    let app_state = AppState { gateway: state };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_upgrade_handler))
        .route("/api/create-session", post(create_session_handler))
        .route("/api/session/{id}", get(session_info_handler));

    let router = match &config.web.static_dir {
        Some(dir) => router
            .route_service("/controller", ServeFile::new(dir.join("controller.html")))
            .fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router.layer(cors).with_state(app_state)
}

/// Start the gateway HTTP + WebSocket server. Runs until shutdown.
pub async fn start_gateway(config: PadlinkConfig) -> anyhow::Result<()> {
    let state = GatewayState::new();
    let app = build_gateway_app(Arc::clone(&state), &config);

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Startup banner.
    let lines = [
        format!("padlink gateway v{}", state.version),
        format!("listening on {addr} ({})", state.hostname),
        format!("controller url: http://{addr}/controller"),
    ];
    let width = lines.iter().map(|l| l.len()).max().unwrap_or(0) + 4;
    info!("┌{}┐", "─".repeat(width));
    for line in &lines {
        info!("│  {:<w$}│", line, w = width - 2);
    }
    info!("└{}┘", "─".repeat(width));

    // Spawn the session expiry sweeper.
    let sweep_state = Arc::clone(&state);
    let sweep_interval = config.relay.sweep_interval();
    let idle_threshold = config.relay.idle_threshold();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            let removed = sweep_state
                .registry
                .sweep_expired(Instant::now(), idle_threshold)
                .await;
            if removed > 0 {
                debug!(removed, "swept expired sessions");
            }
        }
    });

    // Run the server with ConnectInfo for remote IP extraction.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        },
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.gateway.version,
        "sessions": state.gateway.registry.count().await,
        "connections": state.gateway.connection_count(),
    }))
}

async fn create_session_handler(State(state): State<AppState>) -> impl IntoResponse {
    let id = state.gateway.registry.create().await;
    info!(session = %id, "session created via http");
    Json(serde_json::json!({ "sessionId": id }))
}

async fn session_info_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.gateway.registry.lookup(&id).await {
        Some(session) => {
            let session = session.lock().await;
            Json(serde_json::json!({
                "exists": true,
                "games": session.game_count(),
                "controllers": session.controller_count(),
            }))
        },
        None => Json(serde_json::json!({
            "exists": false,
            "games": 0,
            "controllers": 0,
        })),
    }
}

async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state.gateway, addr))
}
