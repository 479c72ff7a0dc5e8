use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;

use crate::{
    config::StatusPageStyle,
    status::{BotState, BotStatus, StatusBoard},
    system::HostLoad,
};

#[derive(Clone)]
pub struct WebState {
    pub status: Arc<StatusBoard>,
    pub page_style: StatusPageStyle,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct MetricsResponse {
    timestamp: String,
    uptime: u64,
    #[serde(flatten)]
    host: HostLoad,
    bot_status: BotStatus,
}

pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serve the liveness endpoints on `0.0.0.0:port` until the process dies.
pub async fn serve(port: u16, state: WebState) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    log::info!("Web server listening on http://{}", addr);
    axum::serve(listener, router(state)).await
}

/// GET /
async fn home(State(state): State<WebState>) -> Html<String> {
    match state.page_style {
        StatusPageStyle::Minimal => Html(String::from("🤖 Bot active")),
        StatusPageStyle::Full => Html(full_page(&state.status.snapshot())),
    }
}

/// GET /health
///
/// Healthy only while the bot is actually running.
async fn health(State(state): State<WebState>) -> Response {
    match state.status.state() {
        BotState::Running => {
            (StatusCode::OK, Json(HealthResponse { status: "healthy" })).into_response()
        }
        BotState::Initializing | BotState::Unhealthy => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unhealthy",
            }),
        )
            .into_response(),
    }
}

/// GET /status
async fn status(State(state): State<WebState>) -> Json<BotStatus> {
    Json(state.status.snapshot())
}

/// GET /metrics
async fn metrics(State(state): State<WebState>) -> Result<Json<MetricsResponse>, StatusCode> {
    let status = state.status.clone();
    let host = tokio::task::spawn_blocking(move || status.host().sample())
        .await
        .map_err(|e| {
            log::error!("Host load sampling panicked: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let bot_status = state.status.snapshot();
    Ok(Json(MetricsResponse {
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime: bot_status.uptime,
        host,
        bot_status,
    }))
}

fn full_page(status: &BotStatus) -> String {
    let (badge_class, badge) = match status.status {
        BotState::Running => ("online", "🟢 ONLINE"),
        BotState::Initializing => ("starting", "🟡 STARTING"),
        BotState::Unhealthy => ("offline", "🔴 UNHEALTHY"),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>🤖 Trading Bot</title>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>
        body {{
            font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            margin: 0;
            display: flex;
            justify-content: center;
            align-items: center;
            min-height: 100vh;
            color: white;
        }}
        .container {{
            background: rgba(255, 255, 255, 0.1);
            border-radius: 20px;
            padding: 40px;
            text-align: center;
            max-width: 600px;
            width: 90%;
        }}
        .status, .endpoints {{
            background: rgba(255, 255, 255, 0.15);
            border-radius: 10px;
            padding: 20px;
            margin: 20px 0;
        }}
        .endpoints {{ text-align: left; }}
        code {{
            background: rgba(0, 0, 0, 0.3);
            padding: 2px 6px;
            border-radius: 4px;
        }}
        .badge {{
            display: inline-block;
            padding: 5px 15px;
            border-radius: 20px;
            font-weight: bold;
        }}
        .online {{ background: #10B981; }}
        .starting {{ background: #F59E0B; }}
        .offline {{ background: #EF4444; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>🤖 Trading Bot</h1>
        <p>Telegram trading bot</p>
        <div class="status">
            <h3>System status</h3>
            <p><strong>Status:</strong> <span class="badge {badge_class}">{badge}</span></p>
            <p><strong>Uptime:</strong> {uptime} seconds</p>
            <p><strong>Commands processed:</strong> {commands}</p>
            <p><strong>Active users:</strong> {users}</p>
        </div>
        <div class="endpoints">
            <h4>Endpoints:</h4>
            <ul>
                <li><code>GET /</code> - This page</li>
                <li><code>GET /health</code> - Health check</li>
                <li><code>GET /status</code> - Bot status</li>
                <li><code>GET /metrics</code> - Metrics</li>
            </ul>
        </div>
    </div>
</body>
</html>
"#,
        uptime = status.uptime,
        commands = status.commands_processed,
        users = status.users_active,
    )
}
