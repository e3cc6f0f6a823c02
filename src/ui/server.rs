//! Server execution logic.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::usecase::GenerationTasks;

use super::{
    handler::http::{debug_presence, health_check, summarize_room},
    handler::websocket::websocket_handler,
    signal::shutdown_signal,
    state::AppState,
};

/// How long shutdown waits for in-flight generation tasks.
const GENERATION_DRAIN_GRACE: Duration = Duration::from_secs(10);

/// Room session coordinator server.
///
/// Encapsulates the wired application state and runs the transport
/// layer until a shutdown signal arrives, then drains in-flight
/// generation work.
pub struct Server {
    state: Arc<AppState>,
    generation_tasks: Arc<GenerationTasks>,
}

impl Server {
    pub fn new(state: Arc<AppState>, generation_tasks: Arc<GenerationTasks>) -> Self {
        Self {
            state,
            generation_tasks,
        }
    }

    /// Run the server.
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8080)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified
    /// address or if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let app = Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/rooms/{room_id}/summary", post(summarize_room))
            .route("/debug/presence", get(debug_presence))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state);

        let bind_addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

        tracing::info!(
            "Room session coordinator listening on {}",
            listener.local_addr()?
        );
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        // Set up graceful shutdown signal handler
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        // Drain in-flight generation work so nothing is orphaned.
        self.generation_tasks.shutdown(GENERATION_DRAIN_GRACE).await;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
