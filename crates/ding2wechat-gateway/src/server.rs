//! Gateway HTTP server — Axum-based receiver endpoint

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::routing::{get, post};
use ding2wechat_core::{Config, DingTalkMessage, DispatchReport, Dispatcher, translate};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use crate::error::RelayError;

/// Shared state for all request handlers
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub dispatcher: Dispatcher,
}

impl GatewayState {
    pub fn new(config: Arc<Config>, dispatcher: Dispatcher) -> Self {
        Self { config, dispatcher }
    }
}

/// The gateway server
pub struct GatewayServer {
    state: GatewayState,
    bind: SocketAddr,
}

impl GatewayServer {
    pub fn new(bind: SocketAddr, state: GatewayState) -> Self {
        Self { state, bind }
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Serve until `shutdown` is cancelled. In-flight relays are allowed to finish.
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(self.bind)
            .await
            .with_context(|| format!("Failed to bind {}", self.bind))?;
        info!("Listening on {}", self.bind);

        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Gateway stopped");
        Ok(())
    }
}

/// Build the Axum router
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(crate::index::index_handler))
        .route("/receiver", post(receiver_handler))
        .fallback(crate::index::index_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// First `name` value in the query string, or empty when absent
fn receiver_name(query: Option<&str>) -> String {
    query
        .and_then(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(k, _)| k == "name")
                .map(|(_, v)| v.into_owned())
        })
        .unwrap_or_default()
}

async fn receiver_handler(
    State(state): State<GatewayState>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<&'static str, RelayError> {
    let name = receiver_name(query.as_deref());
    let span = info_span!("relay", receiver = %name, request_id = %Uuid::new_v4());
    relay(&state, &name, &body).instrument(span).await?;
    Ok("ok")
}

/// Resolve the receiver, translate the body and fan it out.
///
/// Validation failures return before anything is sent. Once dispatch starts the
/// call succeeds no matter how individual targets fare.
pub async fn relay(
    state: &GatewayState,
    name: &str,
    body: &[u8],
) -> Result<DispatchReport, RelayError> {
    let receiver = state
        .config
        .receiver(name)
        .ok_or_else(|| RelayError::UnknownReceiver(name.to_string()))?;

    let source: DingTalkMessage =
        serde_json::from_slice(body).map_err(RelayError::MalformedBody)?;
    let message = translate(&source)?;

    let encoded = serde_json::to_string(&message)
        .map_err(|e| RelayError::Internal(format!("unable to encode message: {}", e)))?;
    debug!(
        "Relaying {} message to {} targets: {}",
        message.msgtype(),
        receiver.targets.len(),
        encoded
    );

    Ok(state.dispatcher.dispatch(receiver, &message).await)
}
