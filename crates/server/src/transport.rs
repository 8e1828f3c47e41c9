//! WebSocket transport.
//!
//! Every upgraded socket is split into a reader loop and a writer task. The
//! writer drains the connection's outbound queue, bounding each socket send by
//! the configured timeout. Whichever side finishes first ends the connection,
//! and the hub is told exactly once on the way out.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use noughts_wire::{Codec, Frame, Inbound};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::hub::{Attached, Hub, Outbound};
use crate::registry::ConnectionId;
use crate::{ServerConfig, ServerError};

#[derive(Clone)]
struct AppState {
    hub: Arc<Hub>,
    send_timeout: Duration,
}

/// Routes: `/ws` (JSON text frames), `/ws/binary` (Protobuf binary frames)
/// and `/health`.
pub fn router(hub: Arc<Hub>, send_timeout: Duration) -> Router {
    Router::new()
        .route("/ws", get(json_handler))
        .route("/ws/binary", get(binary_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { hub, send_timeout })
}

/// Bind the configured listen address.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, ServerError> {
    let addr = config.bind_addr();
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    hub: Arc<Hub>,
    config: &ServerConfig,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = router(hub, config.send_timeout);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .map_err(ServerError::Serve)
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn json_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, peer, Codec::Json))
}

async fn binary_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, peer, Codec::Protobuf))
}

async fn handle_socket(socket: WebSocket, state: AppState, peer: SocketAddr, codec: Codec) {
    let (sink, stream) = socket.split();

    let attached = state.hub.connect(codec);
    info!(conn_id = attached.id, %peer, role = %attached.role, "client connected");

    let id = attached.id;
    run_connection(attached, sink, stream, state.hub, state.send_timeout).await;
    info!(conn_id = id, %peer, "client disconnected");
}

/// Pump one registered connection until either direction ends, then
/// unregister it.
async fn run_connection<Si, St, E>(
    attached: Attached,
    sink: Si,
    mut stream: St,
    hub: Arc<Hub>,
    send_timeout: Duration,
) where
    Si: Sink<Message> + Unpin + Send + 'static,
    Si::Error: fmt::Display + Send,
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
{
    let id = attached.id;
    let mut writer = tokio::spawn(write_loop(sink, attached.outbound, send_timeout, id));

    loop {
        tokio::select! {
            _ = &mut writer => {
                debug!(conn_id = id, "writer finished");
                break;
            }
            next = stream.next() => match next {
                Some(Ok(Message::Text(text))) => hub.dispatch(id, Inbound::from_json(&text)),
                Some(Ok(Message::Binary(bytes))) => hub.dispatch(id, Inbound::from_protobuf(&bytes)),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    warn!(conn_id = id, error = %e, "receive failed");
                    break;
                }
            },
        }
    }

    hub.disconnect(id);
    writer.abort();
}

/// Drain the outbound queue into the socket. Every socket operation, the
/// final close included, is bounded by `send_timeout`. Ends when the queue
/// closes or a send fails or times out.
async fn write_loop<Si>(
    mut sink: Si,
    mut outbound: Outbound,
    send_timeout: Duration,
    id: ConnectionId,
) where
    Si: Sink<Message> + Unpin,
    Si::Error: fmt::Display,
{
    while let Some(frame) = outbound.recv().await {
        let message = match frame.as_ref() {
            Frame::Text(text) => Message::Text(text.clone()),
            Frame::Binary(bytes) => Message::Binary(bytes.clone()),
        };

        match timeout(send_timeout, sink.send(message)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(conn_id = id, error = %e, "send failed");
                return;
            }
            Err(_) => {
                warn!(conn_id = id, ?send_timeout, "send timed out");
                return;
            }
        }
    }

    // Queue closed by the hub: the connection was dropped server-side.
    if timeout(send_timeout, sink.send(Message::Close(None)))
        .await
        .is_err()
    {
        debug!(conn_id = id, ?send_timeout, "close frame timed out");
    }
}

// ============================================================================
// Tests
// ============================================================================
