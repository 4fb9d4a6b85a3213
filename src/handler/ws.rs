use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
    Extension, Router,
};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, time::Instant};
use uuid::Uuid;

use crate::{
    config::NotificationMode,
    middleware::JWTAuthMiddeware,
    service::{
        hire_poller::HirePoller,
        notification_service::{ConnectionId, HireEvent},
    },
    AppState,
};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(15);

pub fn ws_handler() -> Router {
    Router::new().route("/", get(upgrade))
}

pub async fn upgrade(
    ws: WebSocketUpgrade,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> impl IntoResponse {
    let user_id = auth.user.id;
    ws.on_upgrade(move |socket| serve_socket(socket, app_state, user_id))
}

/// Where a socket's hire events come from.
enum HireFeed {
    Push {
        connection_id: ConnectionId,
        rx: mpsc::UnboundedReceiver<HireEvent>,
    },
    Poll {
        poller: HirePoller,
        interval: tokio::time::Interval,
    },
}

impl HireFeed {
    fn open(app_state: &AppState, user_id: Uuid) -> Self {
        match app_state.env.notification_mode {
            NotificationMode::Push => {
                let (connection_id, rx) = app_state.hub.register_connection(user_id);
                tracing::debug!(
                    "User {} now has {} push connection(s)",
                    user_id,
                    app_state.hub.connection_count(user_id)
                );
                HireFeed::Push { connection_id, rx }
            }
            NotificationMode::Poll => {
                let period = Duration::from_secs(app_state.env.poll_interval_secs.max(1));
                HireFeed::Poll {
                    poller: HirePoller::new(app_state.db_client.clone(), user_id),
                    interval: tokio::time::interval(period),
                }
            }
        }
    }

    /// `None` once the feed can no longer produce events.
    async fn next_batch(&mut self) -> Option<Vec<HireEvent>> {
        match self {
            HireFeed::Push { rx, .. } => rx.recv().await.map(|event| vec![event]),
            HireFeed::Poll { poller, interval } => {
                interval.tick().await;
                match poller.poll().await {
                    Ok(events) => Some(events),
                    Err(e) => {
                        tracing::warn!("Hire poll failed, retrying next tick: {}", e);
                        Some(Vec::new())
                    }
                }
            }
        }
    }

    fn close(self, app_state: &AppState, user_id: Uuid) {
        if let HireFeed::Push { connection_id, .. } = self {
            app_state.hub.unregister_connection(user_id, connection_id);
        }
    }
}

async fn serve_socket(socket: WebSocket, app_state: Arc<AppState>, user_id: Uuid) {
    tracing::info!("🔌 Notification socket opened for user {}", user_id);

    let mut feed = HireFeed::open(&app_state, user_id);
    let (mut sender, mut receiver) = socket.split();
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    let mut last_heard = Instant::now();

    'session: loop {
        tokio::select! {
            batch = feed.next_batch() => {
                let Some(events) = batch else { break 'session };

                for event in events {
                    let body = match serde_json::to_string(&event) {
                        Ok(body) => body,
                        Err(e) => {
                            tracing::error!("Failed to encode hire event for bid {}: {}", event.bid_id, e);
                            continue;
                        }
                    };

                    if sender.send(Message::Text(body)).await.is_err() {
                        break 'session;
                    }
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break 'session,
                Some(Ok(_)) => last_heard = Instant::now(),
                Some(Err(e)) => {
                    tracing::warn!("Socket error for user {}: {}", user_id, e);
                    break 'session;
                }
            },
            _ = heartbeat.tick() => {
                if last_heard.elapsed() > CLIENT_TIMEOUT {
                    tracing::info!("Client {} missed heartbeats, closing socket", user_id);
                    break 'session;
                }

                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break 'session;
                }
            }
        }
    }

    feed.close(&app_state, user_id);
    tracing::info!("🔌 Notification socket closed for user {}", user_id);
}
