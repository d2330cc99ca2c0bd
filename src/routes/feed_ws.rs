//! Live operator feed over WebSocket
//!
//! `GET /api/v1/admin/feed` upgrades to a socket that first delivers the
//! bounded audit and notification views, then re-delivers whichever view
//! a write just touched. Closing the socket (or dropping the connection)
//! tears the store subscriptions down with it.

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use hyper_tungstenite::tungstenite::Message as WsMessage;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::admin::{AuditLogEntry, NotificationEntry};
use super::{actor_from_headers, error_response, failure_response, FullBody};
use crate::db::decode_rows;
use crate::db::schemas::{AuditLogDoc, NotificationDoc};
use crate::feed::{self, FeedView};
use crate::moderation::require_admin;
use crate::server::AppState;

type HyperWebSocket =
    hyper_tungstenite::WebSocketStream<hyper_util::rt::TokioIo<hyper::upgrade::Upgraded>>;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum FeedMessage {
    AuditLogs {
        timestamp: String,
        entries: Vec<AuditLogEntry>,
    },
    Notifications {
        timestamp: String,
        entries: Vec<NotificationEntry>,
    },
}

pub async fn handle_feed_ws(state: Arc<AppState>, req: Request<Incoming>) -> Response<FullBody> {
    let actor = match actor_from_headers(&req) {
        Ok(actor) => actor,
        Err(resp) => return resp,
    };
    if let Err(err) = require_admin(&actor) {
        return failure_response(&err);
    }

    if !hyper_tungstenite::is_upgrade_request(&req) {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Expected WebSocket upgrade request",
            Some("NOT_UPGRADE"),
        );
    }

    match hyper_tungstenite::upgrade(req, None) {
        Ok((response, websocket)) => {
            tokio::spawn(async move {
                match websocket.await {
                    Ok(ws) => {
                        if let Err(e) = stream_feeds(ws, state).await {
                            warn!("Feed WebSocket error: {}", e);
                        }
                    }
                    Err(e) => {
                        error!("WebSocket connection failed: {}", e);
                    }
                }
            });

            let (parts, _body) = response.into_parts();
            Response::from_parts(parts, Full::new(Bytes::new()))
        }
        Err(e) => {
            error!("WebSocket upgrade failed: {}", e);
            error_response(
                StatusCode::BAD_REQUEST,
                "WebSocket upgrade failed",
                Some("UPGRADE_FAILED"),
            )
        }
    }
}

async fn stream_feeds(
    ws: HyperWebSocket,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (mut sender, mut receiver) = ws.split();
    info!("Feed WebSocket client connected");

    let mut audit_view = FeedView::open(
        Arc::clone(&state.store),
        feed::audit_query(state.args.audit_feed_limit),
    );
    let mut notification_view = FeedView::open(
        Arc::clone(&state.store),
        feed::notification_query(state.args.notification_feed_limit),
    );

    // Both views deliver their current state up front; afterwards `next`
    // only completes when a write touches the underlying collection.
    let entries = audit_entries(audit_view.next().await?);
    sender.send(audit_message(entries)?).await?;
    let entries = notification_entries(notification_view.next().await?);
    sender.send(notification_message(entries)?).await?;

    loop {
        tokio::select! {
            rows = audit_view.next() => {
                let message = match rows {
                    Ok(rows) => audit_message(audit_entries(rows))?,
                    Err(e) => {
                        warn!("Audit feed read failed: {}", e);
                        break;
                    }
                };
                if sender.send(message).await.is_err() {
                    break;
                }
            }
            rows = notification_view.next() => {
                let message = match rows {
                    Ok(rows) => notification_message(notification_entries(rows))?,
                    Err(e) => {
                        warn!("Notification feed read failed: {}", e);
                        break;
                    }
                };
                if sender.send(message).await.is_err() {
                    break;
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(WsMessage::Close(_))) => {
                        info!("Feed WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(WsMessage::Ping(data))) => {
                        let _ = sender.send(WsMessage::Pong(data)).await;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    info!("Feed WebSocket connection closed");
    Ok(())
}

fn audit_entries(rows: Vec<bson::Document>) -> Vec<AuditLogEntry> {
    decode_rows::<AuditLogDoc>(rows)
        .into_iter()
        .map(Into::into)
        .collect()
}

fn notification_entries(rows: Vec<bson::Document>) -> Vec<NotificationEntry> {
    decode_rows::<NotificationDoc>(rows)
        .into_iter()
        .map(Into::into)
        .collect()
}

fn audit_message(entries: Vec<AuditLogEntry>) -> Result<WsMessage, serde_json::Error> {
    let message = FeedMessage::AuditLogs {
        timestamp: now_iso(),
        entries,
    };
    Ok(WsMessage::Text(serde_json::to_string(&message)?))
}

fn notification_message(entries: Vec<NotificationEntry>) -> Result<WsMessage, serde_json::Error> {
    let message = FeedMessage::Notifications {
        timestamp: now_iso(),
        entries,
    };
    Ok(WsMessage::Text(serde_json::to_string(&message)?))
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}
