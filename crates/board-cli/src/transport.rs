//! The push channel: a persistent WebSocket feed fanned out to any number of
//! dashboard instances through an in-process event bus.
//!
//! One feed task owns the socket. It joins the single all-tasks room (the
//! backend broadcasts every task event to every viewer; visibility filtering
//! is client-side), decodes `{event, data}` frames, and publishes the
//! results on an [`EventBus`]. Dashboards hold a [`Subscription`] each;
//! dropping the subscription releases the registration, so a torn-down view
//! can never be notified again.
//!
//! Reconnection is the feed task's job: on any socket error it backs off
//! exponentially (capped) and dials again. Reconnects can redeliver recent
//! events — the engine is idempotent under redelivery and the notification
//! feed suppresses repeats, so the transport does not try to deduplicate.

use board_core::event::{ChangeEvent, MalformedEvent};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// The one scope token the backend recognises: every viewer joins the same
/// room and receives all task events.
pub const BOARD_ROOM: &str = "all-boards";

/// Name of the join message sent after each (re)connect.
const JOIN_EVENT: &str = "join-board";

const CHANNEL_CAPACITY: usize = 256;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// One `{event, data}` wire frame.
#[derive(Debug, Serialize, Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Why an incoming frame was dropped.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame is not valid JSON: {0}")]
    NotJson(String),
    #[error(transparent)]
    Event(#[from] MalformedEvent),
}

/// Decode one text frame into a change event.
///
/// # Errors
///
/// [`FrameError`] when the frame is not JSON or names an unknown or
/// malformed event. Callers log and drop — a corrupt push message must not
/// take down the feed.
pub fn decode_frame(text: &str) -> Result<ChangeEvent, FrameError> {
    let frame: Frame =
        serde_json::from_str(text).map_err(|e| FrameError::NotJson(e.to_string()))?;
    Ok(ChangeEvent::from_wire(&frame.event, frame.data)?)
}

/// Process-wide fan-out of decoded change events.
///
/// Cheap to clone; all clones publish into the same channel. Subscription
/// registration is additive and released per-subscriber on drop.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Register a new subscriber. Events published before this call are not
    /// delivered to it.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Publish one event to all current subscribers; returns how many
    /// received it. Publishing with no subscribers is fine.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// One dashboard's registration on the bus. Delivery stops when this is
/// dropped.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
    /// Next event in delivery order, or `None` once every bus handle is
    /// gone.
    ///
    /// A slow subscriber that overflows the channel loses the oldest events;
    /// that is logged and delivery continues from the oldest retained one.
    /// The snapshot path makes the view whole again.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "subscriber lagged; a reload will resync the view");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!("push subscription released");
    }
}

/// Own the WebSocket connection forever: dial, join the board room, pump
/// frames into `bus`, and redial with capped exponential backoff on any
/// failure. Runs until the caller drops the future.
pub async fn run_feed(bus: EventBus, url: String) {
    let mut backoff = INITIAL_BACKOFF;
    loop {
        match connect_async(url.as_str()).await {
            Ok((socket, _)) => {
                info!(%url, "push channel connected");
                backoff = INITIAL_BACKOFF;
                pump(socket, &bus).await;
                warn!(%url, "push channel disconnected");
            }
            Err(e) => {
                warn!(%url, error = %e, "push channel connect failed");
            }
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

async fn pump<S>(mut socket: tokio_tungstenite::WebSocketStream<S>, bus: &EventBus)
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let join = Frame {
        event: JOIN_EVENT.to_string(),
        data: serde_json::Value::String(BOARD_ROOM.to_string()),
    };
    let Ok(join_text) = serde_json::to_string(&join) else {
        // A struct of two strings always serializes; nothing to do if not.
        return;
    };
    if let Err(e) = socket.send(Message::Text(join_text)).await {
        warn!(error = %e, "failed to join board room");
        return;
    }

    while let Some(message) = socket.next().await {
        match message {
            Ok(Message::Text(text)) => match decode_frame(&text) {
                Ok(event) => {
                    debug!(kind = %event.kind(), id = event.task_id(), "event received");
                    bus.publish(event);
                }
                Err(e) => warn!(error = %e, "malformed frame dropped"),
            },
            Ok(Message::Close(_)) => return,
            // Pings are answered by the library; other frame types carry
            // nothing for us.
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "push channel read error");
                return;
            }
        }
    }
}
