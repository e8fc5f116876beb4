// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket change feed.
//!
//! Frames are JSON text. The client opens one connection per channel and
//! sends:
//!
//! ```json
//! {"action":"subscribe","channel":"appointment_changes","tag":"appointment","filter":{"eq":[]}}
//! ```
//!
//! Every text frame the server sends back that parses as a
//! [`ChangeEvent`] is forwarded; other frames are ignored. Cancelling the
//! subscription sends `{"action":"unsubscribe",...}` and closes the socket.

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use dl_core::{ChangeEvent, RemoteError, TypeTag};

use crate::remote::{ChannelSpec, Filter, Realtime, RemoteFuture, Subscription};

const EVENT_BUFFER: usize = 256;

#[derive(Serialize)]
struct ControlFrame<'a> {
    action: &'a str,
    channel: &'a str,
    tag: TypeTag,
    filter: &'a Filter,
}

impl<'a> ControlFrame<'a> {
    fn to_message(action: &'a str, spec: &'a ChannelSpec) -> Result<Message, RemoteError> {
        let frame = ControlFrame { action, channel: &spec.name, tag: spec.tag, filter: &spec.filter };
        let json = serde_json::to_string(&frame).map_err(|e| RemoteError::new(e.to_string()))?;
        Ok(Message::Text(json.into()))
    }
}

/// [`Realtime`] implementation over WebSocket using tokio-tungstenite.
#[derive(Debug, Clone)]
pub struct WebSocketFeed {
    url: String,
}

impl WebSocketFeed {
    pub fn new(url: impl Into<String>) -> Self {
        WebSocketFeed { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Realtime for WebSocketFeed {
    fn subscribe(&self, channel: &ChannelSpec) -> RemoteFuture<'_, Subscription> {
        let channel = channel.clone();
        Box::pin(async move {
            let (ws, _) = tokio_tungstenite::connect_async(self.url.as_str())
                .await
                .map_err(|e| RemoteError::transport(e.to_string()))?;
            let (mut sink, mut stream) = ws.split();

            sink.send(ControlFrame::to_message("subscribe", &channel)?)
                .await
                .map_err(|e| RemoteError::transport(e.to_string()))?;

            let (tx, rx) = mpsc::channel(EVENT_BUFFER);
            let cancel = CancellationToken::new();
            let stop = cancel.clone();

            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = stop.cancelled() => {
                            if let Ok(frame) = ControlFrame::to_message("unsubscribe", &channel) {
                                let _ = sink.send(frame).await;
                            }
                            let _ = sink.close().await;
                            break;
                        }
                        msg = stream.next() => match msg {
                            Some(Ok(Message::Text(text))) => match ChangeEvent::from_json(&text) {
                                Ok(event) => {
                                    if tx.send(event).await.is_err() {
                                        break;
                                    }
                                }
                                Err(e) => {
                                    tracing::debug!(channel = %channel.name, "ignoring frame: {}", e);
                                }
                            },
                            Some(Ok(Message::Close(_))) | None => {
                                tracing::debug!(channel = %channel.name, "server closed feed");
                                break;
                            }
                            Some(Ok(_)) => continue,
                            Some(Err(e)) => {
                                tracing::warn!(channel = %channel.name, "feed error: {}", e);
                                break;
                            }
                        },
                    }
                }
            });

            Ok(Subscription::new(rx, cancel))
        })
    }
}
