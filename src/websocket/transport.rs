use crate::error::{AlumniError, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use log::*;
use std::borrow::Cow;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

/// WebSocket "normal closure" status code.
pub const NORMAL_CLOSURE: u16 = 1000;

const CHANNEL_CAPACITY: usize = 32;

// Type alias for the WebSocket stream
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Events surfaced by a live transport, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Text(String),
    Error(String),
    /// The connection ended. `None` means no close frame was received.
    Closed(Option<u16>),
}

/// Frames the client can push to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    Close { code: u16, reason: String },
}

/// An open transport: a sender for outbound frames and a receiver of
/// inbound events. Dropping both ends tears the transport down.
pub struct Connection {
    pub outbound: mpsc::Sender<OutboundFrame>,
    pub inbound: mpsc::Receiver<TransportEvent>,
}

/// Opens transports to a target URL.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &Url) -> Result<Connection>;
}

/// Production connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &Url) -> Result<Connection> {
        info!("Connecting to WebSocket: {}", url);
        let (ws_stream, response) = connect_async(url.as_str())
            .await
            .map_err(|e| AlumniError::WebsocketError(format!("WebSocket connection failed: {}", e)))?;
        info!(
            "WebSocket connected successfully. Response: {:?}",
            response.status()
        );
        Ok(spawn_pumps(ws_stream))
    }
}

/// Spawns the reader and writer tasks for an established stream.
fn spawn_pumps(ws_stream: WsStream) -> Connection {
    let (write, mut read) = ws_stream.split();
    let write = Arc::new(Mutex::new(write));

    let (outbound_tx, mut outbound_rx) = mpsc::channel::<OutboundFrame>(CHANNEL_CAPACITY);
    let (inbound_tx, inbound_rx) = mpsc::channel::<TransportEvent>(CHANNEL_CAPACITY);

    // --- Writer Task ---
    tokio::spawn({
        let write = Arc::clone(&write);
        async move {
            while let Some(frame) = outbound_rx.recv().await {
                let closing = matches!(frame, OutboundFrame::Close { .. });
                let message = match frame {
                    OutboundFrame::Text(text) => Message::Text(text),
                    OutboundFrame::Close { code, reason } => Message::Close(Some(CloseFrame {
                        code: CloseCode::from(code),
                        reason: Cow::Owned(reason),
                    })),
                };
                trace!("Sending WS frame (close={})", closing);
                let mut writer = write.lock().await;
                if let Err(e) = writer.send(message).await {
                    error!("WebSocket send error: {}. Stopping writer task.", e);
                    break;
                }
                if closing {
                    break;
                }
            }
            trace!("WebSocket writer task finished.");
        }
    });

    // --- Reader Task ---
    tokio::spawn({
        let write = Arc::clone(&write);
        async move {
            let close_code = loop {
                let next = tokio::select! {
                    _ = inbound_tx.closed() => {
                        trace!("Inbound receiver dropped; stopping reader task.");
                        return;
                    }
                    next = read.next() => next,
                };
                match next {
                    Some(Ok(msg)) => match msg {
                        Message::Text(text) => {
                            trace!("Received WS Text: {}", text);
                            if inbound_tx.send(TransportEvent::Text(text)).await.is_err() {
                                // Nobody is listening any more
                                return;
                            }
                        }
                        Message::Binary(bin) => {
                            trace!("Ignoring WS Binary frame ({} bytes)", bin.len());
                        }
                        Message::Ping(ping_data) => {
                            trace!("Received WS Ping, sending Pong");
                            let mut writer = write.lock().await;
                            if let Err(e) = writer.send(Message::Pong(ping_data)).await {
                                error!("Failed to send Pong: {}", e);
                            }
                        }
                        Message::Pong(_) => {
                            trace!("Received WS Pong");
                        }
                        Message::Close(close_frame) => {
                            debug!("Received WS Close frame: {:?}", close_frame);
                            break close_frame.map(|frame| u16::from(frame.code));
                        }
                        Message::Frame(_) => {}
                    },
                    Some(Err(e)) => {
                        error!("WebSocket read error: {}", e);
                        let _ = inbound_tx.send(TransportEvent::Error(e.to_string())).await;
                        break None;
                    }
                    None => {
                        debug!("WebSocket stream ended (read None).");
                        break None;
                    }
                }
            };
            let _ = inbound_tx.send(TransportEvent::Closed(close_code)).await;
            trace!("WebSocket reader task finished.");
        }
    });

    Connection {
        outbound: outbound_tx,
        inbound: inbound_rx,
    }
}
