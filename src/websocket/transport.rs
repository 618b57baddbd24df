// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2025 Orbex Labs. All rights reserved.
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Raw WebSocket transport: connect, read pump, and the write-side send gate.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt, stream::SplitSink, stream::SplitStream};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        Message,
        protocol::{CloseFrame, frame::coding::CloseCode},
    },
};
use tokio_util::sync::CancellationToken;

use super::error::{OrbexWsError, OrbexWsResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

/// Events the transport feeds into the inbound processing channel.
///
/// Everything that can change connection health flows through this one channel, so
/// the handler observes frames, transport failures, and heartbeat timeouts in a
/// single total order.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A complete inbound text frame.
    Frame(String),
    /// The read side failed.
    Error(String),
    /// The server closed the connection cleanly.
    Closed,
    /// The heartbeat monitor declared the connection dead.
    PongTimeout,
}

/// Opens the WebSocket connection within `timeout` and splits it.
///
/// # Errors
///
/// Returns [`OrbexWsError::ConnectionFailed`] if the dial fails or exceeds the timeout.
pub async fn open_transport(url: &str, timeout: Duration) -> OrbexWsResult<(WsSink, WsReader)> {
    let connect = connect_async(url);
    let (stream, response) = tokio::time::timeout(timeout, connect)
        .await
        .map_err(|_| OrbexWsError::ConnectionFailed {
            endpoint: url.to_string(),
            cause: format!("connect timed out after {timeout:?}"),
        })?
        .map_err(|e| OrbexWsError::ConnectionFailed {
            endpoint: url.to_string(),
            cause: e.to_string(),
        })?;

    tracing::debug!(status = ?response.status(), "WebSocket handshake complete");
    Ok(stream.split())
}

/// Spawns the read pump: forwards inbound frames as [`TransportEvent`]s until the
/// stream ends, errors, or `stop` is cancelled.
pub fn spawn_read_pump(
    mut reader: WsReader,
    events_tx: tokio::sync::mpsc::UnboundedSender<TransportEvent>,
    stop: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = stop.cancelled() => {
                    tracing::debug!("Read pump stopped");
                    break;
                }
                msg = reader.next() => {
                    let event = match msg {
                        Some(Ok(Message::Text(text))) => TransportEvent::Frame(text.to_string()),
                        Some(Ok(Message::Close(frame))) => {
                            tracing::debug!(?frame, "Server closed connection");
                            TransportEvent::Closed
                        }
                        // Protocol-level ping/pong is handled by tungstenite.
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => TransportEvent::Error(e.to_string()),
                        None => TransportEvent::Closed,
                    };
                    let terminal = !matches!(event, TransportEvent::Frame(_));
                    if events_tx.send(event).is_err() || terminal {
                        break;
                    }
                }
            }
        }
    })
}

/// Serializes writes to the transport: at most one frame is in flight at a time.
///
/// The single permit is the inner mutex; holding the guard is holding the permit,
/// so it is released on every exit path including panics. When no sink is
/// installed every send fails fast with [`OrbexWsError::NotConnected`].
#[derive(Debug, Default)]
pub struct SendGate {
    sink: tokio::sync::Mutex<Option<WsSink>>,
}

impl SendGate {
    /// Creates a gate with no transport attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the write half of a freshly opened transport.
    pub async fn install(&self, sink: WsSink) {
        *self.sink.lock().await = Some(sink);
    }

    /// Sends one text frame, waiting for the permit if another send is in flight.
    ///
    /// # Errors
    ///
    /// Returns [`OrbexWsError::NotConnected`] when no transport is attached, or
    /// [`OrbexWsError::Send`] if the write fails (the sink is dropped so later
    /// sends fail fast).
    pub async fn send_text(&self, text: String) -> OrbexWsResult<()> {
        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(OrbexWsError::NotConnected)?;
        if let Err(e) = sink.send(Message::Text(text.into())).await {
            *guard = None;
            return Err(OrbexWsError::from(e));
        }
        Ok(())
    }

    /// Sends a normal close frame and detaches the transport. Idempotent.
    pub async fn close(&self) {
        if let Some(mut sink) = self.sink.lock().await.take() {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: "client disconnect".into(),
            };
            if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                tracing::debug!(error = %e, "Close frame not delivered");
            }
        }
    }

    /// Returns whether a transport is currently attached.
    pub async fn is_open(&self) -> bool {
        self.sink.lock().await.is_some()
    }
}
