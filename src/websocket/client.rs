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

//! ORBEX WebSocket client: connection lifecycle and trading operations.

use std::{
    fmt::Debug,
    future::Future,
    sync::{
        Arc, Mutex, RwLock,
        atomic::{AtomicU8, AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio_util::sync::CancellationToken;
use ustr::Ustr;

use super::{
    error::{OrbexWsError, OrbexWsResult},
    handler::FeedHandler,
    heartbeat::HeartbeatMonitor,
    login::LoginTracker,
    messages::ClientMessage,
    transport::{SendGate, TransportEvent, open_transport, spawn_read_pump},
};
use crate::{
    common::{
        consts::LOGIN_TZ,
        credential::Credential,
        enums::{ConnectionState, OrderSide},
    },
    config::ConnectorConfig,
    events::{ListenerId, ListenerRegistry, OrbexEventListener},
    scheduler::TaskScheduler,
    session::{SessionState, SharedSessionState},
};

#[derive(Debug)]
struct ConnectionTasks {
    stop: CancellationToken,
    pump: tokio::task::JoinHandle<()>,
    handler: tokio::task::JoinHandle<()>,
    events_tx: tokio::sync::mpsc::UnboundedSender<TransportEvent>,
}

/// WebSocket client for the ORBEX exchange.
///
/// One instance manages at most one connection at a time. All inbound processing
/// happens on a dedicated handler task; public operations only touch the write
/// side (through the send gate) and shared state, so they are safe to call from
/// any task. The client is cheap to share via `Arc`.
pub struct OrbexWebSocketClient {
    config: ConnectorConfig,
    conn_state: Arc<AtomicU8>,
    session: SharedSessionState,
    listeners: ListenerRegistry,
    scheduler: TaskScheduler,
    login: Arc<LoginTracker>,
    gate: Arc<SendGate>,
    heartbeat: Arc<HeartbeatMonitor>,
    connection: Mutex<Option<ConnectionTasks>>,
    order_seq: AtomicU64,
}

impl Debug for OrbexWebSocketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(OrbexWebSocketClient))
            .field("state", &self.connection_state())
            .field("config", &self.config)
            .finish()
    }
}

impl OrbexWebSocketClient {
    /// Creates a disconnected client.
    ///
    /// # Errors
    ///
    /// Returns [`OrbexWsError::InvalidArgument`] if the configuration is invalid.
    pub fn new(config: ConnectorConfig) -> OrbexWsResult<Self> {
        config.validate()?;
        let heartbeat = Arc::new(HeartbeatMonitor::new(
            config.heartbeat_interval,
            config.heartbeat_timeout(),
        ));
        Ok(Self {
            config,
            conn_state: Arc::new(AtomicU8::new(ConnectionState::Disconnected.as_u8())),
            session: Arc::new(RwLock::new(SessionState::new())),
            listeners: ListenerRegistry::new(),
            scheduler: TaskScheduler::new(),
            login: Arc::new(LoginTracker::new()),
            gate: Arc::new(SendGate::new()),
            heartbeat,
            connection: Mutex::new(None),
            order_seq: AtomicU64::new(1),
        })
    }

    /// Returns the current connection lifecycle state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.conn_state.load(Ordering::Relaxed))
    }

    /// Returns whether the login handshake has completed.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.connection_state() == ConnectionState::Authenticated
    }

    /// Opens the transport, performs the login handshake, and starts heartbeats.
    ///
    /// Blocks until the exchange acknowledges the login or
    /// `config.connection_timeout` elapses. On any failure the client rolls back
    /// to `Disconnected` and can be connected again.
    ///
    /// # Errors
    ///
    /// - [`OrbexWsError::InvalidArgument`] for a blank token or non-WebSocket URL.
    /// - [`OrbexWsError::IllegalState`] if the client is not `Disconnected`.
    /// - [`OrbexWsError::AuthenticationFailed`] if the exchange rejects the token.
    /// - [`OrbexWsError::ConnectionFailed`] for transport failures and timeouts.
    pub async fn connect(&self, url: &str, credential: &Credential) -> OrbexWsResult<()> {
        if url.trim().is_empty() || !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(OrbexWsError::InvalidArgument(format!(
                "url must be a ws:// or wss:// endpoint, was '{url}'"
            )));
        }
        if credential.is_blank() {
            return Err(OrbexWsError::InvalidArgument(
                "credential token must not be blank".to_string(),
            ));
        }

        self.conn_state
            .compare_exchange(
                ConnectionState::Disconnected.as_u8(),
                ConnectionState::Connecting.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .map_err(|current| {
                OrbexWsError::IllegalState(format!(
                    "connect requires Disconnected, was {}",
                    ConnectionState::from_u8(current)
                ))
            })?;

        tracing::info!(url, token = %credential.token_masked(), "Connecting");
        match self.connect_inner(url, credential).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.teardown_connection();
                self.gate.close().await;
                self.conn_state
                    .store(ConnectionState::Disconnected.as_u8(), Ordering::SeqCst);
                Err(e)
            }
        }
    }

    async fn connect_inner(&self, url: &str, credential: &Credential) -> OrbexWsResult<()> {
        let (sink, reader) = open_transport(url, self.config.connection_timeout).await?;
        self.gate.install(sink).await;

        let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel();
        let stop = CancellationToken::new();
        let pump = spawn_read_pump(reader, events_tx.clone(), stop.clone());

        let handler = FeedHandler::new(
            url.to_string(),
            events_rx,
            Arc::clone(&self.conn_state),
            Arc::clone(&self.session),
            self.listeners.clone(),
            Arc::clone(&self.login),
            Arc::clone(&self.heartbeat),
            Arc::clone(&self.gate),
        );
        let handler = tokio::spawn(handler.run());

        *self.connection.lock().unwrap() = Some(ConnectionTasks {
            stop,
            pump,
            handler,
            events_tx: events_tx.clone(),
        });
        self.conn_state
            .store(ConnectionState::Connected.as_u8(), Ordering::SeqCst);

        // Arm the login slot before the frame goes out so a fast reply cannot race it.
        let login_rx = self.login.begin();
        let login_frame = ClientMessage::Login {
            token: credential.token().to_string(),
            tz: LOGIN_TZ.to_string(),
        }
        .to_json()?;
        self.gate.send_text(login_frame).await?;
        self.heartbeat.start(Arc::clone(&self.gate), events_tx);

        match tokio::time::timeout(self.config.connection_timeout, login_rx).await {
            Ok(Ok(outcome)) => {
                let login = outcome?;
                tracing::info!(team = %login.team, species = %login.species, "Connected");
                Ok(())
            }
            Ok(Err(_abandoned)) => Err(OrbexWsError::ConnectionFailed {
                endpoint: url.to_string(),
                cause: "login attempt abandoned".to_string(),
            }),
            Err(_) => {
                self.login.abandon();
                Err(OrbexWsError::ConnectionFailed {
                    endpoint: url.to_string(),
                    cause: format!(
                        "login timed out after {:?}",
                        self.config.connection_timeout
                    ),
                })
            }
        }
    }

    /// Closes the connection. Idempotent; safe to call in any state.
    ///
    /// Registered listeners and scheduled tasks survive a disconnect and apply
    /// to the next connection.
    pub async fn disconnect(&self) {
        self.teardown_connection();
        self.login.abandon();
        self.gate.close().await;
        self.conn_state
            .store(ConnectionState::Disconnected.as_u8(), Ordering::SeqCst);
        tracing::info!("Disconnected");
    }

    /// Disconnects and cancels all scheduled tasks.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown_all();
        self.disconnect().await;
    }

    fn teardown_connection(&self) {
        self.heartbeat.stop();
        if let Some(tasks) = self.connection.lock().unwrap().take() {
            tasks.stop.cancel();
            tasks.pump.abort();
            // Dropping `events_tx` (with the pump and heartbeat senders gone)
            // closes the channel; the handler drains what is queued and exits.
            drop(tasks.events_tx);
            drop(tasks.handler);
        }
    }

    /// Blocks until the session is authenticated.
    ///
    /// # Errors
    ///
    /// Returns [`OrbexWsError::IllegalState`] immediately when disconnected, or
    /// after `config.connection_timeout` when the handshake never completes.
    pub async fn wait_for_authentication(&self) -> OrbexWsResult<()> {
        let deadline = tokio::time::Instant::now() + self.config.connection_timeout;
        loop {
            match self.connection_state() {
                ConnectionState::Authenticated => return Ok(()),
                ConnectionState::Disconnected => {
                    return Err(OrbexWsError::IllegalState("Not connected".to_string()));
                }
                ConnectionState::Connecting | ConnectionState::Connected => {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(OrbexWsError::IllegalState(
                            "Authentication timed out".to_string(),
                        ));
                    }
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }

    /// Submits an order and returns its client order ID.
    ///
    /// Blocks until the session is authenticated (bounded by
    /// `config.connection_timeout`).
    ///
    /// # Errors
    ///
    /// Returns [`OrbexWsError::InvalidArgument`] for a non-positive quantity or
    /// price, [`OrbexWsError::IllegalState`] when not connected, or a send error.
    pub async fn submit_order(
        &self,
        product: Ustr,
        side: OrderSide,
        quantity: i64,
        price: Option<f64>,
    ) -> OrbexWsResult<String> {
        if quantity <= 0 {
            return Err(OrbexWsError::InvalidArgument(format!(
                "quantity must be positive, was {quantity}"
            )));
        }
        if let Some(p) = price {
            if p <= 0.0 || !p.is_finite() {
                return Err(OrbexWsError::InvalidArgument(format!(
                    "price must be positive and finite, was {p}"
                )));
            }
        }
        self.wait_for_authentication().await?;

        let cl_ord_id = format!("ord-{}", self.order_seq.fetch_add(1, Ordering::Relaxed));
        let frame = ClientMessage::Order {
            cl_ord_id: cl_ord_id.clone(),
            product,
            side,
            quantity,
            price,
        }
        .to_json()?;
        self.gate.send_text(frame).await?;
        tracing::debug!(%cl_ord_id, %product, %side, quantity, "Order submitted");
        Ok(cl_ord_id)
    }

    /// Cancels a previously submitted order.
    ///
    /// # Errors
    ///
    /// Returns [`OrbexWsError::InvalidArgument`] for a blank order ID,
    /// [`OrbexWsError::IllegalState`] when not connected, or a send error.
    pub async fn cancel_order(&self, cl_ord_id: &str) -> OrbexWsResult<()> {
        if cl_ord_id.trim().is_empty() {
            return Err(OrbexWsError::InvalidArgument(
                "cl_ord_id must not be blank".to_string(),
            ));
        }
        self.wait_for_authentication().await?;
        let frame = ClientMessage::Cancel {
            cl_ord_id: cl_ord_id.to_string(),
        }
        .to_json()?;
        self.gate.send_text(frame).await?;
        tracing::debug!(cl_ord_id, "Cancel submitted");
        Ok(())
    }

    /// Switches a product's production line between standard and premium.
    ///
    /// # Errors
    ///
    /// Returns [`OrbexWsError::IllegalState`] when not connected, or a send error.
    pub async fn update_production(&self, product: Ustr, premium: bool) -> OrbexWsResult<()> {
        self.wait_for_authentication().await?;
        let frame = ClientMessage::ProductionUpdate { product, premium }.to_json()?;
        self.gate.send_text(frame).await?;
        tracing::debug!(%product, premium, "Production updated");
        Ok(())
    }

    /// Accepts or rejects a private offer.
    ///
    /// The offer is removed from the session's open-offer book regardless of the
    /// answer.
    ///
    /// # Errors
    ///
    /// Returns [`OrbexWsError::InvalidArgument`] for a blank offer ID,
    /// [`OrbexWsError::IllegalState`] when not connected, or a send error.
    pub async fn respond_offer(&self, offer_id: &str, accept: bool) -> OrbexWsResult<()> {
        if offer_id.trim().is_empty() {
            return Err(OrbexWsError::InvalidArgument(
                "offer_id must not be blank".to_string(),
            ));
        }
        self.wait_for_authentication().await?;
        let frame = ClientMessage::AcceptOffer {
            offer_id: offer_id.to_string(),
            accept,
        }
        .to_json()?;
        self.gate.send_text(frame).await?;
        self.session.write().unwrap().take_offer(offer_id);
        tracing::debug!(offer_id, accept, "Offer answered");
        Ok(())
    }

    /// Registers a listener for all exchange events.
    pub fn register_listener(&self, listener: Arc<dyn OrbexEventListener>) -> ListenerId {
        self.listeners.register(listener)
    }

    /// Unregisters a listener; unknown IDs are a no-op.
    pub fn unregister_listener(&self, id: ListenerId) {
        self.listeners.unregister(id);
    }

    /// Registers a named periodic task; see [`TaskScheduler::register`].
    ///
    /// # Errors
    ///
    /// Returns [`OrbexWsError::InvalidArgument`] for a blank name or zero interval.
    pub fn register_task<F, Fut>(
        &self,
        name: &str,
        interval: Duration,
        action: F,
    ) -> OrbexWsResult<()>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send,
    {
        self.scheduler.register(name, interval, action)
    }

    /// Cancels a named periodic task; returns whether it existed.
    pub fn cancel_task(&self, name: &str) -> bool {
        self.scheduler.cancel(name)
    }

    /// Returns a point-in-time copy of the session state.
    #[must_use]
    pub fn session_snapshot(&self) -> SessionState {
        self.session.read().unwrap().clone()
    }
}
