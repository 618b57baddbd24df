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

//! Inbound feed handler: the single consumer of the transport event channel.
//!
//! All inbound traffic (frames, transport failures, heartbeat timeouts) arrives on
//! one channel and is processed here one event at a time, so session updates and
//! listener dispatch happen in exactly the order the events were submitted.

use std::sync::{
    Arc,
    atomic::{AtomicU8, Ordering},
};

use tokio::sync::mpsc::UnboundedReceiver;

use super::{
    error::OrbexWsError,
    heartbeat::HeartbeatMonitor,
    login::LoginTracker,
    messages::{ServerMessage, parse_raw_message},
    transport::{SendGate, TransportEvent},
};
use crate::{
    common::enums::ConnectionState,
    events::{ListenerRegistry, OrbexEvent},
    session::SharedSessionState,
};

/// Processes the inbound event channel for one connection.
#[derive(Debug)]
pub struct FeedHandler {
    endpoint: String,
    events_rx: UnboundedReceiver<TransportEvent>,
    conn_state: Arc<AtomicU8>,
    session: SharedSessionState,
    listeners: ListenerRegistry,
    login: Arc<LoginTracker>,
    heartbeat: Arc<HeartbeatMonitor>,
    gate: Arc<SendGate>,
}

impl FeedHandler {
    /// Creates a handler wired to one connection's channels and shared state.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        endpoint: String,
        events_rx: UnboundedReceiver<TransportEvent>,
        conn_state: Arc<AtomicU8>,
        session: SharedSessionState,
        listeners: ListenerRegistry,
        login: Arc<LoginTracker>,
        heartbeat: Arc<HeartbeatMonitor>,
        gate: Arc<SendGate>,
    ) -> Self {
        Self {
            endpoint,
            events_rx,
            conn_state,
            session,
            listeners,
            login,
            heartbeat,
            gate,
        }
    }

    /// Runs until the connection ends or the channel is closed for shutdown.
    pub async fn run(mut self) {
        while let Some(event) = self.events_rx.recv().await {
            match event {
                TransportEvent::Frame(text) => match parse_raw_message(&text) {
                    Ok(msg) => self.handle_message(msg),
                    Err(e) => {
                        tracing::warn!(error = %e, frame = %text, "Dropping undecodable frame");
                    }
                },
                TransportEvent::PongTimeout => {
                    self.handle_loss("pong timeout");
                    break;
                }
                TransportEvent::Error(cause) => {
                    self.handle_loss(&cause);
                    break;
                }
                TransportEvent::Closed => {
                    self.handle_clean_close();
                    break;
                }
            }
        }
        tracing::debug!("Feed handler stopped");
    }

    fn handle_message(&self, msg: ServerMessage) {
        match msg {
            ServerMessage::Pong => self.heartbeat.record_pong(),
            ServerMessage::LoginOk(login) => {
                // Only the handshake window may authenticate; an acknowledgment
                // drained after teardown must not resurrect the session.
                if self
                    .conn_state
                    .compare_exchange(
                        ConnectionState::Connected.as_u8(),
                        ConnectionState::Authenticated.as_u8(),
                        Ordering::SeqCst,
                        Ordering::SeqCst,
                    )
                    .is_err()
                {
                    tracing::warn!(
                        state = %ConnectionState::from_u8(self.conn_state.load(Ordering::Relaxed)),
                        "Ignoring login acknowledgment outside handshake"
                    );
                    return;
                }
                self.session.write().unwrap().apply_login(&login);
                tracing::info!(team = %login.team, "Authenticated");
                self.login.succeed(login.clone());
                self.listeners.dispatch(OrbexEvent::LoginOk(login));
            }
            ServerMessage::Error(err) => {
                if err.code.is_auth_failure() {
                    self.login
                        .fail(OrbexWsError::AuthenticationFailed(err.reason.clone()));
                }
                tracing::warn!(code = %err.code, reason = %err.reason, "Exchange error");
                self.listeners.dispatch(OrbexEvent::Error(err));
            }
            ServerMessage::Ticker(ticker) => {
                self.session.write().unwrap().apply_ticker(&ticker);
                self.listeners.dispatch(OrbexEvent::Ticker(ticker));
            }
            ServerMessage::Fill(fill) => {
                self.session.write().unwrap().apply_fill(&fill);
                self.listeners.dispatch(OrbexEvent::Fill(fill));
            }
            ServerMessage::BalanceUpdate(update) => {
                self.session.write().unwrap().apply_balance(update.balance);
                self.listeners.dispatch(OrbexEvent::BalanceUpdate(update));
            }
            ServerMessage::InventoryUpdate(update) => {
                self.session
                    .write()
                    .unwrap()
                    .apply_inventory(update.product, update.quantity);
                self.listeners.dispatch(OrbexEvent::InventoryUpdate(update));
            }
            ServerMessage::Offer(offer) => {
                self.session.write().unwrap().apply_offer(&offer);
                self.listeners.dispatch(OrbexEvent::Offer(offer));
            }
            ServerMessage::OrderAck(ack) => self.listeners.dispatch(OrbexEvent::OrderAck(ack)),
            ServerMessage::EventDelta(delta) => {
                self.listeners.dispatch(OrbexEvent::EventDelta(delta));
            }
            ServerMessage::Broadcast(broadcast) => {
                self.listeners.dispatch(OrbexEvent::Broadcast(broadcast));
            }
            ServerMessage::GlobalPerformanceReport(report) => {
                self.listeners.dispatch(OrbexEvent::PerformanceReport(report));
            }
        }
    }

    fn handle_loss(&self, cause: &str) {
        tracing::warn!(endpoint = %self.endpoint, cause, "Connection lost");
        self.teardown();
        self.login.fail(OrbexWsError::ConnectionFailed {
            endpoint: self.endpoint.clone(),
            cause: cause.to_string(),
        });
        self.listeners.dispatch(OrbexEvent::ConnectionLost {
            cause: cause.to_string(),
        });
    }

    // A clean server close is not a loss, so listeners are not notified.
    fn handle_clean_close(&self) {
        tracing::info!(endpoint = %self.endpoint, "Connection closed by server");
        self.teardown();
        self.login.fail(OrbexWsError::ConnectionFailed {
            endpoint: self.endpoint.clone(),
            cause: "connection closed".to_string(),
        });
    }

    fn teardown(&self) {
        self.heartbeat.stop();
        self.conn_state
            .store(ConnectionState::Disconnected.as_u8(), Ordering::Relaxed);
        let gate = Arc::clone(&self.gate);
        tokio::spawn(async move { gate.close().await });
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Mutex, RwLock},
        time::Duration,
    };

    use tokio::sync::mpsc::UnboundedSender;
    use ustr::Ustr;

    use super::*;
    use crate::{
        common::testing::wait_until_async,
        config::ConnectorConfig,
        events::OrbexEventListener,
        session::SessionState,
        websocket::messages::TickerMsg,
    };

    struct Fixture {
        events_tx: UnboundedSender<TransportEvent>,
        conn_state: Arc<AtomicU8>,
        session: SharedSessionState,
        listeners: ListenerRegistry,
        login: Arc<LoginTracker>,
    }

    fn make_handler(initial: ConnectionState) -> (FeedHandler, Fixture) {
        let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel();
        let conn_state = Arc::new(AtomicU8::new(initial.as_u8()));
        let session: SharedSessionState = Arc::new(RwLock::new(SessionState::new()));
        let listeners = ListenerRegistry::new();
        let login = Arc::new(LoginTracker::new());
        let config = ConnectorConfig::default();
        let heartbeat = Arc::new(HeartbeatMonitor::new(
            config.heartbeat_interval,
            config.heartbeat_timeout(),
        ));
        let handler = FeedHandler::new(
            "ws://test".to_string(),
            events_rx,
            Arc::clone(&conn_state),
            Arc::clone(&session),
            listeners.clone(),
            Arc::clone(&login),
            heartbeat,
            Arc::new(SendGate::new()),
        );
        let fixture = Fixture {
            events_tx,
            conn_state,
            session,
            listeners,
            login,
        };
        (handler, fixture)
    }

    fn spawn_handler() -> Fixture {
        let (handler, fixture) = make_handler(ConnectionState::Connected);
        tokio::spawn(handler.run());
        fixture
    }

    #[derive(Default)]
    struct TickerRecorder {
        tickers: Mutex<Vec<TickerMsg>>,
        lost: Mutex<Vec<String>>,
    }

    impl OrbexEventListener for TickerRecorder {
        fn on_ticker(&self, msg: &TickerMsg) -> anyhow::Result<()> {
            self.tickers.lock().unwrap().push(msg.clone());
            Ok(())
        }

        fn on_connection_lost(&self, cause: &str) -> anyhow::Result<()> {
            self.lost.lock().unwrap().push(cause.to_string());
            Ok(())
        }
    }

    fn ticker_frame(product: &str, bid: f64) -> TransportEvent {
        TransportEvent::Frame(format!(
            r#"{{"type":"TICKER","product":"{product}","bestBid":{bid},"bestAsk":{}}}"#,
            bid + 1.0
        ))
    }

    #[tokio::test]
    async fn test_concurrent_submitters_per_source_order_preserved() {
        let fx = spawn_handler();
        let recorder = Arc::new(TickerRecorder::default());
        fx.listeners.register(recorder.clone());

        let tx_a = fx.events_tx.clone();
        let tx_b = fx.events_tx.clone();
        let a = tokio::spawn(async move {
            for i in 0..50 {
                tx_a.send(ticker_frame("IRON", f64::from(i))).unwrap();
                tokio::task::yield_now().await;
            }
        });
        let b = tokio::spawn(async move {
            for i in 0..50 {
                tx_b.send(ticker_frame("GOLD", f64::from(i))).unwrap();
                tokio::task::yield_now().await;
            }
        });
        a.await.unwrap();
        b.await.unwrap();

        wait_until_async(
            || async { recorder.tickers.lock().unwrap().len() == 100 },
            Duration::from_secs(2),
        )
        .await;

        let tickers = recorder.tickers.lock().unwrap();
        for product in ["IRON", "GOLD"] {
            let bids: Vec<f64> = tickers
                .iter()
                .filter(|t| t.product == Ustr::from(product))
                .map(|t| t.best_bid)
                .collect();
            assert_eq!(bids, (0..50).map(f64::from).collect::<Vec<_>>());
        }
    }

    #[tokio::test]
    async fn test_login_ok_authenticates_and_seeds_session() {
        let fx = spawn_handler();
        let rx = fx.login.begin();
        fx.events_tx
            .send(TransportEvent::Frame(
                r#"{"type":"LOGIN_OK","team":"rust-raiders","species":"VULCANO","currentBalance":2000.0}"#
                    .to_string(),
            ))
            .unwrap();

        let login = rx.await.unwrap().unwrap();
        assert_eq!(login.team, "rust-raiders");
        assert_eq!(
            ConnectionState::from_u8(fx.conn_state.load(Ordering::Relaxed)),
            ConnectionState::Authenticated
        );
        assert_eq!(fx.session.read().unwrap().balance, 2000.0);
    }

    #[tokio::test]
    async fn test_auth_error_fails_login() {
        let fx = spawn_handler();
        let rx = fx.login.begin();
        fx.events_tx
            .send(TransportEvent::Frame(
                r#"{"type":"ERROR","code":"AUTH_FAILED","reason":"bad token"}"#.to_string(),
            ))
            .unwrap();
        assert!(matches!(
            rx.await.unwrap(),
            Err(OrbexWsError::AuthenticationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_pong_timeout_reports_loss_and_disconnects() {
        let fx = spawn_handler();
        let recorder = Arc::new(TickerRecorder::default());
        fx.listeners.register(recorder.clone());

        fx.events_tx.send(TransportEvent::PongTimeout).unwrap();

        wait_until_async(
            || async { recorder.lost.lock().unwrap().len() == 1 },
            Duration::from_secs(2),
        )
        .await;
        assert_eq!(recorder.lost.lock().unwrap()[0], "pong timeout");
        assert_eq!(
            ConnectionState::from_u8(fx.conn_state.load(Ordering::Relaxed)),
            ConnectionState::Disconnected
        );
    }

    #[tokio::test]
    async fn test_clean_close_does_not_notify_loss() {
        let fx = spawn_handler();
        let recorder = Arc::new(TickerRecorder::default());
        fx.listeners.register(recorder.clone());

        fx.events_tx.send(TransportEvent::Closed).unwrap();

        wait_until_async(
            || async {
                ConnectionState::from_u8(fx.conn_state.load(Ordering::Relaxed))
                    == ConnectionState::Disconnected
            },
            Duration::from_secs(2),
        )
        .await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(recorder.lost.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_ok_drained_after_teardown_stays_disconnected() {
        let (handler, fx) = make_handler(ConnectionState::Disconnected);
        let recorder = Arc::new(TickerRecorder::default());
        fx.listeners.register(recorder);

        fx.events_tx
            .send(TransportEvent::Frame(
                r#"{"type":"LOGIN_OK","team":"rust-raiders","species":"VULCANO","currentBalance":2000.0}"#
                    .to_string(),
            ))
            .unwrap();
        drop(fx.events_tx);

        handler.run().await;

        assert_eq!(
            ConnectionState::from_u8(fx.conn_state.load(Ordering::Relaxed)),
            ConnectionState::Disconnected
        );
        assert!(fx.session.read().unwrap().team.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_frame_dropped_processing_continues() {
        let fx = spawn_handler();
        let recorder = Arc::new(TickerRecorder::default());
        fx.listeners.register(recorder.clone());

        fx.events_tx
            .send(TransportEvent::Frame("{garbage".to_string()))
            .unwrap();
        fx.events_tx.send(ticker_frame("IRON", 5.0)).unwrap();

        wait_until_async(
            || async { recorder.tickers.lock().unwrap().len() == 1 },
            Duration::from_secs(2),
        )
        .await;
    }
}
