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

//! Integration tests for the ORBEX WebSocket client using a mock Axum server.

use std::{
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
    routing::get,
};
use orbex::{
    common::{
        credential::Credential,
        enums::{ConnectionState, OrderSide},
        testing::wait_until_async,
    },
    config::ConnectorConfig,
    events::OrbexEventListener,
    websocket::{
        client::OrbexWebSocketClient,
        error::OrbexWsError,
        messages::{OfferMsg, TickerMsg},
    },
};
use serde_json::{Value, json};
use ustr::Ustr;

// ------------------------------------------------------------------------------------------------
// Test Server State
// ------------------------------------------------------------------------------------------------

#[derive(Clone, Default)]
struct TestServerState {
    connection_count: Arc<AtomicUsize>,
    closed_count: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<Value>>>,
    reject_login: Arc<AtomicBool>,
    swallow_login: Arc<AtomicBool>,
    swallow_pings: Arc<AtomicBool>,
    login_delay_ms: Arc<AtomicU64>,
    ticker_burst: Arc<AtomicUsize>,
    send_offer: Arc<AtomicBool>,
}

impl TestServerState {
    fn received_of_type(&self, msg_type: &str) -> Vec<Value> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .filter(|v| v.get("type").and_then(Value::as_str) == Some(msg_type))
            .cloned()
            .collect()
    }
}

// ------------------------------------------------------------------------------------------------
// Mock WebSocket Handler
// ------------------------------------------------------------------------------------------------

async fn handle_ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<Arc<TestServerState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<TestServerState>) {
    state.connection_count.fetch_add(1, Ordering::Relaxed);
    run_socket(&mut socket, &state).await;
    state.closed_count.fetch_add(1, Ordering::Relaxed);
}

async fn run_socket(socket: &mut WebSocket, state: &TestServerState) {
    while let Some(message) = socket.recv().await {
        let Ok(Message::Text(text)) = message else {
            break;
        };
        let Ok(payload) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        state.received.lock().unwrap().push(payload.clone());

        match payload.get("type").and_then(Value::as_str) {
            Some("LOGIN") => {
                if state.swallow_login.load(Ordering::Relaxed) {
                    continue;
                }
                if state.reject_login.load(Ordering::Relaxed) {
                    let response = json!({
                        "type": "ERROR",
                        "code": "AUTH_FAILED",
                        "reason": "unknown team token"
                    });
                    if socket
                        .send(Message::Text(response.to_string().into()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                    continue;
                }

                let delay = state.login_delay_ms.load(Ordering::Relaxed);
                if delay > 0 {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }

                let login_ok = json!({
                    "type": "LOGIN_OK",
                    "team": "mock-team",
                    "species": "TERRAN",
                    "currentBalance": 1000.0
                });
                if socket
                    .send(Message::Text(login_ok.to_string().into()))
                    .await
                    .is_err()
                {
                    break;
                }

                let burst = state.ticker_burst.load(Ordering::Relaxed);
                for i in 0..burst {
                    let ticker = json!({
                        "type": "TICKER",
                        "product": "IRON",
                        "bestBid": i as f64,
                        "bestAsk": i as f64 + 1.0
                    });
                    if socket
                        .send(Message::Text(ticker.to_string().into()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }

                if state.send_offer.load(Ordering::Relaxed) {
                    let offer = json!({
                        "type": "OFFER",
                        "offerId": "of-77",
                        "product": "HELIUM3",
                        "quantity": 5,
                        "price": 42.0
                    });
                    if socket
                        .send(Message::Text(offer.to_string().into()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            }
            Some("PING") => {
                if state.swallow_pings.load(Ordering::Relaxed) {
                    continue;
                }
                if socket
                    .send(Message::Text(json!({"type": "PONG"}).to_string().into()))
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Some("ORDER") => {
                let ack = json!({
                    "type": "ORDER_ACK",
                    "orderId": "x-1",
                    "status": "ACCEPTED"
                });
                if socket
                    .send(Message::Text(ack.to_string().into()))
                    .await
                    .is_err()
                {
                    break;
                }
            }
            _ => {}
        }
    }
}

async fn start_ws_server(state: Arc<TestServerState>) -> SocketAddr {
    let router = Router::new()
        .route("/ws", get(handle_ws_upgrade))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test server");
    let addr = listener.local_addr().expect("failed to read local addr");
    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("websocket server failed");
    });
    addr
}

fn fast_config() -> ConnectorConfig {
    ConnectorConfig {
        connection_timeout: Duration::from_secs(2),
        heartbeat_interval: Duration::from_millis(100),
        heartbeat_timeout_multiplier: 3,
    }
}

// ------------------------------------------------------------------------------------------------
// Listeners
// ------------------------------------------------------------------------------------------------

#[derive(Default)]
struct RecordingListener {
    tickers: Mutex<Vec<TickerMsg>>,
    offers: Mutex<Vec<OfferMsg>>,
    lost: Mutex<Vec<String>>,
}

impl OrbexEventListener for RecordingListener {
    fn on_ticker(&self, msg: &TickerMsg) -> anyhow::Result<()> {
        self.tickers.lock().unwrap().push(msg.clone());
        Ok(())
    }

    fn on_offer(&self, msg: &OfferMsg) -> anyhow::Result<()> {
        self.offers.lock().unwrap().push(msg.clone());
        Ok(())
    }

    fn on_connection_lost(&self, cause: &str) -> anyhow::Result<()> {
        self.lost.lock().unwrap().push(cause.to_string());
        Ok(())
    }
}

struct FailingListener;

impl OrbexEventListener for FailingListener {
    fn on_ticker(&self, _msg: &TickerMsg) -> anyhow::Result<()> {
        anyhow::bail!("listener is broken")
    }
}

// ------------------------------------------------------------------------------------------------
// Tests
// ------------------------------------------------------------------------------------------------

#[tokio::test]
async fn test_connect_authenticates_and_seeds_session() {
    let state = Arc::new(TestServerState::default());
    let addr = start_ws_server(state.clone()).await;
    let ws_url = format!("ws://{addr}/ws");

    let client = OrbexWebSocketClient::new(fast_config()).unwrap();
    client
        .connect(&ws_url, &Credential::new("team-token"))
        .await
        .unwrap();

    assert_eq!(client.connection_state(), ConnectionState::Authenticated);
    let snapshot = client.session_snapshot();
    assert_eq!(snapshot.team, "mock-team");
    assert_eq!(snapshot.species, "TERRAN");
    assert_eq!(snapshot.balance, 1000.0);

    let logins = state.received_of_type("LOGIN");
    assert_eq!(logins.len(), 1);
    assert_eq!(logins[0]["token"], "team-token");
    assert_eq!(logins[0]["tz"], "UTC");

    client.disconnect().await;
}

#[tokio::test]
async fn test_connect_while_connected_is_illegal() {
    let state = Arc::new(TestServerState::default());
    let addr = start_ws_server(state).await;
    let ws_url = format!("ws://{addr}/ws");

    let client = OrbexWebSocketClient::new(fast_config()).unwrap();
    client
        .connect(&ws_url, &Credential::new("team-token"))
        .await
        .unwrap();

    let result = client.connect(&ws_url, &Credential::new("team-token")).await;
    assert!(matches!(result, Err(OrbexWsError::IllegalState(_))));
    // The rejected call must not have torn down the live session.
    assert_eq!(client.connection_state(), ConnectionState::Authenticated);

    client.disconnect().await;
}

#[tokio::test]
async fn test_rejected_login_fails_and_rolls_back() {
    let state = Arc::new(TestServerState::default());
    state.reject_login.store(true, Ordering::Relaxed);
    let addr = start_ws_server(state.clone()).await;
    let ws_url = format!("ws://{addr}/ws");

    let client = OrbexWebSocketClient::new(fast_config()).unwrap();
    let result = client.connect(&ws_url, &Credential::new("bad-token")).await;

    assert!(matches!(result, Err(OrbexWsError::AuthenticationFailed(_))));
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);

    // The rollback must release the transport, not just the state.
    wait_until_async(
        || async { state.closed_count.load(Ordering::Relaxed) == 1 },
        Duration::from_secs(2),
    )
    .await;
}

#[tokio::test]
async fn test_login_timeout_closes_transport() {
    let state = Arc::new(TestServerState::default());
    state.swallow_login.store(true, Ordering::Relaxed);
    let addr = start_ws_server(state.clone()).await;
    let ws_url = format!("ws://{addr}/ws");

    let config = ConnectorConfig {
        connection_timeout: Duration::from_millis(300),
        ..fast_config()
    };
    let client = OrbexWebSocketClient::new(config).unwrap();
    let result = client.connect(&ws_url, &Credential::new("team-token")).await;

    assert!(matches!(result, Err(OrbexWsError::ConnectionFailed { .. })));
    wait_until_async(
        || async { state.closed_count.load(Ordering::Relaxed) == 1 },
        Duration::from_secs(2),
    )
    .await;
}

#[tokio::test]
async fn test_login_timeout_rolls_back() {
    let state = Arc::new(TestServerState::default());
    state.swallow_login.store(true, Ordering::Relaxed);
    let addr = start_ws_server(state).await;
    let ws_url = format!("ws://{addr}/ws");

    let config = ConnectorConfig {
        connection_timeout: Duration::from_millis(300),
        ..fast_config()
    };
    let client = OrbexWebSocketClient::new(config).unwrap();
    let result = client.connect(&ws_url, &Credential::new("team-token")).await;

    assert!(matches!(result, Err(OrbexWsError::ConnectionFailed { .. })));
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_pong_silence_reports_loss_and_disconnects() {
    let state = Arc::new(TestServerState::default());
    state.swallow_pings.store(true, Ordering::Relaxed);
    let addr = start_ws_server(state).await;
    let ws_url = format!("ws://{addr}/ws");

    let client = OrbexWebSocketClient::new(fast_config()).unwrap();
    let recorder = Arc::new(RecordingListener::default());
    client.register_listener(recorder.clone());

    client
        .connect(&ws_url, &Credential::new("team-token"))
        .await
        .unwrap();

    // interval 100ms x multiplier 3: silence is declared within ~300ms.
    wait_until_async(
        || async { !recorder.lost.lock().unwrap().is_empty() },
        Duration::from_secs(2),
    )
    .await;

    assert_eq!(recorder.lost.lock().unwrap()[0], "pong timeout");
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_heartbeat_pongs_keep_session_alive() {
    let state = Arc::new(TestServerState::default());
    let addr = start_ws_server(state.clone()).await;
    let ws_url = format!("ws://{addr}/ws");

    let client = OrbexWebSocketClient::new(fast_config()).unwrap();
    let recorder = Arc::new(RecordingListener::default());
    client.register_listener(recorder.clone());

    client
        .connect(&ws_url, &Credential::new("team-token"))
        .await
        .unwrap();

    // Several multiples of the timeout with the server answering every probe.
    tokio::time::sleep(Duration::from_millis(900)).await;
    assert_eq!(client.connection_state(), ConnectionState::Authenticated);
    assert!(recorder.lost.lock().unwrap().is_empty());
    assert!(!state.received_of_type("PING").is_empty());

    client.disconnect().await;
}

#[tokio::test]
async fn test_ticker_burst_ordered_and_listener_failure_isolated() {
    let state = Arc::new(TestServerState::default());
    state.ticker_burst.store(100, Ordering::Relaxed);
    let addr = start_ws_server(state).await;
    let ws_url = format!("ws://{addr}/ws");

    let client = OrbexWebSocketClient::new(fast_config()).unwrap();
    let first = Arc::new(RecordingListener::default());
    let second = Arc::new(RecordingListener::default());
    client.register_listener(first.clone());
    client.register_listener(Arc::new(FailingListener));
    client.register_listener(second.clone());

    client
        .connect(&ws_url, &Credential::new("team-token"))
        .await
        .unwrap();

    wait_until_async(
        || async {
            first.tickers.lock().unwrap().len() == 100
                && second.tickers.lock().unwrap().len() == 100
        },
        Duration::from_secs(5),
    )
    .await;

    for recorder in [&first, &second] {
        let bids: Vec<f64> = recorder
            .tickers
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.best_bid)
            .collect();
        assert_eq!(bids, (0..100).map(f64::from).collect::<Vec<_>>());
    }

    // Session saw every ticker before the listeners did.
    let snapshot = client.session_snapshot();
    assert_eq!(snapshot.last_mid.get(&Ustr::from("IRON")), Some(&99.5));

    client.disconnect().await;
}

#[tokio::test]
async fn test_order_before_auth_blocks_until_handshake_completes() {
    let state = Arc::new(TestServerState::default());
    // Keep the handshake window shorter than the 300ms pong deadline: the mock
    // server's single read loop answers no pings while it sleeps on the login.
    state.login_delay_ms.store(150, Ordering::Relaxed);
    let addr = start_ws_server(state.clone()).await;
    let ws_url = format!("ws://{addr}/ws");

    let client = Arc::new(OrbexWebSocketClient::new(fast_config()).unwrap());

    let connector = Arc::clone(&client);
    let url = ws_url.clone();
    let connect_task = tokio::spawn(async move {
        connector
            .connect(&url, &Credential::new("team-token"))
            .await
    });

    // Wait for the handshake window: connected but not yet authenticated.
    wait_until_async(
        || async { client.connection_state() == ConnectionState::Connected },
        Duration::from_secs(2),
    )
    .await;

    let cl_ord_id = client
        .submit_order(Ustr::from("IRON"), OrderSide::Buy, 3, Some(9.5))
        .await
        .unwrap();
    assert_eq!(client.connection_state(), ConnectionState::Authenticated);

    connect_task.await.unwrap().unwrap();

    wait_until_async(
        || async { !state.received_of_type("ORDER").is_empty() },
        Duration::from_secs(2),
    )
    .await;
    let orders = state.received_of_type("ORDER");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["clOrdID"], cl_ord_id.as_str());
    assert_eq!(orders[0]["side"], "BUY");
    assert_eq!(orders[0]["quantity"], 3);

    client.disconnect().await;
}

#[tokio::test]
async fn test_offer_lands_in_session_and_response_clears_it() {
    let state = Arc::new(TestServerState::default());
    state.send_offer.store(true, Ordering::Relaxed);
    let addr = start_ws_server(state.clone()).await;
    let ws_url = format!("ws://{addr}/ws");

    let client = OrbexWebSocketClient::new(fast_config()).unwrap();
    let recorder = Arc::new(RecordingListener::default());
    client.register_listener(recorder.clone());

    client
        .connect(&ws_url, &Credential::new("team-token"))
        .await
        .unwrap();

    wait_until_async(
        || async { !client.session_snapshot().open_offers.is_empty() },
        Duration::from_secs(2),
    )
    .await;
    wait_until_async(
        || async { !recorder.offers.lock().unwrap().is_empty() },
        Duration::from_secs(2),
    )
    .await;
    assert_eq!(recorder.offers.lock().unwrap()[0].offer_id, "of-77");

    client.respond_offer("of-77", true).await.unwrap();
    assert!(client.session_snapshot().open_offers.is_empty());

    wait_until_async(
        || async { !state.received_of_type("ACCEPT_OFFER").is_empty() },
        Duration::from_secs(2),
    )
    .await;
    let accepts = state.received_of_type("ACCEPT_OFFER");
    assert_eq!(accepts[0]["offerId"], "of-77");
    assert_eq!(accepts[0]["accept"], true);

    client.disconnect().await;
}

#[tokio::test]
async fn test_disconnect_then_reconnect() {
    let state = Arc::new(TestServerState::default());
    let addr = start_ws_server(state.clone()).await;
    let ws_url = format!("ws://{addr}/ws");

    let client = OrbexWebSocketClient::new(fast_config()).unwrap();
    client
        .connect(&ws_url, &Credential::new("team-token"))
        .await
        .unwrap();
    client.disconnect().await;
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);

    client
        .connect(&ws_url, &Credential::new("team-token"))
        .await
        .unwrap();
    assert_eq!(client.connection_state(), ConnectionState::Authenticated);
    assert_eq!(state.connection_count.load(Ordering::Relaxed), 2);

    client.shutdown().await;
}

#[tokio::test]
async fn test_scheduled_task_trades_over_the_session() {
    let state = Arc::new(TestServerState::default());
    let addr = start_ws_server(state.clone()).await;
    let ws_url = format!("ws://{addr}/ws");

    let client = Arc::new(OrbexWebSocketClient::new(fast_config()).unwrap());
    client
        .connect(&ws_url, &Credential::new("team-token"))
        .await
        .unwrap();

    let trader = Arc::clone(&client);
    client
        .register_task("buy-iron", Duration::from_millis(100), move || {
            let trader = Arc::clone(&trader);
            async move {
                trader
                    .submit_order(Ustr::from("IRON"), OrderSide::Buy, 1, None)
                    .await?;
                Ok(())
            }
        })
        .unwrap();

    wait_until_async(
        || async { state.received_of_type("ORDER").len() >= 2 },
        Duration::from_secs(3),
    )
    .await;

    assert!(client.cancel_task("buy-iron"));
    client.shutdown().await;
}
