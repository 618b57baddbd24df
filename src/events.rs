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

//! Event fan-out to registered listeners.
//!
//! Each listener gets a dedicated unbounded channel drained by its own Tokio task, so
//! one event can be delivered to many listeners concurrently while a single listener
//! always observes events in the order they were routed. A listener returning an error
//! (or lagging) never affects the other listeners or the connector itself.

use std::{
    fmt::Debug,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use dashmap::DashMap;

use crate::websocket::messages::{
    BalanceUpdateMsg, BroadcastMsg, ErrorMsg, EventDeltaMsg, FillMsg, InventoryUpdateMsg,
    LoginOkMsg, OfferMsg, OrderAckMsg, PerformanceReportMsg, TickerMsg,
};

/// Decoded exchange event delivered to listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum OrbexEvent {
    LoginOk(LoginOkMsg),
    Error(ErrorMsg),
    Ticker(TickerMsg),
    Fill(FillMsg),
    BalanceUpdate(BalanceUpdateMsg),
    InventoryUpdate(InventoryUpdateMsg),
    Offer(OfferMsg),
    OrderAck(OrderAckMsg),
    EventDelta(EventDeltaMsg),
    Broadcast(BroadcastMsg),
    PerformanceReport(PerformanceReportMsg),
    /// The connection was lost (transport error or heartbeat timeout).
    ConnectionLost {
        /// Loss cause, e.g. `"pong timeout"`.
        cause: String,
    },
}

/// Callbacks invoked for each exchange event kind.
///
/// All methods default to no-ops so implementors only override what they need.
/// Returned errors are logged by the dispatcher and never propagated.
#[allow(unused_variables)]
pub trait OrbexEventListener: Send + Sync {
    fn on_login_ok(&self, msg: &LoginOkMsg) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_error(&self, msg: &ErrorMsg) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_ticker(&self, msg: &TickerMsg) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_fill(&self, msg: &FillMsg) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_balance_update(&self, msg: &BalanceUpdateMsg) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_inventory_update(&self, msg: &InventoryUpdateMsg) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_offer(&self, msg: &OfferMsg) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_order_ack(&self, msg: &OrderAckMsg) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_event_delta(&self, msg: &EventDeltaMsg) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_broadcast(&self, msg: &BroadcastMsg) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_performance_report(&self, msg: &PerformanceReportMsg) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_connection_lost(&self, cause: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Handle identifying a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Thread-safe registry of listeners with per-listener delivery tasks.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    senders: Arc<DashMap<ListenerId, tokio::sync::mpsc::UnboundedSender<Arc<OrbexEvent>>>>,
    next_id: Arc<AtomicU64>,
}

impl Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(ListenerRegistry))
            .field("listeners", &self.senders.len())
            .finish()
    }
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener and spawns its delivery task.
    ///
    /// A listener registered while an event is being dispatched may or may not
    /// receive that event; it reliably receives every event from the next one on.
    pub fn register(&self, listener: Arc<dyn OrbexEventListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Arc<OrbexEvent>>();

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = deliver(listener.as_ref(), &event) {
                    tracing::error!(listener_id = id.0, error = %e, "Listener error");
                }
            }
        });

        self.senders.insert(id, tx);
        tracing::debug!(listener_id = id.0, "Registered listener");
        id
    }

    /// Unregisters a listener; unknown IDs are a no-op.
    ///
    /// Events already queued for the listener are still delivered before its
    /// delivery task stops.
    pub fn unregister(&self, id: ListenerId) {
        if self.senders.remove(&id).is_some() {
            tracing::debug!(listener_id = id.0, "Unregistered listener");
        }
    }

    /// Delivers `event` to every registered listener.
    pub fn dispatch(&self, event: OrbexEvent) {
        let event = Arc::new(event);
        self.senders.retain(|id, tx| {
            let alive = tx.send(Arc::clone(&event)).is_ok();
            if !alive {
                tracing::warn!(listener_id = id.0, "Dropping dead listener");
            }
            alive
        });
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

fn deliver(listener: &dyn OrbexEventListener, event: &OrbexEvent) -> anyhow::Result<()> {
    match event {
        OrbexEvent::LoginOk(msg) => listener.on_login_ok(msg),
        OrbexEvent::Error(msg) => listener.on_error(msg),
        OrbexEvent::Ticker(msg) => listener.on_ticker(msg),
        OrbexEvent::Fill(msg) => listener.on_fill(msg),
        OrbexEvent::BalanceUpdate(msg) => listener.on_balance_update(msg),
        OrbexEvent::InventoryUpdate(msg) => listener.on_inventory_update(msg),
        OrbexEvent::Offer(msg) => listener.on_offer(msg),
        OrbexEvent::OrderAck(msg) => listener.on_order_ack(msg),
        OrbexEvent::EventDelta(msg) => listener.on_event_delta(msg),
        OrbexEvent::Broadcast(msg) => listener.on_broadcast(msg),
        OrbexEvent::PerformanceReport(msg) => listener.on_performance_report(msg),
        OrbexEvent::ConnectionLost { cause } => listener.on_connection_lost(cause),
    }
}
