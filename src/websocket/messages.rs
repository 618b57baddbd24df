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

//! Data structures for ORBEX WebSocket frames.
//!
//! Every frame is a JSON object tagged by a `type` field. Outbound frames are
//! [`ClientMessage`] variants; inbound frames decode into [`ServerMessage`].

use serde::{Deserialize, Serialize};
use ustr::Ustr;

use super::error::{OrbexWsError, OrbexWsResult};
use crate::common::enums::{ErrorCode, OrderSide};

/// Outbound frames sent by the connector.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Login handshake request.
    Login {
        /// Team token.
        token: String,
        /// Session timezone.
        tz: String,
    },
    /// New order request.
    Order {
        /// Client-assigned order ID.
        #[serde(rename = "clOrdID")]
        cl_ord_id: String,
        /// Product symbol.
        product: Ustr,
        /// Order side.
        side: OrderSide,
        /// Order quantity.
        quantity: i64,
        /// Limit price; `None` for market orders.
        #[serde(skip_serializing_if = "Option::is_none")]
        price: Option<f64>,
    },
    /// Order cancellation request.
    Cancel {
        /// Client-assigned order ID of the order to cancel.
        #[serde(rename = "clOrdID")]
        cl_ord_id: String,
    },
    /// Production line configuration update.
    ProductionUpdate {
        /// Product symbol.
        product: Ustr,
        /// Whether the premium production line is active.
        premium: bool,
    },
    /// Response to a private offer.
    AcceptOffer {
        /// The offer being answered.
        #[serde(rename = "offerId")]
        offer_id: String,
        /// `true` to accept, `false` to reject.
        accept: bool,
    },
    /// Liveness probe.
    Ping,
}

impl ClientMessage {
    /// Serializes the frame to its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> OrbexWsResult<String> {
        serde_json::to_string(self).map_err(OrbexWsError::from)
    }
}

/// Successful login acknowledgment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOkMsg {
    /// Team name the session is authenticated as.
    pub team: String,
    /// Species assigned to the team.
    pub species: String,
    /// Balance at session start.
    pub current_balance: f64,
}

/// Error frame delivered by the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMsg {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable reason.
    pub reason: String,
}

/// Snapshot of current best prices for a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerMsg {
    /// Product symbol.
    pub product: Ustr,
    /// Best bid price.
    pub best_bid: f64,
    /// Best ask price.
    pub best_ask: f64,
}

impl TickerMsg {
    /// Returns the mid price.
    #[must_use]
    pub fn mid(&self) -> f64 {
        (self.best_bid + self.best_ask) / 2.0
    }
}

/// Fill confirmation for an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillMsg {
    /// Fill side.
    pub side: OrderSide,
    /// Filled quantity.
    pub fill_qty: i64,
    /// Product symbol.
    pub product: Ustr,
    /// Fill price.
    pub fill_price: f64,
}

/// Authoritative balance update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceUpdateMsg {
    /// New balance.
    pub balance: f64,
}

/// Authoritative inventory level for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryUpdateMsg {
    /// Product symbol.
    pub product: Ustr,
    /// New quantity held.
    pub quantity: i64,
}

/// Private offer from the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferMsg {
    /// Offer identifier, used when responding.
    pub offer_id: String,
    /// Product symbol.
    pub product: Ustr,
    /// Offered quantity.
    pub quantity: i64,
    /// Offered price.
    pub price: f64,
}

/// Order acknowledgment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAckMsg {
    /// Exchange-assigned order ID.
    pub order_id: String,
    /// Acknowledgment status.
    pub status: String,
}

/// Narrative world-event delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDeltaMsg {
    /// Event description.
    pub description: String,
}

/// Operator broadcast to all connected teams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastMsg {
    /// Broadcast text.
    pub message: String,
}

/// Periodic global standings report.
///
/// The payload shape is venue-defined and evolves between seasons, so it is kept
/// opaque and handed to listeners as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReportMsg {
    /// Raw report payload.
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Inbound frames delivered by the exchange.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
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
    GlobalPerformanceReport(PerformanceReportMsg),
    /// Liveness probe response.
    Pong,
}

/// Parses a raw JSON frame into a [`ServerMessage`].
///
/// # Errors
///
/// Returns [`OrbexWsError::Decode`] if the frame is malformed or carries an
/// unrecognized `type` tag.
pub fn parse_raw_message(text: &str) -> OrbexWsResult<ServerMessage> {
    serde_json::from_str(text).map_err(OrbexWsError::from)
}
