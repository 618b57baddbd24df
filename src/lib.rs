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

//! Connector for the [ORBEX](https://orbex.example) space-commodity exchange.
//!
//! The `orbex` crate provides a persistent WebSocket connector that authenticates a
//! trading session, keeps it alive with heartbeats, and fans decoded exchange events
//! out to any number of registered listeners (strategies, UI panels, background jobs).
//!
//! The core pieces:
//!
//! - [`websocket::client::OrbexWebSocketClient`] — connection lifecycle state machine,
//!   login handshake, and the public trading operations (orders, cancels, production
//!   updates, offer responses).
//! - [`events::OrbexEventListener`] — one callback per exchange event kind; listeners
//!   are isolated from each other, and each listener observes events in arrival order.
//! - [`scheduler::TaskScheduler`] — named periodic strategies layered on top of the
//!   same session.
//!
//! Inbound frames are decoded and routed strictly in arrival order by a dedicated
//! handler task; outbound frames are serialized through a single-permit send gate so
//! writes are never interleaved. Connection loss (transport error or missed heartbeat
//! responses) is reported through the `on_connection_lost` listener callback rather
//! than thrown across task boundaries.
//!
//! Reconnection is intentionally out of scope: callers layer their own retry policy
//! over [`connect`](websocket::client::OrbexWebSocketClient::connect) and
//! [`disconnect`](websocket::client::OrbexWebSocketClient::disconnect).

#![warn(rustc::all)]
#![deny(unsafe_code)]
#![deny(nonstandard_style)]
#![deny(missing_debug_implementations)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod common;
pub mod config;
pub mod events;
pub mod scheduler;
pub mod session;
pub mod websocket;
