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

//! ORBEX WebSocket connector error types.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

use crate::common::enums::ErrorCode;

/// Error types for the ORBEX WebSocket connector.
///
/// Errors during setup (`connect`, sends before authentication) are returned to the
/// caller; errors during asynchronous inbound processing are logged and, where
/// meaningful, turned into an `on_connection_lost` notification instead.
#[derive(Debug, Clone, Error)]
pub enum OrbexWsError {
    /// Bad caller input, rejected immediately and never retried.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// Operation attempted in the wrong connection state.
    #[error("Illegal state: {0}")]
    IllegalState(String),
    /// Transport-level failure while connecting.
    #[error("Connection to {endpoint} failed: {cause}")]
    ConnectionFailed {
        /// The endpoint the connect attempt targeted.
        endpoint: String,
        /// The underlying cause.
        cause: String,
    },
    /// Explicit login rejection from the exchange.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    /// Malformed or unrecognized inbound frame.
    #[error("Decode error: {0}")]
    Decode(String),
    /// Transport is closed or half-closed for writing.
    #[error("Not connected")]
    NotConnected,
    /// Failed to write a frame to the transport.
    #[error("Send error: {0}")]
    Send(String),
    /// An operation exceeded its deadline.
    #[error("Timeout: {0}")]
    Timeout(String),
    /// Error frame delivered by the exchange.
    #[error("Exchange error {code}: {reason}")]
    Exchange {
        /// The error code from the exchange.
        code: ErrorCode,
        /// The reason string from the exchange.
        reason: String,
    },
}

impl From<tungstenite::Error> for OrbexWsError {
    fn from(error: tungstenite::Error) -> Self {
        Self::Send(error.to_string())
    }
}

impl From<serde_json::Error> for OrbexWsError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error.to_string())
    }
}

/// Result type alias for ORBEX WebSocket operations.
pub type OrbexWsResult<T> = Result<T, OrbexWsError>;
