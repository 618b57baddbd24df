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

//! Enumerations for the ORBEX connector.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Lifecycle state of the exchange connection.
///
/// Transitions form a strict path `Disconnected → Connecting → Connected →
/// Authenticated`; any failure or explicit disconnect returns directly to
/// `Disconnected`. No other edges exist.
#[repr(u8)]
#[derive(
    Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash, AsRefStr, EnumIter, EnumString,
)]
pub enum ConnectionState {
    /// No transport open.
    #[default]
    Disconnected = 0,
    /// Transport opening, login not yet sent.
    Connecting = 1,
    /// Transport open, login sent, handshake pending.
    Connected = 2,
    /// Login acknowledged by the exchange.
    Authenticated = 3,
}

impl ConnectionState {
    /// Returns the state encoded as a `u8` for atomic storage.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decodes a state from its `u8` representation.
    ///
    /// Unknown values decode as `Disconnected`.
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Authenticated,
            _ => Self::Disconnected,
        }
    }
}

/// Order side.
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Error codes delivered by the exchange in `ERROR` frames.
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AuthFailed,
    InvalidToken,
    InsufficientFunds,
    InsufficientInventory,
    ProductNotAuthorized,
    PriceNotAvailable,
    /// Forward-compatible fallback for codes this build does not know.
    #[serde(other)]
    Unknown,
}

impl ErrorCode {
    /// Returns whether this code rejects the login handshake.
    #[must_use]
    pub const fn is_auth_failure(self) -> bool {
        matches!(self, Self::AuthFailed | Self::InvalidToken)
    }
}
