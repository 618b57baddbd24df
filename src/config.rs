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

//! Configuration for the ORBEX WebSocket connector.

use std::time::Duration;

use crate::{common::consts::HEARTBEAT_TIMEOUT_MULTIPLIER, websocket::error::OrbexWsError};

/// Static configuration for an [`OrbexWebSocketClient`](crate::websocket::client::OrbexWebSocketClient).
///
/// `connection_timeout` bounds both the transport open and the login handshake wait;
/// authenticated operations issued before the handshake completes block for at most
/// the same duration.
#[derive(Clone, Debug)]
pub struct ConnectorConfig {
    /// Timeout applied to the transport open and the login handshake.
    pub connection_timeout: Duration,
    /// Interval between heartbeat probes.
    pub heartbeat_interval: Duration,
    /// Missed-probe multiplier: the connection is declared dead when no probe
    /// response arrives within `heartbeat_interval * heartbeat_timeout_multiplier`.
    pub heartbeat_timeout_multiplier: u32,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(5),
            heartbeat_timeout_multiplier: HEARTBEAT_TIMEOUT_MULTIPLIER,
        }
    }
}

impl ConnectorConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`OrbexWsError::InvalidArgument`] if any duration is zero or the
    /// multiplier is zero.
    pub fn validate(&self) -> Result<(), OrbexWsError> {
        if self.connection_timeout.is_zero() {
            return Err(OrbexWsError::InvalidArgument(
                "connection_timeout must be positive".to_string(),
            ));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(OrbexWsError::InvalidArgument(
                "heartbeat_interval must be positive".to_string(),
            ));
        }
        if self.heartbeat_timeout_multiplier == 0 {
            return Err(OrbexWsError::InvalidArgument(
                "heartbeat_timeout_multiplier must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the deadline after which missing probe responses force a disconnect.
    #[must_use]
    pub fn heartbeat_timeout(&self) -> Duration {
        self.heartbeat_interval * self.heartbeat_timeout_multiplier
    }
}
