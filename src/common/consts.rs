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

//! Core constants for the ORBEX connector.

/// Venue identifier string.
pub const ORBEX: &str = "ORBEX";

// Production URLs
pub const ORBEX_WS_URL: &str = "wss://exchange.orbex.example/ws";

// Sandbox URLs
pub const ORBEX_SANDBOX_WS_URL: &str = "wss://sandbox.orbex.example/ws";

/// Timezone sent with the login frame.
pub const LOGIN_TZ: &str = "UTC";

/// Multiplier applied to the heartbeat interval before a missing probe
/// response is declared a timeout.
pub const HEARTBEAT_TIMEOUT_MULTIPLIER: u32 = 3;
