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

//! ORBEX session credential handling.

use std::fmt::Debug;

/// Team token used to authenticate the WebSocket session.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
}

impl Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(Credential))
            .field("token", &self.token_masked())
            .finish()
    }
}

impl Credential {
    /// Creates a new [`Credential`] instance.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Returns the raw token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns a masked form of the token suitable for logging.
    #[must_use]
    pub fn token_masked(&self) -> String {
        if self.token.chars().count() <= 4 {
            "****".to_string()
        } else {
            let prefix: String = self.token.chars().take(4).collect();
            format!("{prefix}****")
        }
    }

    /// Returns whether the token is empty or whitespace-only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.token.trim().is_empty()
    }
}
