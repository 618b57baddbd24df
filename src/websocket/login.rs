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

//! Single-shot login handshake tracking.

use std::sync::Mutex;

use tokio::sync::oneshot;

use super::{
    error::{OrbexWsError, OrbexWsResult},
    messages::LoginOkMsg,
};

/// Tracks the in-flight login handshake.
///
/// `begin` arms a fresh one-shot slot; the first of `succeed`/`fail`/`abandon`
/// resolves it and later calls are no-ops. A new `begin` abandons any previous
/// attempt still pending.
#[derive(Debug, Default)]
pub struct LoginTracker {
    pending: Mutex<Option<oneshot::Sender<OrbexWsResult<LoginOkMsg>>>>,
}

impl LoginTracker {
    /// Creates a tracker with no attempt in flight.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a login attempt and returns the receiver the connect call blocks on.
    pub fn begin(&self) -> oneshot::Receiver<OrbexWsResult<LoginOkMsg>> {
        let (tx, rx) = oneshot::channel();
        if self.pending.lock().unwrap().replace(tx).is_some() {
            tracing::warn!("Abandoning previous login attempt");
        }
        rx
    }

    /// Resolves the pending attempt with a successful login.
    pub fn succeed(&self, msg: LoginOkMsg) {
        self.resolve(Ok(msg));
    }

    /// Resolves the pending attempt with an error.
    pub fn fail(&self, error: OrbexWsError) {
        self.resolve(Err(error));
    }

    /// Drops the pending attempt without resolving it (disconnect during handshake).
    pub fn abandon(&self) {
        self.pending.lock().unwrap().take();
    }

    /// Returns whether an attempt is currently awaiting resolution.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.lock().unwrap().is_some()
    }

    fn resolve(&self, outcome: OrbexWsResult<LoginOkMsg>) {
        if let Some(tx) = self.pending.lock().unwrap().take() {
            // Receiver may have timed out and dropped; nothing to do then.
            let _ = tx.send(outcome);
        }
    }
}
