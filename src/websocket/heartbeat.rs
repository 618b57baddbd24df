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

//! Application-level heartbeat: periodic `PING` probes and pong-silence detection.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicU8, AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{messages::ClientMessage, transport::{SendGate, TransportEvent}};

/// Lifecycle of the heartbeat task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[repr(u8)]
pub enum HeartbeatState {
    /// Never started for the current connection.
    Idle = 0,
    /// Probe task running.
    Running = 1,
    /// Stopped, either explicitly or after declaring a timeout.
    Stopped = 2,
}

impl HeartbeatState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Stopped,
            _ => Self::Idle,
        }
    }
}

/// Sends a JSON `PING` every interval and declares the connection dead when no
/// `PONG` has been observed for `interval * multiplier`.
///
/// A timeout is never surfaced as an error to callers; it is injected as
/// [`TransportEvent::PongTimeout`] into the inbound channel so the loss is
/// reported in order with the frames that preceded it.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    interval: Duration,
    timeout: Duration,
    state: Arc<AtomicU8>,
    epoch: Instant,
    last_pong_ms: Arc<AtomicU64>,
    task: Mutex<Option<(CancellationToken, tokio::task::JoinHandle<()>)>>,
}

impl HeartbeatMonitor {
    /// Creates an idle monitor.
    #[must_use]
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            state: Arc::new(AtomicU8::new(HeartbeatState::Idle as u8)),
            epoch: Instant::now(),
            last_pong_ms: Arc::new(AtomicU64::new(0)),
            task: Mutex::new(None),
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> HeartbeatState {
        HeartbeatState::from_u8(self.state.load(Ordering::Relaxed))
    }

    /// Records a pong observation, resetting the silence clock.
    pub fn record_pong(&self) {
        self.last_pong_ms
            .store(self.now_ms(), Ordering::Relaxed);
    }

    /// Starts the probe task. Any previous task for this monitor is stopped first.
    ///
    /// The first probe fires one full interval after the call; the handshake
    /// itself counts as initial liveness.
    pub fn start(
        &self,
        gate: Arc<SendGate>,
        events_tx: tokio::sync::mpsc::UnboundedSender<TransportEvent>,
    ) {
        self.stop();
        self.record_pong();
        self.state
            .store(HeartbeatState::Running as u8, Ordering::Relaxed);

        let interval = self.interval;
        let timeout_ms = self.timeout.as_millis() as u64;
        let state = Arc::clone(&self.state);
        let epoch = self.epoch;
        let last_pong_ms = Arc::clone(&self.last_pong_ms);
        let token = CancellationToken::new();
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval_at(Instant::now() + interval, interval);
            loop {
                tokio::select! {
                    () = task_token.cancelled() => break,
                    _ = timer.tick() => {
                        let now_ms = epoch.elapsed().as_millis() as u64;
                        let silence = now_ms.saturating_sub(last_pong_ms.load(Ordering::Relaxed));
                        if silence >= timeout_ms {
                            tracing::warn!(silence_ms = silence, "Heartbeat timed out");
                            state.store(HeartbeatState::Stopped as u8, Ordering::Relaxed);
                            let _ = events_tx.send(TransportEvent::PongTimeout);
                            break;
                        }
                        match ClientMessage::Ping.to_json() {
                            Ok(json) => {
                                if let Err(e) = gate.send_text(json).await {
                                    // The read pump reports the transport failure.
                                    tracing::debug!(error = %e, "Heartbeat probe not sent");
                                }
                            }
                            Err(e) => tracing::error!(error = %e, "Failed to encode probe"),
                        }
                    }
                }
            }
        });

        *self.task.lock().unwrap() = Some((token, handle));
    }

    /// Stops the probe task. Idempotent.
    pub fn stop(&self) {
        if let Some((token, handle)) = self.task.lock().unwrap().take() {
            token.cancel();
            handle.abort();
            self.state
                .store(HeartbeatState::Stopped as u8, Ordering::Relaxed);
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

impl Drop for HeartbeatMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
