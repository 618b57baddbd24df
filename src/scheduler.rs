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

//! Named periodic tasks on independent timers.

use std::{future::Future, sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use crate::websocket::error::{OrbexWsError, OrbexWsResult};

#[derive(Debug)]
struct TaskHandle {
    token: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

/// Runs named actions at fixed intervals, each on its own Tokio timer.
///
/// The first execution of a task happens one full interval after registration.
/// Action errors are logged and the task keeps running; a slow tick delays the
/// next one rather than running the action concurrently with itself.
#[derive(Clone, Debug, Default)]
pub struct TaskScheduler {
    tasks: Arc<DashMap<String, TaskHandle>>,
}

impl TaskScheduler {
    /// Creates a scheduler with no tasks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `action` to run every `interval` under `name`.
    ///
    /// Registering an existing name cancels and replaces the previous task.
    ///
    /// # Errors
    ///
    /// Returns [`OrbexWsError::InvalidArgument`] for a blank name or zero interval.
    pub fn register<F, Fut>(&self, name: &str, interval: Duration, action: F) -> OrbexWsResult<()>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send,
    {
        if name.trim().is_empty() {
            return Err(OrbexWsError::InvalidArgument(
                "task name must not be blank".to_string(),
            ));
        }
        if interval.is_zero() {
            return Err(OrbexWsError::InvalidArgument(
                "task interval must be positive".to_string(),
            ));
        }

        let token = CancellationToken::new();
        let task_token = token.clone();
        let task_name = name.to_string();
        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut timer = tokio::time::interval_at(start, interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = task_token.cancelled() => break,
                    _ = timer.tick() => {
                        if let Err(e) = action().await {
                            tracing::error!(task = %task_name, error = %e, "Task failed");
                        }
                    }
                }
            }
        });

        if let Some(previous) = self.tasks.insert(
            name.to_string(),
            TaskHandle { token, handle },
        ) {
            tracing::warn!(task = name, "Replacing existing task");
            previous.token.cancel();
            previous.handle.abort();
        }
        tracing::debug!(task = name, ?interval, "Registered task");
        Ok(())
    }

    /// Cancels the task under `name`; returns whether it existed.
    pub fn cancel(&self, name: &str) -> bool {
        if let Some((_, task)) = self.tasks.remove(name) {
            task.token.cancel();
            task.handle.abort();
            tracing::debug!(task = name, "Cancelled task");
            true
        } else {
            false
        }
    }

    /// Cancels every registered task.
    pub fn shutdown_all(&self) {
        let names: Vec<String> = self.tasks.iter().map(|e| e.key().clone()).collect();
        for name in names {
            self.cancel(&name);
        }
    }

    /// Returns the number of registered tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns whether no tasks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
