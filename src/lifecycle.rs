// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Webhook server lifecycle state.
//!
//! The server moves through `Stopped → Starting → Serving → Draining → Stopped`.
//! The state lives in a [`tokio::sync::watch`] channel. Transitions are applied
//! under the channel lock and every waiter observes the same value.

use crate::errors::ServerError;
use std::fmt;
use tokio::sync::watch;
use tracing::debug;

/// Lifecycle state of the webhook server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Not listening
    Stopped,
    /// Validating certificates and binding the listener
    Starting,
    /// Accepting and handling admission calls
    Serving,
    /// Refusing new connections, waiting for in-flight calls
    Draining,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "Stopped",
            Self::Starting => "Starting",
            Self::Serving => "Serving",
            Self::Draining => "Draining",
        };
        f.write_str(name)
    }
}

/// Atomically transitioned server state with change notification.
#[derive(Debug)]
pub struct Lifecycle {
    state: watch::Sender<ServerState>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    /// Create a lifecycle in the `Stopped` state.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(ServerState::Stopped);
        Self { state }
    }

    /// Current state.
    #[must_use]
    pub fn current(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Move from `from` to `to`, failing if the current state is not `from`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidTransition`] when another caller already
    /// moved the state away from `from`.
    pub fn transition(&self, from: ServerState, to: ServerState) -> Result<(), ServerError> {
        let mut found = from;
        let moved = self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                found = *state;
                false
            }
        });

        if moved {
            debug!(from = %from, to = %to, "Server state transition");
            Ok(())
        } else {
            Err(ServerError::InvalidTransition {
                expected: from,
                found,
            })
        }
    }

    /// Force the state to `Stopped` regardless of where it is.
    pub fn stop(&self) {
        let previous = self.state.send_replace(ServerState::Stopped);
        if previous != ServerState::Stopped {
            debug!(from = %previous, "Server state forced to Stopped");
        }
    }

    /// Wait until the state equals `target`.
    pub async fn wait_for(&self, target: ServerState) {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|state| *state == target).await;
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod lifecycle_tests;
