// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connection status shared across the sync layer.
//!
//! The monitor is advisory for reads and the live subscription: they always
//! try the store. Writes consult it and fail fast while offline.

use std::fmt;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Current view of the link to the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Online,
    Offline,
    /// A reconnect or retry is pending.
    Reconnecting,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Online => "online",
            ConnectionState::Offline => "offline",
            ConnectionState::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Connectivity notifications from the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformEvent {
    Online,
    Offline,
}

/// Shared connection state with change notification.
///
/// Starts `Online`. Retry and subscription code update it; UI code reads it,
/// subscribes to it or polls it.
#[derive(Debug)]
pub struct ConnectionMonitor {
    tx: watch::Sender<ConnectionState>,
}

impl ConnectionMonitor {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ConnectionState::Online);
        Self { tx }
    }

    /// Get the current state.
    pub fn get(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    /// Set the state. Returns true if it changed.
    pub fn set(&self, state: ConnectionState) -> bool {
        let mut previous = state;
        let changed = self.tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            previous = *current;
            *current = state;
            true
        });
        if changed {
            tracing::info!(from = %previous, to = %state, "connection state changed");
        }
        changed
    }

    /// Receive every future change.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }

    pub fn is_offline(&self) -> bool {
        self.get() == ConnectionState::Offline
    }

    /// Human-readable status for display.
    pub fn status_string(&self) -> String {
        match self.get() {
            ConnectionState::Online => "online".to_string(),
            ConnectionState::Offline => "offline (showing saved listings)".to_string(),
            ConnectionState::Reconnecting => "reconnecting".to_string(),
        }
    }

    /// Poll the state every `interval`, calling `listener` whenever it
    /// differs from the last value seen. The first tick always reports.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_poller<F>(&self, interval: Duration, mut listener: F) -> StatusPoller
    where
        F: FnMut(ConnectionState) + Send + 'static,
    {
        let rx = self.tx.subscribe();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let period = interval.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            let mut last: Option<ConnectionState> = None;
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return,
                    _ = ticker.tick() => {}
                }
                let current = *rx.borrow();
                if last != Some(current) {
                    last = Some(current);
                    listener(current);
                }
            }
        });

        StatusPoller {
            cancel,
            handle: Some(handle),
        }
    }
}

impl Default for ConnectionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a polling task. Stops the task when dropped.
#[derive(Debug)]
pub struct StatusPoller {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl StatusPoller {
    /// Stop polling. The listener is not called again.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop polling and wait for the task to exit.
    pub async fn join(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
