// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Network reachability signal.
//!
//! The platform bridge pushes connectivity changes (`PUT /api/network`), and
//! an optional HEAD probe confirms the backend is actually reachable. Both
//! feed one watch channel that the sync loop subscribes to.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared online/offline state.
#[derive(Clone)]
pub struct NetworkMonitor {
    state: Arc<watch::Sender<bool>>,
    http: reqwest::Client,
    ping_url: Option<String>,
}

impl NetworkMonitor {
    pub fn new(initially_online: bool, ping_url: Option<String>) -> Self {
        let (tx, _rx) = watch::channel(initially_online);
        Self {
            state: Arc::new(tx),
            http: reqwest::Client::new(),
            ping_url,
        }
    }

    pub fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    /// Record the current reachability. Returns `true` if it changed.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            tracing::info!(online, "Network status changed");
        }
        changed
    }

    /// Receiver that observes every status change.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    pub fn has_probe(&self) -> bool {
        self.ping_url.is_some()
    }

    /// Check reachability with a HEAD request to the ping URL and record the
    /// result. Without a ping URL the last known status is returned.
    pub async fn probe(&self) -> bool {
        let Some(url) = &self.ping_url else {
            return self.is_online();
        };

        let online = match self.http.head(url).timeout(PROBE_TIMEOUT).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "Reachability probe failed");
                false
            }
        };
        self.set_online(online);
        online
    }
}
