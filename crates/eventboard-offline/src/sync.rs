//! Background replay of the pending-action queue.
//!
//! Actions are replayed one at a time in queue order. A pass stops at the
//! first action that fails; that action and everything after it stay queued
//! for the next trigger. Concurrent triggers wait for the running pass, so an
//! action is never in flight twice.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::error::QueueError;
use crate::network::Network;
use crate::queue::ActionStore;

/// Outcome of one replay pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    /// Identifiers confirmed and removed, in replay order.
    pub replayed: Vec<i64>,
    /// The action that stopped the pass, if any.
    pub failed: Option<i64>,
    /// Actions still queued after the pass.
    pub remaining: u64,
}

impl ReplayReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_none() && self.remaining == 0
    }
}

pub struct BackgroundSync {
    actions: Arc<dyn ActionStore>,
    network: Arc<dyn Network>,
    origin: Url,
    pass: Mutex<()>,
}

impl BackgroundSync {
    pub fn new(actions: Arc<dyn ActionStore>, network: Arc<dyn Network>, origin: Url) -> Self {
        Self {
            actions,
            network,
            origin,
            pass: Mutex::new(()),
        }
    }

    pub fn actions(&self) -> &Arc<dyn ActionStore> {
        &self.actions
    }

    /// Replays queued actions in FIFO order. Only a 2xx response counts as
    /// confirmed delivery.
    #[instrument(skip(self))]
    pub async fn replay_all(&self) -> Result<ReplayReport, QueueError> {
        let _pass = self.pass.lock().await;

        let mut report = ReplayReport::default();
        for action in self.actions.pending().await? {
            let request = match action.to_request(&self.origin) {
                Ok(request) => request,
                Err(err) => {
                    error!(action.id = action.id, error = %err, "Unreplayable pending action");
                    report.failed = Some(action.id);
                    break;
                }
            };

            match self.network.fetch(request).await {
                Ok(response) if response.is_success() => {
                    self.actions.delete(action.id).await?;
                    debug!(action.id = action.id, status = %response.status, "Action replayed");
                    report.replayed.push(action.id);
                }
                Ok(response) => {
                    warn!(
                        action.id = action.id,
                        status = %response.status,
                        "Replay rejected, leaving queued"
                    );
                    report.failed = Some(action.id);
                    break;
                }
                Err(err) => {
                    warn!(action.id = action.id, error = %err, "Replay failed, leaving queued");
                    report.failed = Some(action.id);
                    break;
                }
            }
        }

        report.remaining = self.actions.len().await?;
        info!(
            replayed = report.replayed.len(),
            failed = ?report.failed,
            remaining = report.remaining,
            "Replay pass finished"
        );
        Ok(report)
    }
}

/// Replays the queue whenever `online` flips from `false` to `true`.
///
/// The task ends when the sender is dropped.
pub fn spawn_connectivity_watcher(
    sync: Arc<BackgroundSync>,
    mut online: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let mut was_online = *online.borrow_and_update();

    tokio::spawn(async move {
        while online.changed().await.is_ok() {
            let is_online = *online.borrow_and_update();
            if is_online && !was_online {
                info!("Connectivity restored, replaying pending actions");
                if let Err(err) = sync.replay_all().await {
                    error!(error = %err, "Replay after reconnect failed");
                }
            }
            was_online = is_online;
        }

        debug!("Connectivity watcher stopped");
    })
}
