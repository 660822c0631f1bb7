/*!
 * Memoized Space connection.
 *
 * One engine keeps at most one Space connection, keyed by model id. The
 * connection attempt is stored as a shared `OnceCell`, so concurrent callers
 * for the same model all await the same attempt. Switching to another model
 * drops the stale slot; the new connection is only opened when someone
 * actually needs it.
 */

use log::{info, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::errors::TranslationError;
use crate::providers::{SpaceClient, SpaceConnector};

/// Why a connection attempt produced no client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectFailure {
    /// The backend rejected the connection
    Rejected(String),
    /// The attempt exceeded the connect deadline
    TimedOut(Duration),
}

/// Settled result of a connection attempt
#[derive(Debug, Clone)]
pub enum ConnectionState {
    Ready(Arc<dyn SpaceClient>),
    Failed(ConnectFailure),
}

impl ConnectionState {
    /// The client, or the error a send against this state reports
    pub fn client(&self, space: &str) -> Result<Arc<dyn SpaceClient>, TranslationError> {
        match self {
            Self::Ready(client) => Ok(Arc::clone(client)),
            Self::Failed(ConnectFailure::TimedOut(after)) => Err(TranslationError::Timeout {
                stage: "connecting",
                after: *after,
            }),
            Self::Failed(ConnectFailure::Rejected(reason)) => Err(TranslationError::NoClient {
                space: space.to_string(),
                reason: reason.clone(),
            }),
        }
    }
}

/// Observable lifecycle of the cached connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Unconnected,
    Connecting,
    Ready,
    Failed,
}

struct Slot {
    model_id: String,
    space: String,
    /// Token the connection is opened with
    token: Option<String>,
    started: Arc<AtomicBool>,
    cell: Arc<OnceCell<ConnectionState>>,
}

impl Slot {
    fn new(model_id: &str, space: &str, token: Option<&str>) -> Self {
        Self {
            model_id: model_id.to_string(),
            space: space.to_string(),
            token: token.map(str::to_string),
            started: Arc::new(AtomicBool::new(false)),
            cell: Arc::new(OnceCell::new()),
        }
    }

    fn serves(&self, model_id: &str, space: &str) -> bool {
        self.model_id == model_id && self.space == space
    }
}

/// Caches the connection of the currently selected Space model
pub struct SpaceConnectionCache {
    connector: Arc<dyn SpaceConnector>,
    connect_timeout: Duration,
    slot: Mutex<Option<Slot>>,
}

impl SpaceConnectionCache {
    pub fn new(connector: Arc<dyn SpaceConnector>, connect_timeout: Duration) -> Self {
        Self {
            connector,
            connect_timeout,
            slot: Mutex::new(None),
        }
    }

    /// Make `model_id` the current model without connecting.
    ///
    /// Reselecting the current model keeps its slot; any other model
    /// replaces it.
    pub fn select(&self, model_id: &str, space: &str) {
        let mut slot = self.slot.lock();
        if !slot.as_ref().is_some_and(|current| current.serves(model_id, space)) {
            replace_slot(&mut slot, Slot::new(model_id, space, None));
        }
    }

    /// Connection for `model_id`, opening it on first use.
    ///
    /// Concurrent callers for the same model and token share a single
    /// attempt. A failed attempt stays failed until the model or the token
    /// changes.
    pub async fn connection(&self, model_id: &str, space: &str, token: Option<&str>) -> ConnectionState {
        let (started, cell) = self.slot_for(model_id, space, token);

        cell.get_or_init(|| async {
            started.store(true, Ordering::SeqCst);
            info!("Connecting to space {} for {}", space, model_id);

            match tokio::time::timeout(self.connect_timeout, self.connector.connect(space, token)).await {
                Ok(Ok(client)) => ConnectionState::Ready(client),
                Ok(Err(e)) => {
                    warn!("Connection to space {} failed: {}", space, e);
                    ConnectionState::Failed(ConnectFailure::Rejected(e.to_string()))
                }
                Err(_) => {
                    warn!("Connection to space {} timed out", space);
                    ConnectionState::Failed(ConnectFailure::TimedOut(self.connect_timeout))
                }
            }
        })
        .await
        .clone()
    }

    /// Lifecycle state of the current slot
    pub fn status(&self) -> ConnectionStatus {
        let slot = self.slot.lock();
        match slot.as_ref() {
            None => ConnectionStatus::Unconnected,
            Some(slot) => match slot.cell.get() {
                Some(ConnectionState::Ready(_)) => ConnectionStatus::Ready,
                Some(ConnectionState::Failed(_)) => ConnectionStatus::Failed,
                None if slot.started.load(Ordering::SeqCst) => ConnectionStatus::Connecting,
                None => ConnectionStatus::Unconnected,
            },
        }
    }

    /// Model id the current slot belongs to
    pub fn current_model(&self) -> Option<String> {
        self.slot.lock().as_ref().map(|slot| slot.model_id.clone())
    }

    fn slot_for(
        &self,
        model_id: &str,
        space: &str,
        token: Option<&str>,
    ) -> (Arc<AtomicBool>, Arc<OnceCell<ConnectionState>>) {
        let mut slot = self.slot.lock();
        let reusable = slot
            .as_ref()
            .is_some_and(|current| current.serves(model_id, space) && current.token.as_deref() == token);

        let current = if reusable {
            slot.get_or_insert_with(|| Slot::new(model_id, space, token))
        } else {
            replace_slot(&mut slot, Slot::new(model_id, space, token))
        };
        (Arc::clone(&current.started), Arc::clone(&current.cell))
    }
}

fn replace_slot(slot: &mut Option<Slot>, next: Slot) -> &mut Slot {
    if let Some(stale) = slot.take() {
        info!("Dropping connection to space {} ({})", stale.space, stale.model_id);
    }
    slot.insert(next)
}
