use crate::alerts::payload::AlertPayload;
use crate::config::AlertsConfig;
use crate::error::Error;
use anyhow::Result;
use log::{debug, error, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// One connected monitoring client. The hub owns the sending half of the
/// session's outbound queue; the connection task drains the receiving half.
struct Session {
    tx: mpsc::Sender<String>,
}

/// In-process registry of monitoring sessions with a broadcast primitive.
///
/// Shared by handle: the ingestion path broadcasts while dashboard
/// connections register and unregister concurrently. No path holds the
/// session lock across an await, so a broadcast in progress delays a new
/// registration by at most one bounded pass over the map.
pub struct AlertHub {
    /// Registered sessions keyed by connection id
    sessions: RwLock<HashMap<Uuid, Session>>,
    /// Hard ceiling on concurrent sessions
    max_sessions: usize,
    /// Outbound queue depth per session
    queue_capacity: usize,
}

impl AlertHub {
    /// Create a new hub from the alerts configuration
    pub fn new(config: &AlertsConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions: config.max_sessions,
            queue_capacity: config.queue_capacity,
        }
    }

    /// Register a new monitoring session. Returns the session id and the
    /// receiving half of its outbound queue. Fails with CapacityExceeded
    /// when the registry is at its ceiling; the caller must then reject
    /// the connection.
    pub async fn register(&self) -> Result<(Uuid, mpsc::Receiver<String>)> {
        let mut sessions = self.sessions.write().await;

        if sessions.len() >= self.max_sessions {
            return Err(Error::CapacityExceeded(format!(
                "Session registry full ({} sessions)",
                self.max_sessions
            ))
            .into());
        }

        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        sessions.insert(id, Session { tx });

        debug!("Registered alert session {} ({} active)", id, sessions.len());

        Ok((id, rx))
    }

    /// Remove a session. Idempotent; unregistering an unknown id is a no-op.
    pub async fn unregister(&self, id: &Uuid) {
        let mut sessions = self.sessions.write().await;

        if sessions.remove(id).is_some() {
            debug!(
                "Unregistered alert session {} ({} active)",
                id,
                sessions.len()
            );
        }
    }

    /// Push an alert to every registered session. Never blocks on any one
    /// client: each session has a bounded queue and a session whose queue is
    /// full (or whose connection task has gone away) is dropped from the
    /// registry instead of stalling the broadcast. The pass holds the
    /// registry exclusively, so overlapping broadcasts serialize and every
    /// session observes alerts in the same order on any runtime flavor.
    /// Delivery failures are contained here and never surface to the caller.
    pub async fn broadcast(&self, payload: &AlertPayload) {
        let message = match serde_json::to_string(payload) {
            Ok(message) => message,
            Err(e) => {
                error!("Failed to serialize alert payload: {}", e);
                return;
            }
        };

        // One bounded pass with no awaits held: try_send either delivers or
        // marks the session stale, and stale sessions drop in place
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|id, session| match session.tx.try_send(message.clone()) {
            Ok(()) => true,
            Err(e) => {
                let failure: Error = match e {
                    mpsc::error::TrySendError::Full(_) => Error::DeliveryFailed(format!(
                        "Session {} queue full, dropping session",
                        id
                    )),
                    mpsc::error::TrySendError::Closed(_) => Error::DeliveryFailed(format!(
                        "Session {} closed its receiver",
                        id
                    )),
                };
                warn!("{}", failure);
                false
            }
        });

        let dropped = before - sessions.len();
        if dropped > 0 {
            debug!(
                "Dropped {} stale alert session(s), {} remain",
                dropped,
                sessions.len()
            );
        }
    }

    /// Number of currently registered sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Create a shared alert hub
pub fn create_alert_hub(config: &AlertsConfig) -> Arc<AlertHub> {
    Arc::new(AlertHub::new(config))
}
