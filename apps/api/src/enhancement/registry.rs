//! In-memory session registry. Sessions live until deleted, swept after an idle
//! period, or the process exits.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use crate::enhancement::session::{SessionHandle, SubmissionInput};

#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
}

impl SessionRegistry {
    pub async fn create(&self, input: SubmissionInput) -> SessionHandle {
        let handle = SessionHandle::new(input);
        self.sessions.write().await.insert(handle.id(), handle.clone());
        info!("Session {} created", handle.id());
        handle
    }

    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Removes a session. A submission still in flight keeps its own handle and
    /// settles into the detached session.
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            info!("Session {id} removed");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops every session untouched for `idle_for` that has nothing pending.
    /// Returns how many were removed.
    pub async fn sweep_idle(&self, idle_for: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, handle| !handle.is_idle_for(idle_for));
        before - sessions.len()
    }

    /// Background task sweeping idle sessions every `idle_for / 4` (at least once a second).
    pub fn spawn_idle_sweeper(&self, idle_for: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        let period = (idle_for / 4).max(Duration::from_secs(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = registry.sweep_idle(idle_for).await;
                if removed > 0 {
                    info!("Swept {removed} idle sessions");
                }
            }
        })
    }
}
