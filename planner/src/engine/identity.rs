//! Resolution of temporary ids to server ids.
//!
//! Every optimistic creation registers its temporary id here. Mutations
//! issued against that id before the creation settles wait on the entry,
//! then address the server id, or give up if the creation failed.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::watch;
use uuid::Uuid;

use super::MutationError;

/// State of one temporary id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Identity {
    /// The creation request is in flight.
    Pending,
    /// The server assigned this id.
    Resolved(Uuid),
    /// The creation was rolled back.
    Failed,
}

#[derive(Debug, Default)]
pub(crate) struct IdentityMap {
    entries: Mutex<HashMap<Uuid, watch::Receiver<Identity>>>,
}

impl IdentityMap {
    /// Registers a temporary id and returns the handle that settles it.
    pub(crate) fn register(&self, temp: Uuid) -> watch::Sender<Identity> {
        let (tx, rx) = watch::channel(Identity::Pending);
        self.entries.lock().insert(temp, rx);
        tx
    }

    /// Returns the server id for `id`.
    ///
    /// Ids that were never registered are already server ids and resolve to
    /// themselves. A registered id waits until its creation settles.
    pub(crate) async fn resolve(&self, id: Uuid) -> Result<Uuid, MutationError> {
        let rx = self.entries.lock().get(&id).cloned();
        let Some(mut rx) = rx else {
            return Ok(id);
        };
        let state = rx
            .wait_for(|s| *s != Identity::Pending)
            .await
            .map(|s| *s)
            .unwrap_or(Identity::Failed);
        match state {
            Identity::Resolved(real) => Ok(real),
            Identity::Pending | Identity::Failed => Err(MutationError::Unconfirmed(id)),
        }
    }

    /// Returns the state without waiting; `None` for ids never registered.
    #[cfg(test)]
    pub(crate) fn peek(&self, id: Uuid) -> Option<Identity> {
        self.entries.lock().get(&id).map(|rx| *rx.borrow())
    }
}
