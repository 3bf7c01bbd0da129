//! Per-endpoint mutual exclusion
//!
//! At most one mutating sequence (power change, settings apply, boot-order
//! write, volume create/delete) runs against a given controller at a time.
//! Different controllers never wait on each other.
//!
//! The registry is an ordinary value: the orchestrator creates one and hands
//! clones of it to every operation context. Entries are created on first use
//! and kept for the life of the registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

/// Registry of one lock per endpoint identity
#[derive(Debug, Clone, Default)]
pub struct EndpointLocks {
    entries: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl EndpointLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, endpoint: &str) -> Arc<AsyncMutex<()>> {
        // The map is only touched for lookup/insert, so a poisoned map is still consistent.
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.entry(endpoint.to_string()).or_default().clone()
    }

    /// Wait until exclusive access to `endpoint` is granted
    ///
    /// There is no timeout. The returned guard releases the lock when it is
    /// dropped or passed to [`EndpointLocks::unlock`].
    pub async fn lock(&self, endpoint: &str) -> EndpointGuard {
        let entry = self.entry(endpoint);
        debug!(endpoint = %endpoint, "Waiting for endpoint lock");
        let guard = entry.lock_owned().await;
        debug!(endpoint = %endpoint, "Endpoint lock acquired");
        EndpointGuard {
            endpoint: endpoint.to_string(),
            _guard: guard,
        }
    }

    /// Release a lock obtained from [`EndpointLocks::lock`]
    pub fn unlock(&self, guard: EndpointGuard) {
        drop(guard);
    }

    /// Number of endpoints seen so far
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive hold on one endpoint
#[must_use = "the endpoint is unlocked as soon as the guard is dropped"]
#[derive(Debug)]
pub struct EndpointGuard {
    endpoint: String,
    _guard: OwnedMutexGuard<()>,
}

impl EndpointGuard {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Drop for EndpointGuard {
    fn drop(&mut self) {
        debug!(endpoint = %self.endpoint, "Releasing endpoint lock");
    }
}
