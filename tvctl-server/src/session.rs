//! Session management.

use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Live command sessions, keyed by session ID.
pub type SessionRegistry = DashMap<String, Arc<Session>>;

/// A command session.
pub struct Session {
    /// Unique session ID.
    pub id: String,

    /// Remote address.
    pub remote_addr: SocketAddr,

    /// Command counter.
    command_count: AtomicU64,
}

impl Session {
    /// Creates a new session.
    pub fn new(remote_addr: SocketAddr) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            remote_addr,
            command_count: AtomicU64::new(0),
        }
    }

    /// Records a command.
    pub fn record_command(&self) {
        self.command_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of commands executed in this session.
    pub fn command_count(&self) -> u64 {
        self.command_count.load(Ordering::Relaxed)
    }
}

/// Keeps a session listed in the registry for as long as it is alive.
pub struct SessionGuard {
    registry: Arc<SessionRegistry>,
    id: String,
}

impl SessionGuard {
    /// Adds the session to the registry.
    pub fn register(registry: Arc<SessionRegistry>, session: Arc<Session>) -> Self {
        let id = session.id.clone();
        registry.insert(id.clone(), session);
        Self { registry, id }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
    }
}
