//! Client IP to session map

use super::session::Session;
use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::Arc;

/// Concurrent registry of authenticated sessions, keyed by client IP.
///
/// Lookups from the accept loop race freely with teardown removals; a lookup
/// that misses a session being removed simply starts a new one.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<IpAddr, Arc<Session>>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Session registered for `ip`
    pub fn get(&self, ip: &IpAddr) -> Option<Arc<Session>> {
        self.sessions.get(ip).map(|entry| entry.value().clone())
    }

    /// Register a session, returning the one it replaced
    pub fn insert(&self, ip: IpAddr, session: Arc<Session>) -> Option<Arc<Session>> {
        self.sessions.insert(ip, session)
    }

    /// Remove whatever session is registered for `ip`
    pub fn remove(&self, ip: &IpAddr) -> Option<Arc<Session>> {
        self.sessions.remove(ip).map(|(_, session)| session)
    }

    /// Remove the entry for `ip` only if it is `session` itself.
    ///
    /// A session tearing down must not evict a newer session that took its
    /// place under the same IP.
    pub fn remove_if_same(&self, ip: &IpAddr, session: &Session) -> bool {
        self.sessions
            .remove_if(ip, |_, registered| std::ptr::eq(Arc::as_ptr(registered), session))
            .is_some()
    }

    /// Number of registered sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is registered
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Tear down every registered session
    pub fn close_all(&self) {
        let sessions: Vec<Arc<Session>> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for session in sessions {
            session.teardown();
        }
    }
}
