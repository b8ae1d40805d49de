//! Registry of live WebSocket sessions

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::util::time::unix_millis;

/// Bookkeeping for one connected client
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub connected_at: u64,
    /// Whether the session has sent a join
    pub joined: bool,
}

/// Connected sessions keyed by connection id
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<Uuid, SessionInfo>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, connection_id: Uuid) {
        self.sessions.insert(
            connection_id,
            SessionInfo {
                connected_at: unix_millis(),
                joined: false,
            },
        );
    }

    pub fn mark_joined(&self, connection_id: Uuid) {
        if let Some(mut session) = self.sessions.get_mut(&connection_id) {
            session.joined = true;
        }
    }

    pub fn close(&self, connection_id: Uuid) -> Option<SessionInfo> {
        self.sessions.remove(&connection_id).map(|(_, info)| info)
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_join_close() {
        let registry = SessionRegistry::new();
        let id = Uuid::new_v4();
        registry.open(id);
        assert_eq!(registry.count(), 1);

        registry.mark_joined(id);
        registry.mark_joined(Uuid::new_v4());
        assert_eq!(registry.count(), 1);

        let closed = registry.close(id).unwrap();
        assert!(closed.joined);
        assert_eq!(registry.count(), 0);
        assert!(registry.close(id).is_none());
    }
}
