use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::backend::PreparedHandle;

struct CachedStatement {
    connection_id: u64,
    handle: PreparedHandle,
}

/// Prepared statements of one engine, keyed by a digest of the backend SQL.
///
/// Handles belong to the connection that prepared them, so each key may hold one entry per
/// connection (write and read).
#[derive(Default)]
pub(crate) struct StatementCache {
    entries: HashMap<String, Vec<CachedStatement>>,
}

impl StatementCache {
    pub(crate) fn key(sql: &str) -> String {
        hex::encode(Sha256::digest(sql.as_bytes()))
    }

    pub(crate) fn get(&self, key: &str, connection_id: u64) -> Option<PreparedHandle> {
        self.entries
            .get(key)?
            .iter()
            .find(|entry| entry.connection_id == connection_id)
            .map(|entry| entry.handle.clone())
    }

    pub(crate) fn insert(&mut self, key: String, connection_id: u64, handle: PreparedHandle) {
        let slot = self.entries.entry(key).or_default();
        // one handle per connection
        slot.retain(|entry| entry.connection_id != connection_id);
        slot.push(CachedStatement {
            connection_id,
            handle,
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_stable_per_sql() {
        let a = StatementCache::key("SELECT * FROM t WHERE id = ?");
        assert_eq!(a, StatementCache::key("SELECT * FROM t WHERE id = ?"));
        assert_ne!(a, StatementCache::key("SELECT * FROM t WHERE id = $1"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn entries_are_per_connection() {
        let mut cache = StatementCache::default();
        let key = StatementCache::key("SELECT 1");
        cache.insert(key.clone(), 1, PreparedHandle::sql("SELECT 1"));
        assert!(cache.get(&key, 1).is_some());
        assert!(cache.get(&key, 2).is_none());

        cache.insert(key.clone(), 2, PreparedHandle::sql("SELECT 1"));
        cache.insert(key.clone(), 2, PreparedHandle::sql("SELECT 1"));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
