//! Last-known concurrency tokens per entity.
//!
//! # Design
//! A lost or stale token only costs a rejected conditional update, so the
//! cache has no expiry and lives as long as the owning service. It is backed
//! by a sharded concurrent map so services can be shared across threads.

use dashmap::DashMap;

use crate::types::EntityId;

#[derive(Debug, Default)]
pub struct ConcurrencyTokenCache {
    tokens: DashMap<EntityId, String>,
}

impl ConcurrencyTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: EntityId) -> Option<String> {
        self.tokens.get(&id).map(|token| token.value().clone())
    }

    /// Record `token` as the latest for `id`, replacing any previous one.
    pub fn store(&self, id: EntityId, token: impl Into<String>) {
        self.tokens.insert(id, token.into());
    }

    /// Forget the token for `id`. Does nothing if none is cached.
    pub fn invalidate(&self, id: EntityId) {
        self.tokens.remove(&id);
    }

    pub fn clear(&self) {
        self.tokens.clear();
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
