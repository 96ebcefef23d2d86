//! Persisted key/value storage
//!
//! Browser `localStorage` is the production backing store; [`MemoryStore`]
//! stands in for it in tests and native hosts. Writes are last-write-wins.

use crate::error::CoreResult;
use crate::identity::SessionSlot;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// String-keyed store that survives process restarts within a browsing context
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> CoreResult<()>;
    fn remove(&self, key: &str) -> CoreResult<()>;
}

/// In-memory store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> CoreResult<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// Slot-aware access to the persisted tokens
#[derive(Clone)]
pub struct TokenVault {
    store: Arc<dyn KeyValueStore>,
}

impl TokenVault {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stored access token for the slot; empty values read as absent
    pub fn access_token(&self, slot: SessionSlot) -> Option<String> {
        self.read(slot.access_token_key())
    }

    /// Stored refresh token for the slot; empty values read as absent
    pub fn refresh_token(&self, slot: SessionSlot) -> Option<String> {
        self.read(slot.refresh_token_key())
    }

    /// Persist a token pair. Without a refresh token the stored one is kept.
    pub fn store(&self, slot: SessionSlot, access: &str, refresh: Option<&str>) -> CoreResult<()> {
        self.store.set(slot.access_token_key(), access)?;
        if let Some(refresh) = refresh {
            self.store.set(slot.refresh_token_key(), refresh)?;
        }
        Ok(())
    }

    /// Remove both tokens of the slot
    pub fn clear(&self, slot: SessionSlot) -> CoreResult<()> {
        self.store.remove(slot.access_token_key())?;
        self.store.remove(slot.refresh_token_key())
    }

    fn read(&self, key: &str) -> Option<String> {
        self.store.get(key).filter(|value| !value.is_empty())
    }
}

impl std::fmt::Debug for TokenVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVault").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> (MemoryStore, TokenVault) {
        let store = MemoryStore::new();
        let vault = TokenVault::new(Arc::new(store.clone()));
        (store, vault)
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").as_deref(), Some("v"));
        store.set("k", "w").unwrap();
        assert_eq!(store.get("k").as_deref(), Some("w"));
        store.remove("k").unwrap();
        assert!(store.get("k").is_none());
    }

    #[test]
    fn test_vault_uses_slot_keys() {
        let (store, vault) = vault();
        vault
            .store(SessionSlot::AdminOrEmployee, "acc", Some("ref"))
            .unwrap();

        assert_eq!(store.get("admin_access_token").as_deref(), Some("acc"));
        assert_eq!(store.get("admin_refresh_token").as_deref(), Some("ref"));
        assert!(vault.access_token(SessionSlot::Customer).is_none());
    }

    #[test]
    fn test_vault_keeps_refresh_token_when_not_rotated() {
        let (_store, vault) = vault();
        vault.store(SessionSlot::Customer, "a1", Some("r1")).unwrap();
        vault.store(SessionSlot::Customer, "a2", None).unwrap();

        assert_eq!(vault.access_token(SessionSlot::Customer).as_deref(), Some("a2"));
        assert_eq!(vault.refresh_token(SessionSlot::Customer).as_deref(), Some("r1"));
    }

    #[test]
    fn test_vault_clear_only_touches_one_slot() {
        let (_store, vault) = vault();
        vault.store(SessionSlot::Customer, "c", Some("cr")).unwrap();
        vault.store(SessionSlot::AdminOrEmployee, "s", Some("sr")).unwrap();

        vault.clear(SessionSlot::Customer).unwrap();

        assert!(vault.access_token(SessionSlot::Customer).is_none());
        assert!(vault.refresh_token(SessionSlot::Customer).is_none());
        assert_eq!(vault.access_token(SessionSlot::AdminOrEmployee).as_deref(), Some("s"));
    }

    #[test]
    fn test_empty_values_read_as_absent() {
        let (store, vault) = vault();
        store.set("accessToken", "").unwrap();
        assert!(vault.access_token(SessionSlot::Customer).is_none());
    }
}
