use std::sync::Arc;
use dashmap::DashMap;
use tracing::info;
use super::EntryStore;

/// Named stores of one grid. Stores are created on first use.
#[derive(Default)]
pub struct StoreRegistry {
    stores: DashMap<String, Arc<EntryStore>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the store called `name`, creating an empty one if needed.
    pub fn get_or_create(&self, name: &str) -> Arc<EntryStore> {
        if let Some(store) = self.stores.get(name) {
            return Arc::clone(store.value());
        }
        self.stores
            .entry(name.to_string())
            .or_insert_with(|| {
                info!(map = %name, "Created map");
                Arc::new(EntryStore::new(name))
            })
            .value()
            .clone()
    }

    /// Existing store only; SQL reads never create maps.
    pub fn get(&self, name: &str) -> Option<Arc<EntryStore>> {
        self.stores.get(name).map(|store| Arc::clone(store.value()))
    }

    /// Destroy a store. Outstanding handles fail from now on.
    pub fn drop_store(&self, name: &str) -> bool {
        match self.stores.remove(name) {
            Some((_, store)) => {
                store.destroy();
                info!(map = %name, "Destroyed map");
                true
            }
            None => false,
        }
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.iter().map(|s| s.key().clone()).collect();
        names.sort();
        names
    }

    pub fn clear(&self) {
        for store in self.stores.iter() {
            store.value().destroy();
        }
        self.stores.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DbError, Value};

    #[test]
    fn test_get_or_create_shares_the_same_store() {
        let registry = StoreRegistry::new();
        let a = registry.get_or_create("cities");
        let b = registry.get_or_create("cities");
        a.set(Value::from(1), Value::from("Canberra")).unwrap();
        assert_eq!(b.get(&Value::from(1)).unwrap(), Some(Value::from("Canberra")));
        assert!(registry.get("countries").is_none());
        assert_eq!(registry.names(), vec!["cities".to_string()]);
    }

    #[test]
    fn test_drop_invalidates_old_handles() {
        let registry = StoreRegistry::new();
        let old = registry.get_or_create("cities");
        assert!(registry.drop_store("cities"));
        assert!(!registry.drop_store("cities"));
        assert!(matches!(old.size(), Err(DbError::FatalStoreError(_))));

        let fresh = registry.get_or_create("cities");
        assert_eq!(fresh.size().unwrap(), 0);
    }
}
