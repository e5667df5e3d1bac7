use std::sync::atomic::{AtomicBool, Ordering};
use std::vec;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use tracing::debug;
use crate::core::{DbError, Result, Value};

/// One key/value pair read from a store.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: Value,
    pub value: Value,
}

impl Entry {
    pub fn new(key: impl Into<Value>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A named, concurrently accessible key/value map.
///
/// Every operation is atomic per key. Compare-and-set style operations
/// (`put_if_absent`, `replace_if_same`, `remove_if_same`) are what the SQL
/// layer builds DELETE and UPDATE on, so a concurrent writer always wins
/// over a stale row.
///
/// Once the owning registry drops the store, all further calls fail with
/// [`DbError::FatalStoreError`].
pub struct EntryStore {
    name: String,
    entries: DashMap<Value, Value>,
    destroyed: AtomicBool,
}

impl EntryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: DashMap::new(),
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store `value` under `key`, returning the previous value.
    pub fn put(&self, key: Value, value: Value) -> Result<Option<Value>> {
        self.check_entry(&key, &value)?;
        Ok(self.entries.insert(key, value))
    }

    /// Same as [`put`](Self::put) without handing back the old value.
    pub fn set(&self, key: Value, value: Value) -> Result<()> {
        self.put(key, value).map(|_| ())
    }

    pub fn get(&self, key: &Value) -> Result<Option<Value>> {
        self.check_alive()?;
        Ok(self.entries.get(key).map(|slot| slot.value().clone()))
    }

    pub fn get_required(&self, key: &Value) -> Result<Value> {
        self.get(key)?.ok_or_else(|| DbError::KeyNotFound {
            map: self.name.clone(),
            key: key.to_string(),
        })
    }

    /// Remove `key`, returning the value it held.
    pub fn remove(&self, key: &Value) -> Result<Option<Value>> {
        self.check_alive()?;
        Ok(self.entries.remove(key).map(|(_, value)| value))
    }

    /// Remove `key`, reporting only whether it was present.
    pub fn delete(&self, key: &Value) -> Result<bool> {
        self.remove(key).map(|old| old.is_some())
    }

    /// Store only when `key` is absent. Returns the existing value otherwise.
    pub fn put_if_absent(&self, key: Value, value: Value) -> Result<Option<Value>> {
        self.check_entry(&key, &value)?;
        match self.entries.entry(key) {
            MapEntry::Occupied(existing) => Ok(Some(existing.get().clone())),
            MapEntry::Vacant(slot) => {
                slot.insert(value);
                Ok(None)
            }
        }
    }

    /// Overwrite only when `key` is present. Returns the replaced value.
    pub fn replace(&self, key: &Value, value: Value) -> Result<Option<Value>> {
        self.check_entry(key, &value)?;
        Ok(self
            .entries
            .get_mut(key)
            .map(|mut slot| std::mem::replace(slot.value_mut(), value)))
    }

    /// Overwrite only when `key` currently maps to `expected`.
    pub fn replace_if_same(&self, key: &Value, expected: &Value, value: Value) -> Result<bool> {
        self.check_entry(key, &value)?;
        match self.entries.get_mut(key) {
            Some(mut slot) if slot.value() == expected => {
                *slot.value_mut() = value;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Remove only when `key` currently maps to `expected`.
    pub fn remove_if_same(&self, key: &Value, expected: &Value) -> Result<bool> {
        self.check_alive()?;
        Ok(self
            .entries
            .remove_if(key, |_, current| current == expected)
            .is_some())
    }

    pub fn contains_key(&self, key: &Value) -> Result<bool> {
        self.check_alive()?;
        Ok(self.entries.contains_key(key))
    }

    pub fn size(&self) -> Result<usize> {
        self.check_alive()?;
        Ok(self.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.size().map(|n| n == 0)
    }

    pub fn clear(&self) -> Result<()> {
        self.check_alive()?;
        self.entries.clear();
        debug!(map = %self.name, "Map cleared");
        Ok(())
    }

    /// Look up many keys at once. Missing keys are left out of the result.
    pub fn get_all<'a, I>(&self, keys: I) -> Result<Vec<Entry>>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        self.check_alive()?;
        Ok(keys
            .into_iter()
            .filter_map(|key| {
                self.entries
                    .get(key)
                    .map(|slot| Entry::new(key.clone(), slot.value().clone()))
            })
            .collect())
    }

    pub fn put_all<I>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (Value, Value)>,
    {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Weakly consistent iteration over the current entries.
    ///
    /// Keys are captured up front, values are read as the scan advances.
    /// Entries removed after the snapshot are skipped; entries added after
    /// it may be missed.
    pub fn scan(&self) -> Result<EntryScan<'_>> {
        self.check_alive()?;
        let keys: Vec<Value> = self.entries.iter().map(|slot| slot.key().clone()).collect();
        Ok(EntryScan {
            store: self,
            keys: keys.into_iter(),
        })
    }

    pub(crate) fn destroy(&self) {
        self.destroyed.store(true, Ordering::Release);
        self.entries.clear();
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    fn check_alive(&self) -> Result<()> {
        if self.is_destroyed() {
            return Err(DbError::FatalStoreError(format!(
                "Map '{}' has been destroyed",
                self.name
            )));
        }
        Ok(())
    }

    fn check_entry(&self, key: &Value, value: &Value) -> Result<()> {
        self.check_alive()?;
        if key.is_null() {
            return Err(DbError::TypeMismatch(format!(
                "Map '{}' does not accept NULL keys",
                self.name
            )));
        }
        if value.is_null() {
            return Err(DbError::TypeMismatch(format!(
                "Map '{}' does not accept NULL values",
                self.name
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for EntryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryStore")
            .field("name", &self.name)
            .field("size", &self.entries.len())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

/// Iterator returned by [`EntryStore::scan`].
pub struct EntryScan<'a> {
    store: &'a EntryStore,
    keys: vec::IntoIter<Value>,
}

impl Iterator for EntryScan<'_> {
    type Item = Entry;

    fn next(&mut self) -> Option<Self::Item> {
        if self.store.is_destroyed() {
            return None;
        }
        for key in self.keys.by_ref() {
            let value = self.store.entries.get(&key).map(|slot| slot.value().clone());
            if let Some(value) = value {
                return Some(Entry { key, value });
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.keys.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> EntryStore {
        EntryStore::new("capitals")
    }

    #[test]
    fn test_put_returns_previous_value() {
        let map = store();
        assert_eq!(map.put("1".into(), "Tokyo".into()).unwrap(), None);
        assert_eq!(
            map.put("1".into(), "Paris".into()).unwrap(),
            Some(Value::from("Tokyo"))
        );
        assert_eq!(map.get(&"1".into()).unwrap(), Some(Value::from("Paris")));
        assert_eq!(map.size().unwrap(), 1);
    }

    #[test]
    fn test_get_required_reports_missing_key() {
        let map = store();
        match map.get_required(&"7".into()) {
            Err(DbError::KeyNotFound { map, key }) => {
                assert_eq!(map, "capitals");
                assert_eq!(key, "7");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_conditional_operations() {
        let map = store();
        assert_eq!(map.put_if_absent("1".into(), "Tokyo".into()).unwrap(), None);
        assert_eq!(
            map.put_if_absent("1".into(), "Paris".into()).unwrap(),
            Some(Value::from("Tokyo"))
        );

        assert_eq!(map.replace(&"2".into(), "Oslo".into()).unwrap(), None);
        assert!(!map.contains_key(&"2".into()).unwrap());

        assert!(!map.replace_if_same(&"1".into(), &"Paris".into(), "Rome".into()).unwrap());
        assert!(map.replace_if_same(&"1".into(), &"Tokyo".into(), "Rome".into()).unwrap());

        assert!(!map.remove_if_same(&"1".into(), &"Tokyo".into()).unwrap());
        assert!(map.remove_if_same(&"1".into(), &"Rome".into()).unwrap());
        assert!(map.is_empty().unwrap());
    }

    #[test]
    fn test_null_keys_and_values_are_rejected() {
        let map = store();
        assert!(matches!(
            map.put(Value::Null, "x".into()),
            Err(DbError::TypeMismatch(_))
        ));
        assert!(matches!(
            map.put("1".into(), Value::Null),
            Err(DbError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_scan_skips_entries_removed_after_snapshot() {
        let map = store();
        map.put_all((1..=3).map(|i| (Value::from(i), Value::from(format!("city-{i}")))))
            .unwrap();

        let mut scan = map.scan().unwrap();
        map.delete(&Value::from(2)).unwrap();

        let mut keys: Vec<i64> = scan.by_ref().filter_map(|e| e.key.as_i64()).collect();
        keys.sort();
        assert_eq!(keys, vec![1, 3]);
        assert!(scan.next().is_none());
    }

    #[test]
    fn test_get_all_ignores_missing_keys() {
        let map = store();
        map.set("1".into(), "Tokyo".into()).unwrap();
        let found = map.get_all([&Value::from("1"), &Value::from("2")]).unwrap();
        assert_eq!(found, vec![Entry::new("1", "Tokyo")]);
    }

    #[test]
    fn test_destroyed_store_fails_fatally() {
        let map = store();
        map.set("1".into(), "Tokyo".into()).unwrap();
        map.destroy();
        let err = map.get(&"1".into()).unwrap_err();
        assert!(matches!(err, DbError::FatalStoreError(_)));
        assert!(!err.is_retryable());
    }
}
