use std::sync::Arc;

use crate::core::{Result, Value};
use crate::storage::{Entry, EntryStore};

/// Async handle to one named map.
///
/// Handles are cheap to clone and share the underlying store. Every
/// operation completes in a single step, so dropping a pending future either
/// applies the write fully or not at all. Once the map is dropped from its
/// grid every operation fails with `FatalStoreError`.
///
/// ```
/// # tokio_test::block_on(async {
/// let grid = memgrid::Grid::new();
/// let capitals = grid.get_map("capitals");
///
/// capitals.put("Australia", "Canberra").await?;
/// assert_eq!(capitals.get("Australia").await?, Some("Canberra".into()));
/// assert_eq!(capitals.size().await?, 1);
/// # Ok::<(), memgrid::DbError>(())
/// # });
/// ```
#[derive(Clone)]
pub struct MapHandle {
    store: Arc<EntryStore>,
}

impl MapHandle {
    pub(crate) fn new(store: Arc<EntryStore>) -> Self {
        Self { store }
    }

    pub fn name(&self) -> &str {
        self.store.name()
    }

    pub fn is_destroyed(&self) -> bool {
        self.store.is_destroyed()
    }

    /// Store a value, returning the one it replaced.
    pub async fn put(&self, key: impl Into<Value>, value: impl Into<Value>) -> Result<Option<Value>> {
        self.store.put(key.into(), value.into())
    }

    pub async fn set(&self, key: impl Into<Value>, value: impl Into<Value>) -> Result<()> {
        self.store.set(key.into(), value.into())
    }

    pub async fn get(&self, key: impl Into<Value>) -> Result<Option<Value>> {
        self.store.get(&key.into())
    }

    /// Like [`get`](Self::get), failing with `KeyNotFound` for a missing key.
    pub async fn get_required(&self, key: impl Into<Value>) -> Result<Value> {
        self.store.get_required(&key.into())
    }

    pub async fn remove(&self, key: impl Into<Value>) -> Result<Option<Value>> {
        self.store.remove(&key.into())
    }

    pub async fn delete(&self, key: impl Into<Value>) -> Result<bool> {
        self.store.delete(&key.into())
    }

    pub async fn put_if_absent(
        &self,
        key: impl Into<Value>,
        value: impl Into<Value>,
    ) -> Result<Option<Value>> {
        self.store.put_if_absent(key.into(), value.into())
    }

    pub async fn replace(&self, key: impl Into<Value>, value: impl Into<Value>) -> Result<Option<Value>> {
        self.store.replace(&key.into(), value.into())
    }

    pub async fn replace_if_same(
        &self,
        key: impl Into<Value>,
        expected: impl Into<Value>,
        value: impl Into<Value>,
    ) -> Result<bool> {
        self.store
            .replace_if_same(&key.into(), &expected.into(), value.into())
    }

    pub async fn remove_if_same(&self, key: impl Into<Value>, expected: impl Into<Value>) -> Result<bool> {
        self.store.remove_if_same(&key.into(), &expected.into())
    }

    pub async fn contains_key(&self, key: impl Into<Value>) -> Result<bool> {
        self.store.contains_key(&key.into())
    }

    pub async fn size(&self) -> Result<usize> {
        self.store.size()
    }

    pub async fn is_empty(&self) -> Result<bool> {
        self.store.is_empty()
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.clear()
    }

    pub async fn get_all(&self, keys: &[Value]) -> Result<Vec<Entry>> {
        self.store.get_all(keys)
    }

    pub async fn put_all(&self, entries: Vec<(Value, Value)>) -> Result<()> {
        self.store.put_all(entries)
    }

    /// Current entries, in no particular order.
    pub async fn entries(&self) -> Result<Vec<Entry>> {
        Ok(self.store.scan()?.collect())
    }
}

impl std::fmt::Debug for MapHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapHandle")
            .field("name", &self.store.name())
            .finish()
    }
}
