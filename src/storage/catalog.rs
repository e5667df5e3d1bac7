use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;
use crate::core::{DbError, Result};
use super::Mapping;

/// Catalog хранит только определения маппингов.
/// Immutable: every change produces a new catalog, readers keep their snapshot.
#[derive(Clone, Default)]
pub struct Catalog {
    mappings: Arc<HashMap<String, Arc<Mapping>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping, returning the NEW catalog.
    pub fn with_mapping(self, mapping: Mapping, replace: bool) -> Result<Self> {
        let name = mapping.name().to_string();
        if !replace && self.mappings.contains_key(&name) {
            return Err(DbError::DuplicateMapping(name));
        }

        // Copy-on-Write
        let mut mappings = (*self.mappings).clone();
        mappings.insert(name, Arc::new(mapping));
        Ok(Self {
            mappings: Arc::new(mappings),
        })
    }

    pub fn without_mapping(self, name: &str) -> Result<Self> {
        if !self.mappings.contains_key(name) {
            return Err(DbError::UnknownTable(name.to_string()));
        }
        let mut mappings = (*self.mappings).clone();
        mappings.remove(name);
        Ok(Self {
            mappings: Arc::new(mappings),
        })
    }

    pub fn get_mapping(&self, name: &str) -> Result<Arc<Mapping>> {
        self.mappings
            .get(name)
            .cloned()
            .ok_or_else(|| DbError::UnknownTable(name.to_string()))
    }

    pub fn mapping_exists(&self, name: &str) -> bool {
        self.mappings.contains_key(name)
    }

    pub fn list_mappings(&self) -> Vec<String> {
        let mut names: Vec<String> = self.mappings.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Shared, swappable catalog of one grid.
///
/// Writers replace the whole [`Catalog`] under a short lock; readers take a
/// cheap snapshot and never wait on statement execution.
#[derive(Default)]
pub struct MappingCatalog {
    current: RwLock<Catalog>,
}

impl MappingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Result<Catalog> {
        Ok(self.current.read()?.clone())
    }

    /// Install a mapping. Returns `false` when `if_not_exists` kept an existing one.
    pub fn create_mapping(&self, mapping: Mapping, replace: bool, if_not_exists: bool) -> Result<bool> {
        let mut current = self.current.write()?;
        let name = mapping.name().to_string();
        if !replace && if_not_exists && current.mapping_exists(&name) {
            return Ok(false);
        }
        let object = mapping.object_name().to_string();
        *current = current.clone().with_mapping(mapping, replace)?;
        info!(mapping = %name, map = %object, replace, "Mapping created");
        Ok(true)
    }

    /// Remove a mapping. Entries of the backing map are untouched.
    pub fn drop_mapping(&self, name: &str, if_exists: bool) -> Result<bool> {
        let mut current = self.current.write()?;
        if if_exists && !current.mapping_exists(name) {
            return Ok(false);
        }
        *current = current.clone().without_mapping(name)?;
        info!(mapping = %name, "Mapping dropped");
        Ok(true)
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<Mapping>> {
        self.current.read()?.get_mapping(name)
    }

    pub fn list(&self) -> Result<Vec<String>> {
        Ok(self.current.read()?.list_mappings())
    }

    pub fn clear(&self) -> Result<()> {
        *self.current.write()? = Catalog::new();
        Ok(())
    }
}
