use std::sync::Arc;

use tracing::info;

use crate::config::GridConfig;
use crate::core::{Result, Value};
use crate::result::Cursor;
use crate::storage::{MappingCatalog, StoreRegistry};
use super::{MapHandle, SqlService};

/// One in-memory grid: named maps, their mappings and the SQL service.
///
/// `Grid` is a cheap, cloneable handle; clones share all state. There is no
/// process-wide instance, every caller holds the grid it works with.
///
/// ```
/// use memgrid::{Grid, Value};
///
/// # tokio_test::block_on(async {
/// let grid = Grid::new();
/// grid.execute(
///     "CREATE MAPPING cities TYPE IMap OPTIONS ('keyFormat'='varchar', 'valueFormat'='varchar')",
///     &[],
/// )
/// .await?;
/// grid.execute("INSERT INTO cities VALUES ('Croatia', 'Zagreb')", &[]).await?;
///
/// let mut cursor = grid
///     .execute("SELECT this AS city FROM cities WHERE __key = ?", &["Croatia".into()])
///     .await?;
/// let row = cursor.next_row().unwrap();
/// assert_eq!(row.get("city"), Some(&Value::from("Zagreb")));
/// # Ok::<(), memgrid::DbError>(())
/// # });
/// ```
#[derive(Clone)]
pub struct Grid {
    config: Arc<GridConfig>,
    stores: Arc<StoreRegistry>,
    catalog: Arc<MappingCatalog>,
    sql: Arc<SqlService>,
}

impl Grid {
    /// Grid with the default configuration.
    pub fn new() -> Self {
        Self::build(GridConfig::default())
    }

    pub fn with_config(config: GridConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: GridConfig) -> Self {
        let stores = Arc::new(StoreRegistry::new());
        let catalog = Arc::new(MappingCatalog::new());
        let sql = Arc::new(SqlService::new(&config, Arc::clone(&stores), Arc::clone(&catalog)));
        info!(cluster = %config.cluster_name, "Grid started");

        Self {
            config: Arc::new(config),
            stores,
            catalog,
            sql,
        }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Handle to the map called `name`, created empty on first use.
    pub fn get_map(&self, name: &str) -> MapHandle {
        MapHandle::new(self.stores.get_or_create(name))
    }

    /// Destroy a map and its entries. Mappings that point at it stay defined
    /// and read as empty. Returns `false` if no such map existed.
    pub fn drop_map(&self, name: &str) -> bool {
        self.stores.drop_store(name)
    }

    /// Names of the existing maps, sorted.
    pub fn map_names(&self) -> Vec<String> {
        self.stores.names()
    }

    pub fn sql(&self) -> &SqlService {
        &self.sql
    }

    /// Shorthand for `grid.sql().execute(..)`.
    pub async fn execute(&self, sql: &str, params: &[Value]) -> Result<Cursor> {
        self.sql.execute(sql, params).await
    }

    /// Destroy every map and forget every mapping. Outstanding map handles
    /// fail from now on.
    pub fn shutdown(&self) -> Result<()> {
        self.stores.clear();
        self.catalog.clear()?;
        info!(cluster = %self.config.cluster_name, "Grid shut down");
        Ok(())
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grid")
            .field("cluster_name", &self.config.cluster_name)
            .field("maps", &self.stores.names())
            .finish()
    }
}
