pub mod catalog;
pub mod entry_store;
pub mod mapping;
pub mod registry;

pub use catalog::{Catalog, MappingCatalog};
pub use entry_store::{Entry, EntryScan, EntryStore};
pub use mapping::{ColumnPath, ColumnSpec, Format, Mapping, MappingColumn, MappingDefinition, Side};
pub use registry::StoreRegistry;
