pub mod grid;
pub mod map_handle;
pub mod sql_service;

pub use grid::Grid;
pub use map_handle::MapHandle;
pub use sql_service::SqlService;
