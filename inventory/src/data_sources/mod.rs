//! Data source implementations

pub mod item;

pub use item::ItemDataSource;
