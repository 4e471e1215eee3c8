//! Resource implementations

pub mod item;

pub use item::ItemResource;
