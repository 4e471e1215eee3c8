//! Inventory service API client

mod client;
mod error;
pub mod items;

pub use client::Client;
pub use error::ApiError;
pub use items::{Item, ItemsApi, NewItem};
