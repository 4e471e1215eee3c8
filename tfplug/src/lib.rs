//! tfplug - Terraform Plugin Framework for Rust
//!
//! A framework for building Terraform providers in Rust. Providers implement
//! the traits in [`provider`], [`resource`] and [`data_source`]; the
//! [`server::ProviderServer`] drives them the way Terraform does.

// Core modules
pub mod context;
pub mod error;
pub mod schema;
pub mod types;

// Provider API modules
pub mod data_source;
pub mod provider;
pub mod resource;

// Helper modules
pub mod logging;
pub mod plan_modifier;

pub mod server;

// Re-exports for convenience
pub use context::Context;
pub use data_source::{DataSource, DataSourceWithConfigure};
pub use error::{Result, TfplugError};
pub use provider::{Provider, ProviderMetadataRequest, ProviderMetadataResponse};
pub use resource::{Resource, ResourceWithConfigure, ResourceWithImportState};
pub use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use server::ProviderServer;
pub use types::{AttributePath, Config, Diagnostic, Dynamic, DynamicValue, State};
