//! Provider trait
//!
//! A provider describes its own configuration schema, turns that
//! configuration into shared provider data (usually an API client), and lists
//! the resources and data sources it serves. Resources and data sources are
//! registered as factories so the server can build a fresh instance per call.

use crate::context::Context;
use crate::data_source::DataSourceWithConfigure;
use crate::resource::ResourceWithConfigure;
use crate::schema::Schema;
use crate::types::{Diagnostic, DynamicValue};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

pub type ResourceFactory = fn() -> Box<dyn ResourceWithConfigure>;

pub type DataSourceFactory = fn() -> Box<dyn DataSourceWithConfigure>;

#[async_trait]
pub trait Provider: Send + Sync {
    async fn metadata(
        &self,
        ctx: Context,
        request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse;

    async fn schema(&self, ctx: Context, request: ProviderSchemaRequest) -> ProviderSchemaResponse;

    /// Validate configuration and build the data handed to every resource
    /// and data source. Errors here stop all further operations.
    async fn configure(
        &self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse;

    fn resources(&self) -> Vec<ResourceFactory>;

    fn data_sources(&self) -> Vec<DataSourceFactory>;
}

pub struct ProviderMetadataRequest;

pub struct ProviderMetadataResponse {
    /// Prefix of every resource type name (e.g. "inventory")
    pub type_name: String,
    pub version: String,
}

pub struct ProviderSchemaRequest;

pub struct ProviderSchemaResponse {
    pub schema: Schema,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ConfigureProviderRequest {
    pub terraform_version: String,
    pub config: DynamicValue,
}

pub struct ConfigureProviderResponse {
    pub diagnostics: Vec<Diagnostic>,
    /// Passed to resources and data sources in their configure calls
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
}
