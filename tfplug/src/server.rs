//! In-process provider server
//!
//! [`ProviderServer`] plays the framework's side of the plugin protocol: it
//! decodes the msgpack values Terraform sends, builds a fresh resource or data
//! source per call from the provider's factories, configures it with the
//! provider data, runs planning, and encodes the result. A transport only has
//! to move bytes in and out of these methods.

use crate::context::Context;
use crate::data_source::{
    ConfigureDataSourceRequest, DataSource, DataSourceSchemaRequest, DataSourceWithConfigure,
    ReadDataSourceRequest,
};
use crate::error::TfplugError;
use crate::plan_modifier::PlanModifyRequest;
use crate::provider::{
    ConfigureProviderRequest, DataSourceFactory, Provider, ProviderMetadataRequest,
    ProviderSchemaRequest, ResourceFactory,
};
use crate::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ReadResourceRequest, Resource, ResourceSchemaRequest,
    ResourceWithConfigure, UpdateResourceRequest,
};
use crate::schema::Schema;
use crate::types::{has_errors, AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type ProviderData = Arc<dyn Any + Send + Sync>;

/// Encoded value plus diagnostics. An empty value is null.
#[derive(Debug, Clone, Default)]
pub struct ValueResponse {
    pub value: Vec<u8>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ValueResponse {
    fn failed(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            value: Vec::new(),
            diagnostics,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlanResponse {
    pub planned_state: Vec<u8>,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct ImportedValue {
    pub type_name: String,
    pub state: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct ImportResponse {
    pub imported: Vec<ImportedValue>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct ProviderSchemas {
    pub provider: Schema,
    pub resources: HashMap<String, Schema>,
    pub data_sources: HashMap<String, Schema>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ProviderServer<P: Provider> {
    provider: P,
    resources: HashMap<String, ResourceFactory>,
    data_sources: HashMap<String, DataSourceFactory>,
    provider_data: RwLock<Option<ProviderData>>,
}

impl<P: Provider> ProviderServer<P> {
    pub fn new(provider: P) -> Self {
        let resources = provider
            .resources()
            .into_iter()
            .map(|factory| (factory().type_name().to_string(), factory))
            .collect();
        let data_sources = provider
            .data_sources()
            .into_iter()
            .map(|factory| (factory().type_name().to_string(), factory))
            .collect();

        Self {
            provider,
            resources,
            data_sources,
            provider_data: RwLock::new(None),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub async fn get_provider_schema(&self, ctx: Context) -> ProviderSchemas {
        let provider = self
            .provider
            .schema(ctx.clone(), ProviderSchemaRequest)
            .await;
        let mut diagnostics = provider.diagnostics;

        let mut resources = HashMap::new();
        for (name, factory) in &self.resources {
            let response = factory().schema(ctx.clone(), ResourceSchemaRequest).await;
            diagnostics.extend(response.diagnostics);
            resources.insert(name.clone(), response.schema);
        }

        let mut data_sources = HashMap::new();
        for (name, factory) in &self.data_sources {
            let response = factory().schema(ctx.clone(), DataSourceSchemaRequest).await;
            diagnostics.extend(response.diagnostics);
            data_sources.insert(name.clone(), response.schema);
        }

        ProviderSchemas {
            provider: provider.schema,
            resources,
            data_sources,
            diagnostics,
        }
    }

    /// Configures the provider. Provider data is only kept when no errors
    /// were reported, so later calls fail fast instead of using it.
    pub async fn configure_provider(
        &self,
        ctx: Context,
        terraform_version: &str,
        config: &[u8],
    ) -> Vec<Diagnostic> {
        let config = match decode("config", config) {
            Ok(config) => config,
            Err(diag) => return vec![diag],
        };

        let metadata = self
            .provider
            .metadata(ctx.clone(), ProviderMetadataRequest)
            .await;
        tracing::info!(
            provider = %metadata.type_name,
            version = %metadata.version,
            terraform_version,
            "Configuring provider"
        );

        let response = self
            .provider
            .configure(
                ctx,
                ConfigureProviderRequest {
                    terraform_version: terraform_version.to_string(),
                    config,
                },
            )
            .await;

        if !has_errors(&response.diagnostics) {
            *self.provider_data.write().await = response.provider_data;
        }

        response.diagnostics
    }

    /// Computes the planned state: computed attributes missing from config
    /// become unknown whenever the resource changes, then attribute plan
    /// modifiers run.
    pub async fn plan_resource_change(
        &self,
        ctx: Context,
        type_name: &str,
        prior_state: &[u8],
        proposed_new_state: &[u8],
        config: &[u8],
    ) -> PlanResponse {
        let decoded = decode("prior_state", prior_state).and_then(|prior| {
            let proposed = decode("proposed_new_state", proposed_new_state)?;
            let config = decode("config", config)?;
            Ok((prior, proposed, config))
        });
        let (prior, proposed, config) = match decoded {
            Ok(values) => values,
            Err(diag) => {
                return PlanResponse {
                    diagnostics: vec![diag],
                    ..Default::default()
                }
            }
        };

        // Destroy plans pass through untouched
        if proposed.is_null() {
            return PlanResponse::default();
        }

        let Some(factory) = self.resources.get(type_name) else {
            return PlanResponse {
                diagnostics: vec![unknown_type(TfplugError::ResourceNotFound(
                    type_name.to_string(),
                ))],
                ..Default::default()
            };
        };

        let schema = factory().schema(ctx, ResourceSchemaRequest).await;
        let mut diagnostics = schema.diagnostics;
        let mut planned = proposed.clone();
        let mut requires_replace = Vec::new();

        if prior.is_null() || proposed != prior {
            for attr in schema.schema.attributes.iter().filter(|a| a.computed) {
                let path = AttributePath::new(&attr.name);
                if config.is_null_at(&path) {
                    if let Err(e) = planned.mark_unknown(&path) {
                        diagnostics.push(Diagnostic::error("Unable to plan attribute", e.to_string()));
                    }
                }
            }
        }

        for attr in &schema.schema.attributes {
            let path = AttributePath::new(&attr.name);
            for modifier in &attr.plan_modifiers {
                let response = modifier.modify_plan(PlanModifyRequest {
                    state: value_at(&prior, &path),
                    plan: value_at(&planned, &path),
                    config: value_at(&config, &path),
                    path: path.clone(),
                });
                diagnostics.extend(response.diagnostics);
                if response.requires_replace {
                    requires_replace.push(path.clone());
                }
                if let Err(e) = planned.set(&path, response.plan_value) {
                    diagnostics.push(Diagnostic::error("Unable to plan attribute", e.to_string()));
                }
            }
        }

        match encode("planned_state", &planned) {
            Ok(planned_state) => PlanResponse {
                planned_state,
                requires_replace,
                diagnostics,
            },
            Err(diag) => {
                diagnostics.push(diag);
                PlanResponse {
                    diagnostics,
                    ..Default::default()
                }
            }
        }
    }

    /// Dispatches to create, update or delete depending on which of the prior
    /// and planned states are null.
    pub async fn apply_resource_change(
        &self,
        ctx: Context,
        type_name: &str,
        prior_state: &[u8],
        planned_state: &[u8],
        config: &[u8],
    ) -> ValueResponse {
        let decoded = decode("prior_state", prior_state).and_then(|prior| {
            let planned = decode("planned_state", planned_state)?;
            let config = decode("config", config)?;
            Ok((prior, planned, config))
        });
        let (prior, planned, config) = match decoded {
            Ok(values) => values,
            Err(diag) => return ValueResponse::failed(vec![diag]),
        };

        let resource = match self.resource(ctx.clone(), type_name).await {
            Ok(resource) => resource,
            Err(diagnostics) => return ValueResponse::failed(diagnostics),
        };

        let type_name = type_name.to_string();
        let (new_state, mut diagnostics) = if planned.is_null() {
            tracing::debug!(%type_name, "Applying delete");
            let response = resource
                .delete(
                    ctx,
                    DeleteResourceRequest {
                        type_name,
                        prior_state: prior,
                    },
                )
                .await;
            (DynamicValue::null(), response.diagnostics)
        } else if prior.is_null() {
            tracing::debug!(%type_name, "Applying create");
            let response = resource
                .create(
                    ctx,
                    CreateResourceRequest {
                        type_name,
                        planned_state: planned,
                        config,
                    },
                )
                .await;
            (response.new_state, response.diagnostics)
        } else {
            tracing::debug!(%type_name, "Applying update");
            let response = resource
                .update(
                    ctx,
                    UpdateResourceRequest {
                        type_name,
                        prior_state: prior,
                        planned_state: planned,
                        config,
                    },
                )
                .await;
            (response.new_state, response.diagnostics)
        };

        match encode("new_state", &new_state) {
            Ok(value) => ValueResponse { value, diagnostics },
            Err(diag) => {
                diagnostics.push(diag);
                ValueResponse::failed(diagnostics)
            }
        }
    }

    /// An empty value in the response means the resource is gone.
    pub async fn read_resource(
        &self,
        ctx: Context,
        type_name: &str,
        current_state: &[u8],
    ) -> ValueResponse {
        let current_state = match decode("current_state", current_state) {
            Ok(state) => state,
            Err(diag) => return ValueResponse::failed(vec![diag]),
        };

        let resource = match self.resource(ctx.clone(), type_name).await {
            Ok(resource) => resource,
            Err(diagnostics) => return ValueResponse::failed(diagnostics),
        };

        let response = resource
            .read(
                ctx,
                ReadResourceRequest {
                    type_name: type_name.to_string(),
                    current_state,
                },
            )
            .await;

        let mut diagnostics = response.diagnostics;
        let Some(new_state) = response.new_state else {
            tracing::debug!(type_name, "Resource removed from state");
            return ValueResponse::failed(diagnostics);
        };

        match encode("new_state", &new_state) {
            Ok(value) => ValueResponse { value, diagnostics },
            Err(diag) => {
                diagnostics.push(diag);
                ValueResponse::failed(diagnostics)
            }
        }
    }

    pub async fn import_resource_state(
        &self,
        ctx: Context,
        type_name: &str,
        id: &str,
    ) -> ImportResponse {
        let resource = match self.resource(ctx.clone(), type_name).await {
            Ok(resource) => resource,
            Err(diagnostics) => {
                return ImportResponse {
                    imported: Vec::new(),
                    diagnostics,
                }
            }
        };

        let Some(importer) = resource.import_support() else {
            return ImportResponse {
                imported: Vec::new(),
                diagnostics: vec![Diagnostic::error(
                    "Resource Import Not Implemented",
                    format!("Resource type {} does not support import", type_name),
                )],
            };
        };

        let response = importer
            .import_state(
                ctx,
                ImportResourceStateRequest {
                    type_name: type_name.to_string(),
                    id: id.to_string(),
                },
            )
            .await;

        let mut diagnostics = response.diagnostics;
        let mut imported = Vec::new();
        for resource in response.imported_resources {
            match encode("imported_state", &resource.state) {
                Ok(state) => imported.push(ImportedValue {
                    type_name: resource.type_name,
                    state,
                }),
                Err(diag) => diagnostics.push(diag),
            }
        }

        ImportResponse {
            imported,
            diagnostics,
        }
    }

    pub async fn read_data_source(
        &self,
        ctx: Context,
        type_name: &str,
        config: &[u8],
    ) -> ValueResponse {
        let config = match decode("config", config) {
            Ok(config) => config,
            Err(diag) => return ValueResponse::failed(vec![diag]),
        };

        let data_source = match self.data_source(ctx.clone(), type_name).await {
            Ok(data_source) => data_source,
            Err(diagnostics) => return ValueResponse::failed(diagnostics),
        };

        let response = data_source
            .read(
                ctx,
                ReadDataSourceRequest {
                    type_name: type_name.to_string(),
                    config,
                },
            )
            .await;

        let mut diagnostics = response.diagnostics;
        if has_errors(&diagnostics) {
            return ValueResponse::failed(diagnostics);
        }

        match encode("state", &response.state) {
            Ok(value) => ValueResponse { value, diagnostics },
            Err(diag) => {
                diagnostics.push(diag);
                ValueResponse::failed(diagnostics)
            }
        }
    }

    async fn configured_data(&self) -> Result<ProviderData, Vec<Diagnostic>> {
        self.provider_data.read().await.clone().ok_or_else(|| {
            vec![Diagnostic::error(
                TfplugError::ProviderNotConfigured.to_string(),
                "The provider must be configured successfully before resources or data sources can be used",
            )]
        })
    }

    async fn resource(
        &self,
        ctx: Context,
        type_name: &str,
    ) -> Result<Box<dyn ResourceWithConfigure>, Vec<Diagnostic>> {
        let factory = self.resources.get(type_name).ok_or_else(|| {
            vec![unknown_type(TfplugError::ResourceNotFound(
                type_name.to_string(),
            ))]
        })?;
        let provider_data = self.configured_data().await?;

        let mut resource = factory();
        let response = resource
            .configure(
                ctx,
                ConfigureResourceRequest {
                    provider_data: Some(provider_data),
                },
            )
            .await;

        if has_errors(&response.diagnostics) {
            return Err(response.diagnostics);
        }
        Ok(resource)
    }

    async fn data_source(
        &self,
        ctx: Context,
        type_name: &str,
    ) -> Result<Box<dyn DataSourceWithConfigure>, Vec<Diagnostic>> {
        let factory = self.data_sources.get(type_name).ok_or_else(|| {
            vec![unknown_type(TfplugError::DataSourceNotFound(
                type_name.to_string(),
            ))]
        })?;
        let provider_data = self.configured_data().await?;

        let mut data_source = factory();
        let response = data_source
            .configure(
                ctx,
                ConfigureDataSourceRequest {
                    provider_data: Some(provider_data),
                },
            )
            .await;

        if has_errors(&response.diagnostics) {
            return Err(response.diagnostics);
        }
        Ok(data_source)
    }
}

fn decode(field: &str, data: &[u8]) -> Result<DynamicValue, Diagnostic> {
    DynamicValue::decode_msgpack(data)
        .map_err(|e| Diagnostic::error(format!("Invalid {} value", field), e.to_string()))
}

fn encode(field: &str, value: &DynamicValue) -> Result<Vec<u8>, Diagnostic> {
    value
        .encode_msgpack()
        .map_err(|e| Diagnostic::error(format!("Unable to encode {}", field), e.to_string()))
}

fn unknown_type(error: TfplugError) -> Diagnostic {
    Diagnostic::error("Unknown type", error.to_string())
}

fn value_at(value: &DynamicValue, path: &AttributePath) -> Dynamic {
    value.get(path).cloned().unwrap_or(Dynamic::Null)
}
