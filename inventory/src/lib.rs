//! Terraform provider for the Inventory service

pub mod api;
pub mod config;
pub mod data_sources;
pub mod provider_data;
pub mod resources;

pub use provider_data::InventoryProviderData;

use async_trait::async_trait;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::DataSourceWithConfigure;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetadataRequest, ProviderMetadataResponse, ProviderSchemaRequest,
    ProviderSchemaResponse, ResourceFactory,
};
use tfplug::resource::ResourceWithConfigure;
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{has_errors, Diagnostic};

pub struct InventoryProvider {
    /// "dev" for local builds, "test" under tests, the release version otherwise
    version: String,
}

impl InventoryProvider {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

fn client_error(error: impl std::fmt::Display) -> Diagnostic {
    Diagnostic::error(
        "Unable to Create Inventory API Client",
        format!(
            "An unexpected error occurred when creating the Inventory API client. \
             If the error is not clear, please contact the provider developers.\n\n\
             Inventory Client Error: {}",
            error
        ),
    )
}

fn item_resource() -> Box<dyn ResourceWithConfigure> {
    Box::new(resources::ItemResource::new())
}

fn item_data_source() -> Box<dyn DataSourceWithConfigure> {
    Box::new(data_sources::ItemDataSource::new())
}

#[async_trait]
impl Provider for InventoryProvider {
    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: "inventory".to_string(),
            version: self.version.clone(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        let schema = SchemaBuilder::new()
            .description("Interface with the Inventory service API.")
            .attribute(
                AttributeBuilder::new("host", AttributeType::String)
                    .description(&format!(
                        "The hostname or IP address for the inventory service endpoint. May also be provided via the {} environment variable.",
                        config::HOST_ENV
                    ))
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("port", AttributeType::String)
                    .description(&format!(
                        "The port to connect to. May also be provided via the {} environment variable.",
                        config::PORT_ENV
                    ))
                    .optional()
                    .build(),
            )
            .build();

        ProviderSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn configure(
        &self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        tracing::info!("Configuring Inventory client");

        let (endpoint, mut diagnostics) =
            config::resolve_endpoint(&request.config, |key| std::env::var(key).ok());

        let endpoint = match endpoint {
            Some(endpoint) if !has_errors(&diagnostics) => endpoint,
            _ => {
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        };

        tracing::debug!(host = %endpoint.host, port = %endpoint.port, "Creating Inventory client");

        let client = match endpoint
            .base_url()
            .map_err(|e| api::ApiError::InvalidUrl(e.to_string()))
            .and_then(|url| api::Client::new(url.as_str()))
        {
            Ok(client) => client,
            Err(e) => {
                diagnostics.push(client_error(e));
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                };
            }
        };

        if let Err(e) = client.ping(&ctx).await {
            diagnostics.push(client_error(e));
            return ConfigureProviderResponse {
                diagnostics,
                provider_data: None,
            };
        }

        tracing::info!(url = %client.base_url(), "Configured Inventory client");

        ConfigureProviderResponse {
            diagnostics,
            provider_data: Some(Arc::new(InventoryProviderData::new(client))),
        }
    }

    fn resources(&self) -> Vec<ResourceFactory> {
        vec![item_resource as ResourceFactory]
    }

    fn data_sources(&self) -> Vec<DataSourceFactory> {
        vec![item_data_source as DataSourceFactory]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use serial_test::serial;
    use tfplug::data_source::DataSource;
    use tfplug::resource::Resource;
    use tfplug::types::{AttributePath, Dynamic, DynamicValue};

    fn provider_config(host: Option<&str>, port: Option<&str>) -> DynamicValue {
        let mut config = DynamicValue::object();
        let value = |v: Option<&str>| v.map(|s| Dynamic::String(s.to_string())).unwrap_or(Dynamic::Null);
        config.set(&AttributePath::new("host"), value(host)).unwrap();
        config.set(&AttributePath::new("port"), value(port)).unwrap();
        config
    }

    fn request(config: DynamicValue) -> ConfigureProviderRequest {
        ConfigureProviderRequest {
            terraform_version: "1.9.0".to_string(),
            config,
        }
    }

    #[tokio::test]
    async fn metadata_reports_type_and_version() {
        let provider = InventoryProvider::new("test");
        let metadata = provider
            .metadata(Context::new(), ProviderMetadataRequest)
            .await;

        assert_eq!(metadata.type_name, "inventory");
        assert_eq!(metadata.version, "test");
    }

    #[tokio::test]
    async fn schema_has_optional_host_and_port() {
        let provider = InventoryProvider::new("test");
        let schema = provider
            .schema(Context::new(), ProviderSchemaRequest)
            .await
            .schema;

        for name in ["host", "port"] {
            let attribute = schema.attribute(name).unwrap();
            assert!(attribute.optional);
            assert!(!attribute.required);
        }
        assert!(schema
            .attribute("host")
            .unwrap()
            .description
            .contains("INVENTORY_HOST"));
    }

    #[tokio::test]
    #[serial]
    async fn provider_configures_from_env_vars() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/items/1")
            .with_status(404)
            .create_async()
            .await;
        let url = url::Url::parse(&server.url()).unwrap();

        std::env::set_var(config::HOST_ENV, url.host_str().unwrap());
        std::env::set_var(config::PORT_ENV, url.port().unwrap().to_string());

        let provider = InventoryProvider::new("test");
        let response = provider
            .configure(Context::new(), request(provider_config(None, None)))
            .await;

        std::env::remove_var(config::HOST_ENV);
        std::env::remove_var(config::PORT_ENV);

        assert!(response.diagnostics.is_empty());
        let data = response.provider_data.unwrap();
        let data = data.downcast_ref::<InventoryProviderData>().unwrap();
        assert_eq!(data.client.base_url().as_str(), format!("{}/", server.url()));
        mock.assert_async().await;
    }

    #[tokio::test]
    #[serial]
    async fn provider_config_overrides_env_vars() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/items/1")
            .with_body(r#"{"id":1,"name":"probe"}"#)
            .create_async()
            .await;
        let url = url::Url::parse(&server.url()).unwrap();
        let port = url.port().unwrap().to_string();

        std::env::set_var(config::HOST_ENV, "unreachable.invalid");
        std::env::set_var(config::PORT_ENV, "1");

        let provider = InventoryProvider::new("test");
        let response = provider
            .configure(
                Context::new(),
                request(provider_config(url.host_str(), Some(&port))),
            )
            .await;

        std::env::remove_var(config::HOST_ENV);
        std::env::remove_var(config::PORT_ENV);

        assert!(response.diagnostics.is_empty());
        assert!(response.provider_data.is_some());
        mock.assert_async().await;
    }

    #[tokio::test]
    #[serial]
    async fn unreachable_service_fails_configure() {
        std::env::remove_var(config::HOST_ENV);
        std::env::remove_var(config::PORT_ENV);

        let provider = InventoryProvider::new("test");
        let response = provider
            .configure(
                Context::new(),
                request(provider_config(Some("127.0.0.1"), Some("1"))),
            )
            .await;

        assert!(response.provider_data.is_none());
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(
            response.diagnostics[0].summary,
            "Unable to Create Inventory API Client"
        );
    }

    #[tokio::test]
    #[serial]
    async fn invalid_port_fails_client_construction() {
        let provider = InventoryProvider::new("test");
        let response = provider
            .configure(
                Context::new(),
                request(provider_config(Some("127.0.0.1"), Some("not-a-port"))),
            )
            .await;

        assert!(response.provider_data.is_none());
        assert_eq!(
            response.diagnostics[0].summary,
            "Unable to Create Inventory API Client"
        );
    }

    #[tokio::test]
    #[serial]
    async fn unknown_config_stops_before_connecting() {
        let mut config = provider_config(None, Some("8080"));
        config
            .mark_unknown(&AttributePath::new("host"))
            .unwrap();

        let provider = InventoryProvider::new("test");
        let response = provider
            .configure(Context::new(), request(config))
            .await;

        assert!(response.provider_data.is_none());
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Unknown Inventory service Host");
    }

    #[test]
    fn registers_item_resource_and_data_source() {
        let provider = InventoryProvider::new("test");

        let resources: Vec<String> = provider
            .resources()
            .into_iter()
            .map(|factory| factory().type_name().to_string())
            .collect();
        let data_sources: Vec<String> = provider
            .data_sources()
            .into_iter()
            .map(|factory| factory().type_name().to_string())
            .collect();

        assert_eq!(resources, vec!["inventory_item"]);
        assert_eq!(data_sources, vec!["inventory_item"]);
    }
}
