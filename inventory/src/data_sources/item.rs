//! Item data source implementation

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use crate::api::ApiError;
use crate::resources::item::{
    api_diagnostic, item_state, ID_DESCRIPTION, NAME_DESCRIPTION, TAG_DESCRIPTION,
};
use crate::InventoryProviderData;

#[derive(Default)]
pub struct ItemDataSource {
    provider_data: Option<InventoryProviderData>,
}

impl ItemDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for ItemDataSource {
    fn type_name(&self) -> &str {
        "inventory_item"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Fetch an item.")
            .attribute(
                AttributeBuilder::new("id", AttributeType::Number)
                    .description(ID_DESCRIPTION)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description(NAME_DESCRIPTION)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tag", AttributeType::String)
                    .description(TAG_DESCRIPTION)
                    .computed()
                    .build(),
            )
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        tracing::debug!("Preparing to read item data source");

        let failed = |diagnostic: Diagnostic| ReadDataSourceResponse {
            state: DynamicValue::null(),
            diagnostics: vec![diagnostic],
        };

        let Some(data) = &self.provider_data else {
            return failed(Diagnostic::error(
                "Provider not configured",
                "Provider data was not properly configured",
            ));
        };

        let id = match request.config.get_i64(&AttributePath::new("id")) {
            Ok(id) => id,
            Err(e) => {
                return failed(
                    Diagnostic::error("Invalid item id", e.to_string())
                        .with_attribute(AttributePath::new("id")),
                )
            }
        };

        match data.client.items().find_item_by_id(&ctx, id).await {
            Ok(item) => {
                tracing::debug!(id, "Finished reading item data source");
                match item_state(&item) {
                    Ok(state) => ReadDataSourceResponse {
                        state,
                        diagnostics: vec![],
                    },
                    Err(diag) => failed(diag),
                }
            }
            Err(ApiError::NotFound) => failed(Diagnostic::error(
                "Item Not Found",
                format!("No inventory item exists with id {}", id),
            )),
            Err(e) => failed(api_diagnostic("Unable to Read Item", &e)),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for ItemDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        match InventoryProviderData::from_any(request.provider_data) {
            Ok(data) => {
                self.provider_data = Some(data);
                ConfigureDataSourceResponse {
                    diagnostics: vec![],
                }
            }
            Err(diag) => ConfigureDataSourceResponse {
                diagnostics: vec![diag],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Client;
    use mockito::Server;
    use std::sync::Arc;

    async fn configured(url: &str) -> ItemDataSource {
        let mut data_source = ItemDataSource::new();
        let response = data_source
            .configure(
                Context::new(),
                ConfigureDataSourceRequest {
                    provider_data: Some(Arc::new(InventoryProviderData::new(
                        Client::new(url).unwrap(),
                    ))),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
        data_source
    }

    fn config(id: f64) -> DynamicValue {
        let mut config = DynamicValue::object();
        config.set_number(&AttributePath::new("id"), id).unwrap();
        config.set_null(&AttributePath::new("name")).unwrap();
        config.set_null(&AttributePath::new("tag")).unwrap();
        config
    }

    #[tokio::test]
    async fn read_populates_computed_attributes() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/items/2")
            .with_body(r#"{"id":2,"name":"Gear","tag":"steel"}"#)
            .create_async()
            .await;

        let data_source = configured(&server.url()).await;
        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "inventory_item".to_string(),
                    config: config(2.0),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response.state.get_string(&AttributePath::new("name")).unwrap(),
            "Gear"
        );
        assert_eq!(
            response.state.get_string(&AttributePath::new("tag")).unwrap(),
            "steel"
        );
    }

    #[tokio::test]
    async fn missing_item_is_an_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/items/2")
            .with_status(404)
            .create_async()
            .await;

        let data_source = configured(&server.url()).await;
        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "inventory_item".to_string(),
                    config: config(2.0),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Item Not Found");
    }

    #[tokio::test]
    async fn undecodable_body_is_reported() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/items/2")
            .with_body("[]")
            .create_async()
            .await;

        let data_source = configured(&server.url()).await;
        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "inventory_item".to_string(),
                    config: config(2.0),
                },
            )
            .await;

        assert_eq!(
            response.diagnostics[0].summary,
            "Invalid format received for Item"
        );
    }

    #[tokio::test]
    async fn fractional_id_is_rejected() {
        let data_source = configured("http://127.0.0.1:1/").await;
        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "inventory_item".to_string(),
                    config: config(2.5),
                },
            )
            .await;

        assert_eq!(response.diagnostics[0].summary, "Invalid item id");
        assert_eq!(
            response.diagnostics[0].attribute,
            Some(AttributePath::new("id"))
        );
    }
}
