//! Item resource implementation

use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource,
    ReadResourceRequest, ReadResourceResponse, Resource, ResourceSchemaRequest,
    ResourceSchemaResponse, ResourceWithConfigure, ResourceWithImportState,
    UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use crate::api::{ApiError, Client, Item, NewItem};
use crate::InventoryProviderData;

pub(crate) const ID_DESCRIPTION: &str = "Identifier for this inventory item.";
pub(crate) const NAME_DESCRIPTION: &str = "The name for this inventory item.";
pub(crate) const TAG_DESCRIPTION: &str = "The tag for this inventory item.";

#[derive(Default)]
pub struct ItemResource {
    provider_data: Option<InventoryProviderData>,
}

impl ItemResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self) -> Result<&Client, Diagnostic> {
        self.provider_data
            .as_ref()
            .map(|data| &data.client)
            .ok_or_else(|| {
                Diagnostic::error(
                    "Provider not configured",
                    "Provider data was not properly configured",
                )
            })
    }

    /// Build the request body from planned values; an unset tag is sent as ""
    fn new_item(planned: &DynamicValue) -> Result<NewItem, Diagnostic> {
        let name = planned.get_string(&AttributePath::new("name")).map_err(|e| {
            Diagnostic::error("Invalid item configuration", e.to_string())
                .with_attribute(AttributePath::new("name"))
        })?;
        let tag = planned
            .get_string(&AttributePath::new("tag"))
            .unwrap_or_default();

        Ok(NewItem {
            name,
            tag: Some(tag),
        })
    }
}

/// State for an item exactly as the service returned it
pub(crate) fn item_state(item: &Item) -> Result<DynamicValue, Diagnostic> {
    let id = Dynamic::integer(item.id)
        .map_err(|e| Diagnostic::error("Invalid format received for Item", e.to_string()))?;

    let mut values = HashMap::new();
    values.insert("id".to_string(), id);
    values.insert("name".to_string(), Dynamic::String(item.name.clone()));
    values.insert(
        "tag".to_string(),
        item.tag.clone().map(Dynamic::String).unwrap_or(Dynamic::Null),
    );
    Ok(DynamicValue::new(Dynamic::Map(values)))
}

/// Diagnostic for a failed lookup or update; `summary` covers transport failures
pub(crate) fn api_diagnostic(summary: &str, error: &ApiError) -> Diagnostic {
    match error {
        ApiError::UnexpectedStatus { status } => Diagnostic::error(
            "Unexpected HTTP error code received for Item",
            status.to_string(),
        ),
        ApiError::NotFound => Diagnostic::error(
            "Unexpected HTTP error code received for Item",
            reqwest::StatusCode::NOT_FOUND.to_string(),
        ),
        ApiError::Decode(_) => {
            Diagnostic::error("Invalid format received for Item", error.to_string())
        }
        _ => Diagnostic::error(summary, error.to_string()),
    }
}

fn state_id(state: &DynamicValue) -> Result<i64, Diagnostic> {
    state.get_i64(&AttributePath::new("id")).map_err(|e| {
        Diagnostic::error("Invalid item state", e.to_string())
            .with_attribute(AttributePath::new("id"))
    })
}

#[async_trait]
impl Resource for ItemResource {
    fn type_name(&self) -> &str {
        "inventory_item"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manage an item.")
            .attribute(
                AttributeBuilder::new("id", AttributeType::Number)
                    .description(ID_DESCRIPTION)
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description(NAME_DESCRIPTION)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tag", AttributeType::String)
                    .description(TAG_DESCRIPTION)
                    .optional()
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        tracing::debug!("Preparing to create item resource");

        let failed = |diagnostic: Diagnostic| CreateResourceResponse {
            new_state: DynamicValue::null(),
            diagnostics: vec![diagnostic],
        };

        let client = match self.client() {
            Ok(client) => client,
            Err(diag) => return failed(diag),
        };
        let item = match Self::new_item(&request.planned_state) {
            Ok(item) => item,
            Err(diag) => return failed(diag),
        };

        match client.items().add_item(&ctx, &item).await {
            Ok(created) => {
                tracing::debug!(id = created.id, "Created item resource");
                match item_state(&created) {
                    Ok(new_state) => CreateResourceResponse {
                        new_state,
                        diagnostics: vec![],
                    },
                    Err(diag) => failed(diag),
                }
            }
            Err(e @ ApiError::Decode(_)) => failed(Diagnostic::error(
                "Invalid format received for Item",
                e.to_string(),
            )),
            Err(e) => failed(Diagnostic::error("Unable to Create Item", e.to_string())),
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        tracing::debug!("Preparing to read item resource");

        let failed = |state: DynamicValue, diagnostic: Diagnostic| ReadResourceResponse {
            new_state: Some(state),
            diagnostics: vec![diagnostic],
        };

        let client = match self.client() {
            Ok(client) => client,
            Err(diag) => return failed(request.current_state, diag),
        };
        let id = match state_id(&request.current_state) {
            Ok(id) => id,
            Err(diag) => return failed(request.current_state, diag),
        };

        match client.items().find_item_by_id(&ctx, id).await {
            Ok(item) => {
                tracing::debug!(id, "Finished reading item resource");
                match item_state(&item) {
                    Ok(state) => ReadResourceResponse {
                        new_state: Some(state),
                        diagnostics: vec![],
                    },
                    Err(diag) => failed(request.current_state, diag),
                }
            }
            Err(ApiError::NotFound) => {
                tracing::debug!(id, "Item no longer exists, removing from state");
                ReadResourceResponse {
                    new_state: None,
                    diagnostics: vec![],
                }
            }
            Err(e) => failed(
                request.current_state,
                api_diagnostic("Unable to Read Item", &e),
            ),
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        tracing::debug!("Preparing to update item resource");

        let failed = |state: DynamicValue, diagnostic: Diagnostic| UpdateResourceResponse {
            new_state: state,
            diagnostics: vec![diagnostic],
        };

        let client = match self.client() {
            Ok(client) => client,
            Err(diag) => return failed(request.prior_state, diag),
        };
        // The id never changes, so it comes from the prior state
        let id = match state_id(&request.prior_state) {
            Ok(id) => id,
            Err(diag) => return failed(request.prior_state, diag),
        };
        let item = match Self::new_item(&request.planned_state) {
            Ok(item) => item,
            Err(diag) => return failed(request.prior_state, diag),
        };

        match client.items().update_item(&ctx, id, &item).await {
            Ok(updated) => {
                tracing::debug!(id, "Updated item resource");
                match item_state(&updated) {
                    Ok(new_state) => UpdateResourceResponse {
                        new_state,
                        diagnostics: vec![],
                    },
                    Err(diag) => failed(request.prior_state, diag),
                }
            }
            Err(e) => failed(
                request.prior_state,
                api_diagnostic("Unable to Update Item", &e),
            ),
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        tracing::debug!("Preparing to delete item resource");

        let client = match self.client() {
            Ok(client) => client,
            Err(diag) => {
                return DeleteResourceResponse {
                    diagnostics: vec![diag],
                }
            }
        };
        let id = match state_id(&request.prior_state) {
            Ok(id) => id,
            Err(diag) => {
                return DeleteResourceResponse {
                    diagnostics: vec![diag],
                }
            }
        };

        match client.items().delete_item(&ctx, id).await {
            Ok(()) => {
                tracing::debug!(id, "Deleted item resource");
                DeleteResourceResponse {
                    diagnostics: vec![],
                }
            }
            Err(e) => DeleteResourceResponse {
                diagnostics: vec![Diagnostic::error("Unable to Delete Item", e.to_string())],
            },
        }
    }

    fn import_support(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for ItemResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        match InventoryProviderData::from_any(request.provider_data) {
            Ok(data) => {
                self.provider_data = Some(data);
                ConfigureResourceResponse {
                    diagnostics: vec![],
                }
            }
            Err(diag) => ConfigureResourceResponse {
                diagnostics: vec![diag],
            },
        }
    }
}

#[async_trait]
impl ResourceWithImportState for ItemResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let failed = |detail: String| ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![Diagnostic::error(
                "Error importing item",
                format!(
                    "Could not import item, unexpected error (ID should be an integer): {}",
                    detail
                ),
            )],
        };

        let id = match request.id.parse::<i64>() {
            Ok(id) => id,
            Err(e) => return failed(e.to_string()),
        };
        // Terraform numbers are f64; larger ids would be rounded to a different item
        let id = match Dynamic::integer(id) {
            Ok(id) => id,
            Err(e) => return failed(e.to_string()),
        };

        let mut values = HashMap::new();
        values.insert("id".to_string(), id);

        ImportResourceStateResponse {
            imported_resources: vec![ImportedResource {
                type_name: request.type_name,
                state: DynamicValue::new(Dynamic::Map(values)),
            }],
            diagnostics: vec![],
        }
    }
}
