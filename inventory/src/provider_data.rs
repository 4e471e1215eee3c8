//! Provider data structure passed to resources and data sources

use crate::api::Client;
use std::any::Any;
use std::sync::Arc;
use tfplug::types::Diagnostic;

#[derive(Clone)]
pub struct InventoryProviderData {
    pub client: Client,
}

impl InventoryProviderData {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Recover the provider data handed to a resource or data source
    pub fn from_any(data: Option<Arc<dyn Any + Send + Sync>>) -> Result<Self, Diagnostic> {
        let data = data.ok_or_else(|| {
            Diagnostic::error(
                "Provider not configured",
                "Provider data was not properly configured",
            )
        })?;

        data.downcast_ref::<InventoryProviderData>()
            .cloned()
            .ok_or_else(|| {
                tracing::error!("Unable to prepare client");
                Diagnostic::error(
                    "Invalid provider data",
                    "Expected InventoryProviderData, got a different type",
                )
            })
    }
}
