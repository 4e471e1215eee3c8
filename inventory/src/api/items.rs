//! Item endpoints of the inventory service

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tfplug::Context;

use super::client::Client;
use super::error::ApiError;

/// An item as stored by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// Request body for creating and updating items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

pub struct ItemsApi<'a> {
    client: &'a Client,
}

impl<'a> ItemsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /items
    pub async fn add_item(&self, ctx: &Context, item: &NewItem) -> Result<Item, ApiError> {
        let request = self.client.post("items")?.json(item);
        let response = self.client.send(ctx, request).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::UnexpectedStatus { status });
        }

        self.client.json(ctx, response).await
    }

    /// GET /items/{id}
    pub async fn find_item_by_id(&self, ctx: &Context, id: i64) -> Result<Item, ApiError> {
        let request = self.client.get(&item_path(id))?;
        let response = self.client.send(ctx, request).await?;

        match response.status() {
            StatusCode::OK => self.client.json(ctx, response).await,
            StatusCode::NOT_FOUND => Err(ApiError::NotFound),
            status => Err(ApiError::UnexpectedStatus { status }),
        }
    }

    /// PUT /items/{id}
    pub async fn update_item(
        &self,
        ctx: &Context,
        id: i64,
        item: &NewItem,
    ) -> Result<Item, ApiError> {
        let request = self.client.put(&item_path(id))?.json(item);
        let response = self.client.send(ctx, request).await?;

        match response.status() {
            StatusCode::OK => self.client.json(ctx, response).await,
            status => Err(ApiError::UnexpectedStatus { status }),
        }
    }

    /// DELETE /items/{id}. The response body is never read and a non-success
    /// status is only logged.
    pub async fn delete_item(&self, ctx: &Context, id: i64) -> Result<(), ApiError> {
        let request = self.client.delete(&item_path(id))?;
        let response = self.client.send(ctx, request).await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(id, %status, "Delete returned a non-success status");
        }

        Ok(())
    }
}

fn item_path(id: i64) -> String {
    format!("items/{}", id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[test]
    fn missing_tag_decodes_as_none() {
        let item: Item = serde_json::from_str(r#"{"id":3,"name":"Bolt"}"#).unwrap();
        assert_eq!(item.tag, None);

        let item: Item = serde_json::from_str(r#"{"id":3,"name":"Bolt","tag":""}"#).unwrap();
        assert_eq!(item.tag, Some(String::new()));
    }

    #[test]
    fn unset_tag_is_left_out_of_request_body() {
        let body = serde_json::to_value(NewItem {
            name: "Bolt".to_string(),
            tag: None,
        })
        .unwrap();

        assert_eq!(body, serde_json::json!({"name": "Bolt"}));
    }

    #[tokio::test]
    async fn add_item_posts_json_and_decodes_item() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/items")
            .match_body(Matcher::Json(serde_json::json!({"name": "Widget", "tag": "blue"})))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":7,"name":"Widget","tag":"blue"}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url()).unwrap();
        let item = client
            .items()
            .add_item(
                &Context::new(),
                &NewItem {
                    name: "Widget".to_string(),
                    tag: Some("blue".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(
            item,
            Item {
                id: 7,
                name: "Widget".to_string(),
                tag: Some("blue".to_string()),
            }
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn add_item_rejects_error_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/items")
            .with_status(500)
            .create_async()
            .await;

        let client = Client::new(&server.url()).unwrap();
        let result = client
            .items()
            .add_item(
                &Context::new(),
                &NewItem {
                    name: "Widget".to_string(),
                    tag: None,
                },
            )
            .await;

        match result {
            Err(e @ ApiError::UnexpectedStatus { .. }) => {
                assert_eq!(e.to_string(), "500 Internal Server Error")
            }
            other => panic!("Expected UnexpectedStatus, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn find_item_maps_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/items/99")
            .with_status(404)
            .create_async()
            .await;

        let client = Client::new(&server.url()).unwrap();
        let result = client.items().find_item_by_id(&Context::new(), 99).await;

        assert!(matches!(result, Err(ApiError::NotFound)));
    }

    #[tokio::test]
    async fn find_item_reports_undecodable_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/items/5")
            .with_body("not json")
            .create_async()
            .await;

        let client = Client::new(&server.url()).unwrap();
        let result = client.items().find_item_by_id(&Context::new(), 5).await;

        assert!(matches!(result, Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn update_item_requires_ok() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("PUT", "/items/7")
            .with_status(404)
            .create_async()
            .await;

        let client = Client::new(&server.url()).unwrap();
        let result = client
            .items()
            .update_item(
                &Context::new(),
                7,
                &NewItem {
                    name: "Widget".to_string(),
                    tag: Some("red".to_string()),
                },
            )
            .await;

        match result {
            Err(ApiError::UnexpectedStatus { status }) => assert_eq!(status, StatusCode::NOT_FOUND),
            other => panic!("Expected UnexpectedStatus, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn delete_item_ignores_error_status() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/items/7")
            .with_status(500)
            .create_async()
            .await;

        let client = Client::new(&server.url()).unwrap();
        let result = client.items().delete_item(&Context::new(), 7).await;

        assert!(result.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_item_fails_on_network_errors() {
        let client = Client::new("http://127.0.0.1:1/").unwrap();

        let result = client.items().delete_item(&Context::new(), 7).await;
        assert!(matches!(result, Err(ApiError::Request(_))));
    }
}
