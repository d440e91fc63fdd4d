//! HTTP adapters for the two outbound collaborators: the transactional mail
//! endpoint and the image-hosting API.

use async_trait::async_trait;
use serde_json::json;

use crate::ports::{ImageUploader, Notifier};
use crate::{Result, StorefrontError};

/// Posts the order confirmation to the external mail endpoint as
/// `{to, customerName, order}`.
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpNotifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), endpoint: endpoint.into() }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, recipient: &str, customer_name: &str, order_id: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({
                "to": recipient,
                "customerName": customer_name,
                "order": order_id,
            }))
            .send()
            .await
            .map_err(|e| StorefrontError::Notification(e.to_string()))?;
        if !response.status().is_success() {
            return Err(StorefrontError::Notification(format!(
                "mail endpoint returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Uploads an image as a multipart form and returns the hosted URL from the
/// API's `data.url` field.
pub struct HttpImageUploader {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpImageUploader {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), endpoint: endpoint.into(), api_key: api_key.into() }
    }
}

#[async_trait]
impl ImageUploader for HttpImageUploader {
    async fn upload(&self, bytes: Vec<u8>) -> Result<String> {
        let form = reqwest::multipart::Form::new()
            .part("image", reqwest::multipart::Part::bytes(bytes).file_name("image"));
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .multipart(form)
            .send()
            .await
            .map_err(|e| StorefrontError::Upload(e.to_string()))?;
        if !response.status().is_success() {
            return Err(StorefrontError::Upload(format!(
                "image API returned {}",
                response.status()
            )));
        }
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| StorefrontError::Upload(e.to_string()))?;
        body.pointer("/data/url")
            .and_then(|u| u.as_str())
            .map(str::to_string)
            .ok_or_else(|| StorefrontError::Upload("image API response missing data.url".into()))
    }
}
