//! HTTP client for the list server.

use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::BTreeMap;

use grocery_list_core::{ListId, ListPayload};

use crate::config::Config;

#[derive(Debug)]
pub enum ClientError {
    /// No API key configured
    NotConfigured,
    /// Transport failure or undecodable response
    HttpError(String),
    /// The server answered with an error body
    ServerError {
        status: u16,
        error: String,
        message: String,
    },
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::NotConfigured => write!(
                f,
                "No API key configured. Set api_key in config or GROCERY_API_KEY."
            ),
            ClientError::HttpError(e) => write!(f, "HTTP error: {}", e),
            ClientError::ServerError {
                status, message, ..
            } => write!(f, "Server returned {}: {}", status, message),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::HttpError(e.to_string())
    }
}

#[derive(Debug)]
pub struct ListClient {
    server_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl ListClient {
    pub fn new(server_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        let api_key = config
            .api_key
            .value
            .clone()
            .ok_or(ClientError::NotConfigured)?;
        Ok(Self::new(config.server_url.value.clone(), api_key))
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.server_url, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    pub async fn list_names(&self) -> Result<BTreeMap<ListId, String>, ClientError> {
        let response = self.request(Method::GET, "/lists").send().await?;
        decode(response).await
    }

    pub async fn get_list(&self, id: ListId) -> Result<ListPayload, ClientError> {
        let response = self
            .request(Method::GET, &format!("/lists/{}", id))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn create_list(
        &self,
        name: &str,
        is_template: bool,
        template_id: Option<ListId>,
    ) -> Result<ListPayload, ClientError> {
        let response = self
            .request(Method::POST, "/lists")
            .json(&json!({
                "name": name,
                "isTemplate": is_template,
                "templateId": template_id,
            }))
            .send()
            .await?;
        decode(response).await
    }

    /// Sends the list back with its full item set; the server reconciles.
    pub async fn save_list(&self, list: &ListPayload) -> Result<ListPayload, ClientError> {
        let response = self
            .request(Method::PUT, &format!("/lists/{}", list.id))
            .json(list)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn delete_list(&self, id: ListId) -> Result<(), ClientError> {
        let response = self
            .request(Method::DELETE, &format!("/lists/{}", id))
            .send()
            .await?;
        expect_success(response).await
    }

    pub async fn share_list(&self, id: ListId, username: &str) -> Result<(), ClientError> {
        let response = self
            .request(Method::PUT, &format!("/lists/{}/shares/{}", id, username))
            .send()
            .await?;
        expect_success(response).await
    }

    pub async fn unshare_list(&self, id: ListId, username: &str) -> Result<(), ClientError> {
        let response = self
            .request(Method::DELETE, &format!("/lists/{}/shares/{}", id, username))
            .send()
            .await?;
        expect_success(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(server_error(response).await);
    }
    Ok(response.json().await?)
}

async fn expect_success(response: Response) -> Result<(), ClientError> {
    if !response.status().is_success() {
        return Err(server_error(response).await);
    }
    Ok(())
}

async fn server_error(response: Response) -> ClientError {
    let status = response.status().as_u16();
    let body: serde_json::Value = response.json().await.unwrap_or_default();

    ClientError::ServerError {
        status,
        error: body["error"].as_str().unwrap_or("unknown").to_string(),
        message: body["message"]
            .as_str()
            .unwrap_or("Unknown error")
            .to_string(),
    }
}
