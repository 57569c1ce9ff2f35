//! Client implementation for Vault API interactions.
//!
//! This module provides a client for making HTTP requests to the Vault API
//! with appropriate authentication, TLS material and error handling. A client is
//! bound to at most one token at a time.

use crate::vault::common::check_response;
use crate::vault::{VaultApiConfig, VaultError};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Certificate, Client, Identity, Method,
};
use serde_json::Value;
use std::fs;
use std::str::FromStr;
use tracing::debug;

/// Client for interacting with the Vault HTTP API.
#[derive(Clone)]
pub struct VaultClient {
    /// Base URL of the Vault server
    pub addr: String,
    /// Auth token for Vault API requests
    token: String,
    /// HTTP client for making requests
    client: Client,
    /// Custom headers to add to requests
    custom_headers: HeaderMap,
}

impl std::fmt::Debug for VaultClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultClient")
            .field("addr", &self.addr)
            .field("has_token", &!self.token.is_empty())
            .finish()
    }
}

fn read_pem(path: &str, what: &str) -> Result<Vec<u8>, VaultError> {
    fs::read(path).map_err(|e| {
        VaultError::ClientCreation(format!("Failed to read {} {}: {}", what, path, e))
    })
}

impl VaultClient {
    /// Creates a new client for the server described by `config`.
    ///
    /// The client starts without a token; see [`VaultClient::set_token`].
    pub fn new(config: &VaultApiConfig) -> Result<Self, VaultError> {
        let mut builder = Client::builder().timeout(config.timeout);

        if let Some(ca_path) = &config.ca_cert_path {
            let pem = read_pem(ca_path, "CA certificate")?;
            let cert = Certificate::from_pem(&pem).map_err(|e| {
                VaultError::ClientCreation(format!("Invalid CA certificate {}: {}", ca_path, e))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        match (&config.client_cert_path, &config.client_key_path) {
            (Some(cert_path), Some(key_path)) => {
                let cert = read_pem(cert_path, "client certificate")?;
                let key = read_pem(key_path, "client key")?;
                let identity = Identity::from_pkcs8_pem(&cert, &key).map_err(|e| {
                    VaultError::ClientCreation(format!("Invalid client certificate/key: {}", e))
                })?;
                builder = builder.identity(identity);
            }
            (None, None) => {}
            _ => {
                return Err(VaultError::ClientCreation(
                    "client certificate and client key must be provided together".to_string(),
                ))
            }
        }

        let client = builder.build().map_err(|e| {
            VaultError::ClientCreation(format!("Failed to create HTTP client: {}", e))
        })?;

        let mut vault_client = Self {
            addr: config.address(),
            token: String::new(),
            client,
            custom_headers: HeaderMap::new(),
        };
        if let Some(namespace) = &config.namespace {
            vault_client.add_header("X-Vault-Namespace", namespace);
        }
        Ok(vault_client)
    }

    /// The token this client currently authenticates with.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Binds the client to `token`.
    pub fn set_token(&mut self, token: &str) {
        self.token = token.to_string();
    }

    /// Adds a custom header to the client.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the header
    /// * `value` - The value of the header
    pub fn add_header(&mut self, name: &str, value: &str) -> &mut Self {
        if let (Ok(header_name), Ok(header_value)) =
            (HeaderName::from_str(name), HeaderValue::from_str(value))
        {
            self.custom_headers.insert(header_name, header_value);
        }
        self
    }

    /// Makes a GET request to the Vault API.
    pub async fn get(&self, path: &str) -> Result<Option<Value>, VaultError> {
        self.request(Method::GET, path, None).await
    }

    /// Makes a POST request to the Vault API with a JSON body.
    pub async fn post_with_body(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<Option<Value>, VaultError> {
        self.request(Method::POST, path, Some(body)).await
    }

    /// Makes a PUT request to the Vault API with a JSON body.
    pub async fn put_with_body(&self, path: &str, body: &Value) -> Result<Option<Value>, VaultError> {
        self.request(Method::PUT, path, Some(body)).await
    }

    /// Makes a request to the Vault API with the specified method and optional body.
    ///
    /// Returns `None` when the server answers without a body (204 No Content).
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Option<Value>, VaultError> {
        let url = format!("{}{}", self.addr, path);
        debug!("{} {}", method, url);
        let mut request = self.client.request(method, &url);

        if !self.token.is_empty() {
            request = request.header("X-Vault-Token", &self.token);
        }

        for (name, value) in self.custom_headers.iter() {
            request = request.header(name, value);
        }

        if let Some(json_body) = body {
            request = request.json(json_body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| VaultError::Connectivity(format!("Request to {} failed: {}", url, e)))?;

        check_response(response).await
    }
}
