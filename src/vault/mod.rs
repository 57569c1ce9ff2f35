//! Vault module for the vaulter library
//!
//! This module holds everything that talks to a HashiCorp Vault server: the HTTP
//! client, the narrow capability traits the orchestration helpers are written
//! against, and the helpers themselves.
//!
//! ## Layout:
//! - `client`, `common` and `api` form the transport. `api::VaultApi` is the only
//!   type that implements the capability traits against a real server.
//! - `operations` defines one small trait per server primitive (mount, list, read,
//!   write, ...) so each helper can be driven by a stub in tests.
//! - `mounts`, `tokens`, `cubbyhole` and `pki` hold the orchestration logic.
//!
//! ## Testing strategy:
//! - Each module contains its own unit tests within a `#[cfg(test)] mod tests` block,
//!   using hand-written stubs for the capability traits it needs
//! - Tests that need a real server use Docker containers via `test_utils.rs` and are
//!   ignored by default
//! - Integration tests in the `tests/` directory drive the full flow against an
//!   in-memory server

pub mod api;
pub mod client;
pub mod common;
pub mod cubbyhole;
pub mod error;
pub mod mounts;
pub mod operations;
pub mod pki;
pub mod secret;
#[cfg(test)]
pub mod test_utils;
pub mod tokens;

// Re-export key types and traits for convenience
pub use api::{init_api, VaultApi};
pub use client::VaultClient;
pub use cubbyhole::ScopedSecretStore;
pub use error::VaultError;
pub use mounts::{MountConfigInput, MountConfigOutput, MountConfiguration, MountInput, MountOutput};
pub use secret::{Secret, SecretAuth};
pub use tokens::{child_token, TokenCreateRequest};

use std::time::Duration;

/// Default request timeout applied to every HTTP client.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for a Vault server.
///
/// All values are plain inputs; nothing here is read from the process
/// environment. The CLI maps its flags and environment variables onto this.
#[derive(Debug, Clone, PartialEq)]
pub struct VaultApiConfig {
    /// Token the root client is bound to. Child tokens are created under it.
    pub parent_token: String,
    /// Either "http" or "https". Defaults to "https".
    pub scheme: String,
    /// Hostname or IP address of the server. Defaults to "127.0.0.1".
    pub host: String,
    /// Port of the server. Defaults to "8200".
    pub port: String,
    /// PEM encoded CA certificate used to verify the server certificate.
    pub ca_cert_path: Option<String>,
    /// PEM encoded client certificate for mTLS.
    pub client_cert_path: Option<String>,
    /// PEM encoded PKCS#8 client key for mTLS.
    pub client_key_path: Option<String>,
    /// Optional namespace for namespaced Vault instances (enterprise).
    pub namespace: Option<String>,
    /// Per-request timeout. Defaults to [`DEFAULT_TIMEOUT`].
    pub timeout: Duration,
}

impl VaultApiConfig {
    /// Create a config for `host` with every other field at its default.
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            ..Self::default()
        }
    }

    /// Set the parent token
    pub fn with_token(mut self, token: &str) -> Self {
        self.parent_token = token.to_string();
        self
    }

    /// Set scheme and port
    pub fn with_endpoint(mut self, scheme: &str, port: &str) -> Self {
        self.scheme = scheme.to_string();
        self.port = port.to_string();
        self
    }

    /// Set TLS material paths
    pub fn with_tls(
        mut self,
        ca_cert: Option<&str>,
        client_cert: Option<&str>,
        client_key: Option<&str>,
    ) -> Self {
        self.ca_cert_path = ca_cert.map(|s| s.to_string());
        self.client_cert_path = client_cert.map(|s| s.to_string());
        self.client_key_path = client_key.map(|s| s.to_string());
        self
    }

    /// Set namespace
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(namespace.to_string());
        self
    }

    /// Base URL of the server, e.g. "https://127.0.0.1:8200".
    pub fn address(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    /// "host:port", the form used when building CA access URLs.
    pub fn host_port(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for VaultApiConfig {
    fn default() -> Self {
        Self {
            parent_token: String::new(),
            scheme: "https".to_string(),
            host: "127.0.0.1".to_string(),
            port: "8200".to_string(),
            ca_cert_path: None,
            client_cert_path: None,
            client_key_path: None,
            namespace: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}
