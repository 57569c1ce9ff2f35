//! The response envelope Vault returns from logical reads and writes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A secret returned by the server.
///
/// `data` values are loosely typed; callers compare them with care.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Secret {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub lease_id: String,
    #[serde(default)]
    pub lease_duration: u64,
    #[serde(default)]
    pub renewable: bool,
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
    #[serde(default)]
    pub auth: Option<SecretAuth>,
}

/// Auth section of a token response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecretAuth {
    #[serde(default)]
    pub client_token: String,
    #[serde(default)]
    pub accessor: String,
    #[serde(default)]
    pub policies: Option<Vec<String>>,
    #[serde(default)]
    pub lease_duration: u64,
    #[serde(default)]
    pub renewable: bool,
}

impl Secret {
    /// String value stored under `key` in the secret's data, if any.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.get(key))
            .and_then(|v| v.as_str())
    }
}
