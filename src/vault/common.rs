//! Common helper functions for Vault responses and request payloads.

use crate::vault::VaultError;
use reqwest::{Response, StatusCode};
use serde_json::{Map, Value};

/// Checks the HTTP response from Vault. If successful, returns the JSON body
/// (or `None` for an empty body); otherwise converts the body into a `VaultError`.
pub async fn check_response(resp: Response) -> Result<Option<Value>, VaultError> {
    let status = resp.status();
    if status.is_success() {
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let body = resp
            .text()
            .await
            .map_err(|e| VaultError::Connectivity(format!("Failed to read response: {}", e)))?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| VaultError::Parse(format!("Failed to parse response: {}", e)))
    } else {
        let body = resp.text().await.unwrap_or_default();
        Err(error_from_body(status.as_u16(), body))
    }
}

/// Builds the error for a non-success response.
///
/// Vault reports failures as `{"errors": ["..."]}`. When that list is present the
/// messages are kept verbatim, otherwise the raw body is returned with the status.
pub fn error_from_body(status: u16, body: String) -> VaultError {
    if let Ok(val) = serde_json::from_str::<Value>(&body) {
        if let Some(errors) = val.get("errors").and_then(|v| v.as_array()) {
            let errors = errors
                .iter()
                .filter_map(|e| e.as_str().map(|s| s.to_string()))
                .collect();
            return VaultError::Api { status, errors };
        }
    }
    VaultError::HttpStatus(status, body)
}

/// Turns a `json!({...})` literal into the data map written to a path.
pub fn into_data(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Returns `data` when present in a Vault response envelope, otherwise the
/// whole body. Some sys endpoints duplicate their payload at the top level.
pub fn response_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(data @ Value::Object(_)) => data,
            _ => Value::Object(map),
        },
        other => other,
    }
}
