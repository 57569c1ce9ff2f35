//! Secrets scoped to the token that owns them.
//!
//! A value is stored at `<mount>/<token>` and both the write and the read go
//! through a client created just for that call and bound to that token. Whoever
//! holds the token can read exactly that one secret, and a long lived client
//! bound to some other token is never touched.

use crate::vault::mounts::{read_mount, write_mount};
use crate::vault::operations::{ClientReader, ClientWriter};
use crate::vault::VaultError;
use serde_json::{Map, Value};
use tracing::debug;

/// Mount the store uses unless told otherwise.
pub const DEFAULT_MOUNT: &str = "cubbyhole";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedSecretStore {
    mount: String,
}

impl Default for ScopedSecretStore {
    fn default() -> Self {
        Self::new(DEFAULT_MOUNT)
    }
}

impl ScopedSecretStore {
    /// A store rooted at `mount`. A trailing separator is dropped.
    pub fn new(mount: &str) -> Self {
        Self {
            mount: mount.trim_end_matches('/').to_string(),
        }
    }

    pub fn mount(&self) -> &str {
        &self.mount
    }

    /// Path of the secret owned by `token`.
    pub fn secret_path(&self, token: &str) -> String {
        format!("{}/{}", self.mount, token)
    }

    /// Stores `{key: value}` under `token`'s path, replacing whatever was there.
    pub async fn write<W: ClientWriter + ?Sized>(
        &self,
        cw: &W,
        token: &str,
        key: &str,
        value: &str,
    ) -> Result<(), VaultError> {
        let path = self.secret_path(token);
        let mut data = Map::new();
        data.insert(key.to_string(), Value::String(value.to_string()));
        write_mount(cw, &path, token, data).await?;
        debug!("Wrote {} to {}", key, self.mount);
        Ok(())
    }

    /// Reads `key` from `token`'s path.
    ///
    /// Each way this can come up empty has its own error: the read itself failed,
    /// no secret, no data, no such key, or a null value.
    pub async fn read<R: ClientReader + ?Sized>(
        &self,
        cr: &R,
        token: &str,
        key: &str,
    ) -> Result<String, VaultError> {
        let path = self.secret_path(token);
        let mut data = read_mount(cr, &path, token).await?;
        match data.remove(key) {
            None => Err(VaultError::KeyMissing {
                path,
                key: key.to_string(),
            }),
            Some(Value::Null) => Err(VaultError::NullValue {
                path,
                key: key.to_string(),
            }),
            Some(Value::String(value)) => Ok(value),
            Some(_) => Err(VaultError::NotAString {
                path,
                key: key.to_string(),
            }),
        }
    }
}
