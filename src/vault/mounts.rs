//! Backend mount management.
//!
//! Mounting, listing, tuning and the generic "write/read through a fresh client"
//! helpers the scoped secret store is built on. Existence of a mount is only ever
//! observed here; the server owns it.

use crate::vault::operations::{
    ClientReader, ClientWriter, MountConfigGetter, MountLister, MountTuner, Mounter,
};
use crate::vault::{Secret, VaultError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, info};

/// Lease settings sent when mounting or tuning. Empty strings are left out so
/// the server keeps its defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MountConfigInput {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_lease_ttl: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub max_lease_ttl: String,
}

/// Request body for `sys/mounts/<path>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MountInput {
    #[serde(rename = "type")]
    pub mount_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: MountConfigInput,
}

/// Lease settings of an existing mount, in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MountConfigOutput {
    #[serde(default)]
    pub default_lease_ttl: u64,
    #[serde(default)]
    pub max_lease_ttl: u64,
    #[serde(default)]
    pub force_no_cache: bool,
}

/// One entry of the mount listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MountOutput {
    #[serde(rename = "type")]
    pub mount_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub accessor: String,
    #[serde(default)]
    pub config: MountConfigOutput,
    #[serde(default)]
    pub local: bool,
    #[serde(default)]
    pub seal_wrap: bool,
}

/// Flattened mount settings, as a caller thinks about them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountConfiguration {
    pub mount_type: String,
    pub description: String,
    pub default_lease_ttl: String,
    pub max_lease_ttl: String,
}

impl MountConfiguration {
    pub fn new(mount_type: &str, description: &str) -> Self {
        Self {
            mount_type: mount_type.to_string(),
            description: description.to_string(),
            ..Self::default()
        }
    }

    pub fn with_lease_ttls(mut self, default_ttl: &str, max_ttl: &str) -> Self {
        self.default_lease_ttl = default_ttl.to_string();
        self.max_lease_ttl = max_ttl.to_string();
        self
    }
}

impl From<&MountConfiguration> for MountInput {
    fn from(c: &MountConfiguration) -> Self {
        MountInput {
            mount_type: c.mount_type.clone(),
            description: c.description.clone(),
            config: MountConfigInput {
                default_lease_ttl: c.default_lease_ttl.clone(),
                max_lease_ttl: c.max_lease_ttl.clone(),
            },
        }
    }
}

/// Mounts a backend at `path`.
///
/// Does not check for an existing mount first; use [`ensure_mounted`] for that.
/// Transport failures come back as-is, server rejections as `VaultError::Mount`.
pub async fn mount<M: Mounter + ?Sized>(
    m: &M,
    path: &str,
    config: &MountConfiguration,
) -> Result<(), VaultError> {
    m.mount(path, &MountInput::from(config))
        .await
        .map_err(|e| match e {
            VaultError::Connectivity(_) => e,
            other => VaultError::mount(path, other),
        })
}

/// Returns every mounted path with its metadata.
pub async fn list_mounts<L: MountLister + ?Sized>(
    l: &L,
) -> Result<HashMap<String, MountOutput>, VaultError> {
    l.list_mounts().await
}

/// Returns true if `path` is exactly one of the mounted paths.
///
/// No normalization: "cubbyhole" and "cubbyhole/" are different paths.
pub async fn is_mounted<L: MountLister + ?Sized>(l: &L, path: &str) -> Result<bool, VaultError> {
    let mounts = l.list_mounts().await?;
    Ok(mounts.contains_key(path))
}

/// Mounts `path` unless it is already mounted. Returns true if it mounted.
pub async fn ensure_mounted<M: Mounter + MountLister + ?Sized>(
    m: &M,
    path: &str,
    config: &MountConfiguration,
) -> Result<bool, VaultError> {
    if is_mounted(m, path).await? {
        debug!("{} is already mounted", path);
        return Ok(false);
    }
    info!("Mounting {} backend at {}", config.mount_type, path);
    mount(m, path, config).await?;
    Ok(true)
}

/// Returns the lease configuration of the mount at `path`.
pub async fn mount_config<G: MountConfigGetter + ?Sized>(
    g: &G,
    path: &str,
) -> Result<MountConfigOutput, VaultError> {
    g.mount_config(path).await
}

/// Sets lease TTLs on an existing mount. Values are passed through untouched.
pub async fn tune_mount<T: MountTuner + ?Sized>(
    t: &T,
    path: &str,
    default_ttl: &str,
    max_ttl: &str,
) -> Result<(), VaultError> {
    let input = MountConfigInput {
        default_lease_ttl: default_ttl.to_string(),
        max_lease_ttl: max_ttl.to_string(),
    };
    t.tune_mount(path, input).await
}

/// Writes `data` to `path` with a new client bound to `token`.
pub async fn write_mount<W: ClientWriter + ?Sized>(
    cw: &W,
    path: &str,
    token: &str,
    data: Map<String, Value>,
) -> Result<Option<Secret>, VaultError> {
    let mut client = cw.new_client(cw.config())?;
    cw.set_token(&mut client, token);
    cw.write(&client, path, data)
        .await
        .map_err(|e| VaultError::write(path, e))
}

/// Reads the data stored at `path` with a new client bound to `token`.
pub async fn read_mount<R: ClientReader + ?Sized>(
    cr: &R,
    path: &str,
    token: &str,
) -> Result<Map<String, Value>, VaultError> {
    let mut client = cr.new_client(cr.config())?;
    cr.set_token(&mut client, token);
    let secret = cr
        .read(&client, path)
        .await
        .map_err(|e| VaultError::read(path, e))?
        .ok_or_else(|| VaultError::SecretMissing {
            path: path.to_string(),
        })?;
    secret.data.ok_or_else(|| VaultError::DataMissing {
        path: path.to_string(),
    })
}
