//! The capability traits implemented against a real Vault server.

use crate::vault::common::response_data;
use crate::vault::mounts::{MountConfigInput, MountConfigOutput, MountInput, MountOutput};
use crate::vault::operations::{
    ClientCreator, ClientGetter, ConfigGetter, MountConfigGetter, MountLister, MountReader,
    MountTuner, MountWriter, Mounter, Revoker, TokenSetter, Tokener,
};
use crate::vault::tokens::TokenCreateRequest;
use crate::vault::{Secret, VaultApiConfig, VaultClient, VaultError};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tracing::{debug, info};

/// Vault API access bound to the parent token.
///
/// The held client is only used for server-level calls (mounts, token creation,
/// revocation) and for helpers that explicitly ask for the parent client.
/// Scoped reads and writes build their own clients from the stored config.
#[derive(Debug, Clone)]
pub struct VaultApi {
    client: VaultClient,
    config: VaultApiConfig,
}

/// Connects to the server in `config` with a client bound to `token`.
///
/// `token` becomes the config's parent token.
pub fn init_api(config: VaultApiConfig, token: &str) -> Result<VaultApi, VaultError> {
    VaultApi::new(VaultApiConfig {
        parent_token: token.to_string(),
        ..config
    })
}

impl VaultApi {
    /// Creates the API handle with a client bound to `config.parent_token`.
    pub fn new(config: VaultApiConfig) -> Result<Self, VaultError> {
        let mut client = VaultClient::new(&config)?;
        client.set_token(&config.parent_token);
        info!("Configured Vault client for {}", client.addr);
        Ok(Self { client, config })
    }
}

fn sys_mount_path(path: &str) -> String {
    format!("/v1/sys/mounts/{}", path.trim_matches('/'))
}

fn logical_path(path: &str) -> String {
    format!("/v1/{}", path.trim_start_matches('/'))
}

fn parse_secret(body: Option<Value>) -> Result<Option<Secret>, VaultError> {
    body.map(serde_json::from_value::<Secret>)
        .transpose()
        .map_err(|e| VaultError::Parse(format!("Failed to parse secret: {}", e)))
}

/// Extracts the mount table. Entries are the objects carrying a `type` field, which
/// skips envelope fields such as `request_id`.
fn parse_mounts(body: Value) -> Result<HashMap<String, MountOutput>, VaultError> {
    let Value::Object(entries) = response_data(body) else {
        return Err(VaultError::Parse("mount listing is not an object".to_string()));
    };
    let mut mounts = HashMap::new();
    for (path, entry) in entries {
        if entry.get("type").is_none() {
            continue;
        }
        let mount = serde_json::from_value(entry)
            .map_err(|e| VaultError::Parse(format!("Failed to parse mount {}: {}", path, e)))?;
        mounts.insert(path, mount);
    }
    Ok(mounts)
}

#[async_trait]
impl Mounter for VaultApi {
    async fn mount(&self, path: &str, input: &MountInput) -> Result<(), VaultError> {
        let body = serde_json::to_value(input)?;
        self.client
            .post_with_body(&sys_mount_path(path), &body)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MountLister for VaultApi {
    async fn list_mounts(&self) -> Result<HashMap<String, MountOutput>, VaultError> {
        let body = self.client.get("/v1/sys/mounts").await?.unwrap_or_default();
        parse_mounts(body)
    }
}

#[async_trait]
impl MountConfigGetter for VaultApi {
    async fn mount_config(&self, path: &str) -> Result<MountConfigOutput, VaultError> {
        let url = format!("{}/tune", sys_mount_path(path));
        let body = self.client.get(&url).await?.unwrap_or_default();
        serde_json::from_value(response_data(body))
            .map_err(|e| VaultError::Parse(format!("Failed to parse mount config: {}", e)))
    }
}

#[async_trait]
impl MountTuner for VaultApi {
    async fn tune_mount(&self, path: &str, input: MountConfigInput) -> Result<(), VaultError> {
        let url = format!("{}/tune", sys_mount_path(path));
        let body = serde_json::to_value(&input)?;
        self.client.post_with_body(&url, &body).await?;
        Ok(())
    }
}

#[async_trait]
impl MountWriter for VaultApi {
    async fn write(
        &self,
        client: &VaultClient,
        path: &str,
        data: Map<String, Value>,
    ) -> Result<Option<Secret>, VaultError> {
        let body = client
            .put_with_body(&logical_path(path), &Value::Object(data))
            .await?;
        parse_secret(body)
    }
}

#[async_trait]
impl MountReader for VaultApi {
    async fn read(&self, client: &VaultClient, path: &str) -> Result<Option<Secret>, VaultError> {
        match client.get(&logical_path(path)).await {
            Ok(body) => parse_secret(body),
            Err(VaultError::Api { status: 404, ref errors }) if errors.is_empty() => {
                debug!("Nothing stored at {}", path);
                Ok(None)
            }
            Err(VaultError::HttpStatus(404, _)) => {
                debug!("Nothing stored at {}", path);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Tokener for VaultApi {
    async fn create_token(
        &self,
        client: &VaultClient,
        request: &TokenCreateRequest,
    ) -> Result<Secret, VaultError> {
        let body = serde_json::to_value(request)?;
        let response = client.post_with_body("/v1/auth/token/create", &body).await?;
        Ok(parse_secret(response)?.unwrap_or_default())
    }
}

#[async_trait]
impl Revoker for VaultApi {
    async fn revoke(&self, client: &VaultClient, id: &str) -> Result<(), VaultError> {
        let body = json!({ "lease_id": id });
        client.put_with_body("/v1/sys/leases/revoke", &body).await?;
        Ok(())
    }
}

impl ConfigGetter for VaultApi {
    fn config(&self) -> &VaultApiConfig {
        &self.config
    }
}

impl ClientCreator for VaultApi {
    fn new_client(&self, config: &VaultApiConfig) -> Result<VaultClient, VaultError> {
        VaultClient::new(config)
    }
}

impl ClientGetter for VaultApi {
    fn client(&self) -> &VaultClient {
        &self.client
    }
}

impl TokenSetter for VaultApi {
    fn set_token(&self, client: &mut VaultClient, token: &str) {
        client.set_token(token);
    }
}
