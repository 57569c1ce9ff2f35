//! Shared fixtures for the integration tests: an in-memory Vault that implements
//! every capability trait, and a dev mode Vault container for the ignored tests.
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};
use vaulter::vault::mounts::{MountConfigInput, MountConfigOutput, MountInput, MountOutput};
use vaulter::vault::operations::{
    ClientCreator, ClientGetter, ConfigGetter, MountConfigGetter, MountLister, MountReader,
    MountTuner, MountWriter, Mounter, Revoker, TokenSetter, Tokener,
};
use vaulter::vault::pki::CA_MISSING_SUFFIX;
use vaulter::vault::{Secret, SecretAuth, TokenCreateRequest, VaultClient};
use vaulter::{VaultApiConfig, VaultError};

pub use vaulter::init_logging;

/// Parent token of the fake and of the dev container.
pub const ROOT_TOKEN: &str = "root";

fn api_error(status: u16, message: String) -> VaultError {
    VaultError::Api {
        status,
        errors: vec![message],
    }
}

fn ttl_seconds(ttl: &str) -> u64 {
    let (digits, unit) = match ttl.char_indices().last() {
        None => return 0,
        Some((i, 'h')) => (&ttl[..i], 3600),
        Some((i, 'm')) => (&ttl[..i], 60),
        Some((i, 's')) => (&ttl[..i], 1),
        Some(_) => (ttl, 1),
    };
    digits.parse::<u64>().unwrap_or(0) * unit
}

#[derive(Default)]
struct State {
    mounts: HashMap<String, MountOutput>,
    /// Remaining uses per token; `None` is unlimited.
    tokens: HashMap<String, Option<u32>>,
    next_tokens: VecDeque<String>,
    created_tokens: u32,
    secrets: HashMap<String, Map<String, Value>>,
    has_ca: bool,
    issued: u32,
    mount_calls: u32,
    revoked: Vec<String>,
}

impl State {
    fn use_token(&mut self, token: &str) -> Result<(), VaultError> {
        let remaining = match self.tokens.get_mut(token) {
            None => return Err(api_error(403, "permission denied".to_string())),
            Some(None) => return Ok(()),
            Some(Some(uses)) => {
                *uses -= 1;
                *uses
            }
        };
        if remaining == 0 {
            self.tokens.remove(token);
        }
        Ok(())
    }

    fn mount_type(&self, path: &str) -> Result<String, VaultError> {
        let first = path.split('/').next().unwrap_or_default();
        self.mounts
            .get(&format!("{}/", first))
            .map(|m| m.mount_type.clone())
            .ok_or_else(|| api_error(404, format!("no handler for route \"{}\"", path)))
    }

    /// Cubbyhole entries are private to the token that wrote them.
    fn storage_key(&self, token: &str, path: &str) -> Result<String, VaultError> {
        Ok(match self.mount_type(path)?.as_str() {
            "cubbyhole" => format!("{}:{}", token, path),
            _ => path.to_string(),
        })
    }

    fn pki_write(
        &mut self,
        path: &str,
        data: Map<String, Value>,
    ) -> Result<Option<Secret>, VaultError> {
        let (mount, rest) = path.split_once('/').unwrap_or((path, ""));
        if let Some(role) = rest.strip_prefix("issue/") {
            if !self.has_ca {
                return Err(api_error(400, CA_MISSING_SUFFIX.to_string()));
            }
            if !self.secrets.contains_key(&format!("{}/roles/{}", mount, role)) {
                return Err(api_error(400, format!("unknown role: {}", role)));
            }
            self.issued += 1;
            let serial = format!("3a:5f:00:{:02x}", self.issued);
            let common_name = data.get("common_name").cloned().unwrap_or(Value::Null);
            return Ok(Some(Secret {
                lease_id: format!("{}/{}", path, serial),
                data: Some(into_map(json!({
                    "certificate": format!("-----BEGIN CERTIFICATE-----\n{}\n-----END CERTIFICATE-----", common_name),
                    "issuing_ca": "-----BEGIN CERTIFICATE-----\nca\n-----END CERTIFICATE-----",
                    "serial_number": serial,
                }))),
                ..Default::default()
            }));
        }
        if rest == "root/generate/internal" {
            self.has_ca = true;
            return Ok(Some(Secret {
                data: Some(into_map(json!({
                    "certificate": "-----BEGIN CERTIFICATE-----\nca\n-----END CERTIFICATE-----",
                }))),
                ..Default::default()
            }));
        }
        self.secrets.insert(path.to_string(), data);
        Ok(None)
    }
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// An in-memory Vault. Tokens, mounts and secrets behave like the real server
/// for everything the library touches.
pub struct FakeVault {
    config: VaultApiConfig,
    client: VaultClient,
    state: Mutex<State>,
}

impl FakeVault {
    /// A server with only the system backend mounted.
    pub fn new() -> Self {
        let config = VaultApiConfig::new("127.0.0.1")
            .with_endpoint("http", "8200")
            .with_token(ROOT_TOKEN);
        let mut client = VaultClient::new(&config).expect("client for fake server");
        client.set_token(ROOT_TOKEN);

        let mut state = State::default();
        state.tokens.insert(ROOT_TOKEN.to_string(), None);
        state.mounts.insert(
            "sys/".to_string(),
            MountOutput {
                mount_type: "system".to_string(),
                description: "system endpoints used for control, policy and debugging".to_string(),
                ..Default::default()
            },
        );

        Self {
            config,
            client,
            state: Mutex::new(state),
        }
    }

    pub fn with_mount(self, path: &str, mount_type: &str) -> Self {
        self.state.lock().unwrap().mounts.insert(
            path.to_string(),
            MountOutput {
                mount_type: mount_type.to_string(),
                ..Default::default()
            },
        );
        self
    }

    /// Names handed out, in order, to the next child tokens.
    pub fn with_next_tokens(self, tokens: &[&str]) -> Self {
        self.state
            .lock()
            .unwrap()
            .next_tokens
            .extend(tokens.iter().map(|t| t.to_string()));
        self
    }

    pub fn mount_calls(&self) -> u32 {
        self.state.lock().unwrap().mount_calls
    }

    /// Remaining uses of `token`, `None` once it is spent or unknown.
    pub fn remaining_uses(&self, token: &str) -> Option<u32> {
        self.state.lock().unwrap().tokens.get(token).map(|u| u.unwrap_or(u32::MAX))
    }

    pub fn revoked(&self) -> Vec<String> {
        self.state.lock().unwrap().revoked.clone()
    }

    pub fn stored(&self, key: &str) -> Option<Map<String, Value>> {
        self.state.lock().unwrap().secrets.get(key).cloned()
    }
}

#[async_trait]
impl Mounter for FakeVault {
    async fn mount(&self, path: &str, input: &MountInput) -> Result<(), VaultError> {
        let mut state = self.state.lock().unwrap();
        state.use_token(self.client.token())?;
        state.mount_calls += 1;
        let key = format!("{}/", path.trim_matches('/'));
        if state.mounts.contains_key(&key) {
            return Err(api_error(400, format!("path is already in use at {}", key)));
        }
        let accessor = format!("{}_{:08x}", input.mount_type, state.mounts.len());
        state.mounts.insert(
            key,
            MountOutput {
                mount_type: input.mount_type.clone(),
                description: input.description.clone(),
                accessor,
                config: MountConfigOutput {
                    default_lease_ttl: ttl_seconds(&input.config.default_lease_ttl),
                    max_lease_ttl: ttl_seconds(&input.config.max_lease_ttl),
                    force_no_cache: false,
                },
                ..Default::default()
            },
        );
        Ok(())
    }
}

#[async_trait]
impl MountLister for FakeVault {
    async fn list_mounts(&self) -> Result<HashMap<String, MountOutput>, VaultError> {
        let mut state = self.state.lock().unwrap();
        state.use_token(self.client.token())?;
        Ok(state.mounts.clone())
    }
}

#[async_trait]
impl MountConfigGetter for FakeVault {
    async fn mount_config(&self, path: &str) -> Result<MountConfigOutput, VaultError> {
        let state = self.state.lock().unwrap();
        state
            .mounts
            .get(&format!("{}/", path.trim_matches('/')))
            .map(|m| m.config.clone())
            .ok_or_else(|| api_error(400, format!("cannot fetch sysview for path \"{}\"", path)))
    }
}

#[async_trait]
impl MountTuner for FakeVault {
    async fn tune_mount(&self, path: &str, input: MountConfigInput) -> Result<(), VaultError> {
        let mut state = self.state.lock().unwrap();
        let mount = state
            .mounts
            .get_mut(&format!("{}/", path.trim_matches('/')))
            .ok_or_else(|| api_error(400, format!("no mount entry found for \"{}\"", path)))?;
        if !input.default_lease_ttl.is_empty() {
            mount.config.default_lease_ttl = ttl_seconds(&input.default_lease_ttl);
        }
        if !input.max_lease_ttl.is_empty() {
            mount.config.max_lease_ttl = ttl_seconds(&input.max_lease_ttl);
        }
        Ok(())
    }
}

#[async_trait]
impl MountWriter for FakeVault {
    async fn write(
        &self,
        client: &VaultClient,
        path: &str,
        data: Map<String, Value>,
    ) -> Result<Option<Secret>, VaultError> {
        let mut state = self.state.lock().unwrap();
        state.use_token(client.token())?;
        if state.mount_type(path)? == "pki" {
            return state.pki_write(path, data);
        }
        let key = state.storage_key(client.token(), path)?;
        state.secrets.insert(key, data);
        Ok(None)
    }
}

#[async_trait]
impl MountReader for FakeVault {
    async fn read(&self, client: &VaultClient, path: &str) -> Result<Option<Secret>, VaultError> {
        let mut state = self.state.lock().unwrap();
        state.use_token(client.token())?;
        let key = state.storage_key(client.token(), path)?;
        Ok(state.secrets.get(&key).map(|data| Secret {
            data: Some(data.clone()),
            ..Default::default()
        }))
    }
}

#[async_trait]
impl Tokener for FakeVault {
    async fn create_token(
        &self,
        client: &VaultClient,
        request: &TokenCreateRequest,
    ) -> Result<Secret, VaultError> {
        let mut state = self.state.lock().unwrap();
        state.use_token(client.token())?;
        state.created_tokens += 1;
        let token = match state.next_tokens.pop_front() {
            Some(token) => token,
            None => format!("s.child{}", state.created_tokens),
        };
        let uses = (request.num_uses > 0).then_some(request.num_uses);
        state.tokens.insert(token.clone(), uses);
        Ok(Secret {
            auth: Some(SecretAuth {
                client_token: token,
                accessor: format!("accessor-{}", state.created_tokens),
                ..Default::default()
            }),
            ..Default::default()
        })
    }
}

#[async_trait]
impl Revoker for FakeVault {
    async fn revoke(&self, client: &VaultClient, id: &str) -> Result<(), VaultError> {
        let mut state = self.state.lock().unwrap();
        state.use_token(client.token())?;
        state.revoked.push(id.to_string());
        Ok(())
    }
}

impl ConfigGetter for FakeVault {
    fn config(&self) -> &VaultApiConfig {
        &self.config
    }
}

impl ClientCreator for FakeVault {
    fn new_client(&self, config: &VaultApiConfig) -> Result<VaultClient, VaultError> {
        VaultClient::new(config)
    }
}

impl ClientGetter for FakeVault {
    fn client(&self) -> &VaultClient {
        &self.client
    }
}

impl TokenSetter for FakeVault {
    fn set_token(&self, client: &mut VaultClient, token: &str) {
        client.set_token(token);
    }
}

/// Starts a dev mode Vault whose root token is [`ROOT_TOKEN`].
pub async fn setup_vault_container() -> ContainerAsync<GenericImage> {
    GenericImage::new("hashicorp/vault", "1.18.4")
        .with_exposed_port(8200.tcp())
        .with_wait_for(WaitFor::message_on_stdout("Vault server started!"))
        .with_env_var("VAULT_DEV_ROOT_TOKEN_ID", ROOT_TOKEN)
        .with_env_var("VAULT_DEV_LISTEN_ADDRESS", "0.0.0.0:8200")
        .with_cmd(vec!["server", "-dev", "-dev-root-token-id=root"])
        .start()
        .await
        .unwrap()
}
