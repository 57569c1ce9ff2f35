//! Trait definitions for Vault primitives.
//!
//! Every server primitive the orchestration helpers need gets its own small trait,
//! so a helper asks only for what it uses and a test can stub exactly that. The
//! composite traits at the bottom are blanket-implemented for anything that has all
//! of their parts.

use crate::vault::mounts::{MountConfigInput, MountConfigOutput, MountInput, MountOutput};
use crate::vault::tokens::TokenCreateRequest;
use crate::vault::{Secret, VaultApiConfig, VaultClient, VaultError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Mounts a backend engine at a path.
#[async_trait]
pub trait Mounter: Send + Sync {
    async fn mount(&self, path: &str, input: &MountInput) -> Result<(), VaultError>;
}

/// Lists mounted backends, keyed by path.
#[async_trait]
pub trait MountLister: Send + Sync {
    async fn list_mounts(&self) -> Result<HashMap<String, MountOutput>, VaultError>;
}

/// Reads the lease configuration of a mount.
#[async_trait]
pub trait MountConfigGetter: Send + Sync {
    async fn mount_config(&self, path: &str) -> Result<MountConfigOutput, VaultError>;
}

/// Updates the lease configuration of a mount.
#[async_trait]
pub trait MountTuner: Send + Sync {
    async fn tune_mount(&self, path: &str, input: MountConfigInput) -> Result<(), VaultError>;
}

/// Writes data to a path using the given client.
#[async_trait]
pub trait MountWriter: Send + Sync {
    async fn write(
        &self,
        client: &VaultClient,
        path: &str,
        data: Map<String, Value>,
    ) -> Result<Option<Secret>, VaultError>;
}

/// Reads data from a path using the given client. `None` means nothing is stored there.
#[async_trait]
pub trait MountReader: Send + Sync {
    async fn read(&self, client: &VaultClient, path: &str) -> Result<Option<Secret>, VaultError>;
}

/// Creates tokens that are children of the client's token.
#[async_trait]
pub trait Tokener: Send + Sync {
    async fn create_token(
        &self,
        client: &VaultClient,
        request: &TokenCreateRequest,
    ) -> Result<Secret, VaultError>;
}

/// Revokes a lease (e.g. an issued certificate) by id.
#[async_trait]
pub trait Revoker: Send + Sync {
    async fn revoke(&self, client: &VaultClient, id: &str) -> Result<(), VaultError>;
}

/// Access to the connection settings new clients are built from.
pub trait ConfigGetter {
    fn config(&self) -> &VaultApiConfig;
}

/// Builds new, unauthenticated clients.
pub trait ClientCreator {
    fn new_client(&self, config: &VaultApiConfig) -> Result<VaultClient, VaultError>;
}

/// Access to the long-lived client bound to the parent token.
pub trait ClientGetter {
    fn client(&self) -> &VaultClient;
}

/// Binds a client to a token.
pub trait TokenSetter {
    fn set_token(&self, client: &mut VaultClient, token: &str);
}

/// Writes through a fresh client bound to a caller supplied token.
pub trait ClientWriter: ClientCreator + ConfigGetter + TokenSetter + MountWriter {}
impl<T: ClientCreator + ConfigGetter + TokenSetter + MountWriter + ?Sized> ClientWriter for T {}

/// Reads through a fresh client bound to a caller supplied token.
pub trait ClientReader: ClientCreator + ConfigGetter + TokenSetter + MountReader {}
impl<T: ClientCreator + ConfigGetter + TokenSetter + MountReader + ?Sized> ClientReader for T {}

/// Probes for a configured root CA. Writing is intentional; see `pki::has_root_cert`.
pub trait PkiChecker: ClientCreator + ConfigGetter + TokenSetter + MountWriter {}
impl<T: ClientCreator + ConfigGetter + TokenSetter + MountWriter + ?Sized> PkiChecker for T {}

/// Revokes certificates with the parent client.
pub trait PkiRevoker: ClientGetter + Revoker {}
impl<T: ClientGetter + Revoker + ?Sized> PkiRevoker for T {}

/// Role related reads and writes with the parent client.
pub trait MountReaderWriter: ClientGetter + MountWriter + MountReader {}
impl<T: ClientGetter + MountWriter + MountReader + ?Sized> MountReaderWriter for T {}

/// Everything a real server offers.
pub trait Vaulter:
    Tokener
    + Mounter
    + MountLister
    + MountConfigGetter
    + MountTuner
    + ConfigGetter
    + ClientCreator
    + ClientGetter
    + TokenSetter
    + MountWriter
    + MountReader
    + Revoker
{
}
impl<T> Vaulter for T where
    T: Tokener
        + Mounter
        + MountLister
        + MountConfigGetter
        + MountTuner
        + ConfigGetter
        + ClientCreator
        + ClientGetter
        + TokenSetter
        + MountWriter
        + MountReader
        + Revoker
        + ?Sized
{
}
