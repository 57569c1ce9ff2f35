//! PKI role, certificate and CA helpers.
//!
//! Every function takes the PKI mount path (usually [`DEFAULT_MOUNT`]) so several
//! PKI backends can be managed side by side. Apart from the role comparison and
//! the root CA probe these are straight writes to the mount.

use crate::vault::common::into_data;
use crate::vault::operations::{ClientGetter, MountReaderWriter, MountWriter, PkiChecker, PkiRevoker};
use crate::vault::{Secret, VaultError};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

pub const DEFAULT_MOUNT: &str = "pki";

/// Error text the server ends with when issuing from a mount that has no CA.
pub const CA_MISSING_SUFFIX: &str = "backend must be configured with a CA certificate/key";

/// Parameters for generating an intermediate CSR.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CsrConfig {
    pub common_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_names: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_bits: Option<u32>,
}

fn mount_path(mount: &str, rest: &str) -> String {
    format!("{}/{}", mount.trim_end_matches('/'), rest)
}

/// Creates or overwrites the role `role_name`.
///
/// `allow_subdomains` is sent as the string "true"/"false"; [`has_role`]
/// compares in that same string form.
pub async fn create_role<R: MountReaderWriter + ?Sized>(
    r: &R,
    mount: &str,
    role_name: &str,
    allowed_domains: &str,
    allow_subdomains: bool,
) -> Result<Option<Secret>, VaultError> {
    let path = mount_path(mount, &format!("roles/{}", role_name));
    let data = into_data(json!({
        "allowed_domains": allowed_domains,
        "allow_subdomains": allow_subdomains.to_string(),
    }));
    info!("Writing PKI role {}", path);
    r.write(r.client(), &path, data).await
}

/// Returns true if the role exists with exactly these settings.
///
/// A missing role, missing data or a missing or different field is `Ok(false)`.
/// Only a failed read is an error.
pub async fn has_role<R: MountReaderWriter + ?Sized>(
    r: &R,
    mount: &str,
    role_name: &str,
    allowed_domains: &str,
    allow_subdomains: bool,
) -> Result<bool, VaultError> {
    let path = mount_path(mount, &format!("roles/{}", role_name));
    let Some(secret) = r.read(r.client(), &path).await? else {
        return Ok(false);
    };
    let Some(data) = secret.data else {
        return Ok(false);
    };

    let domains = data.get("allowed_domains").and_then(domains_string);
    if domains.as_deref() != Some(allowed_domains) {
        debug!(
            "Role {} allowed_domains {:?} differs from {}",
            role_name, domains, allowed_domains
        );
        return Ok(false);
    }

    let subdomains = data.get("allow_subdomains").and_then(flag_string);
    if subdomains.as_deref() != Some(allow_subdomains.to_string().as_str()) {
        debug!(
            "Role {} allow_subdomains {:?} differs from {}",
            role_name, subdomains, allow_subdomains
        );
        return Ok(false);
    }
    Ok(true)
}

/// String form of a stored `allowed_domains`. Servers hand it back as a list.
fn domains_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_str())
            .collect::<Option<Vec<_>>>()
            .map(|domains| domains.join(",")),
        _ => None,
    }
}

/// String form of a stored boolean, which may come back native or as text.
fn flag_string(value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some(b.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Issues a certificate for `common_name` from `role_name` and returns the
/// server's response untouched.
pub async fn issue_certificate<W: ClientGetter + MountWriter + ?Sized>(
    w: &W,
    mount: &str,
    role_name: &str,
    common_name: &str,
) -> Result<Option<Secret>, VaultError> {
    let path = mount_path(mount, &format!("issue/{}", role_name));
    w.write(w.client(), &path, into_data(json!({ "common_name": common_name })))
        .await
}

/// Revokes the certificate (lease) identified by `id`.
pub async fn revoke_certificate<R: PkiRevoker + ?Sized>(r: &R, id: &str) -> Result<(), VaultError> {
    info!("Revoking {}", id);
    r.revoke(r.client(), id).await
}

/// Returns true if the mount has a root CA configured.
///
/// The server offers no direct query for this, so the probe issues a certificate
/// and reads the outcome: success means a CA exists, an error ending in
/// [`CA_MISSING_SUFFIX`] means it does not, anything else is a real failure.
/// A successful probe leaves an issued certificate behind.
pub async fn has_root_cert<M: PkiChecker + ?Sized>(
    m: &M,
    mount: &str,
    role_name: &str,
    common_name: &str,
) -> Result<bool, VaultError> {
    let config = m.config();
    let mut client = m.new_client(config)?;
    m.set_token(&mut client, &config.parent_token);

    let path = mount_path(mount, &format!("issue/{}", role_name));
    match m
        .write(&client, &path, into_data(json!({ "common_name": common_name })))
        .await
    {
        Ok(_) => Ok(true),
        Err(e) if e.to_string().ends_with(CA_MISSING_SUFFIX) => {
            debug!("No CA configured on {}", mount);
            Ok(false)
        }
        Err(e) => {
            warn!("Root CA probe on {} failed: {}", mount, e);
            Err(e)
        }
    }
}

/// Points the issuing certificate and CRL distribution URLs at
/// `<scheme>://<host_port>/v1/<mount>/{ca,crl}`.
pub async fn configure_ca_access<W: ClientGetter + MountWriter + ?Sized>(
    w: &W,
    scheme: &str,
    host_port: &str,
    mount: &str,
) -> Result<Option<Secret>, VaultError> {
    let base = format!("{}://{}/v1/{}", scheme, host_port, mount.trim_end_matches('/'));
    let data = into_data(json!({
        "issuing_certificates": format!("{}/ca", base),
        "crl_distribution_points": format!("{}/crl", base),
    }));
    w.write(w.client(), &mount_path(mount, "config/urls"), data)
        .await
}

/// Generates an intermediate CSR; the PEM is under `data.csr` of the result.
pub async fn generate_csr<W: ClientGetter + MountWriter + ?Sized>(
    w: &W,
    mount: &str,
    config: &CsrConfig,
) -> Result<Option<Secret>, VaultError> {
    let data = into_data(serde_json::to_value(config)?);
    w.write(
        w.client(),
        &mount_path(mount, "intermediate/generate/internal"),
        data,
    )
    .await
}

/// Imports a signed intermediate certificate.
pub async fn import_signed_certificate<W: ClientGetter + MountWriter + ?Sized>(
    w: &W,
    mount: &str,
    certificate: &str,
) -> Result<Option<Secret>, VaultError> {
    w.write(
        w.client(),
        &mount_path(mount, "intermediate/set-signed"),
        into_data(json!({ "certificate": certificate })),
    )
    .await
}

/// Generates a self-signed root CA whose key never leaves the server.
pub async fn generate_root<W: ClientGetter + MountWriter + ?Sized>(
    w: &W,
    mount: &str,
    common_name: &str,
    ttl: &str,
) -> Result<Option<Secret>, VaultError> {
    info!("Generating root CA {} on {}", common_name, mount);
    w.write(
        w.client(),
        &mount_path(mount, "root/generate/internal"),
        into_data(json!({ "common_name": common_name, "ttl": ttl })),
    )
    .await
}
