//! Child token issuance.

use crate::vault::operations::{ClientGetter, Tokener};
use crate::vault::VaultError;
use serde::Serialize;
use tracing::debug;

/// Uses granted to a child token: one to authenticate, one for a single read or write.
pub const CHILD_TOKEN_USES: u32 = 2;

/// Request body for `auth/token/create`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TokenCreateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policies: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub num_uses: u32,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// Creates a child of the token `t`'s client is bound to, limited to
/// [`CHILD_TOKEN_USES`] uses, and returns its client token.
///
/// A response without an auth block or with an empty client token is an error
/// even though the request itself succeeded.
pub async fn child_token<T: Tokener + ClientGetter + ?Sized>(t: &T) -> Result<String, VaultError> {
    let request = TokenCreateRequest {
        num_uses: CHILD_TOKEN_USES,
        ..Default::default()
    };
    let secret = t.create_token(t.client(), &request).await?;
    let auth = secret.auth.ok_or(VaultError::MissingAuth)?;
    if auth.client_token.is_empty() {
        return Err(VaultError::EmptyClientToken);
    }
    debug!("Created child token with accessor {}", auth.accessor);
    Ok(auth.client_token)
}
