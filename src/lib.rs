//! vaulter - Vault mount, token scoped secret and PKI helpers
//!
//! This crate talks to a HashiCorp Vault server over its HTTP API. It provides
//! idempotent mount management, two-use child tokens, a secret store scoped to
//! the token that owns each secret, and PKI role, issuance and CA checks.
//!
//! ## Architecture
//!
//! - `vault` module - the library proper. Every helper is written against small
//!   capability traits (`vault::operations`) so it can be driven by a stub;
//!   `vault::VaultApi` implements them against a real server.
//! - `cli` module - the `vaulter` binary's argument parsing and commands.

pub mod cli;
pub mod vault;

pub use vault::{init_api, VaultApi, VaultApiConfig, VaultError};

/// Initialize logging for tests
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}
