use crate::vault::{VaultApiConfig, VaultClient};
use std::time::Duration;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};
use tracing::{debug, info};

/// Root token of the dev mode container.
pub const DEV_ROOT_TOKEN: &str = "root";

/// A client for stubs that never touch the network.
pub fn test_client() -> VaultClient {
    VaultClient::new(&VaultApiConfig::default()).expect("default config builds a client")
}

/// Starts a dev mode Vault container with [`DEV_ROOT_TOKEN`] as its root token.
pub async fn setup_vault_container() -> ContainerAsync<GenericImage> {
    info!("Setting up Vault container in dev mode");

    let container = GenericImage::new("hashicorp/vault", "1.13.3")
        .with_exposed_port(8200.tcp())
        .with_wait_for(WaitFor::message_on_stdout("Vault server started!"))
        .with_env_var("VAULT_DEV_ROOT_TOKEN_ID", DEV_ROOT_TOKEN)
        .with_env_var("VAULT_DEV_LISTEN_ADDRESS", "0.0.0.0:8200")
        .with_cmd(vec!["server", "-dev", "-dev-root-token-id=root"])
        .start()
        .await
        .expect("Failed to start container");
    info!("Vault container started");
    container
}

/// Polls `/v1/sys/health` until the server answers as active or standby.
pub async fn wait_for_vault_ready(
    vault_addr: &str,
    max_retries: usize,
    retry_delay_ms: u64,
) -> Result<(), String> {
    let client = reqwest::Client::new();
    let health_url = format!("{}/v1/sys/health", vault_addr);

    info!("Waiting for Vault to be available at: {}", vault_addr);

    for attempt in 1..=max_retries {
        match client.get(&health_url).send().await {
            Ok(response) => match response.status().as_u16() {
                200 | 429 => {
                    info!("Vault ready after {} attempts", attempt);
                    return Ok(());
                }
                status => debug!("Vault not ready yet (status: {}), retrying...", status),
            },
            Err(e) => debug!("Connection to Vault failed (attempt {}): {}", attempt, e),
        }

        tokio::time::sleep(Duration::from_millis(retry_delay_ms)).await;
    }

    Err(format!("Vault not ready after {} attempts", max_retries))
}
