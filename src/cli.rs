use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use crate::vault::cubbyhole::ScopedSecretStore;
use crate::vault::mounts::{self, MountConfiguration};
use crate::vault::operations::{ClientGetter, ConfigGetter, Vaulter};
use crate::vault::{child_token, init_api, pki, VaultApi, VaultApiConfig};

/// Mount path and description used by the cubbyhole round trip.
pub const CUBBYHOLE_PATH: &str = "cubbyhole/";
pub const CUBBYHOLE_DESCRIPTION: &str = "A cubbyhole mount for configs";

#[derive(Parser)]
#[command(
    name = "vaulter",
    about = "Vault mounts, token scoped secrets and PKI checks",
    version = "0.1.0"
)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the server is and how to authenticate to it.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Parent token; child tokens are created under it.
    #[arg(long, env = "VAULT_TOKEN", global = true, hide_env_values = true, default_value = "")]
    pub token: String,
    /// Vault server host.
    #[arg(long, env = "VAULT_HOST", global = true, default_value = "127.0.0.1")]
    pub host: String,
    /// Vault server port.
    #[arg(long, env = "VAULT_PORT", global = true, default_value = "8200")]
    pub port: String,
    /// "http" or "https".
    #[arg(long, env = "VAULT_SCHEME", global = true, default_value = "https")]
    pub scheme: String,
    /// PEM CA certificate used to verify the server.
    #[arg(long, env = "VAULT_CACERT", global = true)]
    pub ca_cert: Option<String>,
    /// PEM client certificate for mTLS.
    #[arg(long, env = "VAULT_CLIENT_CERT", global = true)]
    pub client_cert: Option<String>,
    /// PEM PKCS#8 client key for mTLS.
    #[arg(long, env = "VAULT_CLIENT_KEY", global = true)]
    pub client_key: Option<String>,
    /// Enterprise namespace.
    #[arg(long, env = "VAULT_NAMESPACE", global = true)]
    pub namespace: Option<String>,
}

impl ConnectionArgs {
    pub fn to_config(&self) -> VaultApiConfig {
        let config = VaultApiConfig::new(&self.host)
            .with_token(&self.token)
            .with_endpoint(&self.scheme, &self.port)
            .with_tls(
                self.ca_cert.as_deref(),
                self.client_cert.as_deref(),
                self.client_key.as_deref(),
            );
        match &self.namespace {
            Some(namespace) => config.with_namespace(namespace),
            None => config,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List mounted backends.
    Mounts,
    /// Mount a backend unless it is already mounted.
    Mount {
        /// Mount path, e.g. "pki/".
        path: String,
        /// Backend type, e.g. "pki" or "cubbyhole".
        #[arg(long = "type")]
        mount_type: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        default_lease_ttl: String,
        #[arg(long, default_value = "")]
        max_lease_ttl: String,
    },
    /// Show or change the lease TTLs of a mount.
    Tune {
        path: String,
        /// New default lease TTL. Shows the current values if neither TTL is given.
        #[arg(long)]
        default_lease_ttl: Option<String>,
        #[arg(long)]
        max_lease_ttl: Option<String>,
    },
    /// Create a child token limited to two uses.
    ChildToken,
    /// Store a value under a fresh child token and read it back once.
    Cubbyhole {
        #[arg(long, default_value = "config")]
        key: String,
        #[arg(long)]
        value: String,
    },
    /// PKI role, issuance and CA checks.
    Pki {
        /// PKI mount path.
        #[arg(long, default_value = pki::DEFAULT_MOUNT, global = true)]
        mount: String,
        #[command(subcommand)]
        command: PkiCommands,
    },
}

#[derive(Subcommand)]
pub enum PkiCommands {
    /// Create the role, or report that it already matches.
    Role {
        name: String,
        #[arg(long)]
        allowed_domains: String,
        #[arg(long)]
        allow_subdomains: bool,
    },
    /// Report whether the mount has a root CA.
    HasRootCert {
        #[arg(long)]
        role: String,
        #[arg(long)]
        common_name: String,
    },
    /// Issue a certificate and print the response.
    Issue {
        #[arg(long)]
        role: String,
        #[arg(long)]
        common_name: String,
    },
    /// Revoke a lease by id.
    Revoke { id: String },
    /// Point the issuing CA and CRL URLs at this server.
    ConfigUrls,
}

/// Result of [`cubbyhole_round_trip`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTrip {
    pub token: String,
    pub value: String,
    /// Whether this run had to mount the cubbyhole.
    pub mounted: bool,
}

/// Creates a child token, makes sure the cubbyhole is mounted, writes `key` under
/// the token and reads it back. The child token has no uses left afterwards.
pub async fn cubbyhole_round_trip<V: Vaulter + ?Sized>(
    v: &V,
    key: &str,
    value: &str,
) -> Result<RoundTrip> {
    let token = child_token(v).await.context("creating child token")?;
    let config = MountConfiguration::new("cubbyhole", CUBBYHOLE_DESCRIPTION);
    let mounted = mounts::ensure_mounted(v, CUBBYHOLE_PATH, &config)
        .await
        .context("ensuring cubbyhole mount")?;

    let store = ScopedSecretStore::default();
    store.write(v, &token, key, value).await?;
    let read = store.read(v, &token, key).await?;
    if read != value {
        return Err(anyhow!("read back {:?}, wrote {:?}", read, value));
    }
    Ok(RoundTrip {
        token,
        value: read,
        mounted,
    })
}

pub async fn run_cli() -> Result<()> {
    run(Cli::parse()).await
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = cli.connection.to_config();
    let token = config.parent_token.clone();
    let api = init_api(config, &token)?;
    info!("Using Vault at {}", api.client().addr);

    match cli.command {
        Commands::Mounts => {
            let mut listed: Vec<_> = mounts::list_mounts(&api).await?.into_iter().collect();
            listed.sort_by(|a, b| a.0.cmp(&b.0));
            for (path, mount) in listed {
                println!("{:<24} {:<12} {}", path, mount.mount_type, mount.description);
            }
        }
        Commands::Mount {
            path,
            mount_type,
            description,
            default_lease_ttl,
            max_lease_ttl,
        } => {
            let config = MountConfiguration::new(&mount_type, &description)
                .with_lease_ttls(&default_lease_ttl, &max_lease_ttl);
            if mounts::ensure_mounted(&api, &path, &config).await? {
                println!("Mounted {} at {}", mount_type, path);
            } else {
                println!("{} is already mounted", path);
            }
        }
        Commands::Tune {
            path,
            default_lease_ttl,
            max_lease_ttl,
        } => {
            if default_lease_ttl.is_some() || max_lease_ttl.is_some() {
                mounts::tune_mount(
                    &api,
                    &path,
                    default_lease_ttl.as_deref().unwrap_or_default(),
                    max_lease_ttl.as_deref().unwrap_or_default(),
                )
                .await?;
            }
            let current = mounts::mount_config(&api, &path).await?;
            println!(
                "default_lease_ttl={} max_lease_ttl={} force_no_cache={}",
                current.default_lease_ttl, current.max_lease_ttl, current.force_no_cache
            );
        }
        Commands::ChildToken => {
            println!("{}", child_token(&api).await?);
        }
        Commands::Cubbyhole { key, value } => {
            let trip = cubbyhole_round_trip(&api, &key, &value).await?;
            if trip.mounted {
                println!("Mounted cubbyhole at {}", CUBBYHOLE_PATH);
            }
            println!("Stored and read back {} under a child token", key);
            // The token is spent, so a further read must be rejected.
            match ScopedSecretStore::default().read(&api, &trip.token, &key).await {
                Ok(_) => return Err(anyhow!("child token still readable after its last use")),
                Err(e) => info!("Spent token rejected as expected: {}", e),
            }
        }
        Commands::Pki { mount, command } => run_pki(&api, &mount, command).await?,
    }
    Ok(())
}

async fn run_pki(api: &VaultApi, mount: &str, command: PkiCommands) -> Result<()> {
    match command {
        PkiCommands::Role {
            name,
            allowed_domains,
            allow_subdomains,
        } => {
            if pki::has_role(api, mount, &name, &allowed_domains, allow_subdomains).await? {
                println!("Role {} is up to date", name);
            } else {
                pki::create_role(api, mount, &name, &allowed_domains, allow_subdomains).await?;
                println!("Wrote role {}", name);
            }
        }
        PkiCommands::HasRootCert { role, common_name } => {
            let present = pki::has_root_cert(api, mount, &role, &common_name).await?;
            println!("{}", present);
        }
        PkiCommands::Issue { role, common_name } => {
            let secret = pki::issue_certificate(api, mount, &role, &common_name)
                .await?
                .ok_or_else(|| anyhow!("server returned no certificate"))?;
            println!("{}", serde_json::to_string_pretty(&secret)?);
        }
        PkiCommands::Revoke { id } => {
            if let Err(e) = pki::revoke_certificate(api, &id).await {
                error!("Revocation of {} failed", id);
                return Err(e.into());
            }
            println!("Revoked {}", id);
        }
        PkiCommands::ConfigUrls => {
            let config = api.config();
            pki::configure_ca_access(api, &config.scheme, &config.host_port(), mount).await?;
            println!("Configured CA and CRL URLs for {}", mount);
        }
    }
    Ok(())
}
