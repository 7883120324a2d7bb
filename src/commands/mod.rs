//! Command implementations. Each submodule exposes a `run` that writes its
//! result to stdout; diagnostics go through `tracing` to stderr.

pub mod console;
pub mod credentials;
pub mod each;
pub mod key;
pub mod listing;
pub mod login;
pub mod setup;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use kion_client::storage::default_secret_store;
use kion_client::{
    CredentialBroker, CredentialCache, KeyFile, KeyLifecycleManager, KeyPolicy, SecretStore,
    Transport,
};

use crate::cli::{Commands, KeyCommands};
use crate::config::{self, Config};

/// Everything a command needs: the effective configuration, the secret
/// store passwords live in, and the directory holding the key file and
/// credential cache.
pub struct Context {
    config: Config,
    secrets: Arc<dyn SecretStore>,
    dir: PathBuf,
}

impl Context {
    /// Context with the default secret store and config directory.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        Ok(Self::in_dir(config, default_secret_store(), config::config_dir()?))
    }

    pub fn in_dir(config: Config, secrets: Arc<dyn SecretStore>, dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            secrets,
            dir: dir.into(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn secrets(&self) -> &Arc<dyn SecretStore> {
        &self.secrets
    }

    /// Transport for the configured host, or for `api_origin` when set.
    pub fn transport(&self) -> anyhow::Result<Transport> {
        Ok(match self.config.api_origin() {
            Some(origin) => Transport::with_origin(origin)?,
            None => Transport::new(self.config.host()?)?,
        })
    }

    pub fn key_file(&self) -> KeyFile {
        KeyFile::new(self.dir.join(config::KEY_FILE_NAME))
    }

    pub fn cache(&self) -> CredentialCache {
        CredentialCache::new(self.dir.join(config::CACHE_FILE_NAME))
    }

    pub fn broker(&self) -> anyhow::Result<CredentialBroker> {
        let broker = CredentialBroker::new(
            self.config.broker_settings()?,
            Arc::clone(&self.secrets),
            self.key_file(),
            self.cache(),
        )?;
        Ok(broker.with_transport(self.transport()?))
    }

    pub fn key_manager(&self) -> anyhow::Result<KeyLifecycleManager> {
        let policy = KeyPolicy::new(self.config.app_api_key_duration()?)
            .with_auto_rotate(self.config.rotate_app_api_keys());
        Ok(KeyLifecycleManager::new(self.key_file(), policy))
    }

    /// Keyring service name for the configured host and identity domain.
    pub fn keyring_service(&self) -> anyhow::Result<String> {
        Ok(kion_client::config::keyring_service(
            self.config.host()?,
            self.config.idms()?,
        ))
    }
}

pub async fn run(command: Commands, ctx: &Context) -> anyhow::Result<()> {
    match command {
        Commands::Setup => setup::run(ctx).await,
        Commands::Login => login::login(ctx).await,
        Commands::Logout => login::logout(ctx),
        Commands::Key { command } => match command {
            KeyCommands::Create { force } => key::create(ctx, force).await,
            KeyCommands::Rotate => key::rotate(ctx).await,
        },
        Commands::Credentials(args) => credentials::credentials(ctx, args.format).await,
        Commands::CredentialProcess(_) => credentials::credential_process(ctx).await,
        Commands::Console(args) => console::run(ctx, args.print, args.logout).await,
        Commands::Roles => listing::roles(ctx).await,
        Commands::Accounts => listing::accounts(ctx).await,
        Commands::Access(args) => listing::access(ctx, &args).await,
        Commands::Each(args) => each::run(ctx, &args).await,
    }
}
