//! `login` and `logout`: the password in the secret store.

use tracing::info;

use kion_client::{Error, KionClient, Transport};

use super::Context;
use crate::prompt;

/// Prompt for a password until the platform accepts it.
///
/// Returns the authenticated client and the accepted password.
pub async fn prompt_until_accepted(
    transport: &Transport,
    idms: u32,
    username: &str,
) -> anyhow::Result<(KionClient, String)> {
    loop {
        let password = prompt::password(&format!("Password for {username}"))?;
        match KionClient::login(transport.clone(), idms, username, &password).await {
            Ok(client) => return Ok((client, password)),
            Err(Error::InvalidCredentials) => eprintln!("Invalid username or password, try again."),
            Err(e) => return Err(e.into()),
        }
    }
}

pub async fn login(ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.config();
    let idms = config.idms()?;
    let username = config.username()?;
    let service = ctx.keyring_service()?;

    let (_, password) = prompt_until_accepted(&ctx.transport()?, idms, username).await?;
    ctx.secrets().set(&service, username, &password)?;

    info!(service = %service, username, store = ctx.secrets().name(), "Password stored");
    eprintln!("Password for {username} stored.");
    Ok(())
}

pub fn logout(ctx: &Context) -> anyhow::Result<()> {
    let username = ctx.config().username()?;
    let service = ctx.keyring_service()?;
    ctx.secrets().delete(&service, username)?;

    info!(service = %service, username, "Password removed");
    eprintln!("Password for {username} removed.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use kion_client::SecretStore;
    use kion_client::storage::MemorySecretStore;

    use crate::config::Config;

    fn config() -> Config {
        Config {
            host: Some("kion.example.com".into()),
            idms: Some(2),
            username: Some("alice".into()),
            ..Config::default()
        }
    }

    #[test]
    fn test_logout_removes_stored_password() {
        let store = MemorySecretStore::with_secret("kion.example.com/2", "alice", "hunter2");
        let ctx = Context::in_dir(config(), Arc::new(store.clone()), "unused");

        logout(&ctx).unwrap();
        assert!(store.get("kion.example.com/2", "alice").unwrap().is_none());
    }

    #[test]
    fn test_logout_without_password_is_no_stored_credential() {
        let ctx = Context::in_dir(config(), Arc::new(MemorySecretStore::new()), "unused");
        let err = logout(&ctx).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::NoStoredCredential { .. })
        ));
    }

    #[test]
    fn test_logout_requires_username() {
        let mut config = config();
        config.username = None;
        let ctx = Context::in_dir(config, Arc::new(MemorySecretStore::new()), "unused");
        assert_eq!(
            logout(&ctx).unwrap_err().to_string(),
            "missing config value: username"
        );
    }
}
