//! `key create` and `key rotate`.

use tracing::debug;

use kion_client::{ApplicationKey, Error, KionClient};

use super::Context;
use super::login::prompt_until_accepted;

/// Create an app API key from a password login.
///
/// The stored password is used when there is one; otherwise the user is
/// prompted until the platform accepts a password.
pub async fn create(ctx: &Context, force: bool) -> anyhow::Result<()> {
    let mut keys = ctx.key_manager()?;
    if !force && keys.load()?.is_some() {
        return Err(Error::KeyAlreadyExists.into());
    }

    let config = ctx.config();
    let idms = config.idms()?;
    let username = config.username()?;
    let service = ctx.keyring_service()?;
    let transport = ctx.transport()?;

    let client = match ctx.secrets().get(&service, username)? {
        Some(password) => {
            debug!(store = ctx.secrets().name(), "Using stored password");
            KionClient::login(transport, idms, username, &password).await?
        }
        None => prompt_until_accepted(&transport, idms, username).await?.0,
    };

    let key = keys.create(&client, config.app_api_key_name(), force).await?;
    report("created", &key);
    Ok(())
}

pub async fn rotate(ctx: &Context) -> anyhow::Result<()> {
    let mut keys = ctx.key_manager()?;
    let Some(key) = keys.load()? else {
        anyhow::bail!("no app API key stored; run \"kion key create\"");
    };
    let rotated = keys.rotate(&ctx.transport()?, &key).await?;
    report("rotated", &rotated);
    Ok(())
}

fn report(action: &str, key: &ApplicationKey) {
    eprintln!(
        "App API key {action} (id {}), valid until {}.",
        key.id,
        key.expiry.to_rfc3339()
    );
}
