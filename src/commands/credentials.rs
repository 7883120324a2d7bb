//! `credentials` and `credential-process`.

use tracing::debug;

use kion_client::CachedCredential;

use super::Context;
use crate::cli::CredentialsFormat;
use crate::output;

/// Credentials for the configured account and role, from the cache when
/// fresh.
pub async fn fetch(ctx: &Context) -> anyhow::Result<CachedCredential> {
    let account_id = ctx.config().account_id()?;
    let role = ctx.config().cloud_access_role()?;
    debug!(account_id, role, "Fetching temporary credentials");
    let mut broker = ctx.broker()?;
    Ok(broker.temporary_credentials(account_id, role).await?)
}

pub async fn credentials(ctx: &Context, format: CredentialsFormat) -> anyhow::Result<()> {
    let entry = fetch(ctx).await?;
    print!("{}", output::credentials(&entry.credentials, format)?);
    Ok(())
}

pub async fn credential_process(ctx: &Context) -> anyhow::Result<()> {
    let entry = fetch(ctx).await?;
    println!("{}", output::credential_process(&entry)?);
    Ok(())
}
