//! `roles`, `accounts` and `access`.

use super::Context;
use crate::cli::AccessArgs;
use crate::output;

pub async fn roles(ctx: &Context) -> anyhow::Result<()> {
    let mut broker = ctx.broker()?;
    let roles = broker.client().await?.cloud_access_roles().await?;
    print!("{}", output::roles(&roles));
    Ok(())
}

pub async fn accounts(ctx: &Context) -> anyhow::Result<()> {
    let mut broker = ctx.broker()?;
    let accounts = broker.client().await?.accounts().await?;
    print!("{}", output::accounts(&accounts));
    Ok(())
}

pub async fn access(ctx: &Context, filter: &AccessArgs) -> anyhow::Result<()> {
    let mut broker = ctx.broker()?;
    let client = broker.client().await?;
    let roles = client.cloud_access_roles().await?;
    let accounts = client.accounts().await?;
    print!("{}", output::access(&output::access_entries(&roles, &accounts, filter)));
    Ok(())
}
