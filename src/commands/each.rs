//! `each`: run a command once per account/role pair read from stdin.

use std::path::Path;

use anyhow::Context as _;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::info;

use kion_client::TemporaryCredentials;

use super::Context;
use crate::cli::EachArgs;

/// One `account role` line from stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub account_id: String,
    pub cloud_access_role: String,
}

/// Parse every line up front so a malformed one fails before any exchange.
/// Blank lines are skipped.
pub fn parse_targets(input: &str) -> anyhow::Result<Vec<Target>> {
    input
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| match line.split_whitespace().collect::<Vec<_>>()[..] {
            [account_id, cloud_access_role] => Ok(Target {
                account_id: account_id.to_string(),
                cloud_access_role: cloud_access_role.to_string(),
            }),
            _ => Err(anyhow::anyhow!(
                "invalid (needs two fields, account ID and Cloud Access Role): {line}"
            )),
        })
        .collect()
}

async fn run_one(shell: &Path, command: &str, creds: &TemporaryCredentials) -> anyhow::Result<()> {
    let status = Command::new(shell)
        .arg("-c")
        .arg(command)
        .env("AWS_ACCESS_KEY_ID", &creds.access_key_id)
        .env("AWS_SECRET_ACCESS_KEY", &creds.secret_access_key)
        .env("AWS_SESSION_TOKEN", &creds.session_token)
        .status()
        .await
        .with_context(|| format!("running {}", shell.display()))?;
    if !status.success() {
        anyhow::bail!("command failed: {status}");
    }
    Ok(())
}

pub async fn run(ctx: &Context, args: &EachArgs) -> anyhow::Result<()> {
    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("reading stdin")?;
    let targets = parse_targets(&input)?;

    let command = args.command.join(" ");
    let mut broker = ctx.broker()?;
    for target in &targets {
        let entry = broker
            .temporary_credentials(&target.account_id, &target.cloud_access_role)
            .await?;
        info!(
            account_id = %target.account_id,
            role = %target.cloud_access_role,
            "Running command"
        );
        run_one(&args.shell, &command, &entry.credentials)
            .await
            .with_context(|| format!("{} {}", target.account_id, target.cloud_access_role))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_targets() {
        let targets = parse_targets("111122223333 admin\n  444455556666\tread-only \n\n").unwrap();
        assert_eq!(
            targets,
            [
                Target {
                    account_id: "111122223333".into(),
                    cloud_access_role: "admin".into(),
                },
                Target {
                    account_id: "444455556666".into(),
                    cloud_access_role: "read-only".into(),
                },
            ]
        );
    }

    #[test]
    fn test_parse_targets_rejects_wrong_field_count() {
        for line in ["111122223333", "111122223333 admin extra"] {
            let err = parse_targets(&format!("444455556666 ok\n{line}\n")).unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("invalid (needs two fields, account ID and Cloud Access Role): {line}")
            );
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_one_sets_credentials_in_environment() {
        let creds = TemporaryCredentials {
            access_key_id: "ASIAEXAMPLE".into(),
            secret_access_key: "secret".into(),
            session_token: "token".into(),
        };
        run_one(
            Path::new("/bin/sh"),
            r#"test "$AWS_ACCESS_KEY_ID" = ASIAEXAMPLE && test "$AWS_SESSION_TOKEN" = token"#,
            &creds,
        )
        .await
        .unwrap();

        let err = run_one(Path::new("/bin/sh"), "exit 3", &creds).await.unwrap_err();
        assert!(err.to_string().contains("command failed"));
    }
}
