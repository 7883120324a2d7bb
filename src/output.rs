//! Text renderings of command results. Everything here goes to stdout.

use chrono::SecondsFormat;
use serde::Serialize;

use kion_client::{Account, CachedCredential, CloudAccessRole, TemporaryCredentials};

use crate::cli::{AccessArgs, CredentialsFormat};

/// Credentials in the requested format, newline-terminated.
pub fn credentials(creds: &TemporaryCredentials, format: CredentialsFormat) -> anyhow::Result<String> {
    Ok(match format {
        CredentialsFormat::Aws => format!(
            "aws_access_key_id = {}\naws_secret_access_key = {}\naws_session_token = {}\n",
            creds.access_key_id, creds.secret_access_key, creds.session_token
        ),
        CredentialsFormat::Export => format!(
            "export AWS_ACCESS_KEY_ID={}\nexport AWS_SECRET_ACCESS_KEY={}\nexport AWS_SESSION_TOKEN={}\n",
            creds.access_key_id, creds.secret_access_key, creds.session_token
        ),
        CredentialsFormat::Json => format!("{}\n", serde_json::to_string(creds)?),
    })
}

/// Payload for the AWS CLI `credential_process` protocol.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CredentialProcessOutput<'a> {
    version: u8,
    access_key_id: &'a str,
    secret_access_key: &'a str,
    session_token: &'a str,
    expiration: String,
}

pub fn credential_process(entry: &CachedCredential) -> anyhow::Result<String> {
    let output = CredentialProcessOutput {
        version: 1,
        access_key_id: &entry.credentials.access_key_id,
        secret_access_key: &entry.credentials.secret_access_key,
        session_token: &entry.credentials.session_token,
        expiration: entry.expiry.to_rfc3339_opts(SecondsFormat::Secs, true),
    };
    Ok(serde_json::to_string(&output)?)
}

pub fn roles(roles: &[CloudAccessRole]) -> String {
    roles
        .iter()
        .map(|role| format!("{}\t{}\n", role.account_number, role.name))
        .collect()
}

pub fn accounts(accounts: &[Account]) -> String {
    accounts
        .iter()
        .map(|account| format!("{}\t{}\n", account.account_number, account.account_name))
        .collect()
}

/// A role joined with the name of the account it lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessEntry {
    pub role: String,
    pub account_number: String,
    pub account_name: String,
}

/// Join roles with account names and apply the `access` filters.
///
/// Roles whose account is not visible get an empty account name rather
/// than being dropped.
pub fn access_entries(
    roles: &[CloudAccessRole],
    accounts: &[Account],
    filter: &AccessArgs,
) -> Vec<AccessEntry> {
    roles
        .iter()
        .map(|role| AccessEntry {
            role: role.name.clone(),
            account_number: role.account_number.clone(),
            account_name: accounts
                .iter()
                .find(|a| a.account_number == role.account_number)
                .map(|a| a.account_name.clone())
                .unwrap_or_default(),
        })
        .filter(|entry| {
            filter.account.as_deref().is_none_or(|name| entry.account_name == name)
                && filter
                    .account_id
                    .as_deref()
                    .is_none_or(|id| entry.account_number == id)
                && filter
                    .cloud_access_role
                    .as_deref()
                    .is_none_or(|role| entry.role == role)
        })
        .collect()
}

pub fn access(entries: &[AccessEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{}\t{}\t{}\n", e.role, e.account_number, e.account_name))
        .collect()
}
