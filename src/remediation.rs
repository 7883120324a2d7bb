//! User-facing error text.

use kion_client::Error;

/// The message printed for a failed command. Errors the user can fix with
/// another `kion` command get that command appended.
pub fn message(err: &anyhow::Error) -> String {
    let Some(kion) = err.downcast_ref::<Error>() else {
        return format!("{err:#}");
    };
    match kion {
        Error::NoStoredCredential { .. } => concat!(
            "no credentials; run \"kion login\" to store your password ",
            "or \"kion key create\" to create an app API key"
        )
        .to_string(),
        Error::InvalidCredentials => {
            "login failed; run \"kion login\" to update credentials".to_string()
        }
        Error::ApplicationKeyExpired => {
            "app API key expired; run \"kion key create --force\"".to_string()
        }
        Error::ApplicationKeyUnauthorized => {
            "app API key rejected by the platform; run \"kion key create --force\"".to_string()
        }
        other if other.requires_reauth() => {
            format!("{err:#}; run \"kion login\" or \"kion key create --force\"")
        }
        _ => format!("{err:#}"),
    }
}
