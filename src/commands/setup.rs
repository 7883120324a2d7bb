//! `setup`: interactive first-run configuration.

use std::time::Duration;

use tracing::info;

use kion_client::config::keyring_service;
use kion_client::{Error, KeyLifecycleManager, KeyPolicy, KionClient, Transport, identity_domains};

use super::Context;
use crate::config::{self, Config};
use crate::prompt;

const DEFAULT_APP_API_KEY_DURATION: &str = "168h";
const DEFAULT_SESSION_DURATION: &str = "60m";

fn prompt_duration(message: &str, default: &str) -> anyhow::Result<(String, Duration)> {
    loop {
        let raw = prompt::text(message, Some(default))?;
        match humantime::parse_duration(&raw) {
            Ok(duration) => return Ok((raw, duration)),
            Err(e) => eprintln!("Invalid duration '{raw}': {e}"),
        }
    }
}

pub async fn run(ctx: &Context) -> anyhow::Result<()> {
    let config_path = ctx.dir().join(config::CONFIG_FILE_NAME);
    if config_path.exists()
        && !prompt::confirm(
            &format!("Config file '{}' exists; overwrite?", config_path.display()),
            false,
        )?
    {
        return Ok(());
    }

    let host = loop {
        let host = prompt::text("Kion host", None)?;
        if !host.is_empty() {
            break host;
        }
    };
    let transport = match ctx.config().api_origin() {
        Some(origin) => Transport::with_origin(origin)?,
        None => Transport::new(&host)?,
    };

    let domains = identity_domains(&transport).await?;
    if domains.is_empty() {
        anyhow::bail!("empty IDMS list");
    }
    let names: Vec<&str> = domains.iter().map(|d| d.name.as_str()).collect();
    let idms = domains[prompt::select("ID management system", &names, 0)?].id;

    let (username, password, client) = loop {
        let username = prompt::text("Username", None)?;
        if username.is_empty() {
            continue;
        }
        let password = prompt::password("Password")?;
        match KionClient::login(transport.clone(), idms, &username, &password).await {
            Ok(client) => break (username, password, client),
            Err(Error::InvalidCredentials) => eprintln!("Invalid credentials"),
            Err(e) => return Err(e.into()),
        }
    };

    let use_app_api_key = prompt::select(
        "Create app API key?",
        &[
            "Yes (recommended)",
            "No (user credentials will be saved in system keyring)",
        ],
        0,
    )? == 0;
    let rotate = prompt::confirm("Automatically rotate app API keys?", true)?;
    let (key_duration_raw, key_duration) =
        prompt_duration("Duration of app API keys", DEFAULT_APP_API_KEY_DURATION)?;
    let (session_duration_raw, _) =
        prompt_duration("Duration of temporary credentials", DEFAULT_SESSION_DURATION)?;

    if use_app_api_key {
        let mut keys = KeyLifecycleManager::new(
            ctx.key_file(),
            KeyPolicy::new(key_duration).with_auto_rotate(rotate),
        );
        let name = ctx.config().app_api_key_name();
        let key = keys.create(&client, name, true).await?;
        eprintln!("App API key created, valid until {}.", key.expiry.to_rfc3339());
    } else {
        ctx.secrets()
            .set(&keyring_service(&host, idms), &username, &password)?;
        eprintln!("Password stored in {}.", ctx.secrets().name());
    }

    let settings = Config {
        host: Some(host),
        idms: Some(idms),
        username: Some(username),
        app_api_key_duration: Some(key_duration_raw),
        rotate_app_api_keys: Some(rotate),
        session_duration: Some(session_duration_raw),
        ..Config::default()
    };
    settings.save(&config_path)?;

    info!(path = %config_path.display(), "Wrote config");
    eprintln!("Wrote {}.", config_path.display());
    Ok(())
}
