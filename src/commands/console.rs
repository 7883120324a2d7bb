//! `console`: AWS console sign-in through the federation endpoint.

use std::path::PathBuf;

use anyhow::Context as _;
use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use kion_client::TemporaryCredentials;

use super::Context;
use super::credentials;

pub const FEDERATION_URL: &str = "https://signin.aws.amazon.com/federation";

const LOGOUT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
  <body>
    <script>
      var iframe = document.createElement("iframe");
      iframe.style = "visibility: hidden;";
      iframe.src = "https://signin.aws.amazon.com/oauth?Action=logout";
      iframe.onload = function () {
        window.location = {{ signin_url|tojson }};
      };
      document.body.appendChild(iframe);
    </script>
  </body>
</html>
"#;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FederationSession<'a> {
    session_id: &'a str,
    session_key: &'a str,
    session_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SigninTokenResponse {
    signin_token: String,
}

/// Exchange temporary credentials for a console sign-in token.
pub async fn signin_token(
    http: &reqwest::Client,
    federation: &Url,
    creds: &TemporaryCredentials,
) -> anyhow::Result<String> {
    let session = serde_json::to_string(&FederationSession {
        session_id: &creds.access_key_id,
        session_key: &creds.secret_access_key,
        session_token: &creds.session_token,
    })?;

    let mut url = federation.clone();
    url.query_pairs_mut()
        .append_pair("Action", "getSigninToken")
        .append_pair("Session", &session);

    let response = http
        .get(url)
        .send()
        .await
        .context("requesting console sign-in token")?;
    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("federation endpoint returned {status}");
    }
    let body: SigninTokenResponse = response
        .json()
        .await
        .context("decoding console sign-in token")?;
    Ok(body.signin_token)
}

/// The URL that signs the browser into the console for `region`.
pub fn login_url(federation: &Url, host: &str, region: &str, signin_token: &str) -> Url {
    let mut url = federation.clone();
    url.query_pairs_mut()
        .append_pair("Action", "login")
        .append_pair("Issuer", &format!("https://{host}/login"))
        .append_pair("Destination", &format!("https://{region}.console.aws.amazon.com"))
        .append_pair("SigninToken", signin_token);
    url
}

/// HTML page that signs out of any existing console session, then follows
/// `signin_url`.
pub fn logout_page(signin_url: &Url) -> anyhow::Result<String> {
    let mut env = Environment::new();
    env.add_template("logout.html", LOGOUT_TEMPLATE)?;
    let page = env
        .get_template("logout.html")?
        .render(context! { signin_url => signin_url.as_str() })?;
    Ok(page)
}

fn write_logout_page(page: &str) -> anyhow::Result<PathBuf> {
    let path = std::env::temp_dir().join(format!("kion-console-{}.html", std::process::id()));

    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        file.write_all(page.as_bytes())?;
    }

    #[cfg(not(unix))]
    std::fs::write(&path, page).with_context(|| format!("writing {}", path.display()))?;

    Ok(path)
}

pub async fn run(ctx: &Context, print: bool, logout: bool) -> anyhow::Result<()> {
    let config = ctx.config();
    let host = config.host()?;
    let region = config.region()?;

    let entry = credentials::fetch(ctx).await?;
    let federation = Url::parse(FEDERATION_URL)?;
    let token = signin_token(&reqwest::Client::new(), &federation, &entry.credentials).await?;
    let url = login_url(&federation, host, region, &token);

    if print {
        println!("{url}");
    } else if logout {
        let path = write_logout_page(&logout_page(&url)?)?;
        debug!(path = %path.display(), "Wrote console logout page");
        open::that(&path).with_context(|| format!("opening {}", path.display()))?;
    } else {
        open::that(url.as_str()).context("opening browser")?;
        info!(region, "Opened AWS console");
    }
    Ok(())
}
