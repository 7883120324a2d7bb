use std::path::Path;
use std::time::Duration;

use assert_cmd::Command;
use assert_cmd::assert::OutputAssertExt;
use chrono::{TimeDelta, Utc};
use predicates::str::contains;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kion_client::{
    ApplicationKey, CacheKey, CachedCredential, CredentialCache, KeyFile, TemporaryCredentials,
};

const ENV_VARS: &[&str] = &[
    "KION_HOST",
    "KION_IDMS",
    "KION_USERNAME",
    "KION_APP_API_KEY_DURATION",
    "KION_APP_API_KEY_NAME",
    "KION_ROTATE_APP_API_KEYS",
    "KION_SESSION_DURATION",
    "KION_REGION",
    "KION_ACCOUNT_ID",
    "KION_CLOUD_ACCESS_ROLE",
    "KION_API_ORIGIN",
    "KION_LOG_LEVEL",
    "KION_LOG_JSON",
    "RUST_LOG",
];

/// `kion` isolated in `dir`: config directory and working directory both
/// point there, and no `KION_*` variables leak in from the environment.
fn kion(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("kion"));
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env("KION_CONFIG_DIR", dir).current_dir(dir);
    cmd
}

fn write_config(dir: &Path, extra: &str) {
    std::fs::write(
        dir.join("config.toml"),
        format!(
            r#"host = "kion.example.com"
idms = 2
username = "alice"
app_api_key_duration = "168h"
{extra}"#
        ),
    )
    .unwrap();
}

#[test]
fn test_cli_help() {
    let dir = tempfile::tempdir().unwrap();
    kion(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("credential-process"))
        .stdout(contains("console"));
}

#[test]
fn test_cli_version() {
    let dir = tempfile::tempdir().unwrap();
    kion(dir.path()).arg("--version").assert().success();
}

#[test]
fn test_missing_host_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    kion(dir.path())
        .args(["roles"])
        .assert()
        .failure()
        .stderr(contains("missing config value: host"));
}

#[test]
fn test_invalid_format_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    kion(dir.path())
        .args(["credentials", "-f", "yaml"])
        .assert()
        .failure()
        .stderr(contains("yaml"));
}

#[test]
fn test_malformed_config_names_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.toml"), "host = ").unwrap();
    kion(dir.path())
        .arg("accounts")
        .assert()
        .failure()
        .stderr(contains("config.toml"));
}

#[test]
fn test_credential_process_served_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    // Nothing listens on the discard port; any request would fail.
    write_config(dir.path(), "api_origin = \"http://127.0.0.1:9\"\n");

    let expiry = Utc::now() + TimeDelta::minutes(30);
    CredentialCache::new(dir.path().join("credential_cache.json"))
        .store(
            &CacheKey::new("kion.example.com", 2, "alice", "111122223333", "admin"),
            &CachedCredential::new(
                TemporaryCredentials {
                    access_key_id: "ASIACACHED".into(),
                    secret_access_key: "cached-secret".into(),
                    session_token: "cached-token".into(),
                },
                expiry,
            ),
        )
        .unwrap();

    let output = kion(dir.path())
        .args([
            "credential-process",
            "--account-id",
            "111122223333",
            "--cloud-access-role",
            "admin",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["Version"], 1);
    assert_eq!(json["AccessKeyId"], "ASIACACHED");
    assert_eq!(json["SecretAccessKey"], "cached-secret");
    assert_eq!(json["SessionToken"], "cached-token");
    let expiration = chrono::DateTime::parse_from_rfc3339(json["Expiration"].as_str().unwrap())
        .unwrap();
    assert_eq!(expiration.timestamp(), expiry.timestamp());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_credentials_export_with_app_api_key() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    write_config(dir.path(), &format!("api_origin = \"{}\"\n", server.uri()));
    KeyFile::new(dir.path().join("key.json"))
        .save(&ApplicationKey::new(
            5,
            "app-key",
            Utc::now(),
            Duration::from_secs(168 * 3600),
        ))
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/api/v3/temporary-credentials/cloud-access-role"))
        .and(header("authorization", "Bearer app-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": 200,
            "message": "",
            "data": {
                "access_key": "ASIAFRESH",
                "secret_access_key": "fresh-secret",
                "session_token": "fresh-token"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut cmd = kion(dir.path());
    cmd.args([
        "creds",
        "--account-id",
        "111122223333",
        "--cloud-access-role",
        "admin",
        "-f",
        "export",
    ]);
    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();
    output
        .assert()
        .success()
        .stdout(contains("export AWS_ACCESS_KEY_ID=ASIAFRESH\n"))
        .stdout(contains("export AWS_SESSION_TOKEN=fresh-token\n"));

    assert!(dir.path().join("credential_cache.json").exists());
}

#[test]
fn test_expired_key_without_rotation_suggests_recreate() {
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "api_origin = \"http://127.0.0.1:9\"\n");
    KeyFile::new(dir.path().join("key.json"))
        .save(&ApplicationKey::new(
            5,
            "app-key",
            Utc::now() - TimeDelta::days(8),
            Duration::from_secs(168 * 3600),
        ))
        .unwrap();

    kion(dir.path())
        .args(["credentials", "--account-id", "1", "--cloud-access-role", "admin"])
        .assert()
        .failure()
        .stderr(contains("kion key create --force"));
}

#[test]
fn test_each_rejects_malformed_line_before_any_exchange() {
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "api_origin = \"http://127.0.0.1:9\"\n");

    kion(dir.path())
        .args(["each", "true"])
        .write_stdin("111122223333 admin\n444455556666\n")
        .assert()
        .failure()
        .stderr(contains(
            "invalid (needs two fields, account ID and Cloud Access Role): 444455556666",
        ));
}
