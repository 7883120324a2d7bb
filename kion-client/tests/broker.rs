//! End-to-end credential broker behaviour against a mock Kion API.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use kion_client::storage::MemorySecretStore;
use kion_client::{
    ApplicationKey, BrokerSettings, CacheKey, CachedCredential, CredentialBroker,
    CredentialCache, Error, KeyFile, SecretStore, TemporaryCredentials, Transport,
};
use wiremock::matchers::{any, body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOST: &str = "kion.example.com";
const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "status": 200, "message": "", "data": data
    }))
}

fn settings() -> BrokerSettings {
    let mut settings = BrokerSettings::new(HOST);
    settings.idms = Some(2);
    settings.username = Some("alice".into());
    settings.app_api_key_duration = Some(WEEK);
    settings
}

struct Fixture {
    dir: tempfile::TempDir,
    secrets: MemorySecretStore,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            secrets: MemorySecretStore::new(),
        }
    }

    fn key_file(&self) -> KeyFile {
        KeyFile::new(self.dir.path().join("key.json"))
    }

    fn cache(&self) -> CredentialCache {
        CredentialCache::new(self.dir.path().join("credential_cache.json"))
    }

    fn broker(&self, settings: BrokerSettings, server: &MockServer) -> CredentialBroker {
        CredentialBroker::new(
            settings,
            Arc::new(self.secrets.clone()),
            self.key_file(),
            self.cache(),
        )
        .unwrap()
        .with_transport(Transport::with_origin(&server.uri()).unwrap())
    }
}

async fn mount_temporary_credentials(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/api/v3/temporary-credentials/cloud-access-role"))
        .and(body_json(serde_json::json!({
            "account_number": "111122223333",
            "cloud_access_role_name": "admin"
        })))
        .respond_with(ok(serde_json::json!({
            "access_key": "ASIAFRESH",
            "secret_access_key": "fresh-secret",
            "session_token": "fresh-token"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_password_login_exchanges_once_and_caches() {
    let fixture = Fixture::new();
    fixture
        .secrets
        .set("kion.example.com/2", "alice", "hunter2")
        .unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/token"))
        .and(body_json(serde_json::json!({
            "idms": 2, "username": "alice", "password": "hunter2"
        })))
        .respond_with(ok(serde_json::json!({"access": {"token": "bearer-1"}})))
        .expect(1)
        .mount(&server)
        .await;
    mount_temporary_credentials(&server, 1).await;

    let mut broker = fixture.broker(settings(), &server);
    let before = Utc::now();
    let entry = broker
        .temporary_credentials("111122223333", "admin")
        .await
        .unwrap();

    assert_eq!(entry.credentials.access_key_id, "ASIAFRESH");
    assert_eq!(entry.credentials.secret_access_key, "fresh-secret");
    assert_eq!(entry.credentials.session_token, "fresh-token");
    assert!(entry.expiry >= before + TimeDelta::hours(1));
    assert!(entry.expiry <= Utc::now() + TimeDelta::hours(1));

    let key = CacheKey::new(HOST, 2, "alice", "111122223333", "admin");
    assert_eq!(fixture.cache().lookup(&key, Utc::now()).unwrap(), Some(entry));
}

#[tokio::test]
async fn test_fresh_cache_entry_makes_no_network_calls() {
    let fixture = Fixture::new();
    let cached = CachedCredential::new(
        TemporaryCredentials {
            access_key_id: "ASIACACHED".into(),
            secret_access_key: "cached-secret".into(),
            session_token: "cached-token".into(),
        },
        Utc::now() + TimeDelta::hours(1),
    );
    fixture
        .cache()
        .store(
            &CacheKey::new(HOST, 2, "alice", "111122223333", "admin"),
            &cached,
        )
        .unwrap();

    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let mut broker = fixture.broker(settings(), &server);
    let entry = broker
        .temporary_credentials("111122223333", "admin")
        .await
        .unwrap();
    assert_eq!(entry, cached);
}

#[tokio::test]
async fn test_expired_key_is_rotated_and_persisted_before_exchange() {
    let fixture = Fixture::new();
    let old_created = Utc::now() - TimeDelta::days(7) - TimeDelta::seconds(1);
    let old = ApplicationKey::new(1, "old-key", old_created, WEEK);
    assert!(old.expiry < Utc::now());
    fixture.key_file().save(&old).unwrap();

    let new_created = Utc::now();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/app-api-key/rotate"))
        .and(header("authorization", "Bearer old-key"))
        .and(body_json(serde_json::json!({"key": "old-key"})))
        .respond_with(ok(serde_json::json!({"id": 2, "key": "new-key"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/app-api-key/2"))
        .and(header("authorization", "Bearer new-key"))
        .respond_with(ok(serde_json::json!({
            "id": 2, "created_at": new_created.to_rfc3339()
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v3/temporary-credentials/cloud-access-role"))
        .and(header("authorization", "Bearer new-key"))
        .respond_with(ok(serde_json::json!({
            "access_key": "ASIAFRESH",
            "secret_access_key": "fresh-secret",
            "session_token": "fresh-token"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut settings = settings();
    settings.rotate_app_api_keys = true;
    let mut broker = fixture.broker(settings, &server);
    broker
        .temporary_credentials("111122223333", "admin")
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let paths: Vec<&str> = requests.iter().map(|r| r.url.path()).collect();
    assert_eq!(
        paths,
        [
            "/api/v3/app-api-key/rotate",
            "/api/v3/app-api-key/2",
            "/api/v3/temporary-credentials/cloud-access-role",
        ]
    );

    let stored = fixture.key_file().load().unwrap().unwrap();
    assert_eq!(stored.key, "new-key");
    assert_eq!(stored.id, 2);
    assert_eq!(stored.expiry, stored.created + TimeDelta::days(7));
}

#[tokio::test]
async fn test_rotated_key_is_persisted_even_if_exchange_fails() {
    let fixture = Fixture::new();
    let old = ApplicationKey::new(1, "old-key", Utc::now() - TimeDelta::days(6), WEEK);
    fixture.key_file().save(&old).unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/app-api-key/rotate"))
        .respond_with(ok(serde_json::json!({"id": 2, "key": "new-key"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/app-api-key/2"))
        .respond_with(ok(serde_json::json!({
            "id": 2, "created_at": Utc::now().to_rfc3339()
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v3/temporary-credentials/cloud-access-role"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "status": 403, "message": "No access to role", "data": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut settings = settings();
    settings.rotate_app_api_keys = true;
    let mut broker = fixture.broker(settings, &server);
    let err = broker
        .temporary_credentials("111122223333", "admin")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Platform { status: 403, .. }), "got {err:?}");

    assert_eq!(fixture.key_file().load().unwrap().unwrap().key, "new-key");
    let key = CacheKey::new(HOST, 2, "alice", "111122223333", "admin");
    assert_eq!(fixture.cache().lookup(&key, Utc::now()).unwrap(), None);
}

#[tokio::test]
async fn test_rejected_key_surfaces_as_application_key_unauthorized() {
    let fixture = Fixture::new();
    let old = ApplicationKey::new(1, "revoked-key", Utc::now() - TimeDelta::days(6), WEEK);
    fixture.key_file().save(&old).unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/app-api-key/rotate"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "status": 401, "message": "Unauthorized", "data": null
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_temporary_credentials(&server, 0).await;

    let mut settings = settings();
    settings.rotate_app_api_keys = true;
    let mut broker = fixture.broker(settings, &server);
    let err = broker
        .temporary_credentials("111122223333", "admin")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ApplicationKeyUnauthorized), "got {err:?}");
    assert_eq!(fixture.key_file().load().unwrap().unwrap().key, "revoked-key");
}

#[tokio::test]
async fn test_expired_key_without_auto_rotate_is_refused_locally() {
    let fixture = Fixture::new();
    let old = ApplicationKey::new(1, "old-key", Utc::now() - TimeDelta::days(8), WEEK);
    fixture.key_file().save(&old).unwrap();

    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let mut broker = fixture.broker(settings(), &server);
    let err = broker
        .temporary_credentials("111122223333", "admin")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ApplicationKeyExpired), "got {err:?}");
}

#[tokio::test]
async fn test_second_request_in_same_invocation_hits_cache() {
    let fixture = Fixture::new();
    fixture
        .key_file()
        .save(&ApplicationKey::new(5, "app-key", Utc::now(), WEEK))
        .unwrap();

    let server = MockServer::start().await;
    mount_temporary_credentials(&server, 1).await;

    let mut settings = settings();
    settings.session_duration = Duration::from_secs(30 * 60);
    let mut broker = fixture.broker(settings, &server);
    let first = broker
        .temporary_credentials("111122223333", "admin")
        .await
        .unwrap();
    let second = broker
        .temporary_credentials("111122223333", "admin")
        .await
        .unwrap();

    assert_eq!(first, second);
    assert!(first.expiry <= Utc::now() + TimeDelta::minutes(30));
    assert!(first.expiry > Utc::now() + TimeDelta::minutes(29));
}
