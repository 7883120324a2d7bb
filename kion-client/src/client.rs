//! Authenticated Kion API client.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::Result;
use crate::models::api::{
    Account, AppApiKey, AppApiKeyMetadata, CloudAccessRole, CreateAppApiKeyRequest,
    IdentityDomain, LoginRequest, LoginResponse, RotateAppApiKeyRequest, TemporaryCredentials,
    TemporaryCredentialsRequest,
};
use crate::models::auth::Session;
use crate::transport::Transport;

/// List the identity domains (IDMSs) of a host. Unauthenticated.
pub async fn identity_domains(transport: &Transport) -> Result<Vec<IdentityDomain>> {
    transport.get(None, "v2/idms").await
}

/// A [`Session`] bound to the transport it talks through.
///
/// # Examples
///
/// ```rust,no_run
/// use kion_client::{KionClient, Transport};
///
/// # async fn example() -> kion_client::Result<()> {
/// let transport = Transport::new("kion.example.com")?;
/// let client = KionClient::login(transport, 1, "alice", "hunter2").await?;
/// for role in client.cloud_access_roles().await? {
///     println!("{}\t{}", role.account_number, role.name);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct KionClient {
    transport: Transport,
    session: Session,
}

impl KionClient {
    /// Exchange a username and password for a bearer token.
    ///
    /// The returned session has no local expiry.
    pub async fn login(
        transport: Transport,
        idms: u32,
        username: &str,
        password: &str,
    ) -> Result<Self> {
        let host = host_of(&transport);
        let request = LoginRequest {
            idms,
            username,
            password,
        };
        let response: LoginResponse = transport.post(None, "v3/token", &request).await?;
        info!(host = %host, idms, username, "Logged in with password");

        Ok(Self {
            transport,
            session: Session::from_password_login(host, response.access.token),
        })
    }

    /// Wrap an app API key. No request is made.
    pub fn with_application_key(
        transport: Transport,
        key: impl Into<String>,
        expiry: Option<DateTime<Utc>>,
    ) -> Self {
        let host = host_of(&transport);
        Self {
            transport,
            session: Session::with_application_key(host, key, expiry),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Cloud access roles available to the current user.
    pub async fn cloud_access_roles(&self) -> Result<Vec<CloudAccessRole>> {
        self.transport
            .get(Some(self.session.token()), "v3/me/cloud-access-role")
            .await
    }

    /// Accounts visible to the current user.
    pub async fn accounts(&self) -> Result<Vec<Account>> {
        self.transport
            .get(Some(self.session.token()), "v3/account")
            .await
    }

    /// Create a new app API key owned by the current user.
    pub async fn create_app_api_key(&self, name: &str) -> Result<AppApiKey> {
        let key: AppApiKey = self
            .transport
            .post(
                Some(self.session.token()),
                "v3/app-api-key",
                &CreateAppApiKeyRequest { name },
            )
            .await?;
        info!(key_id = key.id, name, "Created app API key");
        Ok(key)
    }

    /// Rotate `key`, returning its replacement. `key` stops working.
    pub async fn rotate_app_api_key(&self, key: &str) -> Result<AppApiKey> {
        let rotated: AppApiKey = self
            .transport
            .post(
                Some(self.session.token()),
                "v3/app-api-key/rotate",
                &RotateAppApiKeyRequest { key },
            )
            .await?;
        info!(key_id = rotated.id, "Rotated app API key");
        Ok(rotated)
    }

    /// Metadata (notably the creation time) of an app API key.
    pub async fn app_api_key_metadata(&self, id: u64) -> Result<AppApiKeyMetadata> {
        self.transport
            .get(Some(self.session.token()), &format!("v3/app-api-key/{id}"))
            .await
    }

    /// Temporary AWS credentials for an account and cloud access role.
    pub async fn temporary_credentials(
        &self,
        account_id: &str,
        cloud_access_role: &str,
    ) -> Result<TemporaryCredentials> {
        debug!(account_id, role = cloud_access_role, "Requesting temporary credentials");
        self.transport
            .post(
                Some(self.session.token()),
                "v3/temporary-credentials/cloud-access-role",
                &TemporaryCredentialsRequest {
                    account_number: account_id,
                    cloud_access_role_name: cloud_access_role,
                },
            )
            .await
    }
}

fn host_of(transport: &Transport) -> String {
    let url = transport.base_url();
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}
