//! # kion-client
//!
//! Rust client library for the Kion cloud-management API: password and
//! app API key authentication, app API key rotation, and temporary AWS
//! credentials with an on-disk cache.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kion_client::{BrokerSettings, CredentialBroker, CredentialCache, KeyFile, Result};
//! use kion_client::storage::MemorySecretStore;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<()> {
//!     let mut settings = BrokerSettings::new("kion.example.com");
//!     settings.idms = Some(1);
//!     settings.username = Some("alice".into());
//!
//!     let mut broker = CredentialBroker::new(
//!         settings,
//!         Arc::new(MemorySecretStore::with_secret("kion.example.com/1", "alice", "hunter2")),
//!         KeyFile::new("key.json"),
//!         CredentialCache::new("credential_cache.json"),
//!     )?;
//!
//!     let entry = broker.temporary_credentials("111122223333", "admin").await?;
//!     println!("{} (until {})", entry.credentials.access_key_id, entry.expiry);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `system-keyring` (default) - store passwords in the system keyring

pub mod auth;
pub mod broker;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod storage;
pub mod transport;

// Re-exports for ergonomic usage
pub use auth::{KeyLifecycleManager, KeyPolicy};
pub use broker::{BrokerSettings, CredentialBroker};
pub use client::{KionClient, identity_domains};
pub use error::{Error, FailureClass, Result, classify_failure};
pub use models::api::{Account, CloudAccessRole, IdentityDomain, TemporaryCredentials};
pub use models::auth::{ApplicationKey, KeyState, Session};
pub use models::cache::{CacheKey, CachedCredential};
pub use storage::{CredentialCache, KeyFile, SecretStore};
pub use transport::Transport;
