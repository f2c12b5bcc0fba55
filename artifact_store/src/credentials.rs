//! Credential sources for OSS requests.
//!
//! A [`CredentialsProvider`] produces the current access key, secret and
//! optional security token. Static key pairs never change; the ECS RAM role
//! source returns rotating STS credentials and refreshes them before they
//! expire.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use object_store::aws::AwsCredential;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{config::OssConfig, Error, Result};

/// Base path of the ECS instance metadata credential endpoint.
pub const ECS_METADATA_CREDENTIALS_URL: &str =
    "http://100.100.100.200/latest/meta-data/ram/security-credentials/";

/// Credentials are refreshed this many minutes before they expire.
const REFRESH_MARGIN_MINUTES: i64 = 5;

const METADATA_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub security_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"***")
            .field("security_token", &self.security_token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[async_trait]
pub trait CredentialsProvider: fmt::Debug + Send + Sync {
    /// Return the credentials to sign the next request with.
    async fn credentials(&self) -> Result<Credentials>;
}

/// A fixed key pair.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    credentials: Credentials,
}

impl StaticCredentials {
    pub fn new(access_key_id: &str, access_key_secret: &str, security_token: Option<String>) -> Self {
        Self {
            credentials: Credentials {
                access_key_id: access_key_id.to_string(),
                access_key_secret: access_key_secret.to_string(),
                security_token,
            },
        }
    }
}

#[async_trait]
impl CredentialsProvider for StaticCredentials {
    async fn credentials(&self) -> Result<Credentials> {
        Ok(self.credentials.clone())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EcsCredentialsResponse {
    code: String,
    access_key_id: Option<String>,
    access_key_secret: Option<String>,
    security_token: Option<String>,
    expiration: Option<DateTime<Utc>>,
}

impl EcsCredentialsResponse {
    fn into_credentials(self) -> Result<(Credentials, Option<DateTime<Utc>>)> {
        if self.code != "Success" {
            return Err(Error::Credentials {
                reason: format!("metadata service returned code {}", self.code),
            });
        }
        match (self.access_key_id, self.access_key_secret) {
            (Some(access_key_id), Some(access_key_secret)) => Ok((
                Credentials {
                    access_key_id,
                    access_key_secret,
                    security_token: self.security_token,
                },
                self.expiration,
            )),
            _ => Err(Error::Credentials {
                reason: "metadata response is missing the access key".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedCredentials {
    credentials: Credentials,
    expiration: Option<DateTime<Utc>>,
}

impl CachedCredentials {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expiration {
            Some(expiration) => now + chrono::Duration::minutes(REFRESH_MARGIN_MINUTES) < expiration,
            None => true,
        }
    }
}

/// Rotating STS credentials served by the ECS instance metadata service for
/// the instance's RAM role.
#[derive(Debug)]
pub struct EcsRamRoleCredentials {
    base_url: String,
    role_name: Option<String>,
    client: reqwest::Client,
    cached: Mutex<Option<CachedCredentials>>,
}

impl EcsRamRoleCredentials {
    pub fn new(role_name: Option<String>) -> Result<Self> {
        Self::with_base_url(ECS_METADATA_CREDENTIALS_URL, role_name)
    }

    pub fn with_base_url(base_url: &str, role_name: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(METADATA_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.to_string(),
            role_name,
            client,
            cached: Mutex::new(None),
        })
    }

    async fn role_name(&self) -> Result<String> {
        if let Some(role) = &self.role_name {
            return Ok(role.clone());
        }
        let body = self
            .client
            .get(&self.base_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        body.lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::Credentials {
                reason: "no RAM role is attached to this instance".to_string(),
            })
    }

    async fn fetch(&self) -> Result<CachedCredentials> {
        let role = self.role_name().await?;
        let url = format!("{}{}", self.base_url, role);
        let response: EcsCredentialsResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let (credentials, expiration) = response.into_credentials()?;
        info!(%role, ?expiration, "fetched ECS RAM role credentials");
        Ok(CachedCredentials {
            credentials,
            expiration,
        })
    }
}

#[async_trait]
impl CredentialsProvider for EcsRamRoleCredentials {
    async fn credentials(&self) -> Result<Credentials> {
        let mut cached = self.cached.lock().await;
        if let Some(current) = cached.as_ref() {
            if current.is_fresh(Utc::now()) {
                return Ok(current.credentials.clone());
            }
            debug!("ECS RAM role credentials are about to expire, refreshing");
        }
        let fresh = self.fetch().await?;
        let credentials = fresh.credentials.clone();
        *cached = Some(fresh);
        Ok(credentials)
    }
}

/// Pick a credential source from `config`: an explicit key pair first, then
/// the ECS RAM role.
pub fn resolve_credentials(config: &OssConfig) -> Result<Arc<dyn CredentialsProvider>> {
    if let (true, Some(key_id), Some(key_secret)) =
        (config.has_key_pair(), &config.key_id, &config.key_secret)
    {
        return Ok(Arc::new(StaticCredentials::new(
            key_id,
            key_secret,
            config.security_token.clone(),
        )));
    }
    if config.ecs_role_name.is_some() || config.use_ecs_metadata {
        return Ok(Arc::new(EcsRamRoleCredentials::new(
            config.ecs_role_name.clone(),
        )?));
    }
    Err(Error::MissingCredentials)
}

/// Adapts a [`CredentialsProvider`] to the signer used by `object_store`.
#[derive(Debug)]
pub struct ObjectStoreCredentials {
    provider: Arc<dyn CredentialsProvider>,
}

impl ObjectStoreCredentials {
    pub fn new(provider: Arc<dyn CredentialsProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl object_store::CredentialProvider for ObjectStoreCredentials {
    type Credential = AwsCredential;

    async fn get_credential(&self) -> object_store::Result<Arc<AwsCredential>> {
        let credentials =
            self.provider
                .credentials()
                .await
                .map_err(|e| object_store::Error::Generic {
                    store: "OSS",
                    source: Box::new(e),
                })?;
        Ok(Arc::new(AwsCredential {
            key_id: credentials.access_key_id,
            secret_key: credentials.access_key_secret,
            token: credentials.security_token,
        }))
    }
}
