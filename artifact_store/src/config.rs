//! OSS connection configuration.

use std::env;

use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::{de, Deserialize, Deserializer, Serialize};
use url::Url;

use crate::{Error, Result};

/// Prefix of the environment variables read by [`OssConfig::from_env`].
pub const ENV_PREFIX: &str = "MLFLOW_OSS_";

pub const ALIBABA_CLOUD_ACCESS_KEY_ID: &str = "ALIBABA_CLOUD_ACCESS_KEY_ID";
pub const ALIBABA_CLOUD_ACCESS_KEY_SECRET: &str = "ALIBABA_CLOUD_ACCESS_KEY_SECRET";
pub const ALIBABA_CLOUD_SECURITY_TOKEN: &str = "ALIBABA_CLOUD_SECURITY_TOKEN";
pub const ALIBABA_CLOUD_ECS_METADATA: &str = "ALIBABA_CLOUD_ECS_METADATA";

/// Endpoint and credential settings for an OSS artifact repository.
///
/// Environment variables map onto fields after stripping `MLFLOW_OSS_`, so
/// `MLFLOW_OSS_ENDPOINT_URL` sets `endpoint_url` and `MLFLOW_OSS_KEY_ID` sets
/// `key_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OssConfig {
    /// OSS endpoint, e.g. `https://oss-cn-hangzhou.aliyuncs.com`.
    #[serde(default, deserialize_with = "string_or_number")]
    pub endpoint_url: Option<String>,

    /// Signing region. Derived from the endpoint host when unset.
    #[serde(default, deserialize_with = "string_or_number")]
    pub region: Option<String>,

    #[serde(default, deserialize_with = "string_or_number")]
    pub key_id: Option<String>,

    #[serde(default, deserialize_with = "string_or_number")]
    pub key_secret: Option<String>,

    #[serde(default, deserialize_with = "string_or_number")]
    pub security_token: Option<String>,

    /// RAM role attached to the ECS instance, used when no key pair is set.
    #[serde(default, deserialize_with = "string_or_number")]
    pub ecs_role_name: Option<String>,

    /// Discover credentials from the ECS metadata service even without a
    /// role name.
    #[serde(default)]
    pub use_ecs_metadata: bool,

    #[serde(default)]
    pub allow_http: bool,
}

impl OssConfig {
    /// Load configuration from `MLFLOW_OSS_*` variables, falling back to the
    /// Alibaba Cloud credential variables for the key pair.
    pub fn from_env() -> Result<Self> {
        let config: OssConfig = Figment::new()
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()?;
        Ok(config.with_alibaba_cloud_env())
    }

    /// Load configuration from a YAML file. `MLFLOW_OSS_*` variables take
    /// precedence over the file.
    pub fn from_path(path: &str) -> Result<Self> {
        let config: OssConfig = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()?;
        Ok(config.with_alibaba_cloud_env())
    }

    fn with_alibaba_cloud_env(mut self) -> Self {
        if !self.has_key_pair() {
            if let (Ok(key_id), Ok(key_secret)) = (
                env::var(ALIBABA_CLOUD_ACCESS_KEY_ID),
                env::var(ALIBABA_CLOUD_ACCESS_KEY_SECRET),
            ) {
                self.key_id = Some(key_id);
                self.key_secret = Some(key_secret);
                self.security_token = env::var(ALIBABA_CLOUD_SECURITY_TOKEN)
                    .ok()
                    .or(self.security_token);
            }
        }
        if self.ecs_role_name.is_none() {
            if let Ok(role) = env::var(ALIBABA_CLOUD_ECS_METADATA) {
                self.use_ecs_metadata = true;
                if !role.is_empty() {
                    self.ecs_role_name = Some(role);
                }
            }
        }
        self
    }

    pub fn has_key_pair(&self) -> bool {
        matches!(
            (&self.key_id, &self.key_secret),
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty()
        )
    }

    pub fn validate(&self) -> Result<()> {
        self.endpoint().map(|_| ())
    }

    /// Parsed endpoint URL. A bare host such as `oss-cn-hangzhou.aliyuncs.com`
    /// is treated as `https://`.
    pub fn endpoint(&self) -> Result<Url> {
        let raw = self
            .endpoint_url
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or(Error::MissingEndpoint)?;
        let with_scheme = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("https://{raw}")
        };
        let url = Url::parse(&with_scheme).map_err(|source| Error::InvalidUri {
            uri: raw.to_string(),
            source,
        })?;
        if url.host_str().is_none() {
            return Err(Error::InvalidUri {
                uri: raw.to_string(),
                source: url::ParseError::EmptyHost,
            });
        }
        Ok(url)
    }

    /// Signing region: the configured one, or the endpoint's first host
    /// label (`oss-cn-hangzhou.aliyuncs.com` → `oss-cn-hangzhou`).
    pub fn region(&self) -> Result<String> {
        if let Some(region) = self.region.as_ref().filter(|r| !r.is_empty()) {
            return Ok(region.clone());
        }
        let endpoint = self.endpoint()?;
        let host = endpoint.host_str().unwrap_or_default();
        let label = host.split('.').next().unwrap_or(host);
        Ok(label.trim_end_matches("-internal").to_string())
    }
}

/// Environment values such as `MLFLOW_OSS_KEY_SECRET=1234567890` arrive as
/// numbers; keep them as their string form.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrNumber;

    impl<'de> de::Visitor<'de> for StringOrNumber {
        type Value = Option<String>;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("a string or a number")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(
            self,
            deserializer: D,
        ) -> std::result::Result<Self::Value, D::Error> {
            deserializer.deserialize_any(self)
        }
    }

    deserializer.deserialize_any(StringOrNumber)
}
