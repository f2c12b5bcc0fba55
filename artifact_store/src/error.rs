//! Error types for OSS artifact operations.

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Not an OSS URI: {uri}")]
    InvalidUriScheme { uri: String },

    #[error("Invalid URI '{uri}': {source}")]
    InvalidUri {
        uri: String,
        source: url::ParseError,
    },

    #[error(
        "Please set MLFLOW_OSS_KEY_ID and MLFLOW_OSS_KEY_SECRET, ALIBABA_CLOUD_ACCESS_KEY_ID and \
         ALIBABA_CLOUD_ACCESS_KEY_SECRET, or an ECS RAM role for credentials"
    )]
    MissingCredentials,

    #[error("Please set the MLFLOW_OSS_ENDPOINT_URL environment variable")]
    MissingEndpoint,

    #[error(
        "The path of the listed oss object does not begin with the specified artifact path. \
         Artifact path: {artifact_path}. Object path: {object_path}."
    )]
    ObjectPathMismatch {
        artifact_path: String,
        object_path: String,
    },

    #[error("{0} not implemented yet for Aliyun OSS")]
    NotImplemented(&'static str),

    #[error("Unsupported listing delimiter: {delimiter:?}")]
    UnsupportedDelimiter { delimiter: String },

    #[error("Failed to obtain credentials: {reason}")]
    Credentials { reason: String },

    #[error(transparent)]
    Config(#[from] figment::Error),

    #[error("Invalid object key: {0}")]
    InvalidKey(#[from] object_store::path::Error),

    #[error(transparent)]
    Storage(#[from] object_store::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

impl Error {
    /// Identifies storage errors caused by a missing remote object.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Storage(object_store::Error::NotFound { .. }))
    }
}
