//! Parsing for `oss://bucket/key-prefix` artifact URIs.

use url::Url;

use crate::{Error, Result};

/// URI scheme accepted by the OSS artifact repository.
pub const OSS_SCHEME: &str = "oss";

/// Parse an OSS URI into `(bucket, key_prefix)`.
///
/// `oss://my-bucket/some/run` → `("my-bucket", "some/run")`
///
/// The scheme is validated with [`Url`], but bucket and prefix are cut from
/// the raw string: the prefix is not percent-encoded and `.`/`..` segments,
/// trailing and repeated slashes are kept as given. Only the first leading
/// `/` of the path is removed, and any `?query` or `#fragment` is dropped.
pub fn parse_oss_uri(uri: &str) -> Result<(String, String)> {
    let parsed = Url::parse(uri).map_err(|source| Error::InvalidUri {
        uri: uri.to_string(),
        source,
    })?;
    if parsed.scheme() != OSS_SCHEME {
        return Err(Error::InvalidUriScheme {
            uri: uri.to_string(),
        });
    }
    let (_, rest) = uri.split_once(':').unwrap_or((uri, ""));
    let rest = rest.split(['?', '#']).next().unwrap_or_default();
    let (bucket, path) = match rest.strip_prefix("//") {
        Some(hier) => match hier.find('/') {
            Some(idx) => hier.split_at(idx),
            None => (hier, ""),
        },
        None => ("", rest),
    };
    let key_prefix = path.strip_prefix('/').unwrap_or(path).to_string();
    Ok((bucket.to_string(), key_prefix))
}

/// Check if a URI uses the `oss://` scheme.
pub fn is_oss_uri(uri: &str) -> bool {
    matches!(Url::parse(uri), Ok(url) if url.scheme() == OSS_SCHEME)
}
