use std::path::Path;

use anyhow::{Context, Result};
use artifact_store::OssConfig;

/// Load OSS settings from `path` when given, otherwise from the
/// environment, and check that an endpoint is configured.
pub fn load(path: Option<&Path>) -> Result<OssConfig> {
    let config = match path {
        Some(path) => {
            let path_str = path
                .to_str()
                .with_context(|| format!("config path is not valid UTF-8: {}", path.display()))?;
            OssConfig::from_path(path_str)
                .with_context(|| format!("failed to load config from {}", path.display()))?
        }
        None => OssConfig::from_env().context("failed to load config from environment")?,
    };
    config.validate()?;
    Ok(config)
}
