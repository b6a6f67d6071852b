use std::time::Duration;

use camino::Utf8PathBuf;
use directories::BaseDirs;

use crate::error::BystroError;

pub const CREDENTIALS_DIR_ENV: &str = "BYSTRO_DIR";
pub const STATE_FILE: &str = "bystro_authentication_token.json";

pub const AUTH_TIMEOUT: Duration = Duration::from_secs(30);
pub const LIST_JOBS_TIMEOUT: Duration = Duration::from_secs(120);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const PROTEOMICS_UPLOAD_TIMEOUT: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub credentials_dir: Utf8PathBuf,
}

impl ClientConfig {
    /// Resolves the credentials directory: explicit flag, then `BYSTRO_DIR`, then `~/.bystro`.
    pub fn resolve(dir: Option<&str>) -> Result<Self, BystroError> {
        let env_dir = std::env::var(CREDENTIALS_DIR_ENV).ok();
        Self::resolve_with(dir, env_dir.as_deref())
    }

    pub fn resolve_with<'a>(
        dir: Option<&'a str>,
        env_dir: Option<&'a str>,
    ) -> Result<Self, BystroError> {
        let non_empty = |value: Option<&'a str>| value.map(str::trim).filter(|v| !v.is_empty());
        let explicit = non_empty(dir).or_else(|| non_empty(env_dir));
        let credentials_dir = match explicit {
            Some(path) => Utf8PathBuf::from(path),
            None => default_credentials_dir()?,
        };
        Ok(Self { credentials_dir })
    }
}

pub fn default_credentials_dir() -> Result<Utf8PathBuf, BystroError> {
    BaseDirs::new()
        .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.home_dir().join(".bystro")).ok())
        .ok_or_else(|| {
            BystroError::Filesystem("unable to resolve home directory".to_string())
        })
}
