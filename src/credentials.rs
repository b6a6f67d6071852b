use std::fs;
use std::io::{ErrorKind, Write};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tempfile::Builder;

use crate::config::STATE_FILE;
use crate::error::BystroError;

/// Session state persisted between invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedAuth {
    pub email: String,
    pub access_token: String,
    /// Fully qualified server URL, e.g. `https://bystro-dev.emory.edu:443`.
    #[serde(rename = "url")]
    pub base_url: String,
}

impl CachedAuth {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: Utf8PathBuf,
}

impl CredentialStore {
    pub fn new(dir: Utf8PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    pub fn state_path(&self) -> Utf8PathBuf {
        self.dir.join(STATE_FILE)
    }

    pub fn load(&self) -> Result<Option<CachedAuth>, BystroError> {
        let path = self.state_path();
        let content = match fs::read_to_string(path.as_std_path()) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(BystroError::CredentialsRead {
                    path: path.into_std_path_buf(),
                    source,
                });
            }
        };
        let auth = serde_json::from_str(&content)
            .map_err(|err| BystroError::CredentialsParse(err.to_string()))?;
        Ok(Some(auth))
    }

    /// Overwrites any previous session. Returns the path written.
    pub fn save(&self, auth: &CachedAuth) -> Result<Utf8PathBuf, BystroError> {
        fs::create_dir_all(self.dir.as_std_path())
            .map_err(|err| BystroError::Filesystem(err.to_string()))?;
        let path = self.state_path();
        let content = serde_json::to_vec(auth)
            .map_err(|err| BystroError::Filesystem(err.to_string()))?;
        let mut temp = Builder::new()
            .prefix("bystro-auth")
            .tempfile_in(self.dir.as_std_path())
            .map_err(|err| BystroError::Filesystem(err.to_string()))?;
        temp.write_all(&content)
            .map_err(|err| BystroError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| BystroError::Filesystem(err.to_string()))?;
        tracing::debug!(path = %path, "saved credentials");
        Ok(path)
    }

    pub fn authenticate(&self) -> Result<CachedAuth, BystroError> {
        self.load()?.ok_or(BystroError::NotLoggedIn)
    }
}
