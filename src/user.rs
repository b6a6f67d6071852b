use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::REQUEST_TIMEOUT;
use crate::credentials::CachedAuth;
use crate::error::BystroError;
use crate::http::{build_client, decode_json, expect_ok, with_bearer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub options: Map<String, Value>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub accounts: Vec<String>,
    pub role: String,
    pub last_login: DateTime<Utc>,
}

pub trait UserClient: Send + Sync {
    fn profile(&self, auth: &CachedAuth) -> Result<UserProfile, BystroError>;
}

#[derive(Clone)]
pub struct UserHttpClient {
    client: Client,
}

impl UserHttpClient {
    pub fn new() -> Result<Self, BystroError> {
        Ok(Self {
            client: build_client()?,
        })
    }
}

impl UserClient for UserHttpClient {
    fn profile(&self, auth: &CachedAuth) -> Result<UserProfile, BystroError> {
        let url = auth.endpoint("/api/user/me");
        tracing::debug!(%url, "GET profile");
        let request = with_bearer(self.client.get(&url), auth)?.timeout(REQUEST_TIMEOUT);
        let response = request
            .send()
            .map_err(|err| BystroError::UserHttp(err.to_string()))?;
        let response = expect_ok(response)
            .map_err(|(status, message)| BystroError::UserStatus { status, message })?;
        decode_json(response)
    }
}
