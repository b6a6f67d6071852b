use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::AUTH_TIMEOUT;
use crate::error::BystroError;
use crate::http::{build_client, decode_json, expect_ok};

/// Body returned by both the signup and the login endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

pub trait AuthClient: Send + Sync {
    fn signup(
        &self,
        base_url: &str,
        request: &SignupRequest<'_>,
    ) -> Result<TokenResponse, BystroError>;
    fn login(
        &self,
        base_url: &str,
        request: &LoginRequest<'_>,
    ) -> Result<TokenResponse, BystroError>;
}

#[derive(Clone)]
pub struct AuthHttpClient {
    client: Client,
}

impl AuthHttpClient {
    pub fn new() -> Result<Self, BystroError> {
        Ok(Self {
            client: build_client()?,
        })
    }

    pub fn signup_url(base_url: &str) -> String {
        format!("{base_url}/api/user")
    }

    pub fn login_url(base_url: &str) -> String {
        format!("{base_url}/api/user/auth/local")
    }
}

impl AuthClient for AuthHttpClient {
    fn signup(
        &self,
        base_url: &str,
        request: &SignupRequest<'_>,
    ) -> Result<TokenResponse, BystroError> {
        let url = Self::signup_url(base_url);
        tracing::debug!(%url, "PUT signup");
        let response = self
            .client
            .put(&url)
            .form(request)
            .timeout(AUTH_TIMEOUT)
            .send()
            .map_err(|err| BystroError::AuthHttp(err.to_string()))?;
        let response = expect_ok(response)
            .map_err(|(status, message)| BystroError::SignupStatus { status, message })?;
        decode_json(response)
    }

    fn login(
        &self,
        base_url: &str,
        request: &LoginRequest<'_>,
    ) -> Result<TokenResponse, BystroError> {
        let url = Self::login_url(base_url);
        tracing::debug!(%url, "POST login");
        let response = self
            .client
            .post(&url)
            .form(request)
            .timeout(AUTH_TIMEOUT)
            .send()
            .map_err(|err| BystroError::AuthHttp(err.to_string()))?;
        let response = expect_ok(response)
            .map_err(|(status, message)| BystroError::LoginStatus { status, message })?;
        decode_json(response)
    }
}
