use std::path::Path;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;

use crate::credentials::CachedAuth;
use crate::error::BystroError;

const OCTET_STREAM: &str = "application/octet-stream";

pub fn build_client() -> Result<Client, BystroError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&format!("bystro-api/{}", env!("CARGO_PKG_VERSION")))
            .map_err(|err| BystroError::InvalidHeader(err.to_string()))?,
    );
    Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|err| BystroError::HttpClient(err.to_string()))
}

pub fn with_bearer(
    request: RequestBuilder,
    auth: &CachedAuth,
) -> Result<RequestBuilder, BystroError> {
    let value = HeaderValue::from_str(&auth.bearer())
        .map_err(|err| BystroError::InvalidHeader(err.to_string()))?;
    Ok(request.header(AUTHORIZATION, value))
}

/// Returns the response when it is a 200, otherwise `(status, body)`.
pub fn expect_ok(response: Response) -> Result<Response, (u16, String)> {
    if response.status() == reqwest::StatusCode::OK {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response.text().unwrap_or_default();
    Err((status, message))
}

pub fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, BystroError> {
    let body = response
        .text()
        .map_err(|err| BystroError::Decode(err.to_string()))?;
    serde_json::from_str(&body).map_err(|err| BystroError::Decode(err.to_string()))
}

/// Multipart `file` part named after the path's basename.
pub fn file_part(path: &Path) -> Result<Part, BystroError> {
    let file_name = file_name(path)?;
    Part::file(path)
        .map_err(|err| BystroError::Filesystem(format!("open {}: {err}", path.display())))?
        .file_name(file_name)
        .mime_str(OCTET_STREAM)
        .map_err(|err| BystroError::InvalidHeader(err.to_string()))
}

pub fn attach_files(mut form: Form, paths: &[&Path]) -> Result<Form, BystroError> {
    for path in paths {
        form = form.part("file", file_part(path)?);
    }
    Ok(form)
}

pub fn file_name(path: &Path) -> Result<String, BystroError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_string())
        .ok_or_else(|| BystroError::Filesystem(format!("invalid file name: {}", path.display())))
}
