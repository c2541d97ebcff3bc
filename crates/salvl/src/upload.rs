//! Remote asset upload.
//!
//! Mesh files and textures are posted to the legacy asset endpoints with the
//! user's session cookie. The service answers the first request of a session
//! with a 403 carrying an `x-csrf-token` header; the token is stored and the
//! request repeated.

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, COOKIE, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode, Url};

use crate::error::{Error, Result};
use crate::options::{UPLOAD_ATTEMPTS, UPLOAD_RETRY_DELAY};

pub const DEFAULT_BASE_URL: &str = "https://data.roblox.com";
const MESH_PATH: &str = "/ide/publish/UploadNewMesh";
const DECAL_PATH: &str = "/data/upload/json";
const DECAL_ASSET_TYPE: &str = "13";
const DESCRIPTION: &str = "Generated by salvl2rbx";
const CLIENT_AGENT: &str = "RobloxStudio/WinInet";
const CSRF_HEADER: &str = "x-csrf-token";

/// Uploads assets one request at a time, keeping the CSRF token between
/// requests.
#[derive(Debug)]
pub struct AssetUploader {
    client: Client,
    base_url: String,
    cookie: String,
    csrf_token: String,
    attempts: u32,
    retry_delay: Duration,
}

impl AssetUploader {
    #[must_use]
    pub fn new(cookie: String) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            cookie,
            csrf_token: "FETCH".to_owned(),
            attempts: UPLOAD_ATTEMPTS,
            retry_delay: UPLOAD_RETRY_DELAY,
        }
    }

    /// Point the uploader at a different service root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.attempts = attempts;
        self.retry_delay = delay;
        self
    }

    /// Upload a mesh file and return its asset id.
    pub async fn upload_mesh(&mut self, name: &str, data: Vec<u8>) -> Result<u64> {
        let url = self.endpoint(MESH_PATH, &[("name", name), ("description", DESCRIPTION)])?;
        let body = self.post(url, data).await?;
        parse_mesh_id(&body)
    }

    /// Upload an image as a decal and return the id of its backing image.
    pub async fn upload_texture(&mut self, name: &str, data: Vec<u8>) -> Result<u64> {
        let url = self.endpoint(
            DECAL_PATH,
            &[
                ("assetTypeId", DECAL_ASSET_TYPE),
                ("name", name),
                ("description", DESCRIPTION),
            ],
        )?;
        let body = self.post(url, data).await?;
        parse_backing_asset_id(&body)
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        Url::parse_with_params(&format!("{}{path}", self.base_url), query)
            .map_err(|e| Error::Upload(format!("bad upload URL: {e}")))
    }

    async fn post(&mut self, url: Url, data: Vec<u8>) -> Result<String> {
        let mut last_error = None;

        for attempt in 1..=self.attempts {
            let request = self
                .client
                .post(url.clone())
                .header(CONTENT_TYPE, "*/*")
                .header(USER_AGENT, CLIENT_AGENT)
                .header(COOKIE, format!(".ROBLOSECURITY={}", self.cookie))
                .header(CSRF_HEADER, self.csrf_token.as_str())
                .body(data.clone());

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    return Ok(response.text().await?);
                }
                Ok(response) => {
                    let status = response.status();
                    if let Some(token) = csrf_token(status, response.headers().get(CSRF_HEADER)) {
                        tracing::debug!("refreshed CSRF token");
                        self.csrf_token = token;
                        continue;
                    }
                    let body = response.text().await.unwrap_or_default();
                    tracing::warn!(attempt, %status, "upload rejected: {body}");
                    last_error = Some(Error::Upload(format!("{status}: {body}")));
                }
                Err(e) => {
                    tracing::warn!(attempt, "upload request failed: {e}");
                    last_error = Some(Error::Http(e));
                }
            }

            tokio::time::sleep(self.retry_delay).await;
        }

        Err(last_error.unwrap_or_else(|| Error::Upload(format!("gave up on {}", url.path()))))
    }
}

/// New CSRF token from a rejected response, if it carried one.
fn csrf_token(status: StatusCode, header: Option<&HeaderValue>) -> Option<String> {
    if status != StatusCode::FORBIDDEN {
        return None;
    }
    header
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Asset id from a mesh upload response, which is the bare number.
pub fn parse_mesh_id(body: &str) -> Result<u64> {
    body.trim()
        .parse()
        .map_err(|_| Error::Upload(format!("mesh upload returned {body:?} instead of an asset id")))
}

/// `BackingAssetId` from a decal upload response.
pub fn parse_backing_asset_id(body: &str) -> Result<u64> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| Error::Upload(format!("decal upload returned bad JSON: {e}")))?;
    value
        .get("BackingAssetId")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| Error::Upload("decal upload response has no BackingAssetId".into()))
}
