use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("datastore authorization rejected: {0}")]
    Unauthorized(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("conditional write conflict: {0}")]
    Conflict(String),

    #[error("datastore error ({status}): {detail}")]
    Status { status: u16, detail: String },

    #[error("datastore transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("datastore payload decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// JSON client for the relational datastore's REST head.
///
/// Filters travel as query parameters; writes that need the affected rows
/// back set `Prefer: return=representation`. The caller's bearer token is
/// forwarded so row-level policies apply to the requesting identity.
pub struct PostgrestClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl PostgrestClient {
    pub fn new(config: &AppConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .expect("failed to construct HTTP client");

        Self {
            client,
            base_url: config.database_url.clone(),
            anon_key: config.database_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key).unwrap());
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
            );
        }

        headers
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, DbError>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, auth_token, body, None)
            .await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, DbError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut headers = self.get_headers(auth_token);
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Datastore error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => DbError::Unauthorized(error_text),
                404 => DbError::NotFound(error_text),
                // PostgREST reports unique-index violations (SQLSTATE 23505)
                // as 409; `create_if_free` relies on this to detect a lost
                // slot race.
                409 => DbError::Conflict(error_text),
                code => DbError::Status {
                    status: code,
                    detail: error_text,
                },
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }
}
