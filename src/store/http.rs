//! REST client for an Orchestrate-style key-value service.
//!
//! Values live at `{base}/v0/{collection}/{key}`; every request carries the
//! API key as the HTTP basic-auth user name. One attempt per call, no retry.

use super::{RemoteError, RemoteStore};

use async_trait::async_trait;
use reqwest::{StatusCode, Url, header};
use std::time::Duration;

const API_VERSION: &str = "v0";

pub struct HttpStore {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl HttpStore {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| RemoteError::Transport(format!("invalid store url {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::Transport(format!(
                "store url {} cannot hold a path",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    /// `{base}/v0/{collection}/{key}` with both names percent-encoded.
    ///
    /// `.` and `..` are refused: the URL path encoder drops them instead of
    /// escaping, which would address the collection rather than the key.
    pub(crate) fn url(&self, collection: &str, key: &str) -> Result<Url, RemoteError> {
        for segment in [collection, key] {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(RemoteError::Transport(format!(
                    "invalid path segment {:?}",
                    segment
                )));
            }
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::Transport("store url cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend([API_VERSION, collection, key]);
        Ok(url)
    }

    fn check_status(status: StatusCode) -> Result<(), RemoteError> {
        match status {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(RemoteError::NotFound),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(RemoteError::Unauthorized(status.to_string()))
            }
            s => Err(RemoteError::Transport(format!("remote store returned {}", s))),
        }
    }
}

fn transport(err: reqwest::Error) -> RemoteError {
    RemoteError::Transport(err.to_string())
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Vec<u8>, RemoteError> {
        let response = self
            .client
            .get(self.url(collection, key)?)
            .basic_auth(&self.api_key, None::<&str>)
            .send()
            .await
            .map_err(transport)?;

        Self::check_status(response.status())?;

        let body = response.bytes().await.map_err(transport)?;
        tracing::trace!("GET {}/{} -> {} bytes", collection, key, body.len());
        Ok(body.to_vec())
    }

    async fn put(&self, collection: &str, key: &str, value: Vec<u8>) -> Result<(), RemoteError> {
        let response = self
            .client
            .put(self.url(collection, key)?)
            .basic_auth(&self.api_key, None::<&str>)
            .header(header::CONTENT_TYPE, "application/json")
            .body(value)
            .send()
            .await
            .map_err(transport)?;

        Self::check_status(response.status())
    }

    /// Deleting a missing key succeeds.
    async fn delete(&self, collection: &str, key: &str) -> Result<(), RemoteError> {
        let response = self
            .client
            .delete(self.url(collection, key)?)
            .query(&[("purge", "true")])
            .basic_auth(&self.api_key, None::<&str>)
            .send()
            .await
            .map_err(transport)?;

        match Self::check_status(response.status()) {
            Err(RemoteError::NotFound) => Ok(()),
            other => other,
        }
    }
}
