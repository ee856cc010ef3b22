//! Redis-over-HTTP store client
//!
//! Speaks the REST command protocol exposed by hosted Redis services:
//! `GET {endpoint}/get/{key}` and `POST {endpoint}/set/{key}` with the value
//! as the request body, authenticated with a bearer token. Replies are JSON
//! envelopes of the form `{"result": ...}` or `{"error": "..."}`.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

use super::StateStore;
use crate::error::StoreError;

#[derive(Debug, Clone)]
pub struct RestStore {
    client: reqwest::Client,
    endpoint: Url,
    token: String,
}

#[derive(Debug, Deserialize)]
struct RestReply {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

impl RestStore {
    pub fn new(endpoint: &str, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("Invalid store endpoint: {}", endpoint))?;
        if endpoint.cannot_be_a_base() {
            bail!("Store endpoint must be an http(s) base URL: {}", endpoint);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            token: token.into(),
        })
    }

    fn command_url(&self, command: &str, key: &str) -> Url {
        let mut url = self.endpoint.clone();
        // Checked in `new`: the endpoint can always be a base.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(command).push(key);
        }
        url
    }

    async fn read_reply(response: reqwest::Response) -> Result<String, StoreError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

/// Extract the stored value from a `get` reply; `null` means absent
pub(crate) fn parse_get_reply(body: &str) -> Result<String, StoreError> {
    let reply: RestReply =
        serde_json::from_str(body).map_err(|e| StoreError::Decode(e.to_string()))?;

    if let Some(error) = reply.error {
        return Err(StoreError::Decode(error));
    }

    Ok(match reply.result {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(value)) => value,
        Some(other) => other.to_string(),
    })
}

#[async_trait]
impl StateStore for RestStore {
    async fn get(&self, key: &str) -> Result<String, StoreError> {
        let response = self
            .client
            .get(self.command_url("get", key))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let body = Self::read_reply(response).await?;
        let value = parse_get_reply(&body)?;
        tracing::debug!(key = %key, bytes = value.len(), "Store get");
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .post(self.command_url("set", key))
            .bearer_auth(&self.token)
            .body(value.to_string())
            .send()
            .await?;

        Self::read_reply(response).await?;
        tracing::debug!(key = %key, bytes = value.len(), "Store set");
        Ok(())
    }
}
