use super::{HttpReply, Transport};
use crate::error::SubmitError;
use crate::model::{SelectedFile, SubmitConfig};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::multipart::{Form, Part};
use url::Url;

/// Longest body excerpt carried in an `HttpError`.
const BODY_SNIPPET_LEN: usize = 200;

/// reqwest-backed transport for the analysis webhook.
#[derive(Clone)]
pub struct WebhookClient {
    http: reqwest::Client,
    endpoint: Url,
    field_name: String,
}

impl WebhookClient {
    pub fn new(cfg: &SubmitConfig) -> Result<Self> {
        let endpoint = Url::parse(&cfg.endpoint)
            .with_context(|| format!("invalid webhook endpoint {:?}", cfg.endpoint))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            anyhow::bail!("webhook endpoint must be http(s), got {}", endpoint.scheme());
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .default_headers(headers)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            http,
            endpoint,
            field_name: cfg.field_name.clone(),
        })
    }
}

fn network_failure(e: reqwest::Error) -> SubmitError {
    SubmitError::NetworkFailure(e.to_string())
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_SNIPPET_LEN) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[async_trait]
impl Transport for WebhookClient {
    async fn post_image(&self, file: &SelectedFile) -> Result<HttpReply, SubmitError> {
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.mime)
            .map_err(network_failure)?;
        let form = Form::new().part(self.field_name.clone(), part);

        tracing::debug!(
            endpoint = %self.endpoint,
            field = %self.field_name,
            file = %file.name,
            bytes = file.bytes.len(),
            "posting image"
        );

        let resp = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(network_failure)?;

        let status = resp.status();
        // A body that cannot be read on an error status is reported as unknown.
        let body = match resp.text().await {
            Ok(b) => b,
            Err(e) if status.is_success() => return Err(network_failure(e)),
            Err(_) => "unknown error".to_string(),
        };
        tracing::debug!(status = status.as_u16(), body_len = body.len(), "webhook replied");

        let reply = HttpReply {
            status: status.as_u16(),
            body,
        };
        if !reply.is_success() {
            return Err(SubmitError::HttpError {
                status: reply.status,
                body: snippet(&reply.body),
            });
        }
        Ok(reply)
    }

    async fn fetch_image(&self, url: &str) -> Result<Bytes, SubmitError> {
        let resp = self.http.get(url).send().await.map_err(network_failure)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SubmitError::HttpError {
                status: status.as_u16(),
                body: String::new(),
            });
        }
        resp.bytes().await.map_err(network_failure)
    }
}
