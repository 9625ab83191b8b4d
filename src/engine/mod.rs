//! Outbound side of a submission: the HTTP transport and image source loading.

pub(crate) mod images;
pub(crate) mod webhook;

use crate::error::SubmitError;
use crate::model::SelectedFile;
use async_trait::async_trait;
use bytes::Bytes;

/// Raw reply from the webhook before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network collaborator of the submission controller.
///
/// Implementations report connection-level problems as
/// [`SubmitError::NetworkFailure`]; deadlines are enforced by the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_image(&self, file: &SelectedFile) -> Result<HttpReply, SubmitError>;

    async fn fetch_image(&self, url: &str) -> Result<Bytes, SubmitError>;
}

pub use webhook::WebhookClient;
