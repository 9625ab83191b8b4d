use crate::model::ImageSlot;
use thiserror::Error;

/// Every way a submission can go wrong. None of these escape the controller;
/// they end up as a banner message via [`SubmitError::user_message`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("no file selected")]
    NoFileSelected,
    #[error("failed to read {path}: {reason}")]
    FileRead { path: String, reason: String },
    #[error("network failure: {0}")]
    NetworkFailure(String),
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("server returned HTTP {status}: {body}")]
    HttpError { status: u16, body: String },
    #[error("server returned an empty body")]
    EmptyBody,
    #[error("response is not valid JSON: {0}")]
    MalformedJson(String),
    #[error("response is missing field `{0}`")]
    MissingField(&'static str),
    #[error("response field `{0}` has the wrong type")]
    WrongType(&'static str),
    #[error("response field `{0}` is out of range")]
    OutOfRange(&'static str),
    #[error("failed to load {slot:?} image: {reason}")]
    ImageLoadFailure { slot: ImageSlot, reason: String },
}

impl SubmitError {
    /// Short message for the error banner.
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::NoFileSelected => "⚠️ Please select an image".into(),
            SubmitError::FileRead { .. } => "⚠️ Could not read the selected image".into(),
            SubmitError::NetworkFailure(_) => {
                "🔌 Could not connect to the server. Check your connection.".into()
            }
            SubmitError::Timeout(_) => "⏱️ The server took too long to respond".into(),
            SubmitError::HttpError { status, .. } => format!("❌ Server error ({status})"),
            SubmitError::EmptyBody => "🔴 The server returned no data".into(),
            SubmitError::MalformedJson(_) => "📛 Invalid response from the server".into(),
            SubmitError::MissingField(_)
            | SubmitError::WrongType(_)
            | SubmitError::OutOfRange(_) => "📦 The response does not have the expected format".into(),
            SubmitError::ImageLoadFailure { slot, .. } => slot.placeholder_caption().into(),
        }
    }
}
