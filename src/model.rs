use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Substring in `result` that marks a positive finding.
pub const TUMOR_MARKER: &str = "Tumor detectado";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitConfig {
    pub endpoint: String,
    pub field_name: String,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub image_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub banner_timeout: Duration,
    pub user_agent: String,
    pub positive_marker: String,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:5678/webhook/mri-analysis".into(),
            field_name: "image".into(),
            request_timeout: Duration::from_secs(30),
            image_timeout: Duration::from_secs(10),
            banner_timeout: Duration::from_secs(5),
            user_agent: format!("mri-webhook-cli/{}", env!("CARGO_PKG_VERSION")),
            positive_marker: TUMOR_MARKER.into(),
        }
    }
}

/// Image picked by the user; lives for one submission.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub mime: String,
    pub bytes: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let name = name.into();
        let mime = mime_for_name(&name).to_string();
        Self {
            name,
            mime,
            bytes: bytes.into(),
        }
    }

    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }
}

fn mime_for_name(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        "dcm" => "application/dicom",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestState {
    Idle,
    Submitting,
    Success,
    Failed,
}

/// Validated webhook answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub result: String,
    pub probability: f64,
    pub original_image: String,
    pub mask: Option<String>,
    pub overlay_image: Option<String>,
}

impl AnalysisResponse {
    pub fn source(&self, slot: ImageSlot) -> Option<&str> {
        match slot {
            ImageSlot::Original => Some(self.original_image.as_str()),
            ImageSlot::Mask => self.mask.as_deref(),
            ImageSlot::Overlay => self.overlay_image.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    TumorDetected,
    NoTumor,
}

impl Verdict {
    pub fn classify(result: &str, marker: &str) -> Self {
        if result.contains(marker) {
            Verdict::TumorDetected
        } else {
            Verdict::NoTumor
        }
    }

    pub fn style_class(self) -> &'static str {
        match self {
            Verdict::TumorDetected => "tumor-detected",
            Verdict::NoTumor => "no-tumor",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Verdict::TumorDetected => "fas fa-exclamation-circle",
            Verdict::NoTumor => "fas fa-check-circle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSlot {
    Original,
    Mask,
    Overlay,
}

impl ImageSlot {
    pub const ALL: [ImageSlot; 3] = [ImageSlot::Original, ImageSlot::Mask, ImageSlot::Overlay];

    pub fn card_id(self) -> &'static str {
        match self {
            ImageSlot::Original => "original-card",
            ImageSlot::Mask => "mask-card",
            ImageSlot::Overlay => "overlay-card",
        }
    }

    pub fn image_id(self) -> &'static str {
        match self {
            ImageSlot::Original => "original-image",
            ImageSlot::Mask => "mask-image",
            ImageSlot::Overlay => "overlay-image",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ImageSlot::Original => "Original",
            ImageSlot::Mask => "Mask",
            ImageSlot::Overlay => "Overlay",
        }
    }

    /// Caption shown in place of an image that could not be loaded.
    pub fn placeholder_caption(self) -> &'static str {
        match self {
            ImageSlot::Original => "Image not available",
            ImageSlot::Mask => "Mask not available",
            ImageSlot::Overlay => "Overlay not available",
        }
    }

    pub fn index(self) -> usize {
        match self {
            ImageSlot::Original => 0,
            ImageSlot::Mask => 1,
            ImageSlot::Overlay => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    DataUri,
    Url,
    Base64,
}

/// What a card ends up displaying after a render.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelContent {
    Image(LoadedImage),
    Placeholder { caption: String },
    Hidden,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedImage {
    pub bytes: Bytes,
    pub mime: String,
    pub width: u32,
    pub height: u32,
    pub source: SourceKind,
}

impl LoadedImage {
    pub fn extension(&self) -> &'static str {
        match self.mime.as_str() {
            "image/png" => "png",
            "image/jpeg" => "jpg",
            "image/gif" => "gif",
            "image/bmp" => "bmp",
            "image/tiff" => "tiff",
            "image/webp" => "webp",
            _ => "bin",
        }
    }
}

/// Outcome of one submission as printed in JSON mode and written by `--export-json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub timestamp_utc: String,
    pub endpoint: String,
    pub file: Option<String>,
    pub state: RequestState,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub probability: Option<f64>,
    #[serde(default)]
    pub percentage: Option<String>,
    #[serde(default)]
    pub verdict: Option<Verdict>,
    #[serde(default)]
    pub verdict_icon: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    pub panels: Vec<PanelSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PanelStatus {
    Image {
        mime: String,
        width: u32,
        height: u32,
        source: SourceKind,
    },
    Placeholder {
        caption: String,
    },
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelSummary {
    pub slot: ImageSlot,
    #[serde(flatten)]
    pub status: PanelStatus,
}

impl PanelSummary {
    pub fn new(slot: ImageSlot, content: &PanelContent) -> Self {
        let status = match content {
            PanelContent::Image(img) => PanelStatus::Image {
                mime: img.mime.clone(),
                width: img.width,
                height: img.height,
                source: img.source,
            },
            PanelContent::Placeholder { caption } => PanelStatus::Placeholder {
                caption: caption.clone(),
            },
            PanelContent::Hidden => PanelStatus::Hidden,
        };
        Self { slot, status }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_uses_substring_match() {
        let v = Verdict::classify("⚠️ Tumor detectado (glioma)", TUMOR_MARKER);
        assert_eq!(v, Verdict::TumorDetected);
        assert_eq!(v.style_class(), "tumor-detected");
        assert_eq!(v.icon(), "fas fa-exclamation-circle");

        let v = Verdict::classify("No se detectó tumor", TUMOR_MARKER);
        assert_eq!(v, Verdict::NoTumor);
        assert_eq!(v.style_class(), "no-tumor");
        assert_eq!(v.icon(), "fas fa-check-circle");
    }

    #[test]
    fn verdict_is_case_sensitive() {
        assert_eq!(
            Verdict::classify("tumor detectado", TUMOR_MARKER),
            Verdict::NoTumor
        );
    }

    #[test]
    fn selected_file_guesses_mime_from_extension() {
        assert_eq!(SelectedFile::new("scan.PNG", vec![1u8]).mime, "image/png");
        assert_eq!(SelectedFile::new("scan.jpeg", vec![1u8]).mime, "image/jpeg");
        assert_eq!(
            SelectedFile::new("scan", vec![1u8]).mime,
            "application/octet-stream"
        );
    }

    #[test]
    fn panel_summary_serializes_flat() {
        let s = PanelSummary::new(
            ImageSlot::Mask,
            &PanelContent::Placeholder {
                caption: "Mask not available".into(),
            },
        );
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["slot"], "mask");
        assert_eq!(v["status"], "placeholder");
        assert_eq!(v["caption"], "Mask not available");

        let hidden = serde_json::to_value(PanelSummary::new(ImageSlot::Overlay, &PanelContent::Hidden)).unwrap();
        assert_eq!(hidden["status"], "hidden");
    }

    #[test]
    fn config_round_trips_with_humantime_durations() {
        let cfg = SubmitConfig::default();
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["request_timeout"], "30s");
        let back: SubmitConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back.request_timeout, Duration::from_secs(30));
        assert_eq!(back.field_name, "image");
    }
}
