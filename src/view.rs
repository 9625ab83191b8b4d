//! Presentation contract.
//!
//! The controller never touches a concrete screen; it emits [`ViewUpdate`]s into a
//! [`View`]. Each variant stands for one of the fixed page elements (file label,
//! submit button, progress bar, error banner, result panel, the three image cards).

use crate::model::{ImageSlot, LoadedImage, PanelContent, Verdict};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

pub const SUBMIT_IDLE_LABEL: &str = "Analyze Image";
pub const SUBMIT_BUSY_LABEL: &str = "Analyzing...";
pub const NO_FILE_LABEL: &str = "Select an image";

#[derive(Debug, Clone, PartialEq)]
pub enum ViewUpdate {
    FileLabel(String),
    SubmitButton { enabled: bool, label: String },
    /// `None` hides the progress bar.
    Progress(Option<u8>),
    ErrorBanner(Option<String>),
    ResultText(String),
    Probability(String),
    Verdict(Verdict),
    Card { slot: ImageSlot, content: PanelContent },
    ResultsVisible(bool),
}

pub trait View: Send {
    fn update(&mut self, change: ViewUpdate);
}

/// Forwards updates to a UI running elsewhere (the TUI thread).
pub struct ChannelView {
    tx: UnboundedSender<ViewUpdate>,
}

impl ChannelView {
    pub fn new(tx: UnboundedSender<ViewUpdate>) -> Self {
        Self { tx }
    }
}

impl View for ChannelView {
    fn update(&mut self, change: ViewUpdate) {
        // Receiver gone means the UI is shutting down.
        let _ = self.tx.send(change);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitButton {
    pub enabled: bool,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultPanel {
    pub text: String,
    pub probability: String,
    pub verdict: Option<Verdict>,
}

/// In-memory rendition of the page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageState {
    pub file_label: String,
    pub submit: SubmitButton,
    pub progress: Option<u8>,
    pub error_banner: Option<String>,
    pub result: ResultPanel,
    pub results_visible: bool,
    pub cards: [PanelContent; 3],
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            file_label: NO_FILE_LABEL.into(),
            submit: SubmitButton {
                enabled: true,
                label: SUBMIT_IDLE_LABEL.into(),
            },
            progress: None,
            error_banner: None,
            result: ResultPanel::default(),
            results_visible: false,
            cards: [PanelContent::Hidden, PanelContent::Hidden, PanelContent::Hidden],
        }
    }
}

impl PageState {
    pub fn apply(&mut self, change: ViewUpdate) {
        match change {
            ViewUpdate::FileLabel(label) => self.file_label = label,
            ViewUpdate::SubmitButton { enabled, label } => {
                self.submit = SubmitButton { enabled, label };
            }
            ViewUpdate::Progress(p) => self.progress = p,
            ViewUpdate::ErrorBanner(msg) => self.error_banner = msg,
            ViewUpdate::ResultText(text) => self.result.text = text,
            ViewUpdate::Probability(p) => self.result.probability = p,
            ViewUpdate::Verdict(v) => self.result.verdict = Some(v),
            ViewUpdate::Card { slot, content } => self.cards[slot.index()] = content,
            ViewUpdate::ResultsVisible(v) => self.results_visible = v,
        }
    }

    pub fn card(&self, slot: ImageSlot) -> &PanelContent {
        &self.cards[slot.index()]
    }

    /// Loaded images in slot order.
    pub fn images(&self) -> impl Iterator<Item = (ImageSlot, &LoadedImage)> {
        ImageSlot::ALL
            .into_iter()
            .filter_map(move |slot| match self.card(slot) {
                PanelContent::Image(img) => Some((slot, img)),
                _ => None,
            })
    }
}

impl View for PageState {
    fn update(&mut self, change: ViewUpdate) {
        self.apply(change);
    }
}
