use crate::model::Report;
use crate::view::{PageState, NO_FILE_LABEL};
use std::path::Path;

pub struct UiState {
    pub page: PageState,
    pub endpoint: String,
    pub info: String,

    // File path input
    pub path_input: String,
    pub editing_path: bool,

    pub show_help: bool,
    pub last_report: Option<Report>,
}

impl UiState {
    pub fn new(endpoint: &str, initial_path: Option<&Path>) -> Self {
        Self {
            page: PageState::default(),
            endpoint: endpoint.to_string(),
            info: "Press / to enter an image path, Enter to analyze".into(),
            path_input: initial_path
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            editing_path: initial_path.is_none(),
            show_help: false,
            last_report: None,
        }
    }

    /// Mirrors the submit control; disabled while a request is in flight.
    pub fn can_submit(&self) -> bool {
        self.page.submit.enabled
    }

    pub fn selected_file(&self) -> Option<&str> {
        if self.page.file_label == NO_FILE_LABEL {
            None
        } else {
            Some(self.page.file_label.as_str())
        }
    }

    pub fn summary_text(&self) -> Option<String> {
        self.last_report
            .as_ref()
            .map(|r| crate::text_summary::build_text_summary(r).lines.join("\n"))
    }
}
