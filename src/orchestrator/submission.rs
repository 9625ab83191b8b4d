//! Submission controller.
//!
//! Owns the selected file and the request state, talks to the webhook through a
//! [`Transport`], and drives the page through a [`View`]. Every failure is turned
//! into a banner message here; callers only get the outcome back for exit codes.

use crate::engine::{images, Transport};
use crate::error::SubmitError;
use crate::model::{AnalysisResponse, ImageSlot, PanelContent, RequestState, SelectedFile, SubmitConfig};
use crate::render::{self, panel_content};
use crate::validate::validate;
use crate::view::{View, ViewUpdate, NO_FILE_LABEL, SUBMIT_BUSY_LABEL, SUBMIT_IDLE_LABEL};
use tokio::time::{Duration, Instant};

const PROGRESS_TICK: Duration = Duration::from_millis(100);
const PROGRESS_STEP: u8 = 5;
/// The bar never reaches 100% until the response is in.
const PROGRESS_CAP: u8 = 90;

pub struct SubmissionController<T, V> {
    cfg: SubmitConfig,
    transport: T,
    view: V,
    selected: Option<SelectedFile>,
    state: RequestState,
    banner_deadline: Option<Instant>,
}

impl<T: Transport, V: View> SubmissionController<T, V> {
    pub fn new(cfg: SubmitConfig, transport: T, view: V) -> Self {
        Self {
            cfg,
            transport,
            view,
            selected: None,
            state: RequestState::Idle,
            banner_deadline: None,
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn selected(&self) -> Option<&SelectedFile> {
        self.selected.as_ref()
    }

    #[cfg(test)]
    pub fn banner_deadline(&self) -> Option<Instant> {
        self.banner_deadline
    }

    /// Record the user's choice (or clear it) and drop any stale error.
    pub fn select_file(&mut self, file: Option<SelectedFile>) {
        let label = file
            .as_ref()
            .map(|f| f.name.clone())
            .unwrap_or_else(|| NO_FILE_LABEL.to_string());
        self.selected = file;
        self.view.update(ViewUpdate::FileLabel(label));
        self.hide_banner();
    }

    /// Run one submit/await/display cycle.
    ///
    /// The submit control is re-enabled on every path out of this function.
    pub async fn submit(&mut self) -> Result<AnalysisResponse, SubmitError> {
        let Some(file) = self.selected.clone() else {
            let err = SubmitError::NoFileSelected;
            self.report_error(&err);
            return Err(err);
        };

        self.state = RequestState::Submitting;
        self.start_loading();
        tracing::info!(file = %file.name, endpoint = %self.cfg.endpoint, "submitting image");

        let outcome = match self.request_with_progress(&file).await {
            Ok(response) => {
                let panels = self.load_panels(&response).await;
                render::render(&mut self.view, &response, &self.cfg.positive_marker, panels);
                Ok(response)
            }
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(response) => {
                self.state = RequestState::Success;
                tracing::info!(
                    result = %response.result,
                    probability = response.probability,
                    "analysis received"
                );
            }
            Err(e) => {
                self.state = RequestState::Failed;
                tracing::warn!(error = %e, "submission failed");
                self.report_error(e);
                self.view.update(ViewUpdate::Progress(Some(0)));
            }
        }

        self.finish_loading();
        outcome
    }

    /// Show the user-facing message for `err` and arm the auto-dismiss timer.
    pub fn report_error(&mut self, err: &SubmitError) {
        self.view
            .update(ViewUpdate::ErrorBanner(Some(err.user_message())));
        // A newer error replaces the deadline of an older one.
        self.banner_deadline = Some(Instant::now() + self.cfg.banner_timeout);
    }

    /// Hide the banner once its deadline passed. Returns whether it was hidden.
    pub fn dismiss_expired_banner(&mut self, now: Instant) -> bool {
        match self.banner_deadline {
            Some(deadline) if now >= deadline => {
                self.hide_banner();
                true
            }
            _ => false,
        }
    }

    fn hide_banner(&mut self) {
        self.banner_deadline = None;
        self.view.update(ViewUpdate::ErrorBanner(None));
    }

    fn start_loading(&mut self) {
        self.view.update(ViewUpdate::SubmitButton {
            enabled: false,
            label: SUBMIT_BUSY_LABEL.into(),
        });
        self.view.update(ViewUpdate::Progress(Some(0)));
        self.view.update(ViewUpdate::ResultsVisible(false));
        self.hide_banner();
    }

    fn finish_loading(&mut self) {
        self.view.update(ViewUpdate::SubmitButton {
            enabled: true,
            label: SUBMIT_IDLE_LABEL.into(),
        });
        self.view.update(ViewUpdate::Progress(None));
    }

    async fn request_with_progress(
        &mut self,
        file: &SelectedFile,
    ) -> Result<AnalysisResponse, SubmitError> {
        let limit = self.cfg.request_timeout;
        // Dropping this future on timeout aborts the in-flight request.
        let request = tokio::time::timeout(limit, self.transport.post_image(file));
        tokio::pin!(request);

        let mut ticker = tokio::time::interval_at(Instant::now() + PROGRESS_TICK, PROGRESS_TICK);
        let mut width = 0u8;

        let reply = loop {
            tokio::select! {
                res = &mut request => break res,
                _ = ticker.tick(), if width < PROGRESS_CAP => {
                    width = (width + PROGRESS_STEP).min(PROGRESS_CAP);
                    self.view.update(ViewUpdate::Progress(Some(width)));
                }
            }
        };

        let reply = match reply {
            Err(_) => return Err(SubmitError::Timeout(limit)),
            Ok(res) => res?,
        };
        if !reply.is_success() {
            return Err(SubmitError::HttpError {
                status: reply.status,
                body: reply.body,
            });
        }
        validate(&reply.body)
    }

    async fn load_panels(&self, response: &AnalysisResponse) -> [PanelContent; 3] {
        let timeout = self.cfg.image_timeout;
        let load = |slot: ImageSlot| {
            let src = response.source(slot);
            async move {
                match src {
                    Some(src) => Some(images::load_panel(&self.transport, slot, src, timeout).await),
                    None => None,
                }
            }
        };

        let (original, mask, overlay) = futures::join!(
            load(ImageSlot::Original),
            load(ImageSlot::Mask),
            load(ImageSlot::Overlay)
        );

        for (slot, outcome) in ImageSlot::ALL.into_iter().zip([&original, &mask, &overlay]) {
            if let Some(Err(err)) = outcome {
                tracing::warn!(card = slot.card_id(), error = %err, "panel image unavailable");
            }
        }

        [
            panel_content(ImageSlot::Original, original),
            panel_content(ImageSlot::Mask, mask),
            panel_content(ImageSlot::Overlay, overlay),
        ]
    }
}
