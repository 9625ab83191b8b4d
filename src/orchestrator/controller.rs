//! Interactive lifecycle loop.
//!
//! Translates UI commands into controller calls and keeps the error banner on its
//! dismiss schedule. Only one submission runs at a time; commands that arrive while
//! it is in flight are dropped, except quit, which abandons the request.

use super::submission::SubmissionController;
use crate::engine::Transport;
use crate::error::SubmitError;
use crate::model::{AnalysisResponse, SelectedFile};
use crate::view::View;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{Duration, Instant, Interval, MissedTickBehavior};

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    SelectFile(PathBuf),
    Submit,
    Quit,
}

const BANNER_CHECK_INTERVAL: Duration = Duration::from_millis(250);

/// Ticks missed during a long submission are not replayed.
fn banner_watchdog() -> Interval {
    let mut watchdog = banner_watchdog();
    watchdog.set_missed_tick_behavior(MissedTickBehavior::Delay);
    watchdog
}

/// Read a picked file, mapping I/O problems onto the submission error type.
pub(crate) async fn read_selection(path: &Path) -> Result<SelectedFile, SubmitError> {
    SelectedFile::read(path)
        .await
        .map_err(|e| SubmitError::FileRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}

pub(crate) async fn apply_selection<T: Transport, V: View>(
    controller: &mut SubmissionController<T, V>,
    path: &Path,
) {
    match read_selection(path).await {
        Ok(file) => controller.select_file(Some(file)),
        Err(e) => {
            tracing::warn!(error = %e, "file selection failed");
            controller.select_file(None);
            controller.report_error(&e);
        }
    }
}

/// Drive a submission while still listening for quit. Returns `None` when the user quit.
async fn submit_until_done<T: Transport, V: View>(
    controller: &mut SubmissionController<T, V>,
    cmd_rx: &mut UnboundedReceiver<UiCommand>,
) -> Option<Result<AnalysisResponse, SubmitError>> {
    let submission = controller.submit();
    tokio::pin!(submission);

    loop {
        tokio::select! {
            outcome = &mut submission => return Some(outcome),
            cmd = cmd_rx.recv() => match cmd {
                Some(UiCommand::Quit) | None => {
                    tracing::info!("quit while a submission was in flight; aborting request");
                    return None;
                }
                Some(other) => {
                    tracing::debug!(?other, "command ignored while a submission is in flight");
                }
            }
        }
    }
}

/// Serve UI commands until quit. `on_complete` sees the outcome of every finished
/// submission (exports, status line).
pub(crate) async fn run_controller<T, V, F>(
    controller: &mut SubmissionController<T, V>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
    mut on_complete: F,
) -> Result<()>
where
    T: Transport,
    V: View,
    F: FnMut(Result<AnalysisResponse, SubmitError>),
{
    let mut watchdog = banner_watchdog();

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::SelectFile(path)) => apply_selection(controller, &path).await,
                    Some(UiCommand::Submit) => match submit_until_done(controller, &mut cmd_rx).await {
                        Some(outcome) => on_complete(outcome),
                        None => break,
                    },
                    Some(UiCommand::Quit) | None => break,
                }
            }
            _ = watchdog.tick() => {
                controller.dismiss_expired_banner(Instant::now());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::HttpReply;
    use crate::model::SubmitConfig;
    use crate::view::{ChannelView, ViewUpdate};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    #[derive(Clone, Default)]
    struct HangingTransport {
        posts: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Transport for HangingTransport {
        async fn post_image(&self, _file: &SelectedFile) -> Result<HttpReply, SubmitError> {
            self.posts.fetch_add(1, Ordering::SeqCst);
            futures::future::pending().await
        }

        async fn fetch_image(&self, _url: &str) -> Result<Bytes, SubmitError> {
            futures::future::pending().await
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ViewUpdate>) -> Vec<ViewUpdate> {
        let mut out = Vec::new();
        while let Ok(u) = rx.try_recv() {
            out.push(u);
        }
        out
    }

    #[tokio::test]
    async fn extra_submits_are_ignored_and_quit_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, b"not really a png").unwrap();

        let transport = HangingTransport::default();
        let posts = transport.posts.clone();
        let (view_tx, mut view_rx) = mpsc::unbounded_channel();
        let mut controller =
            SubmissionController::new(SubmitConfig::default(), transport, ChannelView::new(view_tx));

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        cmd_tx.send(UiCommand::SelectFile(path)).unwrap();
        cmd_tx.send(UiCommand::Submit).unwrap();
        cmd_tx.send(UiCommand::Submit).unwrap();
        cmd_tx.send(UiCommand::Quit).unwrap();

        let mut completed = 0;
        run_controller(&mut controller, cmd_rx, |_| completed += 1)
            .await
            .unwrap();

        assert_eq!(posts.load(Ordering::SeqCst), 1);
        assert_eq!(completed, 0);
        let updates = drain(&mut view_rx);
        assert!(updates.contains(&ViewUpdate::FileLabel("scan.png".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn unreadable_selection_shows_banner_that_expires() {
        let (view_tx, mut view_rx) = mpsc::unbounded_channel();
        let mut controller = SubmissionController::new(
            SubmitConfig::default(),
            HangingTransport::default(),
            ChannelView::new(view_tx),
        );
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let driver = async move {
            cmd_tx
                .send(UiCommand::SelectFile(PathBuf::from("/definitely/not/here.png")))
                .unwrap();
            tokio::time::sleep(Duration::from_secs(6)).await;
            cmd_tx.send(UiCommand::Quit).unwrap();
        };
        let (res, ()) = tokio::join!(run_controller(&mut controller, cmd_rx, |_| {}), driver);
        res.unwrap();

        assert!(controller.selected().is_none());
        let updates = drain(&mut view_rx);
        let shown = updates
            .iter()
            .rposition(|u| matches!(u, ViewUpdate::ErrorBanner(Some(_))))
            .expect("banner shown");
        assert!(updates[shown..].contains(&ViewUpdate::ErrorBanner(None)));
    }

    #[tokio::test]
    async fn finished_submission_reaches_callback() {
        let (view_tx, _view_rx) = mpsc::unbounded_channel();
        let mut controller = SubmissionController::new(
            SubmitConfig::default(),
            HangingTransport::default(),
            ChannelView::new(view_tx),
        );
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        // No file selected: the submission fails immediately without posting.
        cmd_tx.send(UiCommand::Submit).unwrap();
        cmd_tx.send(UiCommand::Quit).unwrap();

        let mut outcomes = Vec::new();
        run_controller(&mut controller, cmd_rx, |o| outcomes.push(o))
            .await
            .unwrap();
        assert_eq!(outcomes, vec![Err(SubmitError::NoFileSelected)]);
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_skips_missed_ticks() {
        let mut watchdog = banner_watchdog();
        assert_eq!(watchdog.missed_tick_behavior(), MissedTickBehavior::Delay);

        watchdog.tick().await;
        // A blocked loop, e.g. a 30s submission.
        tokio::time::advance(Duration::from_secs(30)).await;
        watchdog.tick().await;
        let resumed = Instant::now();
        watchdog.tick().await;
        assert!(Instant::now() - resumed >= BANNER_CHECK_INTERVAL);
    }
}
