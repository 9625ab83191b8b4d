//! Post-submission processing: report building and exports.

use crate::error::SubmitError;
use crate::model::{
    AnalysisResponse, ImageSlot, PanelSummary, Report, RequestState, SubmitConfig, Verdict,
};
use crate::render::format_percentage;
use crate::storage;
use crate::view::PageState;
use std::path::PathBuf;

/// Where a finished submission should be written, if anywhere.
#[derive(Debug, Clone, Default)]
pub(crate) struct ExportTargets {
    pub json: Option<PathBuf>,
    pub images_dir: Option<PathBuf>,
}

/// Result of post-submission processing, ready for presentation layers.
pub(crate) struct ProcessedRun {
    pub report: Report,
    pub export_messages: Vec<String>,
    pub export_failed: bool,
}

pub(crate) fn build_report(
    cfg: &SubmitConfig,
    file: Option<&str>,
    page: &PageState,
    outcome: &Result<AnalysisResponse, SubmitError>,
) -> Report {
    let timestamp_utc = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into());
    let panels = ImageSlot::ALL
        .into_iter()
        .map(|slot| PanelSummary::new(slot, page.card(slot)))
        .collect();

    let (state, result, probability, verdict, error) = match outcome {
        Ok(r) => (
            RequestState::Success,
            Some(r.result.clone()),
            Some(r.probability),
            Some(Verdict::classify(&r.result, &cfg.positive_marker)),
            None,
        ),
        Err(e) => (RequestState::Failed, None, None, None, Some(e.to_string())),
    };

    Report {
        timestamp_utc,
        endpoint: cfg.endpoint.clone(),
        file: file.map(str::to_string),
        state,
        result,
        percentage: probability.map(format_percentage),
        probability,
        verdict_icon: verdict.map(|v| v.icon().to_string()),
        verdict,
        error,
        panels,
    }
}

/// Build the report and run the requested exports. Export failures are collected
/// as messages rather than aborting.
pub(crate) fn process_submission(
    cfg: &SubmitConfig,
    targets: &ExportTargets,
    file: Option<&str>,
    page: &PageState,
    outcome: &Result<AnalysisResponse, SubmitError>,
) -> ProcessedRun {
    let report = build_report(cfg, file, page, outcome);
    let mut export_messages = Vec::new();
    let mut export_failed = false;

    if let Some(path) = targets.json.as_deref() {
        match storage::export_json(path, &report) {
            Ok(()) => export_messages.push(format!("Exported JSON: {}", path.display())),
            Err(e) => {
                export_failed = true;
                export_messages.push(format!("Export JSON failed: {e:#}"));
            }
        }
    }

    if let Some(dir) = targets.images_dir.as_deref() {
        let stem = storage::stem_for(file.unwrap_or_default());
        match storage::save_images(dir, &stem, page) {
            Ok(paths) if paths.is_empty() => {
                export_messages.push("No panel images to save".to_string());
            }
            Ok(paths) => {
                for p in paths {
                    export_messages.push(format!("Saved image: {}", p.display()));
                }
            }
            Err(e) => {
                export_failed = true;
                export_messages.push(format!("Saving images to {} failed: {e:#}", dir.display()));
            }
        }
    }

    ProcessedRun {
        report,
        export_messages,
        export_failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PanelStatus;

    fn response() -> AnalysisResponse {
        AnalysisResponse {
            result: "Tumor detectado".into(),
            probability: 0.8734,
            original_image: "data:,".into(),
            mask: None,
            overlay_image: None,
        }
    }

    #[test]
    fn success_report_carries_percentage_and_verdict() {
        let cfg = SubmitConfig::default();
        let page = PageState::default();
        let report = build_report(&cfg, Some("scan.png"), &page, &Ok(response()));
        assert_eq!(report.state, RequestState::Success);
        assert_eq!(report.percentage.as_deref(), Some("87.34%"));
        assert_eq!(report.verdict, Some(Verdict::TumorDetected));
        assert_eq!(
            report.verdict_icon.as_deref(),
            Some("fas fa-exclamation-circle")
        );
        assert_eq!(report.panels.len(), 3);
        assert!(report
            .panels
            .iter()
            .all(|p| p.status == PanelStatus::Hidden));
    }

    #[test]
    fn failure_report_carries_error() {
        let cfg = SubmitConfig::default();
        let report = build_report(
            &cfg,
            None,
            &PageState::default(),
            &Err(SubmitError::EmptyBody),
        );
        assert_eq!(report.state, RequestState::Failed);
        assert_eq!(report.result, None);
        assert_eq!(report.error.as_deref(), Some("server returned an empty body"));
    }

    #[test]
    fn exports_are_written_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        let targets = ExportTargets {
            json: Some(dir.path().join("report.json")),
            images_dir: Some(dir.path().join("images")),
        };
        let processed = process_submission(
            &SubmitConfig::default(),
            &targets,
            Some("scan.png"),
            &PageState::default(),
            &Ok(response()),
        );
        assert!(!processed.export_failed);
        assert!(dir.path().join("report.json").exists());
        assert_eq!(processed.export_messages.len(), 2);
        assert_eq!(processed.export_messages[1], "No panel images to save");
    }

    #[test]
    fn export_failure_is_collected() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where a directory is expected.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let targets = ExportTargets {
            json: Some(blocker.join("report.json")),
            images_dir: None,
        };
        let processed = process_submission(
            &SubmitConfig::default(),
            &targets,
            Some("scan.png"),
            &PageState::default(),
            &Ok(response()),
        );
        assert!(processed.export_failed);
        assert!(processed.export_messages[0].starts_with("Export JSON failed"));
    }
}
