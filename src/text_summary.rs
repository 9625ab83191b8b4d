//! Text summary builder for CLI output.

use crate::model::{PanelStatus, Report, Verdict};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

pub(crate) fn build_text_summary(report: &Report) -> TextSummary {
    let mut lines = Vec::new();

    if let Some(file) = report.file.as_deref() {
        lines.push(format!("File: {file}"));
    }
    if let Some(result) = report.result.as_deref() {
        lines.push(format!("Diagnosis: {result}"));
    }
    if let Some(pct) = report.percentage.as_deref() {
        lines.push(format!("Probability: {pct}"));
    }
    if let Some(verdict) = report.verdict {
        let label = match verdict {
            Verdict::TumorDetected => "TUMOR DETECTED",
            Verdict::NoTumor => "no tumor",
        };
        lines.push(format!("Status: {label} [{}]", verdict.style_class()));
    }

    for panel in &report.panels {
        let title = panel.slot.title();
        match &panel.status {
            PanelStatus::Image {
                mime,
                width,
                height,
                source,
            } => lines.push(format!("{title}: {width}x{height} {mime} ({source:?})")),
            PanelStatus::Placeholder { caption } => lines.push(format!("{title}: {caption}")),
            // Hidden cards are not part of the page.
            PanelStatus::Hidden => {}
        }
    }

    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageSlot, PanelSummary, RequestState, SourceKind};

    #[test]
    fn lists_visible_panels_only() {
        let report = Report {
            timestamp_utc: "2026-10-19T10:00:00Z".into(),
            endpoint: "http://localhost/hook".into(),
            file: Some("scan.png".into()),
            state: RequestState::Success,
            result: Some("Tumor detectado".into()),
            probability: Some(0.8734),
            percentage: Some("87.34%".into()),
            verdict: Some(Verdict::TumorDetected),
            verdict_icon: None,
            error: None,
            panels: vec![
                PanelSummary {
                    slot: ImageSlot::Original,
                    status: PanelStatus::Image {
                        mime: "image/png".into(),
                        width: 256,
                        height: 256,
                        source: SourceKind::DataUri,
                    },
                },
                PanelSummary {
                    slot: ImageSlot::Mask,
                    status: PanelStatus::Hidden,
                },
                PanelSummary {
                    slot: ImageSlot::Overlay,
                    status: PanelStatus::Placeholder {
                        caption: "Overlay not available".into(),
                    },
                },
            ],
        };

        let lines = build_text_summary(&report).lines;
        assert_eq!(
            lines,
            vec![
                "File: scan.png",
                "Diagnosis: Tumor detectado",
                "Probability: 87.34%",
                "Status: TUMOR DETECTED [tumor-detected]",
                "Original: 256x256 image/png (DataUri)",
                "Overlay: Overlay not available",
            ]
        );
    }
}
