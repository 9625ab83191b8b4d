use crate::error::SubmitError;
use crate::model::{AnalysisResponse, ImageSlot, LoadedImage, PanelContent, Verdict};
use crate::view::{View, ViewUpdate};

/// `0.8734` -> `"87.34%"`.
pub fn format_percentage(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

/// Map a panel's load outcome to what its card shows.
///
/// `None` means the response carried no source for the slot. The original image
/// card is never hidden; it degrades to a placeholder instead.
pub fn panel_content(
    slot: ImageSlot,
    outcome: Option<Result<LoadedImage, SubmitError>>,
) -> PanelContent {
    match outcome {
        Some(Ok(img)) => PanelContent::Image(img),
        Some(Err(_)) => PanelContent::Placeholder {
            caption: slot.placeholder_caption().to_string(),
        },
        None if slot == ImageSlot::Original => PanelContent::Placeholder {
            caption: slot.placeholder_caption().to_string(),
        },
        None => PanelContent::Hidden,
    }
}

/// Push a validated response onto the page.
pub fn render<V: View + ?Sized>(
    view: &mut V,
    response: &AnalysisResponse,
    positive_marker: &str,
    panels: [PanelContent; 3],
) {
    view.update(ViewUpdate::ResultText(response.result.clone()));
    view.update(ViewUpdate::Probability(format_percentage(
        response.probability,
    )));
    view.update(ViewUpdate::Verdict(Verdict::classify(
        &response.result,
        positive_marker,
    )));

    for (slot, content) in ImageSlot::ALL.into_iter().zip(panels) {
        view.update(ViewUpdate::Card { slot, content });
    }

    view.update(ViewUpdate::ResultsVisible(true));
    view.update(ViewUpdate::Progress(Some(100)));
}
