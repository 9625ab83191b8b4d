use crate::model::Report;
use crate::view::PageState;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub fn export_json(path: &Path, report: &Report) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create export directory {}", parent.display()))?;
    }
    let data = serde_json::to_vec_pretty(report)?;
    std::fs::write(path, data).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Write every decoded panel image as `<stem>-<image id>.<ext>` under `dir`.
pub fn save_images(dir: &Path, stem: &str, page: &PageState) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let mut written = Vec::new();
    for (slot, img) in page.images() {
        let path = dir.join(format!("{stem}-{}.{}", slot.image_id(), img.extension()));
        std::fs::write(&path, &img.bytes).with_context(|| format!("write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// File stem for exported images, derived from the submitted file name.
pub fn stem_for(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if stem.is_empty() {
        "analysis".into()
    } else {
        stem
    }
}
