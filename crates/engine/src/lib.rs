//! PDF inspection for uploaded flipbooks.

use std::fs;
use std::path::Path;

use anyhow::Context as _;
use pdf::file::FileOptions;

/// What an uploaded PDF contributes to a new flipbook record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfInfo {
    pub title: String,
    pub pages: u32,
    pub size: u64,
}

#[derive(Debug, Default)]
pub struct Engine;

impl Engine {
    pub fn new() -> Self {
        Self
    }

    pub fn page_count(&self, path: &Path) -> anyhow::Result<u32> {
        let file = FileOptions::cached()
            .open(path)
            .with_context(|| format!("open pdf {}", path.display()))?;
        Ok(file.num_pages())
    }

    pub fn inspect(&self, path: &Path) -> anyhow::Result<PdfInfo> {
        let size = fs::metadata(path)
            .with_context(|| format!("stat {}", path.display()))?
            .len();
        let pages = self.page_count(path)?;
        tracing::debug!(path = %path.display(), pages, size, "inspected pdf");
        Ok(PdfInfo {
            title: title_from_path(path),
            pages,
            size,
        })
    }
}

pub fn title_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .replace(['_', '-'], " ");
    let title = stem.split_whitespace().collect::<Vec<_>>().join(" ");
    if title.is_empty() {
        "untitled".to_string()
    } else {
        title
    }
}
