//! Flipbook creation wizard: pick a method, then upload PDFs or pick a template.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use flipshelf_core::{
    DEFAULT_TEMPLATE_ID, PageCount, Settings, TEMPLATES, Template, template_by_id,
};
use thiserror::Error;

use crate::library::BookDraft;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("Only PDF files can be uploaded: {0}")]
    NotPdf(PathBuf),
    #[error("Add at least one PDF first")]
    NoFiles,
    #[error("Wait for uploads to finish")]
    UploadInProgress,
    #[error("Choose a method first")]
    NothingToSubmit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardOutcome {
    Upload(Vec<PathBuf>),
    Template { template_id: String, page_count: u32 },
}

/// Progress update for one tracked file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub path: PathBuf,
    pub progress: u8,
}

impl ProgressEvent {
    pub fn is_complete(&self) -> bool {
        self.progress >= 100
    }
}

#[derive(Debug, Clone)]
pub struct TrackedUpload {
    pub path: PathBuf,
    pub progress: u8,
    next_tick: Instant,
}

impl TrackedUpload {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= 100
    }
}

/// Files attached in the upload view. Each file owns its own simulated
/// progress ticker; removing the file (or dropping the queue) stops it.
#[derive(Debug, Clone)]
pub struct UploadQueue {
    files: Vec<TrackedUpload>,
    interval: Duration,
    step: u8,
}

impl UploadQueue {
    pub fn new(interval: Duration, step: u8) -> Self {
        Self {
            files: Vec::new(),
            interval: interval.max(Duration::from_millis(1)),
            step: step.clamp(1, 100),
        }
    }

    pub fn files(&self) -> &[TrackedUpload] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn all_complete(&self) -> bool {
        self.files.iter().all(TrackedUpload::is_complete)
    }

    /// Attaches a PDF. Returns `Ok(false)` when the path is already queued.
    pub fn attach(&mut self, path: impl Into<PathBuf>, now: Instant) -> Result<bool, WizardError> {
        let path = path.into();
        if !is_pdf(&path) {
            return Err(WizardError::NotPdf(path));
        }
        if self.files.iter().any(|f| f.path == path) {
            return Ok(false);
        }
        tracing::debug!(path = %path.display(), "attached upload");
        self.files.push(TrackedUpload {
            path,
            progress: 0,
            next_tick: now + self.interval,
        });
        Ok(true)
    }

    pub fn remove(&mut self, index: usize) -> Option<PathBuf> {
        if index < self.files.len() {
            Some(self.files.remove(index).path)
        } else {
            None
        }
    }

    /// Advances every file whose interval elapsed, catching up on missed
    /// ticks. Yields one event per file that moved.
    pub fn tick(&mut self, now: Instant) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        for file in &mut self.files {
            let mut moved = false;
            while !file.is_complete() && now >= file.next_tick {
                file.progress = file.progress.saturating_add(self.step).min(100);
                file.next_tick += self.interval;
                moved = true;
            }
            if moved {
                events.push(ProgressEvent {
                    path: file.path.clone(),
                    progress: file.progress,
                });
            }
        }
        events
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }
}

pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Book record for a template submission. Unknown ids fall back to a plain title.
pub fn template_draft(template_id: &str, page_count: u32) -> BookDraft {
    let title = match template_by_id(template_id) {
        Some(template) => format!("{} flipbook", template.name),
        None => "Untitled flipbook".to_string(),
    };
    BookDraft {
        title,
        pages: PageCount::new(page_count).get(),
        size: 0,
        image: None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePicker {
    selected: usize,
    pub page_count: PageCount,
}

impl Default for TemplatePicker {
    fn default() -> Self {
        let selected = TEMPLATES
            .iter()
            .position(|t| t.id == DEFAULT_TEMPLATE_ID)
            .unwrap_or(0);
        Self {
            selected,
            page_count: PageCount::default(),
        }
    }
}

impl TemplatePicker {
    pub fn templates(&self) -> &'static [Template] {
        TEMPLATES
    }

    pub fn selected(&self) -> &'static Template {
        &TEMPLATES[self.selected]
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn select(&mut self, id: &str) -> bool {
        match TEMPLATES.iter().position(|t| t.id == id) {
            Some(pos) => {
                self.selected = pos;
                true
            }
            None => false,
        }
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1) % TEMPLATES.len();
    }

    pub fn select_prev(&mut self) {
        self.selected = (self.selected + TEMPLATES.len() - 1) % TEMPLATES.len();
    }
}

#[derive(Debug, Clone)]
pub enum WizardView {
    Selection,
    Upload(UploadQueue),
    Template(TemplatePicker),
}

#[derive(Debug, Clone)]
pub struct Wizard {
    view: WizardView,
    interval: Duration,
    step: u8,
}

impl Wizard {
    pub fn new(interval: Duration, step: u8) -> Self {
        Self {
            view: WizardView::Selection,
            interval,
            step,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Duration::from_millis(settings.upload_tick_ms),
            settings.upload_step,
        )
    }

    pub fn view(&self) -> &WizardView {
        &self.view
    }

    /// Enters the upload view; only valid from the selection view.
    pub fn choose_upload(&mut self) -> bool {
        if !matches!(self.view, WizardView::Selection) {
            return false;
        }
        self.view = WizardView::Upload(UploadQueue::new(self.interval, self.step));
        true
    }

    pub fn choose_template(&mut self) -> bool {
        if !matches!(self.view, WizardView::Selection) {
            return false;
        }
        self.view = WizardView::Template(TemplatePicker::default());
        true
    }

    /// Returns to the selection view, dropping any in-flight uploads.
    pub fn back(&mut self) {
        if let WizardView::Upload(queue) = &self.view
            && !queue.is_empty()
        {
            tracing::debug!(files = queue.files().len(), "cancelled uploads");
        }
        self.view = WizardView::Selection;
    }

    pub fn upload_mut(&mut self) -> Option<&mut UploadQueue> {
        match &mut self.view {
            WizardView::Upload(queue) => Some(queue),
            _ => None,
        }
    }

    pub fn template_mut(&mut self) -> Option<&mut TemplatePicker> {
        match &mut self.view {
            WizardView::Template(picker) => Some(picker),
            _ => None,
        }
    }

    pub fn tick(&mut self, now: Instant) -> Vec<ProgressEvent> {
        match &mut self.view {
            WizardView::Upload(queue) => queue.tick(now),
            _ => Vec::new(),
        }
    }

    pub fn submit(&self) -> Result<WizardOutcome, WizardError> {
        match &self.view {
            WizardView::Selection => Err(WizardError::NothingToSubmit),
            WizardView::Upload(queue) => {
                if queue.is_empty() {
                    return Err(WizardError::NoFiles);
                }
                if !queue.all_complete() {
                    return Err(WizardError::UploadInProgress);
                }
                Ok(WizardOutcome::Upload(queue.paths()))
            }
            WizardView::Template(picker) => Ok(WizardOutcome::Template {
                template_id: picker.selected().id.to_string(),
                page_count: picker.page_count.get(),
            }),
        }
    }
}
