//! Application orchestration layer for Flipshelf.

mod library;
mod menu;
mod wizard;

pub use library::{
    BookDraft, Library, LibraryError, LibraryView, MoveDestination, PendingAction, Target,
};
pub use menu::{Bounds, ContextMenu, MenuItem, MenuPlacement, MenuTarget, place_menu};
pub use wizard::{
    ProgressEvent, TemplatePicker, TrackedUpload, UploadQueue, Wizard, WizardError,
    WizardOutcome, WizardView, is_pdf, template_draft,
};

use flipshelf_core::{Session, Settings};

#[derive(Debug, Clone)]
pub struct AppContext {
    pub settings: Settings,
    pub session: Option<Session>,
    pub library: Library,
}

impl AppContext {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            session: None,
            library: Library::new(),
        }
    }

    pub fn with_library(mut self, library: Library) -> Self {
        self.library = library;
        self
    }

    pub fn with_session(mut self, session: Option<Session>) -> Self {
        self.session = session.filter(|s| s.is_logged_in);
        self
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }

    pub fn wizard(&self) -> Wizard {
        Wizard::from_settings(&self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logged_out_session_is_ignored() {
        let session = Session {
            email_id: "a@b.co".to_string(),
            is_logged_in: false,
            profile: Default::default(),
        };
        let ctx = AppContext::new(Settings::default()).with_session(Some(session));
        assert!(!ctx.is_signed_in());
    }
}
