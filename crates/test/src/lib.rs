//! Test helpers and fixtures.

use chrono::NaiveDate;
use flipshelf_application::Library;
use flipshelf_core::{Book, BookId, Folder, FolderId, Settings, Theme};

pub fn make_settings(upload_step: u8) -> Settings {
    Settings {
        backend_url: "http://127.0.0.1:9".to_string(),
        upload_tick_ms: 100,
        upload_step,
        theme: Theme::Dark,
    }
}

pub fn make_book(id: &str, title: &str, folder: &FolderId) -> Book {
    Book {
        id: BookId(id.to_string()),
        title: title.to_string(),
        pages: 16,
        created: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
        views: 0,
        size: 1024,
        folder: folder.clone(),
        image: None,
    }
}

/// Default folder holding three books, plus an empty "Drafts" folder.
pub fn sample_library() -> Library {
    let public = FolderId::default_folder();
    let drafts = Folder {
        id: FolderId("drafts".to_string()),
        name: "Drafts".to_string(),
    };
    Library::from_parts(
        vec![Folder::default_folder(), drafts],
        vec![
            make_book("b1", "Annual Report", &public),
            make_book("b2", "Product Catalog", &public),
            make_book("b3", "Menu", &public),
        ],
    )
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use flipshelf_application::{
        MoveDestination, WizardOutcome, WizardView, template_draft,
    };
    use flipshelf_storage::Storage;

    use super::*;

    #[test]
    fn builds_settings() {
        let settings = make_settings(25);
        assert_eq!(settings.upload_step, 25);
    }

    #[test]
    fn travel_folder_template_scenario() {
        let mut library = sample_library();
        let settings = make_settings(10);

        let travel = library.create_folder("Travel").unwrap();
        assert_eq!(library.active_folder_id(), &travel);
        assert!(library.list_by_folder(&travel).is_empty());

        let mut wizard = flipshelf_application::Wizard::from_settings(&settings);
        assert!(wizard.choose_template());
        wizard.template_mut().unwrap().page_count.set(5);
        let outcome = wizard.submit().unwrap();
        assert_eq!(
            outcome,
            WizardOutcome::Template {
                template_id: "corporate".to_string(),
                page_count: 6,
            }
        );

        let WizardOutcome::Template {
            template_id,
            page_count,
        } = outcome
        else {
            unreachable!("template flow submits a template outcome");
        };
        library.add_book(template_draft(&template_id, page_count));
        let visible = library.visible_books();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].title, "Corporate flipbook");
        assert_eq!(visible[0].pages, 6);
    }

    #[test]
    fn upload_scenario_ticks_to_completion() {
        let settings = make_settings(50);
        let mut wizard = flipshelf_application::Wizard::from_settings(&settings);
        wizard.choose_upload();
        let start = Instant::now();
        wizard.upload_mut().unwrap().attach("brochure.pdf", start).unwrap();
        let events = wizard.tick(start + Duration::from_millis(100));
        assert_eq!(events[0].progress, 50);
        let events = wizard.tick(start + Duration::from_millis(200));
        assert!(events[0].is_complete());
        assert!(matches!(wizard.submit(), Ok(WizardOutcome::Upload(paths)) if paths.len() == 1));
        wizard.back();
        assert!(matches!(wizard.view(), WizardView::Selection));
    }

    #[test]
    fn bulk_move_then_persist_and_reload() -> anyhow::Result<()> {
        let mut library = sample_library();
        library.toggle_select(&BookId("b1".to_string()));
        library.toggle_select(&BookId("b3".to_string()));
        library.request_move_selected()?;
        let drafts = FolderId("drafts".to_string());
        library.confirm_move(MoveDestination::Existing(drafts.clone()))?;
        assert_eq!(library.active_folder_id(), &drafts);
        assert!(library.selection().is_empty());

        let path = std::env::temp_dir().join(format!("flipshelf-test-{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let storage = Storage::open(&path)?;
        storage.save_library(library.folders(), library.books())?;
        let (folders, books) = storage.load_library()?;
        drop(storage);
        std::fs::remove_file(&path)?;

        let reloaded = Library::from_parts(folders, books);
        assert_eq!(reloaded.list_by_folder(&drafts).len(), 2);
        assert!(reloaded.active_folder_id().is_default());
        Ok(())
    }

    #[test]
    fn deleting_folder_keeps_its_books() {
        let mut library = sample_library();
        let drafts = FolderId("drafts".to_string());
        library
            .move_book(&BookId("b2".to_string()), &drafts)
            .unwrap();
        library.request_delete_folder(&drafts).unwrap();
        library.confirm_delete().unwrap();
        assert_eq!(library.books().len(), 3);
        assert_eq!(
            library.list_by_folder(&FolderId::default_folder()).len(),
            3
        );
    }
}
