//! Folder and book state for the dashboard.

use std::collections::HashSet;

use chrono::NaiveDate;
use flipshelf_core::{Book, BookId, Folder, FolderId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LibraryError {
    #[error("Name cannot be empty")]
    EmptyName,
    #[error("Folder not found: {0}")]
    UnknownFolder(FolderId),
    #[error("Flipbook not found: {0}")]
    UnknownBook(BookId),
    #[error("The default folder cannot be deleted")]
    DefaultFolder,
    #[error("No flipbooks selected")]
    EmptySelection,
    #[error("Nothing to confirm")]
    NothingPending,
}

/// Books an action applies to: one row, or the whole selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Single(BookId),
    Bulk(Vec<BookId>),
}

impl Target {
    pub fn ids(&self) -> &[BookId] {
        match self {
            Target::Single(id) => std::slice::from_ref(id),
            Target::Bulk(ids) => ids,
        }
    }

    pub fn is_bulk(&self) -> bool {
        matches!(self, Target::Bulk(_))
    }
}

/// An action waiting for the user to confirm it in a modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    DeleteFolder { id: FolderId, name: String },
    DeleteBooks(Target),
    MoveBooks(Target),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveDestination {
    Existing(FolderId),
    New(String),
}

/// Fields of a new flipbook; id, date, views and folder are filled in by the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDraft {
    pub title: String,
    pub pages: u32,
    pub size: u64,
    pub image: Option<String>,
}

/// Read-only snapshot handed to the view layer.
#[derive(Debug, Clone)]
pub struct LibraryView<'a> {
    pub folders: &'a [Folder],
    pub active: &'a Folder,
    pub books: Vec<&'a Book>,
    pub selected: &'a HashSet<BookId>,
    pub pending: Option<&'a PendingAction>,
    pub revision: u64,
}

impl LibraryView<'_> {
    pub fn all_visible_selected(&self) -> bool {
        !self.books.is_empty() && self.books.iter().all(|b| self.selected.contains(&b.id))
    }
}

#[derive(Debug, Clone)]
pub struct Library {
    folders: Vec<Folder>,
    books: Vec<Book>,
    active: FolderId,
    selected: HashSet<BookId>,
    pending: Option<PendingAction>,
    revision: u64,
    seq: u64,
}

impl Default for Library {
    fn default() -> Self {
        Self::new()
    }
}

impl Library {
    pub fn new() -> Self {
        Self::from_parts(Vec::new(), Vec::new())
    }

    /// Builds a library from stored records, restoring the folder invariants:
    /// the default folder exists and every book points at a known folder.
    pub fn from_parts(mut folders: Vec<Folder>, mut books: Vec<Book>) -> Self {
        folders.retain(|f| !f.name.trim().is_empty());
        if !folders.iter().any(|f| f.id.is_default()) {
            folders.insert(0, Folder::default_folder());
        }
        let known: HashSet<FolderId> = folders.iter().map(|f| f.id.clone()).collect();
        for book in &mut books {
            if !known.contains(&book.folder) {
                tracing::warn!(book = %book.id, folder = %book.folder, "reassigning book with unknown folder");
                book.folder = FolderId::default_folder();
            }
        }
        Self {
            folders,
            books,
            active: FolderId::default_folder(),
            selected: HashSet::new(),
            pending: None,
            revision: 0,
            seq: 0,
        }
    }

    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn folder(&self, id: &FolderId) -> Option<&Folder> {
        self.folders.iter().find(|f| &f.id == id)
    }

    pub fn book(&self, id: &BookId) -> Option<&Book> {
        self.books.iter().find(|b| &b.id == id)
    }

    pub fn active_folder_id(&self) -> &FolderId {
        &self.active
    }

    pub fn active_folder(&self) -> &Folder {
        // The default folder cannot be deleted, so `folders` is never empty.
        let pos = self
            .folders
            .iter()
            .position(|f| f.id == self.active)
            .unwrap_or(0);
        &self.folders[pos]
    }

    pub fn selection(&self) -> &HashSet<BookId> {
        &self.selected
    }

    pub fn is_selected(&self, id: &BookId) -> bool {
        self.selected.contains(id)
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        self.pending.as_ref()
    }

    /// Incremented by every mutation; lets observers skip unchanged snapshots.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn view(&self) -> LibraryView<'_> {
        LibraryView {
            folders: &self.folders,
            active: self.active_folder(),
            books: self.visible_books(),
            selected: &self.selected,
            pending: self.pending.as_ref(),
            revision: self.revision,
        }
    }

    pub fn list_by_folder(&self, folder: &FolderId) -> Vec<&Book> {
        self.books.iter().filter(|b| &b.folder == folder).collect()
    }

    pub fn visible_books(&self) -> Vec<&Book> {
        self.list_by_folder(&self.active)
    }

    pub fn book_count(&self, folder: &FolderId) -> usize {
        self.books.iter().filter(|b| &b.folder == folder).count()
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn new_id(&mut self) -> String {
        self.seq += 1;
        let millis = chrono::Utc::now().timestamp_millis();
        format!("{millis:x}-{:x}", self.seq)
    }

    fn require_folder(&self, id: &FolderId) -> Result<(), LibraryError> {
        if self.folder(id).is_some() {
            Ok(())
        } else {
            Err(LibraryError::UnknownFolder(id.clone()))
        }
    }

    pub fn set_active_folder(&mut self, id: &FolderId) -> Result<(), LibraryError> {
        self.require_folder(id)?;
        if &self.active != id {
            self.active = id.clone();
            self.selected.clear();
            self.touch();
        }
        Ok(())
    }

    pub fn create_folder(&mut self, name: &str) -> Result<FolderId, LibraryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LibraryError::EmptyName);
        }
        let id = FolderId(self.new_id());
        self.folders.push(Folder {
            id: id.clone(),
            name: name.to_string(),
        });
        self.active = id.clone();
        self.selected.clear();
        self.touch();
        tracing::debug!(folder = %id, name, "created folder");
        Ok(id)
    }

    pub fn rename_folder(&mut self, id: &FolderId, new_name: &str) -> bool {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return false;
        }
        let Some(folder) = self.folders.iter_mut().find(|f| &f.id == id) else {
            return false;
        };
        folder.name = new_name.to_string();
        self.touch();
        tracing::debug!(folder = %id, name = new_name, "renamed folder");
        true
    }

    /// Removes a folder and moves its books into the default folder.
    /// Returns how many books were moved.
    pub fn delete_folder(&mut self, id: &FolderId) -> Result<usize, LibraryError> {
        if id.is_default() {
            return Err(LibraryError::DefaultFolder);
        }
        let Some(pos) = self.folders.iter().position(|f| &f.id == id) else {
            return Err(LibraryError::UnknownFolder(id.clone()));
        };
        self.folders.remove(pos);

        let fallback = FolderId::default_folder();
        let mut moved = 0;
        for book in self.books.iter_mut().filter(|b| &b.folder == id) {
            book.folder = fallback.clone();
            moved += 1;
        }

        if &self.active == id {
            self.active = fallback;
            self.selected.clear();
        }
        self.touch();
        tracing::debug!(folder = %id, moved, "deleted folder");
        Ok(moved)
    }

    pub fn duplicate_folder(&mut self, id: &FolderId) -> Result<FolderId, LibraryError> {
        let Some(source) = self.folder(id) else {
            return Err(LibraryError::UnknownFolder(id.clone()));
        };
        let name = format!("{} Copy", source.name);
        let new_id = FolderId(self.new_id());
        self.folders.push(Folder {
            id: new_id.clone(),
            name,
        });
        self.touch();
        Ok(new_id)
    }

    pub fn toggle_select(&mut self, id: &BookId) {
        if !self.selected.remove(id) {
            if self.book(id).is_none() {
                return;
            }
            self.selected.insert(id.clone());
        }
        self.touch();
    }

    /// Selects every visible book, or clears the selection when that is
    /// already the case.
    pub fn select_all(&mut self) {
        let visible: HashSet<BookId> = self.visible_books().iter().map(|b| b.id.clone()).collect();
        if !visible.is_empty() && self.selected == visible {
            self.selected.clear();
        } else {
            self.selected = visible;
        }
        self.touch();
    }

    pub fn clear_selection(&mut self) {
        if !self.selected.is_empty() {
            self.selected.clear();
            self.touch();
        }
    }

    pub fn rename_book(&mut self, id: &BookId, new_title: &str) -> bool {
        let new_title = new_title.trim();
        if new_title.is_empty() {
            return false;
        }
        let Some(book) = self.books.iter_mut().find(|b| &b.id == id) else {
            return false;
        };
        book.title = new_title.to_string();
        self.touch();
        true
    }

    pub fn duplicate_book(&mut self, id: &BookId) -> Result<BookId, LibraryError> {
        self.duplicate_book_on(id, chrono::Local::now().date_naive())
    }

    pub fn duplicate_book_on(
        &mut self,
        id: &BookId,
        created: NaiveDate,
    ) -> Result<BookId, LibraryError> {
        let Some(source) = self.book(id) else {
            return Err(LibraryError::UnknownBook(id.clone()));
        };
        let mut copy = source.clone();
        copy.id = BookId(self.new_id());
        copy.title = format!("{} Copy", copy.title);
        copy.created = created;
        copy.views = 0;
        let new_id = copy.id.clone();
        self.books.insert(0, copy);
        self.touch();
        tracing::debug!(source = %id, book = %new_id, "duplicated book");
        Ok(new_id)
    }

    /// Adds a new book to the active folder, at the front of the list.
    pub fn add_book(&mut self, draft: BookDraft) -> BookId {
        self.add_book_on(draft, chrono::Local::now().date_naive())
    }

    pub fn add_book_on(&mut self, draft: BookDraft, created: NaiveDate) -> BookId {
        let id = BookId(self.new_id());
        let title = match draft.title.trim() {
            "" => "Untitled".to_string(),
            title => title.to_string(),
        };
        self.books.insert(
            0,
            Book {
                id: id.clone(),
                title,
                pages: draft.pages,
                created,
                views: 0,
                size: draft.size,
                folder: self.active.clone(),
                image: draft.image,
            },
        );
        self.touch();
        id
    }

    pub fn delete_book(&mut self, id: &BookId) -> bool {
        self.delete_books(std::slice::from_ref(id)) > 0
    }

    pub fn delete_books(&mut self, ids: &[BookId]) -> usize {
        let doomed: HashSet<&BookId> = ids.iter().collect();
        let before = self.books.len();
        self.books.retain(|b| !doomed.contains(&b.id));
        for id in ids {
            self.selected.remove(id);
        }
        let removed = before - self.books.len();
        if removed > 0 {
            self.touch();
            tracing::debug!(removed, "deleted books");
        }
        removed
    }

    /// Moves one book; the active folder stays and only this id leaves the selection.
    pub fn move_book(&mut self, id: &BookId, folder: &FolderId) -> Result<(), LibraryError> {
        self.require_folder(folder)?;
        let Some(book) = self.books.iter_mut().find(|b| &b.id == id) else {
            return Err(LibraryError::UnknownBook(id.clone()));
        };
        book.folder = folder.clone();
        self.selected.remove(id);
        self.touch();
        Ok(())
    }

    /// Moves several books, clears the selection and shows the target folder.
    pub fn move_books(&mut self, ids: &[BookId], folder: &FolderId) -> Result<usize, LibraryError> {
        self.require_folder(folder)?;
        let wanted: HashSet<&BookId> = ids.iter().collect();
        let mut moved = 0;
        for book in self.books.iter_mut().filter(|b| wanted.contains(&b.id)) {
            book.folder = folder.clone();
            moved += 1;
        }
        self.selected.clear();
        self.active = folder.clone();
        self.touch();
        tracing::debug!(moved, folder = %folder, "moved books");
        Ok(moved)
    }

    fn move_target(&mut self, target: &Target, folder: &FolderId) -> Result<(), LibraryError> {
        match target {
            Target::Single(id) => self.move_book(id, folder),
            Target::Bulk(ids) => self.move_books(ids, folder).map(|_| ()),
        }
    }

    /// Creates a folder and moves the target into it. Nothing changes when
    /// the name is empty or a book id is unknown.
    pub fn create_folder_and_move(
        &mut self,
        name: &str,
        target: &Target,
    ) -> Result<FolderId, LibraryError> {
        if name.trim().is_empty() {
            return Err(LibraryError::EmptyName);
        }
        if let Some(missing) = target.ids().iter().find(|id| self.book(id).is_none()) {
            return Err(LibraryError::UnknownBook(missing.clone()));
        }

        let previous_active = self.active.clone();
        let previous_selection = self.selected.clone();
        let folder = self.create_folder(name)?;
        // create_folder switched the view; a single move keeps the old one.
        self.active = previous_active;
        self.selected = previous_selection;
        self.move_target(target, &folder)?;
        Ok(folder)
    }

    pub fn request_delete_folder(&mut self, id: &FolderId) -> Result<(), LibraryError> {
        if id.is_default() {
            return Err(LibraryError::DefaultFolder);
        }
        let Some(folder) = self.folder(id) else {
            return Err(LibraryError::UnknownFolder(id.clone()));
        };
        self.pending = Some(PendingAction::DeleteFolder {
            id: id.clone(),
            name: folder.name.clone(),
        });
        Ok(())
    }

    pub fn request_delete_book(&mut self, id: &BookId) -> Result<(), LibraryError> {
        self.book(id)
            .ok_or_else(|| LibraryError::UnknownBook(id.clone()))?;
        self.pending = Some(PendingAction::DeleteBooks(Target::Single(id.clone())));
        Ok(())
    }

    pub fn request_delete_selected(&mut self) -> Result<(), LibraryError> {
        let target = self.selection_target()?;
        self.pending = Some(PendingAction::DeleteBooks(target));
        Ok(())
    }

    pub fn request_move_book(&mut self, id: &BookId) -> Result<(), LibraryError> {
        self.book(id)
            .ok_or_else(|| LibraryError::UnknownBook(id.clone()))?;
        self.pending = Some(PendingAction::MoveBooks(Target::Single(id.clone())));
        Ok(())
    }

    pub fn request_move_selected(&mut self) -> Result<(), LibraryError> {
        let target = self.selection_target()?;
        self.pending = Some(PendingAction::MoveBooks(target));
        Ok(())
    }

    /// Selection in list order, so bulk actions are deterministic.
    fn selection_target(&self) -> Result<Target, LibraryError> {
        let ids: Vec<BookId> = self
            .books
            .iter()
            .filter(|b| self.selected.contains(&b.id))
            .map(|b| b.id.clone())
            .collect();
        if ids.is_empty() {
            return Err(LibraryError::EmptySelection);
        }
        Ok(Target::Bulk(ids))
    }

    pub fn cancel_pending(&mut self) {
        self.pending = None;
    }

    /// Applies a pending delete of a folder or of books.
    pub fn confirm_delete(&mut self) -> Result<(), LibraryError> {
        match self.pending.take() {
            Some(PendingAction::DeleteFolder { id, .. }) => self.delete_folder(&id).map(|_| ()),
            Some(PendingAction::DeleteBooks(target)) => {
                self.delete_books(target.ids());
                Ok(())
            }
            other => {
                self.pending = other;
                Err(LibraryError::NothingPending)
            }
        }
    }

    /// Applies a pending move. On error the request stays open so the modal
    /// can show the problem.
    pub fn confirm_move(&mut self, destination: MoveDestination) -> Result<FolderId, LibraryError> {
        if !matches!(self.pending, Some(PendingAction::MoveBooks(_))) {
            return Err(LibraryError::NothingPending);
        }
        let Some(PendingAction::MoveBooks(target)) = self.pending.take() else {
            return Err(LibraryError::NothingPending);
        };
        let result = match &destination {
            MoveDestination::Existing(folder) => {
                self.move_target(&target, folder).map(|_| folder.clone())
            }
            MoveDestination::New(name) => self.create_folder_and_move(name, &target),
        };
        if result.is_err() {
            self.pending = Some(PendingAction::MoveBooks(target));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn book(id: &str, title: &str, folder: &FolderId) -> Book {
        Book {
            id: BookId(id.to_string()),
            title: title.to_string(),
            pages: 12,
            created: date(2024, 1, 15),
            views: 7,
            size: 2048,
            folder: folder.clone(),
            image: None,
        }
    }

    fn library_with_books() -> Library {
        let public = FolderId::default_folder();
        Library::from_parts(
            vec![Folder::default_folder()],
            vec![
                book("a", "Annual Report", &public),
                book("b", "Brochure", &public),
                book("c", "Catalog", &public),
            ],
        )
    }

    fn id(value: &str) -> BookId {
        BookId(value.to_string())
    }

    #[test]
    fn new_library_has_active_default_folder() {
        let library = Library::new();
        assert_eq!(library.folders().len(), 1);
        assert!(library.active_folder_id().is_default());
        assert_eq!(library.active_folder().name, "Public Books");
    }

    #[test]
    fn from_parts_repairs_unknown_folder_refs() {
        let ghost = FolderId("ghost".to_string());
        let library = Library::from_parts(Vec::new(), vec![book("a", "A", &ghost)]);
        assert!(library.books()[0].folder.is_default());
        assert!(library.folder(&FolderId::default_folder()).is_some());
    }

    #[test]
    fn create_folder_activates_it() {
        let mut library = library_with_books();
        library.toggle_select(&id("a"));
        let travel = library.create_folder("  Travel ").unwrap();
        assert_eq!(library.active_folder_id(), &travel);
        assert_eq!(library.active_folder().name, "Travel");
        assert!(library.visible_books().is_empty());
        assert!(library.selection().is_empty());
    }

    #[test]
    fn create_folder_rejects_blank_names() {
        let mut library = Library::new();
        let revision = library.revision();
        assert_eq!(library.create_folder("   "), Err(LibraryError::EmptyName));
        assert_eq!(library.folders().len(), 1);
        assert_eq!(library.revision(), revision);
    }

    #[test]
    fn rename_folder_ignores_blank_names() {
        let mut library = Library::new();
        let travel = library.create_folder("Travel").unwrap();
        assert!(!library.rename_folder(&travel, ""));
        assert!(!library.rename_folder(&travel, " \t "));
        assert_eq!(library.folder(&travel).unwrap().name, "Travel");
    }

    #[test]
    fn rename_folder_keeps_books_attached() {
        let mut library = library_with_books();
        let travel = library.create_folder("Travel").unwrap();
        library.set_active_folder(&FolderId::default_folder()).unwrap();
        library.move_book(&id("a"), &travel).unwrap();

        assert!(library.rename_folder(&travel, "Trips"));
        assert_eq!(library.list_by_folder(&travel).len(), 1);
        assert_eq!(library.folder(&travel).unwrap().name, "Trips");
    }

    #[test]
    fn delete_folder_moves_books_to_default_and_resets_active() {
        let mut library = library_with_books();
        let travel = library.create_folder("Travel").unwrap();
        library.add_book_on(
            BookDraft {
                title: "Map".to_string(),
                pages: 4,
                size: 0,
                image: None,
            },
            date(2024, 2, 1),
        );
        assert_eq!(library.book_count(&travel), 1);

        assert_eq!(library.delete_folder(&travel), Ok(1));
        assert!(library.folder(&travel).is_none());
        assert!(library.active_folder_id().is_default());
        assert_eq!(library.visible_books().len(), 4);
    }

    #[test]
    fn default_folder_cannot_be_deleted() {
        let mut library = Library::new();
        let public = FolderId::default_folder();
        assert_eq!(library.delete_folder(&public), Err(LibraryError::DefaultFolder));
        assert_eq!(
            library.request_delete_folder(&public),
            Err(LibraryError::DefaultFolder)
        );
    }

    #[test]
    fn duplicate_folder_appends_copy_without_books() {
        let mut library = library_with_books();
        let public = FolderId::default_folder();
        let copy = library.duplicate_folder(&public).unwrap();
        assert_eq!(library.folders().last().unwrap().name, "Public Books Copy");
        assert_eq!(library.book_count(&copy), 0);
        assert!(library.active_folder_id().is_default());
    }

    #[test]
    fn select_all_twice_clears() {
        let mut library = library_with_books();
        library.select_all();
        assert_eq!(library.selection().len(), 3);
        assert!(library.view().all_visible_selected());
        library.select_all();
        assert!(library.selection().is_empty());
    }

    #[test]
    fn select_all_from_partial_selects_visible_set_only() {
        let mut library = library_with_books();
        let travel = library.create_folder("Travel").unwrap();
        library.set_active_folder(&FolderId::default_folder()).unwrap();
        library.move_book(&id("c"), &travel).unwrap();

        library.toggle_select(&id("a"));
        library.select_all();
        let selected = library.selection();
        assert_eq!(selected.len(), 2);
        assert!(selected.contains(&id("a")) && selected.contains(&id("b")));
    }

    #[test]
    fn switching_folder_clears_selection() {
        let mut library = library_with_books();
        library.toggle_select(&id("a"));
        let travel = library.create_folder("Travel").unwrap();
        library.set_active_folder(&FolderId::default_folder()).unwrap();
        library.toggle_select(&id("b"));
        library.set_active_folder(&travel).unwrap();
        assert!(library.selection().is_empty());
    }

    #[test]
    fn toggle_select_ignores_unknown_ids() {
        let mut library = library_with_books();
        library.toggle_select(&id("zzz"));
        assert!(library.selection().is_empty());
        library.toggle_select(&id("a"));
        library.toggle_select(&id("a"));
        assert!(library.selection().is_empty());
    }

    #[test]
    fn rename_book_ignores_blank_titles() {
        let mut library = library_with_books();
        assert!(!library.rename_book(&id("a"), "  "));
        assert_eq!(library.book(&id("a")).unwrap().title, "Annual Report");
        assert!(library.rename_book(&id("a"), " Report 2024 "));
        assert_eq!(library.book(&id("a")).unwrap().title, "Report 2024");
    }

    #[test]
    fn duplicate_book_goes_first_with_copy_suffix() {
        let mut library = library_with_books();
        let today = date(2025, 6, 9);
        let copy = library.duplicate_book_on(&id("b"), today).unwrap();
        let first = &library.books()[0];
        assert_eq!(first.id, copy);
        assert_ne!(first.id, id("b"));
        assert_eq!(first.title, "Brochure Copy");
        assert_eq!(first.created_label(), "09-06-2025");
        assert_eq!(first.views, 0);
        assert_eq!(library.books().len(), 4);
    }

    #[test]
    fn duplicate_ids_are_unique() {
        let mut library = library_with_books();
        let one = library.duplicate_book(&id("a")).unwrap();
        let two = library.duplicate_book(&id("a")).unwrap();
        assert_ne!(one, two);
    }

    #[test]
    fn delete_book_removes_from_list_and_selection() {
        let mut library = library_with_books();
        library.toggle_select(&id("a"));
        library.toggle_select(&id("b"));
        assert!(library.delete_book(&id("a")));
        assert!(library.book(&id("a")).is_none());
        assert!(!library.is_selected(&id("a")));
        assert!(library.is_selected(&id("b")));
        assert!(!library.delete_book(&id("a")));
    }

    #[test]
    fn bulk_delete_through_confirmation() {
        let mut library = library_with_books();
        library.toggle_select(&id("a"));
        library.toggle_select(&id("c"));
        library.request_delete_selected().unwrap();
        assert_eq!(
            library.pending(),
            Some(&PendingAction::DeleteBooks(Target::Bulk(vec![id("a"), id("c")])))
        );
        library.confirm_delete().unwrap();
        assert!(library.pending().is_none());
        assert_eq!(library.books().len(), 1);
        assert!(library.selection().is_empty());
    }

    #[test]
    fn bulk_request_needs_a_selection() {
        let mut library = library_with_books();
        assert_eq!(
            library.request_move_selected(),
            Err(LibraryError::EmptySelection)
        );
        assert!(library.pending().is_none());
    }

    #[test]
    fn cancel_drops_pending_action() {
        let mut library = library_with_books();
        library.request_delete_book(&id("a")).unwrap();
        library.cancel_pending();
        assert_eq!(library.confirm_delete(), Err(LibraryError::NothingPending));
        assert_eq!(library.books().len(), 3);
    }

    #[test]
    fn bulk_move_switches_folder_and_clears_selection() {
        let mut library = library_with_books();
        let travel = library.create_folder("Travel").unwrap();
        library.set_active_folder(&FolderId::default_folder()).unwrap();
        library.toggle_select(&id("a"));
        library.toggle_select(&id("b"));

        let ids = vec![id("a"), id("b")];
        assert_eq!(library.move_books(&ids, &travel), Ok(2));
        for book_id in &ids {
            assert_eq!(library.book(book_id).unwrap().folder, travel);
        }
        assert!(library.selection().is_empty());
        assert_eq!(library.active_folder_id(), &travel);
    }

    #[test]
    fn single_move_keeps_view_and_other_selections() {
        let mut library = library_with_books();
        let travel = library.create_folder("Travel").unwrap();
        let public = FolderId::default_folder();
        library.set_active_folder(&public).unwrap();
        library.toggle_select(&id("a"));
        library.toggle_select(&id("b"));

        library.move_book(&id("a"), &travel).unwrap();
        assert_eq!(library.active_folder_id(), &public);
        assert!(!library.is_selected(&id("a")));
        assert!(library.is_selected(&id("b")));
        assert_eq!(library.visible_books().len(), 2);
    }

    #[test]
    fn move_to_unknown_folder_fails() {
        let mut library = library_with_books();
        let ghost = FolderId("ghost".to_string());
        assert_eq!(
            library.move_book(&id("a"), &ghost),
            Err(LibraryError::UnknownFolder(ghost.clone()))
        );
        assert!(library.book(&id("a")).unwrap().folder.is_default());
    }

    #[test]
    fn create_folder_and_move_is_all_or_nothing() {
        let mut library = library_with_books();
        library.request_move_book(&id("a")).unwrap();
        assert_eq!(
            library.confirm_move(MoveDestination::New("  ".to_string())),
            Err(LibraryError::EmptyName)
        );
        assert_eq!(library.folders().len(), 1);
        assert!(library.pending().is_some());

        let missing = Target::Bulk(vec![id("a"), id("nope")]);
        assert_eq!(
            library.create_folder_and_move("Archive", &missing),
            Err(LibraryError::UnknownBook(id("nope")))
        );
        assert_eq!(library.folders().len(), 1);

        let archive = library
            .confirm_move(MoveDestination::New("Archive".to_string()))
            .unwrap();
        assert_eq!(library.book(&id("a")).unwrap().folder, archive);
        assert!(library.active_folder_id().is_default());
        assert!(library.pending().is_none());
    }

    #[test]
    fn create_folder_and_bulk_move_shows_new_folder() {
        let mut library = library_with_books();
        library.select_all();
        library.request_move_selected().unwrap();
        let archive = library
            .confirm_move(MoveDestination::New("Archive".to_string()))
            .unwrap();
        assert_eq!(library.active_folder_id(), &archive);
        assert_eq!(library.visible_books().len(), 3);
        assert!(library.selection().is_empty());
    }

    #[test]
    fn add_book_lands_in_active_folder_first() {
        let mut library = library_with_books();
        let travel = library.create_folder("Travel").unwrap();
        let new_id = library.add_book_on(
            BookDraft {
                title: "  ".to_string(),
                pages: 6,
                size: 10,
                image: None,
            },
            date(2024, 5, 5),
        );
        let first = &library.books()[0];
        assert_eq!(first.id, new_id);
        assert_eq!(first.folder, travel);
        assert_eq!(first.title, "Untitled");
    }

    #[test]
    fn mutations_bump_revision() {
        let mut library = library_with_books();
        let start = library.revision();
        library.toggle_select(&id("a"));
        assert!(library.revision() > start);
        let after = library.revision();
        library.clear_selection();
        library.clear_selection();
        assert_eq!(library.revision(), after + 1);
    }
}
