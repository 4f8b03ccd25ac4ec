//! Sqlite-backed persistence.

use std::path::Path;

use anyhow::Context as _;
use chrono::NaiveDate;
use flipshelf_core::{Book, BookId, Folder, FolderId, Session, Settings, Theme};
use rusqlite::{Connection, OptionalExtension as _};

/// Key the signed-in session is stored under.
pub const SESSION_KEY: &str = "user";

#[derive(Debug)]
pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("open sqlite db at {}", path.as_ref().display()))?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    fn migrate(&self) -> anyhow::Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys=ON;

            CREATE TABLE IF NOT EXISTS settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                backend_url TEXT NOT NULL,
                upload_tick_ms INTEGER NOT NULL,
                upload_step INTEGER NOT NULL
            );
            INSERT OR IGNORE INTO settings (id, backend_url, upload_tick_ms, upload_step)
            VALUES (1, 'http://localhost:8080', 200, 10);

            CREATE TABLE IF NOT EXISTS folders (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                position INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS books (
                id TEXT PRIMARY KEY,
                folder_id TEXT NOT NULL REFERENCES folders(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                pages INTEGER NOT NULL,
                created TEXT NOT NULL,
                views INTEGER NOT NULL DEFAULT 0,
                size INTEGER NOT NULL DEFAULT 0,
                image TEXT,
                position INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL DEFAULT (unixepoch())
            );
            "#,
        )?;

        self.add_column(
            "ALTER TABLE settings ADD COLUMN theme TEXT NOT NULL DEFAULT 'dark'",
            "add settings.theme column",
        )?;

        Ok(())
    }

    fn add_column(&self, sql: &str, what: &'static str) -> anyhow::Result<()> {
        match self.conn.execute(sql, []) {
            Ok(_) => Ok(()),
            Err(err) => {
                let msg = err.to_string();
                if msg.contains("duplicate column name") {
                    Ok(())
                } else {
                    Err(err).context(what)
                }
            }
        }
    }

    pub fn load_settings(&self) -> anyhow::Result<Settings> {
        let row = self
            .conn
            .query_row(
                "SELECT backend_url, upload_tick_ms, upload_step, theme FROM settings WHERE id = 1",
                [],
                |row| {
                    let backend_url: String = row.get(0)?;
                    let upload_tick_ms: i64 = row.get(1)?;
                    let upload_step: i64 = row.get(2)?;
                    let theme: String = row.get(3)?;
                    Ok((backend_url, upload_tick_ms, upload_step, theme))
                },
            )
            .optional()?;

        let defaults = Settings::default();
        let Some((backend_url, upload_tick_ms, upload_step, theme)) = row else {
            return Ok(defaults);
        };

        let mut settings = Settings {
            backend_url,
            upload_tick_ms: u64::try_from(upload_tick_ms).unwrap_or(defaults.upload_tick_ms),
            upload_step: u8::try_from(upload_step).unwrap_or(defaults.upload_step),
            theme: theme.parse::<Theme>().unwrap_or(defaults.theme),
        };
        settings.normalize();
        Ok(settings)
    }

    pub fn save_settings(&self, settings: &Settings) -> anyhow::Result<()> {
        let mut settings = settings.clone();
        settings.normalize();

        self.conn.execute(
            "UPDATE settings SET backend_url = ?, upload_tick_ms = ?, upload_step = ?, theme = ? WHERE id = 1",
            (
                &settings.backend_url,
                settings.upload_tick_ms as i64,
                settings.upload_step as i64,
                settings.theme.as_str(),
            ),
        )?;
        Ok(())
    }

    pub fn load_library(&self) -> anyhow::Result<(Vec<Folder>, Vec<Book>)> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM folders ORDER BY position")?;
        let folders = stmt
            .query_map([], |row| {
                Ok(Folder {
                    id: FolderId(row.get(0)?),
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT id, folder_id, title, pages, created, views, size, image FROM books ORDER BY position",
        )?;
        let rows = stmt.query_map([], |row| {
            let created: String = row.get(4)?;
            let pages: i64 = row.get(3)?;
            let views: i64 = row.get(5)?;
            let size: i64 = row.get(6)?;
            Ok((
                BookId(row.get(0)?),
                FolderId(row.get(1)?),
                row.get::<_, String>(2)?,
                pages,
                created,
                views,
                size,
                row.get::<_, Option<String>>(7)?,
            ))
        })?;

        let mut books = Vec::new();
        for row in rows {
            let (id, folder, title, pages, created, views, size, image) = row?;
            let created = created
                .parse::<NaiveDate>()
                .with_context(|| format!("parse created date {created:?} of book {id}"))?;
            books.push(Book {
                id,
                title,
                pages: u32::try_from(pages).unwrap_or(0),
                created,
                views: u32::try_from(views).unwrap_or(0),
                size: u64::try_from(size).unwrap_or(0),
                folder,
                image,
            });
        }

        Ok((folders, books))
    }

    /// Replaces the stored folders and books with the given ones.
    pub fn save_library(&self, folders: &[Folder], books: &[Book]) -> anyhow::Result<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("begin library transaction")?;
        tx.execute("DELETE FROM books", [])?;
        tx.execute("DELETE FROM folders", [])?;
        {
            let mut insert_folder =
                tx.prepare("INSERT INTO folders (id, name, position) VALUES (?, ?, ?)")?;
            for (position, folder) in folders.iter().enumerate() {
                insert_folder.execute((folder.id.as_str(), &folder.name, position as i64))?;
            }

            let mut insert_book = tx.prepare(
                r#"
                INSERT INTO books (id, folder_id, title, pages, created, views, size, image, position)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )?;
            for (position, book) in books.iter().enumerate() {
                insert_book.execute((
                    book.id.as_str(),
                    book.folder.as_str(),
                    &book.title,
                    book.pages as i64,
                    book.created.to_string(),
                    book.views as i64,
                    book.size as i64,
                    book.image.as_deref(),
                    position as i64,
                ))?;
            }
        }
        tx.commit().context("commit library")?;
        tracing::info!(folders = folders.len(), books = books.len(), "saved library");
        Ok(())
    }

    pub fn load_session(&self) -> anyhow::Result<Option<Session>> {
        let value: Option<String> = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?", [SESSION_KEY], |row| {
                row.get(0)
            })
            .optional()?;
        let Some(value) = value else {
            return Ok(None);
        };
        match serde_json::from_str::<Session>(&value) {
            Ok(session) => Ok(Some(session)),
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable session");
                Ok(None)
            }
        }
    }

    pub fn save_session(&self, session: &Session) -> anyhow::Result<()> {
        let value = serde_json::to_string(session)?;
        self.conn.execute(
            r#"
            INSERT INTO kv (key, value, updated_at) VALUES (?, ?, unixepoch())
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            (SESSION_KEY, value),
        )?;
        Ok(())
    }

    pub fn clear_session(&self) -> anyhow::Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?", [SESSION_KEY])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_in_memory() -> anyhow::Result<Storage> {
        let conn = Connection::open_in_memory()?;
        let storage = Storage { conn };
        storage.migrate()?;
        Ok(storage)
    }

    fn sample_book(id: &str, folder: &FolderId) -> Book {
        Book {
            id: BookId(id.to_string()),
            title: format!("Book {id}"),
            pages: 8,
            created: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            views: 3,
            size: 4096,
            folder: folder.clone(),
            image: Some("cover.png".to_string()),
        }
    }

    #[test]
    fn settings_roundtrip() -> anyhow::Result<()> {
        let storage = open_in_memory()?;
        let mut settings = storage.load_settings()?;
        assert_eq!(settings.theme, Theme::Dark);
        settings.backend_url = "https://books.example.com".to_string();
        settings.upload_tick_ms = 500;
        settings.upload_step = 25;
        settings.theme = Theme::Light;
        storage.save_settings(&settings)?;

        let settings2 = storage.load_settings()?;
        assert_eq!(settings2.backend_url, "https://books.example.com");
        assert_eq!(settings2.upload_tick_ms, 500);
        assert_eq!(settings2.upload_step, 25);
        assert_eq!(settings2.theme, Theme::Light);
        Ok(())
    }

    #[test]
    fn migrate_is_idempotent() -> anyhow::Result<()> {
        let storage = open_in_memory()?;
        storage.migrate()?;
        storage.migrate()?;
        Ok(())
    }

    #[test]
    fn library_roundtrip_keeps_order() -> anyhow::Result<()> {
        let storage = open_in_memory()?;
        let public = FolderId::default_folder();
        let travel = FolderId("travel".to_string());
        let folders = vec![
            Folder::default_folder(),
            Folder {
                id: travel.clone(),
                name: "Travel".to_string(),
            },
        ];
        let books = vec![
            sample_book("z", &travel),
            sample_book("a", &public),
            sample_book("m", &public),
        ];
        storage.save_library(&folders, &books)?;

        let (folders2, books2) = storage.load_library()?;
        assert_eq!(folders2, folders);
        assert_eq!(books2, books);
        Ok(())
    }

    #[test]
    fn save_library_replaces_previous_contents() -> anyhow::Result<()> {
        let storage = open_in_memory()?;
        let public = FolderId::default_folder();
        storage.save_library(
            &[Folder::default_folder()],
            &[sample_book("a", &public), sample_book("b", &public)],
        )?;
        storage.save_library(&[Folder::default_folder()], &[sample_book("b", &public)])?;

        let (_, books) = storage.load_library()?;
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].id, BookId("b".to_string()));
        Ok(())
    }

    #[test]
    fn book_with_unknown_folder_is_rejected() -> anyhow::Result<()> {
        let storage = open_in_memory()?;
        let ghost = FolderId("ghost".to_string());
        let result = storage.save_library(&[Folder::default_folder()], &[sample_book("a", &ghost)]);
        assert!(result.is_err());
        let (folders, books) = storage.load_library()?;
        assert!(folders.is_empty());
        assert!(books.is_empty());
        Ok(())
    }

    #[test]
    fn session_roundtrip_and_clear() -> anyhow::Result<()> {
        let storage = open_in_memory()?;
        assert!(storage.load_session()?.is_none());

        let session =
            Session::from_user(serde_json::json!({"emailId": "a@b.co", "name": "Ada"})).unwrap();
        storage.save_session(&session)?;
        assert_eq!(storage.load_session()?, Some(session));

        storage.clear_session()?;
        assert!(storage.load_session()?.is_none());
        Ok(())
    }

    #[test]
    fn unreadable_session_is_dropped() -> anyhow::Result<()> {
        let storage = open_in_memory()?;
        storage.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?, ?)",
            (SESSION_KEY, "not json"),
        )?;
        assert!(storage.load_session()?.is_none());
        Ok(())
    }
}
