use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context as _;
use directories::ProjectDirs;
use flipshelf_application::{AppContext, Library};
use flipshelf_core::Settings;
use flipshelf_storage::Storage;
use flipshelf_ui::{Ui, UiExit};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const BACKEND_URL_ENV: &str = "FLIPSHELF_BACKEND_URL";

fn main() {
    if let Err(err) = run() {
        error!("{err:?}");
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let project_dirs =
        ProjectDirs::from("dev", "flipshelf", "flipshelf").context("resolve project dirs")?;

    let data_dir = project_dirs.data_dir();
    fs::create_dir_all(data_dir)
        .with_context(|| format!("create data dir {}", data_dir.display()))?;
    init_tracing(&data_dir.join("flipshelf.log"))?;

    let config_dir = project_dirs.config_dir();
    fs::create_dir_all(config_dir)
        .with_context(|| format!("create config dir {}", config_dir.display()))?;

    let db_path = config_dir.join("flipshelf.db");
    let storage = Storage::open(&db_path)?;
    info!(db = %db_path.display(), "opened storage");

    let mut settings = storage.load_settings()?;
    let stored_backend_url = settings.backend_url.clone();
    apply_env_overrides(&mut settings, std::env::var(BACKEND_URL_ENV).ok());

    let (folders, books) = storage.load_library()?;
    let library = Library::from_parts(folders, books);
    let session = storage.load_session()?;

    let mut ctx = AppContext::new(settings)
        .with_library(library)
        .with_session(session);
    loop {
        let mut ui = Ui::new(ctx);
        let outcome = ui.run()?;
        ctx = outcome.ctx;
        storage.save_settings(&persisted_settings(&ctx.settings, &stored_backend_url))?;
        storage.save_library(ctx.library.folders(), ctx.library.books())?;

        match outcome.exit {
            UiExit::Quit => break,
            UiExit::SignedIn(session) => {
                info!(user = %session.email_id, "signed in");
                storage.save_session(&session)?;
                ctx.session = Some(session);
            }
            UiExit::SignedOut => {
                info!("signed out");
                storage.clear_session()?;
                ctx.session = None;
            }
        }
    }

    Ok(())
}

/// Start-up only overrides; never written back to storage.
fn apply_env_overrides(settings: &mut Settings, backend_url: Option<String>) {
    if let Some(url) = backend_url.filter(|url| !url.trim().is_empty()) {
        settings.backend_url = url;
        settings.normalize();
        info!(backend = %settings.backend_url, "backend url overridden from environment");
    }
}

fn persisted_settings(current: &Settings, stored_backend_url: &str) -> Settings {
    Settings {
        backend_url: stored_backend_url.to_string(),
        ..current.clone()
    }
}

/// Logs go to a file; the terminal belongs to the UI.
fn init_tracing(log_path: &Path) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("open log file {}", log_path.display()))?;
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true)
                .with_filter(env_filter),
        )
        .init();
    info!("logging initialized; override level with RUST_LOG");
    Ok(())
}

#[cfg(test)]
mod tests {
    use flipshelf_core::Theme;

    use super::*;

    #[test]
    fn env_backend_url_is_not_persisted() -> anyhow::Result<()> {
        let path =
            std::env::temp_dir().join(format!("flipshelf-app-{}.db", std::process::id()));
        let _ = fs::remove_file(&path);
        let storage = Storage::open(&path)?;

        let mut settings = storage.load_settings()?;
        let stored = settings.backend_url.clone();
        apply_env_overrides(
            &mut settings,
            Some("https://staging.example.com/".to_string()),
        );
        assert_eq!(settings.backend_url, "https://staging.example.com");

        settings.theme = Theme::Light;
        storage.save_settings(&persisted_settings(&settings, &stored))?;
        let reloaded = storage.load_settings()?;
        drop(storage);
        fs::remove_file(&path)?;

        assert_eq!(reloaded.backend_url, stored);
        assert_eq!(reloaded.theme, Theme::Light);
        Ok(())
    }

    #[test]
    fn blank_env_backend_url_is_ignored() {
        let mut settings = Settings::default();
        let before = settings.backend_url.clone();
        apply_env_overrides(&mut settings, Some("   ".to_string()));
        assert_eq!(settings.backend_url, before);
        apply_env_overrides(&mut settings, None);
        assert_eq!(settings.backend_url, before);
    }
}
