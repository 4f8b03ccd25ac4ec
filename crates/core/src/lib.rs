//! Core domain types for Flipshelf.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_FOLDER_ID: &str = "public";
pub const DEFAULT_FOLDER_NAME: &str = "Public Books";

const DATE_FORMAT: &str = "%d-%m-%Y";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(pub String);

impl FolderId {
    pub fn default_folder() -> Self {
        Self(DEFAULT_FOLDER_ID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_FOLDER_ID
    }
}

impl std::fmt::Display for FolderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(pub String);

impl BookId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
}

impl Folder {
    pub fn default_folder() -> Self {
        Self {
            id: FolderId::default_folder(),
            name: DEFAULT_FOLDER_NAME.to_string(),
        }
    }
}

/// A flipbook record. `folder` is the owning folder's id, never its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub pages: u32,
    pub created: NaiveDate,
    pub views: u32,
    pub size: u64,
    pub folder: FolderId,
    pub image: Option<String>,
}

impl Book {
    pub fn created_label(&self) -> String {
        format_date(self.created)
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend_url: String,
    pub upload_tick_ms: u64,
    pub upload_step: u8,
    pub theme: Theme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Theme {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err("unknown theme"),
        }
    }
}

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            upload_tick_ms: 200,
            upload_step: 10,
            theme: Theme::Dark,
        }
    }
}

impl Settings {
    pub fn normalize(&mut self) {
        let url = self.backend_url.trim().trim_end_matches('/');
        self.backend_url = if url.is_empty() {
            DEFAULT_BACKEND_URL.to_string()
        } else {
            url.to_string()
        };
        self.upload_tick_ms = self.upload_tick_ms.clamp(50, 5_000);
        self.upload_step = self.upload_step.clamp(1, 100);
    }

    pub fn cycle_theme(&mut self) {
        self.theme = match self.theme {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub id: &'static str,
    pub name: &'static str,
}

pub const DEFAULT_TEMPLATE_ID: &str = "corporate";

pub const TEMPLATES: &[Template] = &[
    Template {
        id: "corporate",
        name: "Corporate",
    },
    Template {
        id: "magazine",
        name: "Magazine",
    },
    Template {
        id: "portfolio",
        name: "Portfolio",
    },
    Template {
        id: "catalog",
        name: "Catalog",
    },
    Template {
        id: "brochure",
        name: "Brochure",
    },
];

pub fn template_by_id(id: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.id == id)
}

/// Page count for template flipbooks: even, within `[MIN, MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PageCount(u32);

impl PageCount {
    pub const MIN: u32 = 2;
    pub const MAX: u32 = 12;

    pub fn new(value: u32) -> Self {
        let clamped = value.clamp(Self::MIN, Self::MAX);
        let even = if clamped % 2 == 1 { clamped + 1 } else { clamped };
        Self(even.min(Self::MAX))
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    pub fn set(&mut self, value: u32) {
        *self = Self::new(value);
    }

    pub fn increment(&mut self) {
        self.set(self.0 + 2);
    }

    pub fn decrement(&mut self) {
        self.set(self.0.saturating_sub(2));
    }
}

impl Default for PageCount {
    fn default() -> Self {
        Self(4)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter your email")]
    EmptyEmail,
    #[error("Please enter your password")]
    EmptyPassword,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Passwords do not match")]
    PasswordMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub email_id: String,
    pub password: String,
}

pub fn validate_sign_in(email: &str, password: &str) -> Result<Credentials, ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::EmptyEmail);
    }
    if password.is_empty() {
        return Err(ValidationError::EmptyPassword);
    }
    if !looks_like_email(email) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(Credentials {
        email_id: email.to_string(),
        password: password.to_string(),
    })
}

pub fn validate_sign_up(
    email: &str,
    password: &str,
    confirm: &str,
) -> Result<Credentials, ValidationError> {
    let credentials = validate_sign_in(email, password)?;
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(credentials)
}

fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Signed-in user record, stored as `{...user, isLoggedIn: true}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub email_id: String,
    #[serde(default)]
    pub is_logged_in: bool,
    #[serde(flatten)]
    pub profile: serde_json::Map<String, serde_json::Value>,
}

impl Session {
    pub fn from_user(user: serde_json::Value) -> Option<Self> {
        let serde_json::Value::Object(mut profile) = user else {
            return None;
        };
        let email_id = match profile.remove("emailId") {
            Some(serde_json::Value::String(email)) => email,
            _ => String::new(),
        };
        profile.remove("isLoggedIn");
        Some(Self {
            email_id,
            is_logged_in: true,
            profile,
        })
    }

    pub fn display_name(&self) -> &str {
        match self.profile.get("name").and_then(|v| v.as_str()) {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.email_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_normalize_clamps_and_trims() {
        let mut settings = Settings {
            backend_url: " https://api.example.com/ ".to_string(),
            upload_tick_ms: 0,
            upload_step: 250,
            theme: Theme::Light,
        };
        settings.normalize();
        assert_eq!(settings.backend_url, "https://api.example.com");
        assert_eq!(settings.upload_tick_ms, 50);
        assert_eq!(settings.upload_step, 100);

        settings.backend_url = "   ".to_string();
        settings.normalize();
        assert_eq!(settings.backend_url, DEFAULT_BACKEND_URL);
    }

    #[test]
    fn theme_parses_and_cycles() {
        assert_eq!(" Dark ".parse::<Theme>().unwrap(), Theme::Dark);
        assert!("sepia".parse::<Theme>().is_err());
        let mut settings = Settings::default();
        settings.cycle_theme();
        assert_eq!(settings.theme, Theme::Light);
    }

    #[test]
    fn page_count_clamps_at_bounds() {
        let mut count = PageCount::new(12);
        count.increment();
        assert_eq!(count.get(), 12);

        let mut count = PageCount::new(2);
        count.decrement();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn page_count_rounds_odd_values_up() {
        for n in [3, 5, 7, 9] {
            assert_eq!(PageCount::new(n).get(), n + 1);
        }
        assert_eq!(PageCount::new(11).get(), 12);
        assert_eq!(PageCount::new(13).get(), 12);
        assert_eq!(PageCount::new(0).get(), 2);
        let mut count = PageCount::default();
        count.set(5);
        assert_eq!(count.get(), 6);
    }

    #[test]
    fn dates_use_day_month_year() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(format_date(date), "07-03-2024");
        assert_eq!(parse_date("07-03-2024"), Some(date));
        assert_eq!(parse_date("2024-03-07"), None);
    }

    #[test]
    fn sign_in_validation() {
        assert_eq!(validate_sign_in(" ", "x"), Err(ValidationError::EmptyEmail));
        assert_eq!(
            validate_sign_in("a@b.co", ""),
            Err(ValidationError::EmptyPassword)
        );
        assert_eq!(
            validate_sign_in("not-an-email", "pw"),
            Err(ValidationError::InvalidEmail)
        );
        assert_eq!(
            validate_sign_in("a@b", "pw"),
            Err(ValidationError::InvalidEmail)
        );
        let creds = validate_sign_in(" reader@example.com ", "pw").unwrap();
        assert_eq!(creds.email_id, "reader@example.com");
    }

    #[test]
    fn sign_up_requires_matching_passwords() {
        assert_eq!(
            validate_sign_up("a@b.co", "one", "two"),
            Err(ValidationError::PasswordMismatch)
        );
        assert!(validate_sign_up("a@b.co", "one", "one").is_ok());
    }

    #[test]
    fn credentials_serialize_as_email_id() {
        let creds = validate_sign_in("a@b.co", "pw").unwrap();
        let json = serde_json::to_value(&creds).unwrap();
        assert_eq!(json["emailId"], "a@b.co");
        assert_eq!(json["password"], "pw");
    }

    #[test]
    fn session_from_user_marks_logged_in() {
        let user = serde_json::json!({"emailId": "a@b.co", "name": "Ada", "_id": "42"});
        let session = Session::from_user(user).unwrap();
        assert!(session.is_logged_in);
        assert_eq!(session.display_name(), "Ada");

        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["isLoggedIn"], true);
        assert_eq!(json["emailId"], "a@b.co");
        assert_eq!(json["_id"], "42");

        let back: Session = serde_json::from_value(json).unwrap();
        assert_eq!(back, session);
        assert!(Session::from_user(serde_json::json!("nope")).is_none());
    }

    #[test]
    fn template_catalog_has_default() {
        assert!(template_by_id(DEFAULT_TEMPLATE_ID).is_some());
        assert!(template_by_id("missing").is_none());
    }
}
