//! Implements a struct that holds the state of the web server.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use sha2::{Digest, Sha512};
use time::Duration;

use crate::{Error, auth::DEFAULT_COOKIE_DURATION, db::initialize, timezone::get_local_offset};

/// Controls how the auth cookie is issued.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CookieSettings {
    /// The duration for which cookies used for authentication are valid.
    pub duration: Duration,
    /// Whether to mark the auth cookie as HTTPS-only.
    pub secure: bool,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            duration: DEFAULT_COOKIE_DURATION,
            secure: false,
        }
    }
}

/// The state of the web server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,

    /// How the auth cookie is issued.
    pub cookie_settings: CookieSettings,

    /// The local timezone as a canonical timezone name, e.g. "Asia/Colombo".
    pub local_timezone: String,

    /// The shared database connection.
    pub db_connection: Arc<Mutex<Connection>>,

    /// Where the database file lives on disk, used for backups and restores.
    pub db_path: Arc<PathBuf>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the
    /// domain models and seeding the default categories and units.
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "Asia/Colombo".
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized or the timezone is unknown.
    pub fn new(
        db_connection: Connection,
        db_path: impl Into<PathBuf>,
        cookie_secret: &str,
        local_timezone: &str,
        cookie_settings: CookieSettings,
    ) -> Result<Self, Error> {
        if get_local_offset(local_timezone).is_none() {
            return Err(Error::InvalidTimezoneError(local_timezone.to_owned()));
        }

        initialize(&db_connection)?;

        Ok(Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_settings,
            local_timezone: local_timezone.to_owned(),
            db_connection: Arc::new(Mutex::new(db_connection)),
            db_path: Arc::new(db_path.into()),
        })
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Create a signing key for cookies from a `secret`s string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}
