//! Kasi is a small multi-user web app for tracking personal and shared
//! expenses.
//!
//! This library provides the HTTP routes, which directly serve HTML pages, and
//! the SQLite data access functions behind them.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::response::{IntoResponse, Response};
use axum_server::Handle;
use tokio::signal;

mod admin;
mod app_state;
mod auth;
mod db;
mod endpoints;
mod expense;
mod feedback;
mod html;
mod internal_server_error;
mod logging;
mod lookup;
mod navigation;
mod not_found;
mod report;
mod routing;
mod settings;
mod timezone;
mod user;

#[cfg(test)]
mod test_utils;

pub use app_state::{AppState, CookieSettings};
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;
pub use timezone::get_local_offset;
pub use user::{
    PasswordHash, User, UserID, ensure_bootstrap_admin, get_user_by_username, update_password,
};

use crate::{internal_server_error::InternalServerError, not_found::get_404_not_found_response};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The username and password combination did not match a user.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The auth cookie is missing from the cookie jar, could not be decoded
    /// or has expired.
    #[error("no valid auth cookie in the cookie jar")]
    CookieMissing,

    /// The auth cookie could not be serialized or its expiry could not be
    /// computed.
    #[error("could not build the auth cookie: {0}")]
    CookieError(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The username is already taken by another user.
    #[error("the username already exists")]
    DuplicateUsername,

    /// A category or unit with the same name already exists.
    #[error("the name already exists")]
    DuplicateName,

    /// The user tried to perform an action that requires the admin role.
    #[error("the user is not an admin")]
    NotAdmin,

    /// The bootstrap admin (user ID 1) cannot be deleted.
    #[error("the main admin cannot be deleted")]
    ProtectedUser,

    /// The expense type was not one of `private` or `common`.
    #[error("\"{0}\" is not a valid expense type")]
    InvalidExpenseType(String),

    /// An amount or quantity was not a valid, non-negative number.
    #[error("\"{0}\" is not a valid non-negative number")]
    InvalidNumber(String),

    /// A date string could not be parsed as a calendar date.
    #[error("\"{0}\" is not a valid date (expected YYYY-MM-DD)")]
    InvalidDate(String),

    /// A required form field was empty.
    #[error("the field \"{0}\" cannot be empty")]
    EmptyField(&'static str),

    /// The multipart form could not be read.
    #[error("could not parse multipart form: {0}")]
    MultipartError(String),

    /// The multipart form did not contain the backup file.
    #[error("the backup file is missing from the upload")]
    MissingBackupFile,

    /// The uploaded backup is not a usable Kasi database.
    #[error("invalid backup file: {0}")]
    InvalidBackup(String),

    /// A file system operation on the database file failed.
    #[error("file system error: {0}")]
    Io(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("users.username") =>
            {
                Error::DuplicateUsername
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(_))
                if sql_error.extended_code == 2067 =>
            {
                Error::DuplicateName
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

#[cfg(test)]
mod error_tests {
    use rusqlite::Connection;

    use crate::Error;

    #[test]
    fn unique_violation_on_username_maps_to_duplicate_username() {
        let connection = Connection::open_in_memory().unwrap();
        connection
            .execute("CREATE TABLE users (id INTEGER PRIMARY KEY, username TEXT UNIQUE)", ())
            .unwrap();
        connection
            .execute("INSERT INTO users (username) VALUES ('admin')", ())
            .unwrap();

        let error: Error = connection
            .execute("INSERT INTO users (username) VALUES ('admin')", ())
            .unwrap_err()
            .into();

        assert_eq!(error, Error::DuplicateUsername);
    }

    #[test]
    fn other_unique_violation_maps_to_duplicate_name() {
        let connection = Connection::open_in_memory().unwrap();
        connection
            .execute("CREATE TABLE units (id INTEGER PRIMARY KEY, name TEXT UNIQUE)", ())
            .unwrap();
        connection
            .execute("INSERT INTO units (name) VALUES ('kg')", ())
            .unwrap();

        let error: Error = connection
            .execute("INSERT INTO units (name) VALUES ('kg')", ())
            .unwrap_err()
            .into();

        assert_eq!(error, Error::DuplicateName);
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound);
    }
}
