//! Code for creating the user table and reading and writing users.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, user::PasswordHash};

/// The ID of the admin created on first boot. This user cannot be deleted.
pub const BOOTSTRAP_ADMIN_ID: UserID = UserID(1);
/// The username of the admin created on first boot.
pub const BOOTSTRAP_ADMIN_USERNAME: &str = "admin";
/// The currency code given to new users.
pub const DEFAULT_CURRENCY: &str = "LKR";
/// The language code given to new users.
pub const DEFAULT_LANGUAGE: &str = "en";
/// The project name given to new users.
pub const DEFAULT_PROJECT_NAME: &str = "My Project";

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The name the user logs in with. Unique across all users.
    pub username: String,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// Whether the user can manage other users and backups.
    pub is_admin: bool,
    /// The currency code amounts are displayed with, e.g. "LKR".
    pub currency: String,
    /// The user's language code, e.g. "en".
    pub language: String,
    /// The title shown in the navigation bar.
    pub project_name: String,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE,
                password TEXT,
                is_admin BOOLEAN DEFAULT 0,
                currency TEXT DEFAULT 'LKR',
                language TEXT DEFAULT 'en',
                project_name TEXT DEFAULT 'Project Expenses'
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database with the default currency,
/// language and project name.
///
/// # Errors
///
/// Returns a [Error::DuplicateUsername] if `username` is taken,
/// [Error::EmptyField] if `username` is blank,
/// or [Error::SqlError] if some other SQL related error occurred.
pub fn create_user(
    username: &str,
    password_hash: PasswordHash,
    is_admin: bool,
    connection: &Connection,
) -> Result<User, Error> {
    let username = username.trim();

    if username.is_empty() {
        return Err(Error::EmptyField("username"));
    }

    connection.execute(
        "INSERT INTO users (username, password, is_admin, currency, language, project_name)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        (
            username,
            password_hash.as_ref(),
            is_admin,
            DEFAULT_CURRENCY,
            DEFAULT_LANGUAGE,
            DEFAULT_PROJECT_NAME,
        ),
    )?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        username: username.to_owned(),
        password_hash,
        is_admin,
        currency: DEFAULT_CURRENCY.to_owned(),
        language: DEFAULT_LANGUAGE.to_owned(),
        project_name: DEFAULT_PROJECT_NAME.to_owned(),
    })
}

const SELECT_USER: &str = "SELECT id, username, COALESCE(password, ''), COALESCE(is_admin, 0), \
    COALESCE(currency, 'LKR'), COALESCE(language, 'en'), COALESCE(project_name, 'Project') \
    FROM users";

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_password_hash: String = row.get(2)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        username: row.get(1)?,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        is_admin: row.get(3)?,
        currency: row.get(4)?,
        language: row.get(5)?,
        project_name: row.get(6)?,
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, db_connection: &Connection) -> Result<User, Error> {
    db_connection
        .prepare(&format!("{SELECT_USER} WHERE id = :id"))?
        .query_row(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Get the user from the database with the username `username`.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has that username,
/// or [Error::SqlError] if some other SQL related error occurred.
pub fn get_user_by_username(username: &str, db_connection: &Connection) -> Result<User, Error> {
    db_connection
        .prepare(&format!("{SELECT_USER} WHERE username = :username"))?
        .query_row(&[(":username", &username)], map_user_row)
        .map_err(|error| error.into())
}

/// Get every user, ordered by ID.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn get_all_users(db_connection: &Connection) -> Result<Vec<User>, Error> {
    db_connection
        .prepare(&format!("{SELECT_USER} ORDER BY id ASC"))?
        .query_map([], map_user_row)?
        .map(|maybe_user| maybe_user.map_err(Error::from))
        .collect()
}

/// Get the number of users in the database.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn count_users(connection: &Connection) -> Result<usize, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM users;", [], |row| row.get::<_, i64>(0))
        .map(|count| count as usize)
        .map_err(|error| error.into())
}

/// Change a user's username, currency and language.
///
/// # Errors
///
/// Returns a [Error::DuplicateUsername] if another user has `username`,
/// [Error::EmptyField] if `username` is blank,
/// [Error::NotFound] if `user_id` does not exist,
/// or [Error::SqlError] if some other SQL related error occurred.
pub fn update_profile(
    user_id: UserID,
    username: &str,
    currency: &str,
    language: &str,
    connection: &Connection,
) -> Result<(), Error> {
    let username = username.trim();

    if username.is_empty() {
        return Err(Error::EmptyField("username"));
    }

    let rows_affected = connection.execute(
        "UPDATE users SET username = ?1, currency = ?2, language = ?3 WHERE id = ?4",
        (username, currency.trim(), language.trim(), user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Replace a user's password hash.
///
/// # Errors
///
/// Returns [Error::NotFound] if `user_id` does not exist,
/// or [Error::SqlError] if some other SQL related error occurred.
pub fn update_password(
    user_id: UserID,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE users SET password = ?1 WHERE id = ?2",
        (password_hash.as_ref(), user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Change the currency code of a user.
///
/// # Errors
///
/// Returns [Error::NotFound] if `user_id` does not exist,
/// or [Error::SqlError] if some other SQL related error occurred.
pub fn update_currency(user_id: UserID, currency: &str, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE users SET currency = ?1 WHERE id = ?2",
        (currency.trim(), user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Set the project name of every user, since the project title is shared
/// across the installation.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn set_project_name_for_all(project_name: &str, connection: &Connection) -> Result<(), Error> {
    connection.execute("UPDATE users SET project_name = ?1", (project_name.trim(),))?;

    Ok(())
}

/// Delete a user along with all of the expenses they created.
///
/// # Errors
///
/// Returns [Error::ProtectedUser] for the bootstrap admin,
/// or [Error::SqlError] if an SQL related error occurred.
pub fn delete_user_and_expenses(user_id: UserID, connection: &Connection) -> Result<(), Error> {
    if user_id == BOOTSTRAP_ADMIN_ID {
        return Err(Error::ProtectedUser);
    }

    let transaction = connection.unchecked_transaction()?;
    transaction.execute("DELETE FROM expenses WHERE user_id = ?1", (user_id.as_i64(),))?;
    transaction.execute("DELETE FROM users WHERE id = ?1", (user_id.as_i64(),))?;
    transaction.commit()?;

    Ok(())
}

/// Create the bootstrap admin if there are no users yet.
///
/// Returns the new admin, or `None` if the database already has users.
///
/// # Errors
///
/// Returns an error if the password could not be hashed or an SQL related error occurred.
pub fn ensure_bootstrap_admin(
    password: &str,
    cost: u32,
    connection: &Connection,
) -> Result<Option<User>, Error> {
    if count_users(connection)? > 0 {
        return Ok(None);
    }

    let password_hash = PasswordHash::new(password, cost)?;
    let admin = create_user(BOOTSTRAP_ADMIN_USERNAME, password_hash, true, connection)?;

    Ok(Some(admin))
}
