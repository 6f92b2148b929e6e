use rusqlite::Connection;

use crate::{
    User, db,
    user::{PasswordHash, create_user},
};

/// An in-memory database with every table created and the lookup lists seeded.
pub(crate) fn get_test_connection() -> Connection {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");
    db::initialize(&connection).expect("Could not initialize database");

    connection
}

/// Insert a user whose password is "password".
pub(crate) fn insert_test_user(connection: &Connection, username: &str, is_admin: bool) -> User {
    let password_hash = PasswordHash::new("password", 4).expect("Could not hash password");

    create_user(username, password_hash, is_admin, connection).expect("Could not create user")
}
