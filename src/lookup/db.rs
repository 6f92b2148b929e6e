//! Database operations for categories and units.

use rusqlite::{Connection, Row};

use crate::Error;

/// Which lookup list to operate on.
///
/// Both lists share the same shape: an ID and a unique name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    /// Expense categories, e.g. "Food".
    Category,
    /// Units of measure, e.g. "kg".
    Unit,
}

impl LookupKind {
    fn table(self) -> &'static str {
        match self {
            LookupKind::Category => "categories",
            LookupKind::Unit => "units",
        }
    }

    fn defaults(self) -> &'static [&'static str] {
        match self {
            LookupKind::Category => &["Food", "Transport", "Materials", "Labor", "Other"],
            LookupKind::Unit => &["Items", "kg", "L", "Day", "Feet"],
        }
    }
}

/// A category or unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupEntry {
    /// The ID of the entry in its table.
    pub id: i64,
    /// The display name, unique within its table.
    pub name: String,
}

/// Create the category and unit tables.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_lookup_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE
        );

        CREATE TABLE IF NOT EXISTS units (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE
        );",
    )?;

    Ok(())
}

/// Fill the category and unit tables with the default entries, skipping any
/// table that already has entries.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn seed_default_lookups(connection: &Connection) -> Result<(), Error> {
    for kind in [LookupKind::Category, LookupKind::Unit] {
        let count: i64 = connection.query_row(
            &format!("SELECT COUNT(*) FROM {}", kind.table()),
            [],
            |row| row.get(0),
        )?;

        if count > 0 {
            continue;
        }

        let mut statement =
            connection.prepare(&format!("INSERT INTO {} (name) VALUES (?1)", kind.table()))?;
        for name in kind.defaults() {
            statement.execute((name,))?;
        }
    }

    Ok(())
}

/// Retrieve all entries of `kind` ordered alphabetically by name.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn get_lookup_entries(kind: LookupKind, connection: &Connection) -> Result<Vec<LookupEntry>, Error> {
    connection
        .prepare(&format!(
            "SELECT id, name FROM {} ORDER BY name ASC;",
            kind.table()
        ))?
        .query_map([], map_row)?
        .map(|maybe_entry| maybe_entry.map_err(|error| error.into()))
        .collect()
}

/// Add an entry named `name` to the `kind` list.
///
/// # Errors
///
/// Returns [Error::EmptyField] if `name` is blank,
/// [Error::DuplicateName] if the name is already in the list,
/// or [Error::SqlError] if some other SQL related error occurred.
pub fn add_lookup_entry(
    kind: LookupKind,
    name: &str,
    connection: &Connection,
) -> Result<LookupEntry, Error> {
    let name = name.trim();

    if name.is_empty() {
        return Err(Error::EmptyField("name"));
    }

    connection.execute(
        &format!("INSERT INTO {} (name) VALUES (?1)", kind.table()),
        (name,),
    )?;

    Ok(LookupEntry {
        id: connection.last_insert_rowid(),
        name: name.to_owned(),
    })
}

/// Delete the entry with `id` from the `kind` list. Deleting an entry that does
/// not exist is not an error.
///
/// Existing expenses keep the name they were tagged with.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn delete_lookup_entry(kind: LookupKind, id: i64, connection: &Connection) -> Result<(), Error> {
    connection.execute(&format!("DELETE FROM {} WHERE id = ?1", kind.table()), (id,))?;

    Ok(())
}

fn map_row(row: &Row) -> Result<LookupEntry, rusqlite::Error> {
    Ok(LookupEntry {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

#[cfg(test)]
mod lookup_db_tests {
    use rusqlite::Connection;

    use crate::Error;

    use super::{
        LookupKind, add_lookup_entry, create_lookup_tables, delete_lookup_entry,
        get_lookup_entries, seed_default_lookups,
    };

    fn get_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        create_lookup_tables(&connection).unwrap();
        connection
    }

    fn names(kind: LookupKind, connection: &Connection) -> Vec<String> {
        get_lookup_entries(kind, connection)
            .unwrap()
            .into_iter()
            .map(|entry| entry.name)
            .collect()
    }

    #[test]
    fn seeds_defaults_sorted_by_name() {
        let connection = get_connection();

        seed_default_lookups(&connection).unwrap();

        assert_eq!(
            names(LookupKind::Category, &connection),
            ["Food", "Labor", "Materials", "Other", "Transport"]
        );
        assert_eq!(
            names(LookupKind::Unit, &connection),
            ["Day", "Feet", "Items", "L", "kg"]
        );
    }

    #[test]
    fn seeding_skips_lists_with_entries() {
        let connection = get_connection();
        add_lookup_entry(LookupKind::Unit, "Bags", &connection).unwrap();

        seed_default_lookups(&connection).unwrap();

        assert_eq!(names(LookupKind::Unit, &connection), ["Bags"]);
        assert_eq!(names(LookupKind::Category, &connection).len(), 5);
    }

    #[test]
    fn add_entry_trims_name() {
        let connection = get_connection();

        let entry = add_lookup_entry(LookupKind::Category, "  Tools ", &connection).unwrap();

        assert_eq!(entry.name, "Tools");
        assert_eq!(get_lookup_entries(LookupKind::Category, &connection), Ok(vec![entry]));
    }

    #[test]
    fn duplicate_name_leaves_table_unchanged() {
        let connection = get_connection();
        add_lookup_entry(LookupKind::Category, "Food", &connection).unwrap();

        let result = add_lookup_entry(LookupKind::Category, "Food", &connection);

        assert_eq!(result, Err(Error::DuplicateName));
        assert_eq!(names(LookupKind::Category, &connection), ["Food"]);
    }

    #[test]
    fn same_name_is_allowed_in_both_lists() {
        let connection = get_connection();
        add_lookup_entry(LookupKind::Category, "Day", &connection).unwrap();

        assert!(add_lookup_entry(LookupKind::Unit, "Day", &connection).is_ok());
    }

    #[test]
    fn blank_name_is_rejected() {
        let connection = get_connection();

        let result = add_lookup_entry(LookupKind::Unit, " \t", &connection);

        assert_eq!(result, Err(Error::EmptyField("name")));
        assert!(names(LookupKind::Unit, &connection).is_empty());
    }

    #[test]
    fn delete_removes_only_that_entry() {
        let connection = get_connection();
        let food = add_lookup_entry(LookupKind::Category, "Food", &connection).unwrap();
        add_lookup_entry(LookupKind::Category, "Labor", &connection).unwrap();

        delete_lookup_entry(LookupKind::Category, food.id, &connection).unwrap();

        assert_eq!(names(LookupKind::Category, &connection), ["Labor"]);
    }

    #[test]
    fn delete_missing_entry_is_not_an_error() {
        let connection = get_connection();

        assert_eq!(delete_lookup_entry(LookupKind::Unit, 99, &connection), Ok(()));
    }
}
