/*! Creates the application's tables and seeds the default lookup lists. */

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::{
    Error, expense::create_expense_table, lookup::create_lookup_tables,
    lookup::seed_default_lookups, user::create_user_table,
};

/// Create the tables for the domain models if they do not exist, and seed the
/// category and unit lists when they are empty.
///
/// The table layout matches existing Kasi databases, so restoring an older
/// backup keeps working.
///
/// # Errors
/// Returns an error if any of the SQL statements fail.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_lookup_tables(&transaction)?;
    create_expense_table(&transaction)?;
    seed_default_lookups(&transaction)?;

    transaction.commit()?;

    Ok(())
}
