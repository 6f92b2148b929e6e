//! Defines the core data models and database commands for expenses.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use time::Date;

use crate::{Error, User, UserID};

/// The ID of an expense in the database.
pub type ExpenseId = i64;

// ============================================================================
// MODELS
// ============================================================================

/// Who can see an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseType {
    /// Only visible to the user that created it.
    Private,
    /// Visible to every user, attributed to the user that created it.
    Common,
}

impl ExpenseType {
    /// The name stored in the database and used in forms.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseType::Private => "private",
            ExpenseType::Common => "common",
        }
    }
}

impl Display for ExpenseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "private" => Ok(ExpenseType::Private),
            "common" => Ok(ExpenseType::Common),
            other => Err(Error::InvalidExpenseType(other.to_owned())),
        }
    }
}

impl ToSql for ExpenseType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ExpenseType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// A single purchase recorded by a user.
#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    /// The ID of the expense.
    pub id: ExpenseId,
    /// What was bought.
    pub item: String,
    /// How much was spent. Never negative.
    pub amount: f64,
    /// Whether the expense is private or shared.
    pub expense_type: ExpenseType,
    /// The category name the expense was tagged with, e.g. "Food".
    pub category: String,
    /// How many units were bought.
    pub quantity: f64,
    /// The unit name the quantity is measured in, e.g. "kg".
    pub unit: String,
    /// The user that created the expense.
    pub user_id: UserID,
    /// The username of the user that created the expense.
    pub username: String,
    /// When the expense happened.
    pub date: Date,
}

impl Expense {
    /// Create a new expense.
    ///
    /// Shortcut for [ExpenseBuilder] for discoverability.
    pub fn build(
        item: &str,
        amount: f64,
        expense_type: ExpenseType,
        date: Date,
        user_id: UserID,
    ) -> ExpenseBuilder {
        ExpenseBuilder {
            item: item.trim().to_owned(),
            amount,
            expense_type,
            date,
            user_id,
            category: String::new(),
            quantity: 1.0,
            unit: String::new(),
        }
    }
}

/// A builder for new expenses. The optional fields default to no category,
/// a quantity of one, and no unit.
#[derive(Debug, PartialEq, Clone)]
pub struct ExpenseBuilder {
    /// What was bought.
    pub item: String,
    /// How much was spent.
    pub amount: f64,
    /// Whether the expense is private or shared.
    pub expense_type: ExpenseType,
    /// When the expense happened.
    pub date: Date,
    /// The user creating the expense.
    pub user_id: UserID,
    /// The category name.
    pub category: String,
    /// How many units were bought.
    pub quantity: f64,
    /// The unit name.
    pub unit: String,
}

impl ExpenseBuilder {
    /// Set the category name.
    pub fn category(mut self, category: &str) -> Self {
        self.category = category.trim().to_owned();
        self
    }

    /// Set the quantity.
    pub fn quantity(mut self, quantity: f64) -> Self {
        self.quantity = quantity;
        self
    }

    /// Set the unit name.
    pub fn unit(mut self, unit: &str) -> Self {
        self.unit = unit.trim().to_owned();
        self
    }
}

/// Which expenses a user may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseAccess {
    /// Admins may change any expense.
    Any,
    /// Everyone else may only change their own expenses.
    OwnedBy(UserID),
}

impl From<&User> for ExpenseAccess {
    fn from(user: &User) -> Self {
        if user.is_admin {
            ExpenseAccess::Any
        } else {
            ExpenseAccess::OwnedBy(user.id)
        }
    }
}

/// Parse a form value as a finite, non-negative number.
///
/// # Errors
///
/// Returns [Error::InvalidNumber] if `raw` is not a number, is negative, or is not finite.
pub fn parse_non_negative(raw: &str) -> Result<f64, Error> {
    match raw.trim().parse::<f64>() {
        Ok(number) if number.is_finite() && number >= 0.0 => Ok(number),
        _ => Err(Error::InvalidNumber(raw.to_owned())),
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the expense table.
///
/// The dates are stored in `created_at` as "YYYY-MM-DD" text.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS expenses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            item TEXT,
            amount REAL,
            type TEXT,
            category TEXT,
            quantity REAL DEFAULT 1,
            unit TEXT,
            user_id INTEGER,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY(user_id) REFERENCES users(id)
        );

        CREATE INDEX IF NOT EXISTS idx_expenses_type_created_at ON expenses(type, created_at);",
    )?;

    Ok(())
}

/// The columns selected for an [Expense], in the order [map_expense_row] expects.
pub(crate) const SELECT_EXPENSE: &str = "SELECT e.id, COALESCE(e.item, ''), \
    COALESCE(e.amount, 0), e.type, COALESCE(e.category, ''), COALESCE(e.quantity, 1), \
    COALESCE(e.unit, ''), e.user_id, COALESCE(u.username, ''), strftime('%Y-%m-%d', e.created_at) \
    FROM expenses e JOIN users u ON e.user_id = u.id";

pub(crate) fn map_expense_row(row: &Row) -> Result<Expense, rusqlite::Error> {
    Ok(Expense {
        id: row.get(0)?,
        item: row.get(1)?,
        amount: row.get(2)?,
        expense_type: row.get(3)?,
        category: row.get(4)?,
        quantity: row.get(5)?,
        unit: row.get(6)?,
        user_id: UserID::new(row.get(7)?),
        username: row.get(8)?,
        date: row.get(9)?,
    })
}

/// Create a new expense in the database.
///
/// # Errors
///
/// Returns [Error::InvalidNumber] if the amount or quantity is negative or not finite,
/// or [Error::SqlError] if an SQL related error occurred.
pub fn create_expense(builder: ExpenseBuilder, connection: &Connection) -> Result<Expense, Error> {
    for number in [builder.amount, builder.quantity] {
        if !number.is_finite() || number < 0.0 {
            return Err(Error::InvalidNumber(number.to_string()));
        }
    }

    connection.execute(
        "INSERT INTO expenses (item, amount, type, category, quantity, unit, user_id, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        (
            &builder.item,
            builder.amount,
            builder.expense_type,
            &builder.category,
            builder.quantity,
            &builder.unit,
            builder.user_id.as_i64(),
            builder.date,
        ),
    )?;

    get_expense(connection.last_insert_rowid(), connection)
}

/// Retrieve an expense by its `id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if there is no expense with `id`,
/// or [Error::SqlError] if some other SQL related error occurred.
pub fn get_expense(id: ExpenseId, connection: &Connection) -> Result<Expense, Error> {
    connection
        .prepare(&format!("{SELECT_EXPENSE} WHERE e.id = :id"))?
        .query_row(&[(":id", &id)], map_expense_row)
        .map_err(|error| error.into())
}

/// Delete the expense with `id` if `access` allows it.
///
/// Returns whether an expense was deleted. Deleting another user's expense
/// without [ExpenseAccess::Any] does nothing.
///
/// # Errors
///
/// Returns [Error::SqlError] if an SQL related error occurred.
pub fn delete_expense(
    id: ExpenseId,
    access: ExpenseAccess,
    connection: &Connection,
) -> Result<bool, Error> {
    let rows_affected = match access {
        ExpenseAccess::Any => connection.execute("DELETE FROM expenses WHERE id = ?1", (id,))?,
        ExpenseAccess::OwnedBy(user_id) => connection.execute(
            "DELETE FROM expenses WHERE id = ?1 AND user_id = ?2",
            (id, user_id.as_i64()),
        )?,
    };

    Ok(rows_affected > 0)
}

/// Change the item and amount of the expense with `id` if `access` allows it.
///
/// Returns whether an expense was updated. Editing another user's expense
/// without [ExpenseAccess::Any] does nothing.
///
/// # Errors
///
/// Returns [Error::InvalidNumber] if `amount` is negative or not finite,
/// or [Error::SqlError] if an SQL related error occurred.
pub fn update_expense(
    id: ExpenseId,
    item: &str,
    amount: f64,
    access: ExpenseAccess,
    connection: &Connection,
) -> Result<bool, Error> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidNumber(amount.to_string()));
    }

    let item = item.trim();
    let rows_affected = match access {
        ExpenseAccess::Any => connection.execute(
            "UPDATE expenses SET item = ?1, amount = ?2 WHERE id = ?3",
            (item, amount, id),
        )?,
        ExpenseAccess::OwnedBy(user_id) => connection.execute(
            "UPDATE expenses SET item = ?1, amount = ?2 WHERE id = ?3 AND user_id = ?4",
            (item, amount, id, user_id.as_i64()),
        )?,
    };

    Ok(rows_affected > 0)
}


#[cfg(test)]
mod parse_number_tests {
    use crate::Error;

    use super::parse_non_negative;

    #[test]
    fn accepts_non_negative_numbers() {
        assert_eq!(parse_non_negative("0"), Ok(0.0));
        assert_eq!(parse_non_negative(" 12.5 "), Ok(12.5));
    }

    #[test]
    fn rejects_negative_and_garbage() {
        for raw in ["-1", "abc", "", "NaN", "inf"] {
            assert_eq!(
                parse_non_negative(raw),
                Err(Error::InvalidNumber(raw.to_owned())),
                "{raw:?} should be rejected"
            );
        }
    }
}
