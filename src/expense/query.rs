//! Database query helpers for the expense lists and monthly totals.

use rusqlite::{Connection, params_from_iter, types::Value};
use serde::Deserialize;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    Error, UserID,
    expense::{Expense, ExpenseType, core::SELECT_EXPENSE, core::map_expense_row},
};

/// How many expenses the home page lists per type.
pub const RECENT_EXPENSE_LIMIT: usize = 50;

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// An inclusive range of dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// The first day in the range.
    pub start: Date,
    /// The last day in the range.
    pub end: Date,
}

/// The optional date filter in a page's query string, e.g. `?start=2024-01-01&end=2024-01-31`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateRangeQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl DateRangeQuery {
    /// The date range to filter by.
    ///
    /// Returns `None` unless both `start` and `end` are set and not blank.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidDate] if either date is not in "YYYY-MM-DD" format.
    pub fn date_range(&self) -> Result<Option<DateRange>, Error> {
        let start = self.start.as_deref().map(str::trim).unwrap_or_default();
        let end = self.end.as_deref().map(str::trim).unwrap_or_default();

        if start.is_empty() || end.is_empty() {
            return Ok(None);
        }

        Ok(Some(DateRange {
            start: parse_date(start)?,
            end: parse_date(end)?,
        }))
    }
}

/// Parse a date in "YYYY-MM-DD" format, as sent by HTML date inputs.
///
/// # Errors
///
/// Returns [Error::InvalidDate] if `raw` is not a valid date.
pub fn parse_date(raw: &str) -> Result<Date, Error> {
    Date::parse(raw.trim(), DATE_FORMAT).map_err(|_| Error::InvalidDate(raw.to_owned()))
}

/// Which expenses to list.
struct ExpenseFilter {
    expense_type: ExpenseType,
    owner: Option<UserID>,
    date_range: Option<DateRange>,
    limit: Option<usize>,
}

/// Get expenses newest first. Expenses on the same day are ordered newest insertion first.
fn query_expenses(filter: ExpenseFilter, connection: &Connection) -> Result<Vec<Expense>, Error> {
    let mut query = format!("{SELECT_EXPENSE} WHERE e.type = ?");
    let mut params = vec![Value::Text(filter.expense_type.as_str().to_owned())];

    if let Some(owner) = filter.owner {
        query.push_str(" AND e.user_id = ?");
        params.push(Value::Integer(owner.as_i64()));
    }

    if let Some(DateRange { start, end }) = filter.date_range {
        query.push_str(" AND date(e.created_at) BETWEEN ? AND ?");
        params.push(Value::Text(start.to_string()));
        params.push(Value::Text(end.to_string()));
    }

    query.push_str(" ORDER BY e.created_at DESC, e.id DESC");

    if let Some(limit) = filter.limit {
        query.push_str(&format!(" LIMIT {limit}"));
    }

    connection
        .prepare(&query)?
        .query_map(params_from_iter(params), map_expense_row)?
        .map(|expense_result| expense_result.map_err(Error::from))
        .collect()
}

/// Get the private expenses of `user_id`, optionally within `date_range`.
///
/// # Errors
///
/// Returns [Error::SqlError] if an SQL related error occurred.
pub fn get_private_expenses(
    user_id: UserID,
    date_range: Option<DateRange>,
    limit: Option<usize>,
    connection: &Connection,
) -> Result<Vec<Expense>, Error> {
    query_expenses(
        ExpenseFilter {
            expense_type: ExpenseType::Private,
            owner: Some(user_id),
            date_range,
            limit,
        },
        connection,
    )
}

/// Get the common expenses of every user, optionally within `date_range`.
///
/// # Errors
///
/// Returns [Error::SqlError] if an SQL related error occurred.
pub fn get_common_expenses(
    date_range: Option<DateRange>,
    limit: Option<usize>,
    connection: &Connection,
) -> Result<Vec<Expense>, Error> {
    query_expenses(
        ExpenseFilter {
            expense_type: ExpenseType::Common,
            owner: None,
            date_range,
            limit,
        },
        connection,
    )
}

/// Sum the expenses of `expense_type` in the calendar month containing `day`.
///
/// Pass `Some(user_id)` to only count that user's expenses.
///
/// # Errors
///
/// Returns [Error::SqlError] if an SQL related error occurred.
pub fn get_monthly_total(
    expense_type: ExpenseType,
    owner: Option<UserID>,
    day: Date,
    connection: &Connection,
) -> Result<f64, Error> {
    let month = format!("{:04}-{:02}", day.year(), u8::from(day.month()));
    let mut query = "SELECT COALESCE(SUM(amount), 0) FROM expenses \
        WHERE type = ? AND strftime('%Y-%m', created_at) = ?"
        .to_owned();
    let mut params = vec![
        Value::Text(expense_type.as_str().to_owned()),
        Value::Text(month),
    ];

    if let Some(owner) = owner {
        query.push_str(" AND user_id = ?");
        params.push(Value::Integer(owner.as_i64()));
    }

    connection
        .query_row(&query, params_from_iter(params), |row| row.get(0))
        .map_err(Error::from)
}
