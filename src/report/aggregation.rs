//! Sums the common expenses per category.

use rusqlite::{Connection, params_from_iter, types::Value};

use crate::{
    Error,
    expense::{DateRange, Expense, get_common_expenses},
};

/// The sum of the common expenses in one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    /// The category name. Empty for expenses without a category.
    pub category: String,
    /// The sum of the amounts.
    pub total: f64,
}

/// The category breakdown of the common expenses.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Per-category sums, largest first.
    pub summary: Vec<CategoryTotal>,
    /// The sum of the per-category sums.
    pub grand_total: f64,
    /// The expenses counted in the summary, newest first.
    pub details: Vec<Expense>,
}

/// Sum the common expenses per category, largest sum first.
///
/// # Errors
///
/// Returns [Error::SqlError] if an SQL related error occurred.
pub fn get_category_totals(
    date_range: Option<DateRange>,
    connection: &Connection,
) -> Result<Vec<CategoryTotal>, Error> {
    let mut query = "SELECT COALESCE(category, ''), COALESCE(SUM(amount), 0) \
        FROM expenses WHERE type = 'common'"
        .to_owned();
    let mut params = Vec::new();

    if let Some(DateRange { start, end }) = date_range {
        query.push_str(" AND date(created_at) BETWEEN ? AND ?");
        params.push(Value::Text(start.to_string()));
        params.push(Value::Text(end.to_string()));
    }

    query.push_str(" GROUP BY COALESCE(category, '') ORDER BY SUM(amount) DESC");

    connection
        .prepare(&query)?
        .query_map(params_from_iter(params), |row| {
            Ok(CategoryTotal {
                category: row.get(0)?,
                total: row.get(1)?,
            })
        })?
        .map(|total_result| total_result.map_err(Error::from))
        .collect()
}

/// Build the category report for the common expenses within `date_range`,
/// or all of them if `date_range` is `None`.
///
/// # Errors
///
/// Returns [Error::SqlError] if an SQL related error occurred.
pub fn build_report(
    date_range: Option<DateRange>,
    connection: &Connection,
) -> Result<Report, Error> {
    let summary = get_category_totals(date_range, connection)?;
    let grand_total = summary.iter().map(|category| category.total).sum();
    let details = get_common_expenses(date_range, None, connection)?;

    Ok(Report {
        summary,
        grand_total,
        details,
    })
}
