//! Expense tracking.
//!
//! This module contains everything related to expenses:
//! - The `Expense` model and `ExpenseBuilder` for creating expenses
//! - Database functions for storing, listing, and summing expenses
//! - The home page and the endpoints for adding, editing, and deleting expenses

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod home_page;
mod query;

pub use core::{
    Expense, ExpenseAccess, ExpenseBuilder, ExpenseId, ExpenseType, create_expense,
    create_expense_table, delete_expense, get_expense, parse_non_negative, update_expense,
};
pub use create_endpoint::create_expense_endpoint;
pub use delete_endpoint::delete_expense_endpoint;
pub use edit_endpoint::edit_expense_endpoint;
pub use home_page::get_home_page;
pub use query::{
    DateRange, DateRangeQuery, RECENT_EXPENSE_LIMIT, get_common_expenses, get_monthly_total,
    get_private_expenses, parse_date,
};
