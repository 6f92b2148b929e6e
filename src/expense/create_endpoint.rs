//! Defines the endpoint for recording a new expense.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error, User, endpoints,
    expense::{
        Expense, ExpenseBuilder, ExpenseType, create_expense, parse_non_negative,
        query::parse_date,
    },
    feedback::{Feedback, redirect_with_feedback},
    timezone::local_today,
    user::UserID,
};

/// The state needed for creating an expense.
#[derive(Debug, Clone)]
pub struct CreateExpenseState {
    /// The database connection for managing expenses.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Colombo".
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The form data for a new expense.
///
/// Numbers and dates are kept as text so that bad input can be reported back
/// to the user instead of being rejected by the extractor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseForm {
    pub item: String,
    pub amount: String,
    #[serde(rename = "type")]
    pub expense_type: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub date: String,
}

impl ExpenseForm {
    /// Validate the form, returning the message to show the user on failure.
    ///
    /// A blank quantity defaults to one and a blank date defaults to `today`.
    fn into_builder(self, user_id: UserID, today: Date) -> Result<ExpenseBuilder, &'static str> {
        let amount = parse_non_negative(&self.amount).map_err(|_| "Invalid amount")?;
        let expense_type: ExpenseType =
            self.expense_type.parse().map_err(|_| "Invalid expense type")?;

        let quantity = if self.quantity.trim().is_empty() {
            1.0
        } else {
            parse_non_negative(&self.quantity).map_err(|_| "Invalid quantity")?
        };

        let date = if self.date.trim().is_empty() {
            today
        } else {
            parse_date(&self.date).map_err(|_| "Invalid date")?
        };

        Ok(Expense::build(&self.item, amount, expense_type, date, user_id)
            .category(&self.category)
            .quantity(quantity)
            .unit(&self.unit))
    }
}

/// A route handler for creating a new expense owned by the logged-in user.
///
/// Redirects to the home page with a success or error message.
pub async fn create_expense_endpoint(
    State(state): State<CreateExpenseState>,
    Extension(user): Extension<User>,
    Form(form): Form<ExpenseForm>,
) -> Response {
    let today = match local_today(&state.local_timezone) {
        Ok(today) => today,
        Err(error) => return error.into_response(),
    };

    let builder = match form.into_builder(user.id, today) {
        Ok(builder) => builder,
        Err(message) => {
            return redirect_with_feedback(endpoints::HOME, Feedback::Error(message))
                .into_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match create_expense(builder, &connection) {
        Ok(expense) => {
            tracing::debug!("User {} added expense {}", user.id, expense.id);
            redirect_with_feedback(endpoints::HOME, Feedback::Success("Expense added"))
                .into_response()
        }
        Err(error) => {
            tracing::error!("Could not create expense for user {}: {error}", user.id);
            redirect_with_feedback(endpoints::HOME, Feedback::Error("Could not add expense"))
                .into_response()
        }
    }
}

#[cfg(test)]
mod create_expense_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, Form, extract::State};
    use time::macros::date;

    use crate::{
        User,
        expense::{ExpenseType, query::get_common_expenses, query::get_private_expenses},
        test_utils::{assert_redirect, get_test_connection, insert_test_user},
        timezone::local_today,
    };

    use super::{CreateExpenseState, ExpenseForm, create_expense_endpoint};

    fn get_state() -> (CreateExpenseState, User) {
        let connection = get_test_connection();
        let user = insert_test_user(&connection, "alice", false);

        let state = CreateExpenseState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        (state, user)
    }

    fn form(amount: &str, expense_type: &str) -> ExpenseForm {
        ExpenseForm {
            item: "Rice".to_owned(),
            amount: amount.to_owned(),
            expense_type: expense_type.to_owned(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn creates_expense_with_all_fields() {
        let (state, user) = get_state();
        let form = ExpenseForm {
            category: "Food".to_owned(),
            quantity: "2.5".to_owned(),
            unit: "kg".to_owned(),
            date: "2024-01-15".to_owned(),
            ..form("450", "common")
        };

        let response =
            create_expense_endpoint(State(state.clone()), Extension(user.clone()), Form(form))
                .await;

        assert_redirect(&response, "/?success=Expense+added");
        let connection = state.db_connection.lock().unwrap();
        let expenses = get_common_expenses(None, None, &connection).unwrap();
        assert_eq!(expenses.len(), 1);
        let expense = &expenses[0];
        assert_eq!(expense.item, "Rice");
        assert_eq!(expense.amount, 450.0);
        assert_eq!(expense.expense_type, ExpenseType::Common);
        assert_eq!(expense.category, "Food");
        assert_eq!(expense.quantity, 2.5);
        assert_eq!(expense.unit, "kg");
        assert_eq!(expense.date, date!(2024 - 01 - 15));
        assert_eq!(expense.user_id, user.id);
    }

    #[tokio::test]
    async fn blank_quantity_and_date_use_defaults() {
        let (state, user) = get_state();

        create_expense_endpoint(
            State(state.clone()),
            Extension(user.clone()),
            Form(form("10", "private")),
        )
        .await;

        let connection = state.db_connection.lock().unwrap();
        let expenses = get_private_expenses(user.id, None, None, &connection).unwrap();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].quantity, 1.0);
        // Allow for the test running across midnight.
        let today = local_today("Etc/UTC").unwrap();
        assert!(expenses[0].date == today || expenses[0].date.next_day() == Some(today));
    }

    #[tokio::test]
    async fn rejects_invalid_values_without_storing() {
        let cases = [
            (form("-1", "private"), "/?error=Invalid+amount"),
            (form("abc", "private"), "/?error=Invalid+amount"),
            (form("1", "shared"), "/?error=Invalid+expense+type"),
            (
                ExpenseForm {
                    quantity: "-2".to_owned(),
                    ..form("1", "private")
                },
                "/?error=Invalid+quantity",
            ),
            (
                ExpenseForm {
                    date: "15/01/2024".to_owned(),
                    ..form("1", "private")
                },
                "/?error=Invalid+date",
            ),
        ];

        for (form, want_location) in cases {
            let (state, user) = get_state();

            let response =
                create_expense_endpoint(State(state.clone()), Extension(user.clone()), Form(form))
                    .await;

            assert_redirect(&response, want_location);
            let connection = state.db_connection.lock().unwrap();
            assert!(
                get_private_expenses(user.id, None, None, &connection)
                    .unwrap()
                    .is_empty()
            );
        }
    }
}
