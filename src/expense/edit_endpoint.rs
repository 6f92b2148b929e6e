use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    response::{IntoResponse, Redirect, Response},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, User, endpoints,
    expense::{ExpenseAccess, ExpenseId, parse_non_negative, update_expense},
    feedback::{Feedback, redirect_with_feedback},
};

/// The state needed to edit an expense.
#[derive(Debug, Clone)]
pub struct EditExpenseState {
    /// The database connection for managing expenses.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form for changing an expense's item and amount.
#[derive(Debug, Deserialize)]
pub struct EditExpenseForm {
    pub id: ExpenseId,
    pub item: String,
    pub amount: String,
}

/// A route handler for editing an expense, redirects to the home page.
///
/// Admins may edit any expense, everyone else only their own. Trying to
/// edit someone else's expense does nothing.
pub async fn edit_expense_endpoint(
    State(state): State<EditExpenseState>,
    Extension(user): Extension<User>,
    Form(form): Form<EditExpenseForm>,
) -> Response {
    let Ok(amount) = parse_non_negative(&form.amount) else {
        return redirect_with_feedback(endpoints::HOME, Feedback::Error("Invalid amount"))
            .into_response();
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match update_expense(
        form.id,
        &form.item,
        amount,
        ExpenseAccess::from(&user),
        &connection,
    ) {
        Ok(true) => redirect_with_feedback(endpoints::HOME, Feedback::Success("Expense updated"))
            .into_response(),
        Ok(false) => {
            tracing::debug!("User {} could not edit expense {}", user.id, form.id);
            Redirect::to(endpoints::HOME).into_response()
        }
        Err(error) => {
            tracing::error!("Could not update expense {}: {error}", form.id);
            redirect_with_feedback(endpoints::HOME, Feedback::Error("Could not update expense"))
                .into_response()
        }
    }
}

#[cfg(test)]
mod edit_expense_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, Form, extract::State};
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        User,
        expense::{Expense, ExpenseType, create_expense, get_expense},
        test_utils::{assert_redirect, get_test_connection, insert_test_user},
    };

    use super::{EditExpenseForm, EditExpenseState, edit_expense_endpoint};

    fn setup() -> (Connection, User, User, Expense) {
        let connection = get_test_connection();
        let alice = insert_test_user(&connection, "alice", false);
        let bob = insert_test_user(&connection, "bob", false);
        let expense = create_expense(
            Expense::build("Tea", 100.0, ExpenseType::Common, date!(2024 - 01 - 01), alice.id),
            &connection,
        )
        .unwrap();

        (connection, alice, bob, expense)
    }

    fn edit_form(id: i64, item: &str, amount: &str) -> Form<EditExpenseForm> {
        Form(EditExpenseForm {
            id,
            item: item.to_owned(),
            amount: amount.to_owned(),
        })
    }

    #[tokio::test]
    async fn owner_edits_item_and_amount() {
        let (connection, alice, _, expense) = setup();
        let state = EditExpenseState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = edit_expense_endpoint(
            State(state.clone()),
            Extension(alice),
            edit_form(expense.id, "Coffee", "150.5"),
        )
        .await;

        assert_redirect(&response, "/?success=Expense+updated");
        let connection = state.db_connection.lock().unwrap();
        let got = get_expense(expense.id, &connection).unwrap();
        assert_eq!(got.item, "Coffee");
        assert_eq!(got.amount, 150.5);
    }

    #[tokio::test]
    async fn editing_others_expense_is_a_no_op() {
        let (connection, _, bob, expense) = setup();
        let state = EditExpenseState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = edit_expense_endpoint(
            State(state.clone()),
            Extension(bob),
            edit_form(expense.id, "Coffee", "1"),
        )
        .await;

        assert_redirect(&response, "/");
        let connection = state.db_connection.lock().unwrap();
        assert_eq!(get_expense(expense.id, &connection), Ok(expense));
    }

    #[tokio::test]
    async fn invalid_amount_is_rejected() {
        let (connection, alice, _, expense) = setup();
        let state = EditExpenseState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = edit_expense_endpoint(
            State(state.clone()),
            Extension(alice),
            edit_form(expense.id, "Coffee", "-3"),
        )
        .await;

        assert_redirect(&response, "/?error=Invalid+amount");
        let connection = state.db_connection.lock().unwrap();
        assert_eq!(get_expense(expense.id, &connection), Ok(expense));
    }
}
