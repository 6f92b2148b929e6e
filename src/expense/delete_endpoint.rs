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
    expense::{ExpenseAccess, ExpenseId, delete_expense},
    feedback::{Feedback, redirect_with_feedback},
};

/// The state needed to delete an expense.
#[derive(Debug, Clone)]
pub struct DeleteExpenseState {
    /// The database connection for managing expenses.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form for deleting an expense.
#[derive(Debug, Deserialize)]
pub struct DeleteExpenseForm {
    pub id: ExpenseId,
}

/// A route handler for deleting an expense, redirects to the home page.
///
/// Admins may delete any expense, everyone else only their own. Trying to
/// delete someone else's expense does nothing.
pub async fn delete_expense_endpoint(
    State(state): State<DeleteExpenseState>,
    Extension(user): Extension<User>,
    Form(form): Form<DeleteExpenseForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match delete_expense(form.id, ExpenseAccess::from(&user), &connection) {
        Ok(true) => redirect_with_feedback(endpoints::HOME, Feedback::Success("Expense deleted"))
            .into_response(),
        Ok(false) => {
            tracing::debug!("User {} could not delete expense {}", user.id, form.id);
            Redirect::to(endpoints::HOME).into_response()
        }
        Err(error) => {
            tracing::error!("Could not delete expense {}: {error}", form.id);
            redirect_with_feedback(endpoints::HOME, Feedback::Error("Could not delete expense"))
                .into_response()
        }
    }
}
