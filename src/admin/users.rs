//! Form handlers for creating, editing, and deleting users.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    response::{IntoResponse, Redirect, Response},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, PasswordHash, User, UserID, endpoints,
    feedback::{Feedback, redirect_with_feedback},
    user::{create_user, delete_user_and_expenses, update_currency, update_password},
};

/// The state needed for managing users.
#[derive(Debug, Clone)]
pub struct AdminState {
    /// The database connection for managing users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AdminState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form for creating a user.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserForm {
    pub username: String,
    pub password: String,
}

/// The form for deleting a user.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteUserForm {
    pub id: i64,
}

/// The form for editing a user. A blank password keeps the current one.
#[derive(Debug, Clone, Deserialize)]
pub struct EditUserForm {
    pub id: i64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub password: String,
}

fn admin_feedback(feedback: Feedback) -> Response {
    redirect_with_feedback(endpoints::ADMIN, feedback).into_response()
}

/// Create a regular user with the default settings.
pub async fn create_user_endpoint(
    State(state): State<AdminState>,
    Extension(user): Extension<User>,
    Form(form): Form<CreateUserForm>,
) -> Response {
    if !user.is_admin {
        return Redirect::to(endpoints::HOME).into_response();
    }

    let password_hash = match PasswordHash::new(&form.password, PasswordHash::DEFAULT_COST) {
        Ok(password_hash) => password_hash,
        Err(Error::EmptyField(_)) => {
            return admin_feedback(Feedback::Error("Password required"));
        }
        Err(error) => {
            tracing::error!("Could not hash password for new user: {error}");
            return admin_feedback(Feedback::Error("Could not create user"));
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match create_user(&form.username, password_hash, false, &connection) {
        Ok(new_user) => {
            tracing::info!("Admin {} created user {}", user.id, new_user.id);
            admin_feedback(Feedback::Success("User Created"))
        }
        Err(Error::DuplicateUsername) => admin_feedback(Feedback::Error("Username exists")),
        Err(Error::EmptyField(_)) => admin_feedback(Feedback::Error("Username required")),
        Err(error) => {
            tracing::error!("Could not create user {:?}: {error}", form.username);
            admin_feedback(Feedback::Error("Could not create user"))
        }
    }
}

/// Delete a user and all of their expenses. The bootstrap admin cannot be deleted.
pub async fn delete_user_endpoint(
    State(state): State<AdminState>,
    Extension(user): Extension<User>,
    Form(form): Form<DeleteUserForm>,
) -> Response {
    if !user.is_admin {
        return Redirect::to(endpoints::HOME).into_response();
    }

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match delete_user_and_expenses(UserID::new(form.id), &connection) {
        Ok(()) => {
            tracing::info!("Admin {} deleted user {}", user.id, form.id);
            admin_feedback(Feedback::Success("User Deleted"))
        }
        Err(Error::ProtectedUser) => admin_feedback(Feedback::Error("Cannot delete main admin")),
        Err(error) => {
            tracing::error!("Could not delete user {}: {error}", form.id);
            admin_feedback(Feedback::Error("Could not delete user"))
        }
    }
}

/// Change a user's currency and, if given, their password.
pub async fn edit_user_endpoint(
    State(state): State<AdminState>,
    Extension(user): Extension<User>,
    Form(form): Form<EditUserForm>,
) -> Response {
    if !user.is_admin {
        return Redirect::to(endpoints::HOME).into_response();
    }

    let password_hash = if form.password.is_empty() {
        None
    } else {
        match PasswordHash::new(&form.password, PasswordHash::DEFAULT_COST) {
            Ok(password_hash) => Some(password_hash),
            Err(error) => {
                tracing::error!("Could not hash password for user {}: {error}", form.id);
                return admin_feedback(Feedback::Error("Could not update user"));
            }
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    let target = UserID::new(form.id);
    let result = update_currency(target, &form.currency, &connection).and_then(|()| {
        match &password_hash {
            Some(password_hash) => update_password(target, password_hash, &connection),
            None => Ok(()),
        }
    });

    match result {
        Ok(()) => {
            tracing::info!("Admin {} updated user {}", user.id, form.id);
            admin_feedback(Feedback::Success("User Updated"))
        }
        Err(Error::NotFound) => admin_feedback(Feedback::Error("User not found")),
        Err(error) => {
            tracing::error!("Could not update user {}: {error}", form.id);
            admin_feedback(Feedback::Error("Could not update user"))
        }
    }
}
