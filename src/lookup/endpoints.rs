//! Form handlers for adding and deleting categories and units.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    response::{IntoResponse, Redirect, Response},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, endpoints,
    feedback::{Feedback, redirect_with_feedback},
    lookup::{LookupKind, add_lookup_entry, delete_lookup_entry},
};

/// The state needed for changing the lookup lists.
#[derive(Debug, Clone)]
pub struct LookupState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LookupState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form for adding a category or unit.
#[derive(Debug, Deserialize)]
pub struct LookupNameForm {
    pub name: String,
}

/// The form for deleting a category or unit.
#[derive(Debug, Deserialize)]
pub struct LookupIdForm {
    pub id: i64,
}

fn add_entry(kind: LookupKind, state: LookupState, name: &str) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match add_lookup_entry(kind, name, &connection) {
        Ok(entry) => {
            tracing::info!("Added {kind:?} \"{}\"", entry.name);
            redirect_with_feedback(endpoints::SETTINGS, Feedback::Success("Added")).into_response()
        }
        Err(Error::EmptyField(_)) => Redirect::to(endpoints::SETTINGS).into_response(),
        Err(Error::DuplicateName) => {
            redirect_with_feedback(endpoints::SETTINGS, Feedback::Error("Exists")).into_response()
        }
        Err(error) => {
            tracing::error!("An unexpected error occurred while adding {kind:?} {name:?}: {error}");
            error.into_response()
        }
    }
}

fn delete_entry(kind: LookupKind, state: LookupState, id: i64) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match delete_lookup_entry(kind, id, &connection) {
        Ok(()) => {
            redirect_with_feedback(endpoints::SETTINGS, Feedback::Success("Deleted")).into_response()
        }
        Err(error) => {
            tracing::error!("An unexpected error occurred while deleting {kind:?} {id}: {error}");
            error.into_response()
        }
    }
}

/// Add a category, redirecting back to the settings page.
pub async fn add_category_endpoint(
    State(state): State<LookupState>,
    Form(form): Form<LookupNameForm>,
) -> Response {
    add_entry(LookupKind::Category, state, &form.name)
}

/// Delete a category, redirecting back to the settings page.
pub async fn delete_category_endpoint(
    State(state): State<LookupState>,
    Form(form): Form<LookupIdForm>,
) -> Response {
    delete_entry(LookupKind::Category, state, form.id)
}

/// Add a unit, redirecting back to the settings page.
pub async fn add_unit_endpoint(
    State(state): State<LookupState>,
    Form(form): Form<LookupNameForm>,
) -> Response {
    add_entry(LookupKind::Unit, state, &form.name)
}

/// Delete a unit, redirecting back to the settings page.
pub async fn delete_unit_endpoint(
    State(state): State<LookupState>,
    Form(form): Form<LookupIdForm>,
) -> Response {
    delete_entry(LookupKind::Unit, state, form.id)
}
