//! Saves the profile changes from the settings page.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, PasswordHash, User, endpoints,
    feedback::{Feedback, redirect_with_feedback},
    user::{set_project_name_for_all, update_password, update_profile},
};

/// The state needed for saving settings.
#[derive(Debug, Clone)]
pub struct SettingsState {
    /// The database connection for managing users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SettingsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The settings form. Blank `password` and `project_name` fields leave the
/// current values unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsForm {
    pub username: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub project_name: String,
}

/// Update the logged-in user's profile, and the project name of every user.
///
/// Redirects to the settings page with a success or error message.
pub async fn update_settings_endpoint(
    State(state): State<SettingsState>,
    Extension(user): Extension<User>,
    Form(form): Form<SettingsForm>,
) -> Response {
    let password_hash = if form.password.is_empty() {
        None
    } else {
        match PasswordHash::new(&form.password, PasswordHash::DEFAULT_COST) {
            Ok(password_hash) => Some(password_hash),
            Err(error) => {
                tracing::error!("Could not hash password for user {}: {error}", user.id);
                return redirect_with_feedback(
                    endpoints::SETTINGS,
                    Feedback::Error("Could not save settings"),
                )
                .into_response();
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

    match save_settings(&user, &form, password_hash.as_ref(), &connection) {
        Ok(()) => {
            tracing::info!("User {} updated their settings", user.id);
            redirect_with_feedback(endpoints::SETTINGS, Feedback::Success("Saved & Synced"))
                .into_response()
        }
        Err(Error::DuplicateUsername) => {
            redirect_with_feedback(endpoints::SETTINGS, Feedback::Error("Username taken"))
                .into_response()
        }
        Err(Error::EmptyField(_)) => {
            redirect_with_feedback(endpoints::SETTINGS, Feedback::Error("Username required"))
                .into_response()
        }
        Err(error) => {
            tracing::error!("Could not save settings for user {}: {error}", user.id);
            redirect_with_feedback(
                endpoints::SETTINGS,
                Feedback::Error("Could not save settings"),
            )
            .into_response()
        }
    }
}

fn save_settings(
    user: &User,
    form: &SettingsForm,
    password_hash: Option<&PasswordHash>,
    connection: &Connection,
) -> Result<(), Error> {
    update_profile(
        user.id,
        &form.username,
        &form.currency,
        &form.language,
        connection,
    )?;

    if !form.project_name.trim().is_empty() {
        set_project_name_for_all(&form.project_name, connection)?;
    }

    if let Some(password_hash) = password_hash {
        update_password(user.id, password_hash, connection)?;
    }

    Ok(())
}
