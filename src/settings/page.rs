use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error, User, endpoints,
    feedback::{FeedbackQuery, feedback_banner},
    html::{
        BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE, base,
        delete_button, labelled_input,
    },
    lookup::{LookupEntry, LookupKind, get_lookup_entries},
    navigation::NavBar,
};

/// The state needed for the settings page.
#[derive(Debug, Clone)]
pub struct SettingsPageState {
    /// The database connection for reading the lookup lists.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SettingsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Display the profile form and the category and unit lists.
pub async fn get_settings_page(
    State(state): State<SettingsPageState>,
    Extension(user): Extension<User>,
    Query(feedback): Query<FeedbackQuery>,
) -> Response {
    let lookups = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_response();
            }
        };

        get_lookup_entries(LookupKind::Category, &connection).and_then(|categories| {
            get_lookup_entries(LookupKind::Unit, &connection).map(|units| (categories, units))
        })
    };

    match lookups {
        Ok((categories, units)) => {
            settings_view(&user, &categories, &units, &feedback).into_response()
        }
        Err(error) => {
            tracing::error!("Could not load the lookup lists: {error}");
            error.into_response()
        }
    }
}

fn settings_view(
    user: &User,
    categories: &[LookupEntry],
    units: &[LookupEntry],
    feedback: &FeedbackQuery,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::SETTINGS, &user.project_name, user.is_admin).into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-3xl space-y-6"
            {
                (feedback_banner(feedback))

                section class=(CARD_STYLE)
                {
                    h2 class="text-xl font-bold mb-4" { "Profile" }

                    form method="post" action=(endpoints::SETTINGS) class="space-y-4"
                    {
                        (labelled_input("username", "Username", "text", &user.username, true))
                        (labelled_input("currency", "Currency", "text", &user.currency, false))
                        (labelled_input("language", "Language", "text", &user.language, false))
                        (labelled_input("project_name", "Project name (shared by everyone)", "text",
                            &user.project_name, false))
                        (labelled_input("password", "New password (leave blank to keep)",
                            "password", "", false))

                        button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Save" }
                    }
                }

                div class="grid grid-cols-1 md:grid-cols-2 gap-6"
                {
                    (lookup_section("Categories", "categories", categories,
                        endpoints::ADD_CATEGORY, endpoints::DELETE_CATEGORY))
                    (lookup_section("Units", "units", units,
                        endpoints::ADD_UNIT, endpoints::DELETE_UNIT))
                }
            }
        }
    };

    base("Settings", &content)
}

fn lookup_section(
    title: &str,
    id: &str,
    entries: &[LookupEntry],
    add_endpoint: &str,
    delete_endpoint: &str,
) -> Markup {
    html! {
        section id=(id) class=(CARD_STYLE)
        {
            h2 class="text-xl font-bold mb-4" { (title) }

            form method="post" action=(add_endpoint) class="flex gap-2 mb-4"
            {
                input type="text" name="name" aria-label="Name" placeholder="New name"
                    class=(FORM_TEXT_INPUT_STYLE) required;
                button type="submit" class="px-4 py-2 bg-blue-500 text-white rounded" { "Add" }
            }

            ul class="divide-y divide-gray-200 dark:divide-gray-700"
            {
                @for entry in entries {
                    li class="flex justify-between items-center py-2"
                    {
                        span { (entry.name) }
                        (delete_button(delete_endpoint, entry.id, &format!("Delete {}?", entry.name)))
                    }
                }
            }
        }
    }
}
