use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error, User, endpoints,
    feedback::{FeedbackQuery, feedback_banner},
    html::{
        BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE,
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
        delete_button, labelled_input,
    },
    navigation::NavBar,
    user::{BOOTSTRAP_ADMIN_ID, get_all_users},
};

/// The state needed for the admin page.
#[derive(Debug, Clone)]
pub struct AdminPageState {
    /// The database connection for listing users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AdminPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Display the user list and the backup controls. Users that are not admins
/// are redirected to the home page.
pub async fn get_admin_page(
    State(state): State<AdminPageState>,
    Extension(user): Extension<User>,
    Query(feedback): Query<FeedbackQuery>,
) -> Response {
    if !user.is_admin {
        return Redirect::to(endpoints::HOME).into_response();
    }

    let users = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_response();
            }
        };

        match get_all_users(&connection) {
            Ok(users) => users,
            Err(error) => {
                tracing::error!("Could not list users: {error}");
                return error.into_response();
            }
        }
    };

    admin_view(&user, &users, &feedback).into_response()
}

fn admin_view(user: &User, users: &[User], feedback: &FeedbackQuery) -> Markup {
    let nav_bar = NavBar::new(endpoints::ADMIN, &user.project_name, user.is_admin).into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-5xl space-y-6"
            {
                (feedback_banner(feedback))

                section id="users" class="overflow-x-auto"
                {
                    h2 class="text-xl font-bold mb-2" { "Users" }

                    table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "ID" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Username" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Role" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Language" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Currency and password" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for listed_user in users {
                                (user_row(listed_user))
                            }
                        }
                    }
                }

                div class="grid grid-cols-1 md:grid-cols-2 gap-6"
                {
                    section class=(CARD_STYLE)
                    {
                        h2 class="text-xl font-bold mb-4" { "Create user" }

                        form method="post" action=(endpoints::ADMIN_CREATE_USER) class="space-y-4"
                        {
                            (labelled_input("username", "Username", "text", "", true))
                            (labelled_input("password", "Password", "password", "", true))

                            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create" }
                        }
                    }

                    section class=(CARD_STYLE)
                    {
                        h2 class="text-xl font-bold mb-4" { "Backup" }

                        p class="mb-4"
                        {
                            a href=(endpoints::ADMIN_BACKUP) class=(LINK_STYLE) { "Download backup" }
                        }

                        form method="post" action=(endpoints::ADMIN_RESTORE)
                            enctype="multipart/form-data" class="space-y-4"
                            onsubmit="return confirm('Replace all data with this backup?');"
                        {
                            div
                            {
                                label for="backup_file" class=(FORM_LABEL_STYLE) { "Restore from file" }
                                input type="file" name="backup_file" id="backup_file"
                                    class=(FORM_TEXT_INPUT_STYLE) required;
                            }

                            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Restore" }
                        }
                    }
                }
            }
        }
    };

    base("Admin", &content)
}

fn user_row(user: &User) -> Markup {
    html! {
        tr class=(TABLE_ROW_STYLE) data-user-id=(user.id.as_i64())
        {
            td class=(TABLE_CELL_STYLE) { (user.id) }
            td class=(TABLE_CELL_STYLE) { (user.username) }
            td class=(TABLE_CELL_STYLE) { @if user.is_admin { "Admin" } @else { "User" } }
            td class=(TABLE_CELL_STYLE) { (user.language) }
            td class=(TABLE_CELL_STYLE)
            {
                form method="post" action=(endpoints::ADMIN_EDIT_USER) class="flex items-center gap-1"
                {
                    input type="hidden" name="id" value=(user.id.as_i64());
                    input type="text" name="currency" value=(user.currency) aria-label="Currency"
                        class=(FORM_TEXT_INPUT_STYLE);
                    input type="password" name="password" placeholder="New password"
                        aria-label="New password" class=(FORM_TEXT_INPUT_STYLE);
                    button type="submit" class=(LINK_STYLE) { "Save" }
                }
            }
            td class=(TABLE_CELL_STYLE)
            {
                @if user.id != BOOTSTRAP_ADMIN_ID {
                    (delete_button(
                        endpoints::ADMIN_DELETE_USER,
                        user.id.as_i64(),
                        &format!("Delete {} and all of their expenses?", user.username),
                    ))
                }
            }
        }
    }
}
