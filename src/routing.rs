//! Application router configuration with protected and unprotected route definitions.

use std::path::Path;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    admin::{
        backup_endpoint, create_user_endpoint, delete_user_endpoint, edit_user_endpoint,
        get_admin_page, restore_endpoint,
    },
    auth::{auth_guard, get_log_in_page, get_log_out, post_log_in},
    endpoints,
    expense::{
        create_expense_endpoint, delete_expense_endpoint, edit_expense_endpoint, get_home_page,
    },
    lookup::{
        add_category_endpoint, add_unit_endpoint, delete_category_endpoint, delete_unit_endpoint,
    },
    not_found::get_404_not_found,
    report::get_report_page,
    settings::{get_settings_page, update_settings_endpoint},
};

/// Return a router with all the app's routes.
///
/// Files in `static_dir` are served under `/static`.
pub fn build_router(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN, get(get_log_in_page).post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out));

    let protected_routes = Router::new()
        .route(endpoints::HOME, get(get_home_page))
        .route(endpoints::ADD_EXPENSE, post(create_expense_endpoint))
        .route(endpoints::DELETE_EXPENSE, post(delete_expense_endpoint))
        .route(endpoints::EDIT_EXPENSE, post(edit_expense_endpoint))
        .route(endpoints::REPORT, get(get_report_page))
        .route(
            endpoints::SETTINGS,
            get(get_settings_page).post(update_settings_endpoint),
        )
        .route(endpoints::ADD_CATEGORY, post(add_category_endpoint))
        .route(endpoints::DELETE_CATEGORY, post(delete_category_endpoint))
        .route(endpoints::ADD_UNIT, post(add_unit_endpoint))
        .route(endpoints::DELETE_UNIT, post(delete_unit_endpoint))
        .route(endpoints::ADMIN, get(get_admin_page))
        .route(endpoints::ADMIN_CREATE_USER, post(create_user_endpoint))
        .route(endpoints::ADMIN_DELETE_USER, post(delete_user_endpoint))
        .route(endpoints::ADMIN_EDIT_USER, post(edit_user_endpoint))
        .route(endpoints::ADMIN_BACKUP, get(backup_endpoint))
        // Backups are whole database files, often larger than the default body limit.
        .route(
            endpoints::ADMIN_RESTORE,
            post(restore_endpoint).layer(DefaultBodyLimit::disable()),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new(static_dir))
        .fallback(get_404_not_found)
        .with_state(state)
}
