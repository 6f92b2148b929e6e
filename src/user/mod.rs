//! Users, their settings, and password hashing.

mod core;
mod password;

pub use core::{
    BOOTSTRAP_ADMIN_ID, BOOTSTRAP_ADMIN_USERNAME, DEFAULT_CURRENCY, DEFAULT_LANGUAGE,
    DEFAULT_PROJECT_NAME, User, UserID, count_users, create_user, create_user_table,
    delete_user_and_expenses, ensure_bootstrap_admin, get_all_users, get_user_by_id,
    get_user_by_username, set_project_name_for_all, update_currency, update_password,
    update_profile,
};
pub use password::PasswordHash;
