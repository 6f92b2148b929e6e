//! Admin-only pages: user management, and backing up and restoring the
//! database file.
//!
//! Every handler checks the admin flag of the user loaded by the auth
//! middleware, so a user demoted in the database loses access immediately.

mod backup;
mod page;
mod users;

pub use backup::{backup_endpoint, restore_database, restore_endpoint};
pub use page::get_admin_page;
pub use users::{create_user_endpoint, delete_user_endpoint, edit_user_endpoint};
