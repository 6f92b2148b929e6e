//! The URIs of the app's pages and form targets.

/// The home page with the expense lists and monthly totals.
pub const HOME: &str = "/";
/// The route for the log-in page and form.
pub const LOG_IN: &str = "/login";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/logout";
/// The route for adding an expense.
pub const ADD_EXPENSE: &str = "/add";
/// The route for deleting an expense.
pub const DELETE_EXPENSE: &str = "/delete";
/// The route for editing an expense.
pub const EDIT_EXPENSE: &str = "/edit";
/// The page for the user's own settings and the lookup lists.
pub const SETTINGS: &str = "/settings";
/// The route for adding a category.
pub const ADD_CATEGORY: &str = "/settings/category/add";
/// The route for deleting a category.
pub const DELETE_CATEGORY: &str = "/settings/category/delete";
/// The route for adding a unit.
pub const ADD_UNIT: &str = "/settings/unit/add";
/// The route for deleting a unit.
pub const DELETE_UNIT: &str = "/settings/unit/delete";
/// The page showing common expenses grouped by category.
pub const REPORT: &str = "/report";
/// The admin page for managing users and backups.
pub const ADMIN: &str = "/admin";
/// The route for creating a user.
pub const ADMIN_CREATE_USER: &str = "/admin/create";
/// The route for deleting a user.
pub const ADMIN_DELETE_USER: &str = "/admin/delete";
/// The route for editing a user.
pub const ADMIN_EDIT_USER: &str = "/admin/edit";
/// The route for downloading a copy of the database.
pub const ADMIN_BACKUP: &str = "/admin/backup";
/// The route for uploading a database to replace the current one.
pub const ADMIN_RESTORE: &str = "/admin/restore";
/// The route for static files.
pub const STATIC: &str = "/static";

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::HOME);
        assert_endpoint_is_valid_uri(endpoints::LOG_IN);
        assert_endpoint_is_valid_uri(endpoints::LOG_OUT);
        assert_endpoint_is_valid_uri(endpoints::ADD_EXPENSE);
        assert_endpoint_is_valid_uri(endpoints::DELETE_EXPENSE);
        assert_endpoint_is_valid_uri(endpoints::EDIT_EXPENSE);
        assert_endpoint_is_valid_uri(endpoints::SETTINGS);
        assert_endpoint_is_valid_uri(endpoints::ADD_CATEGORY);
        assert_endpoint_is_valid_uri(endpoints::DELETE_CATEGORY);
        assert_endpoint_is_valid_uri(endpoints::ADD_UNIT);
        assert_endpoint_is_valid_uri(endpoints::DELETE_UNIT);
        assert_endpoint_is_valid_uri(endpoints::REPORT);
        assert_endpoint_is_valid_uri(endpoints::ADMIN);
        assert_endpoint_is_valid_uri(endpoints::ADMIN_CREATE_USER);
        assert_endpoint_is_valid_uri(endpoints::ADMIN_DELETE_USER);
        assert_endpoint_is_valid_uri(endpoints::ADMIN_EDIT_USER);
        assert_endpoint_is_valid_uri(endpoints::ADMIN_BACKUP);
        assert_endpoint_is_valid_uri(endpoints::ADMIN_RESTORE);
        assert_endpoint_is_valid_uri(endpoints::STATIC);
    }
}
