//! The settings page, where users update their own profile and manage the
//! category and unit lists.

mod page;
mod update_endpoint;

pub use page::get_settings_page;
pub use update_endpoint::update_settings_endpoint;
