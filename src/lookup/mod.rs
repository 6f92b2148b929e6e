//! The category and unit lists that expenses are tagged with.

mod db;
mod endpoints;

pub use db::{
    LookupEntry, LookupKind, add_lookup_entry, create_lookup_tables, delete_lookup_entry,
    get_lookup_entries, seed_default_lookups,
};
pub use endpoints::{
    add_category_endpoint, add_unit_endpoint, delete_category_endpoint, delete_unit_endpoint,
};
