//! Report module
//!
//! Provides a page summarising the common expenses by category, with the
//! matching expenses listed underneath.

mod aggregation;
mod page;

pub use aggregation::{CategoryTotal, Report, build_report, get_category_totals};
pub use page::get_report_page;
