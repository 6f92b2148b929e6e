//! HTTP handler and templates for the report page.

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
    expense::{DateRange, DateRangeQuery},
    feedback::{FeedbackQuery, feedback_banner},
    html::{
        BUTTON_PRIMARY_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency, format_quantity,
        labelled_input,
    },
    navigation::NavBar,
    report::{Report, build_report},
};

/// The state needed for the report page.
#[derive(Debug, Clone)]
pub struct ReportState {
    /// The database connection for reading expenses.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ReportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Display the category report for the common expenses, optionally limited
/// by the `start` and `end` query parameters.
pub async fn get_report_page(
    State(state): State<ReportState>,
    Extension(user): Extension<User>,
    Query(date_query): Query<DateRangeQuery>,
) -> Response {
    let mut feedback = FeedbackQuery::default();
    let date_range = match date_query.date_range() {
        Ok(date_range) => date_range,
        Err(error) => {
            tracing::debug!("Ignoring date filter: {error}");
            feedback.error = Some("Invalid date".to_owned());
            None
        }
    };

    let report = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_response();
            }
        };

        match build_report(date_range, &connection) {
            Ok(report) => report,
            Err(error) => {
                tracing::error!("Could not build report: {error}");
                return error.into_response();
            }
        }
    };

    report_view(&user, &report, date_range, &feedback).into_response()
}

fn report_view(
    user: &User,
    report: &Report,
    date_range: Option<DateRange>,
    feedback: &FeedbackQuery,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::REPORT, &user.project_name, user.is_admin).into_html();
    let start = date_range.map(|range| range.start.to_string()).unwrap_or_default();
    let end = date_range.map(|range| range.end.to_string()).unwrap_or_default();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-5xl space-y-6"
            {
                (feedback_banner(feedback))

                h1 class="text-2xl font-bold" { "Common expenses by category" }

                form method="get" action=(endpoints::REPORT) class="flex flex-wrap items-end gap-4"
                {
                    (labelled_input("start", "From", "date", &start, false))
                    (labelled_input("end", "To", "date", &end, false))

                    div
                    {
                        button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Filter" }
                    }

                    @if date_range.is_some() {
                        a href=(endpoints::REPORT) class=(LINK_STYLE) { "Clear" }
                    }
                }

                section id="category-summary" class="overflow-x-auto"
                {
                    table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Total" }
                            }
                        }

                        tbody
                        {
                            @for category in &report.summary {
                                tr class=(TABLE_ROW_STYLE)
                                {
                                    td class=(TABLE_CELL_STYLE) { (category_label(&category.category)) }
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        (format_currency(category.total, &user.currency))
                                    }
                                }
                            }
                        }

                        tfoot
                        {
                            tr class="font-semibold text-gray-900 dark:text-white"
                            {
                                th scope="row" class=(TABLE_CELL_STYLE) { "Total" }
                                td id="grand-total" class=(TABLE_CELL_STYLE)
                                {
                                    (format_currency(report.grand_total, &user.currency))
                                }
                            }
                        }
                    }
                }

                section id="report-details" class="overflow-x-auto"
                {
                    h2 class="text-xl font-bold mb-2" { "Details" }

                    table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "User" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Item" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Quantity" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                            }
                        }

                        tbody
                        {
                            @for expense in &report.details {
                                tr class=(TABLE_ROW_STYLE)
                                {
                                    td class=(TABLE_CELL_STYLE) { (expense.date) }
                                    td class=(TABLE_CELL_STYLE) { (expense.username) }
                                    td class=(TABLE_CELL_STYLE) { (expense.item) }
                                    td class=(TABLE_CELL_STYLE) { (category_label(&expense.category)) }
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        (format_quantity(expense.quantity)) " " (expense.unit)
                                    }
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        (format_currency(expense.amount, &user.currency))
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    base("Report", &content)
}

fn category_label(category: &str) -> &str {
    if category.is_empty() {
        "Uncategorized"
    } else {
        category
    }
}
