//! The home page: monthly totals, the form for adding expenses, and the
//! recent private and common expenses.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::Date;

use crate::{
    AppState, Error, User, endpoints,
    expense::{
        Expense, ExpenseAccess, ExpenseType,
        query::{
            DateRange, DateRangeQuery, RECENT_EXPENSE_LIMIT, get_common_expenses,
            get_monthly_total, get_private_expenses,
        },
    },
    feedback::{FeedbackQuery, feedback_banner},
    html::{
        BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE,
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
        delete_button, format_currency, format_quantity, labelled_input, labelled_select,
    },
    lookup::{LookupEntry, LookupKind, get_lookup_entries},
    navigation::NavBar,
    timezone::local_today,
};

/// The state needed for the home page.
#[derive(Debug, Clone)]
pub struct HomePageState {
    /// The database connection for reading expenses.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Colombo".
    pub local_timezone: String,
}

impl FromRef<AppState> for HomePageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Everything shown on the home page.
struct HomeView {
    today: Date,
    date_range: Option<DateRange>,
    private_month_total: f64,
    common_month_total: f64,
    private_expenses: Vec<Expense>,
    common_expenses: Vec<Expense>,
    categories: Vec<LookupEntry>,
    units: Vec<LookupEntry>,
}

fn load_home_view(
    user: &User,
    today: Date,
    date_range: Option<DateRange>,
    connection: &Connection,
) -> Result<HomeView, Error> {
    Ok(HomeView {
        today,
        date_range,
        private_month_total: get_monthly_total(
            ExpenseType::Private,
            Some(user.id),
            today,
            connection,
        )?,
        common_month_total: get_monthly_total(ExpenseType::Common, None, today, connection)?,
        private_expenses: get_private_expenses(
            user.id,
            date_range,
            Some(RECENT_EXPENSE_LIMIT),
            connection,
        )?,
        common_expenses: get_common_expenses(date_range, Some(RECENT_EXPENSE_LIMIT), connection)?,
        categories: get_lookup_entries(LookupKind::Category, connection)?,
        units: get_lookup_entries(LookupKind::Unit, connection)?,
    })
}

/// Display the home page for the logged-in user.
///
/// The expense lists can be limited to a date range with the `start` and `end`
/// query parameters. The monthly totals ignore the date range.
pub async fn get_home_page(
    State(state): State<HomePageState>,
    Extension(user): Extension<User>,
    Query(date_query): Query<DateRangeQuery>,
    Query(mut feedback): Query<FeedbackQuery>,
) -> Response {
    let today = match local_today(&state.local_timezone) {
        Ok(today) => today,
        Err(error) => return error.into_response(),
    };

    let date_range = match date_query.date_range() {
        Ok(date_range) => date_range,
        Err(error) => {
            tracing::debug!("Ignoring date filter: {error}");
            feedback.error.get_or_insert_with(|| "Invalid date".to_owned());
            None
        }
    };

    let view = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_response();
            }
        };

        match load_home_view(&user, today, date_range, &connection) {
            Ok(view) => view,
            Err(error) => {
                tracing::error!("Could not load home page for user {}: {error}", user.id);
                return error.into_response();
            }
        }
    };

    home_view(&user, &view, &feedback).into_response()
}

fn home_view(user: &User, view: &HomeView, feedback: &FeedbackQuery) -> Markup {
    let nav_bar = NavBar::new(endpoints::HOME, &user.project_name, user.is_admin).into_html();
    let access = ExpenseAccess::from(user);

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-5xl space-y-6"
            {
                (feedback_banner(feedback))

                section class="grid grid-cols-1 sm:grid-cols-2 gap-4"
                {
                    (total_card("My expenses this month", "private-month-total",
                        &format_currency(view.private_month_total, &user.currency)))
                    (total_card("Common expenses this month", "common-month-total",
                        &format_currency(view.common_month_total, &user.currency)))
                }

                (add_expense_form(view))

                (date_filter_form(view.date_range))

                (expense_table(
                    "My expenses",
                    "private-expenses",
                    &view.private_expenses,
                    false,
                    access,
                    &user.currency,
                ))

                (expense_table(
                    "Common expenses",
                    "common-expenses",
                    &view.common_expenses,
                    true,
                    access,
                    &user.currency,
                ))
            }
        }
    };

    base("Home", &content)
}

fn total_card(title: &str, id: &str, total: &str) -> Markup {
    html! {
        div class=(CARD_STYLE)
        {
            h3 class="text-sm font-medium text-gray-500 dark:text-gray-400" { (title) }
            p id=(id) class="text-2xl font-semibold" { (total) }
        }
    }
}

fn add_expense_form(view: &HomeView) -> Markup {
    let today = view.today.to_string();

    html! {
        section class=(CARD_STYLE)
        {
            h2 class="text-xl font-bold mb-4" { "Add expense" }

            form method="post" action=(endpoints::ADD_EXPENSE)
                class="grid grid-cols-1 sm:grid-cols-2 gap-4"
            {
                (labelled_input("item", "Item", "text", "", true))

                div
                {
                    label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }
                    input type="number" name="amount" id="amount" step="0.01" min="0"
                        class=(FORM_TEXT_INPUT_STYLE) required;
                }

                (labelled_select("type", "Type", [
                    ExpenseType::Private.as_str(),
                    ExpenseType::Common.as_str(),
                ]))

                (labelled_select(
                    "category",
                    "Category",
                    view.categories.iter().map(|entry| entry.name.as_str()),
                ))

                div
                {
                    label for="quantity" class=(FORM_LABEL_STYLE) { "Quantity" }
                    input type="number" name="quantity" id="quantity" step="any" min="0"
                        value="1" class=(FORM_TEXT_INPUT_STYLE);
                }

                (labelled_select(
                    "unit",
                    "Unit",
                    view.units.iter().map(|entry| entry.name.as_str()),
                ))

                (labelled_input("date", "Date", "date", &today, false))

                div class="flex items-end"
                {
                    button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Add" }
                }
            }
        }
    }
}

fn date_filter_form(date_range: Option<DateRange>) -> Markup {
    let start = date_range.map(|range| range.start.to_string()).unwrap_or_default();
    let end = date_range.map(|range| range.end.to_string()).unwrap_or_default();

    html! {
        form method="get" action=(endpoints::HOME) class="flex flex-wrap items-end gap-4"
        {
            (labelled_input("start", "From", "date", &start, false))
            (labelled_input("end", "To", "date", &end, false))

            div
            {
                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Filter" }
            }

            @if date_range.is_some() {
                a href=(endpoints::HOME) class=(LINK_STYLE) { "Clear" }
            }
        }
    }
}

fn expense_table(
    title: &str,
    id: &str,
    expenses: &[Expense],
    show_username: bool,
    access: ExpenseAccess,
    currency: &str,
) -> Markup {
    let total: f64 = expenses.iter().map(|expense| expense.amount).sum();

    html! {
        section id=(id) class="overflow-x-auto"
        {
            h2 class="text-xl font-bold mb-2" { (title) }

            table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                        @if show_username {
                            th scope="col" class=(TABLE_CELL_STYLE) { "User" }
                        }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Item" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Quantity" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                    }
                }

                tbody
                {
                    @for expense in expenses {
                        (expense_row(expense, show_username, can_change(access, expense), currency))
                    }

                    @if expenses.is_empty() {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td colspan="7" class=(TABLE_CELL_STYLE) { "No expenses yet." }
                        }
                    }
                }

                tfoot
                {
                    tr class="font-semibold text-gray-900 dark:text-white"
                    {
                        th scope="row" colspan=(if show_username { 5 } else { 4 })
                            class=(TABLE_CELL_STYLE)
                        {
                            "Total"
                        }
                        td class={ (TABLE_CELL_STYLE) " total" }
                        {
                            (format_currency(total, currency))
                        }
                        td {}
                    }
                }
            }
        }
    }
}

fn can_change(access: ExpenseAccess, expense: &Expense) -> bool {
    match access {
        ExpenseAccess::Any => true,
        ExpenseAccess::OwnedBy(user_id) => user_id == expense.user_id,
    }
}

fn expense_row(expense: &Expense, show_username: bool, can_change: bool, currency: &str) -> Markup {
    html! {
        tr class=(TABLE_ROW_STYLE) data-expense-id=(expense.id)
        {
            td class=(TABLE_CELL_STYLE) { (expense.date) }
            @if show_username {
                td class=(TABLE_CELL_STYLE) { (expense.username) }
            }
            td class=(TABLE_CELL_STYLE) { (expense.item) }
            td class=(TABLE_CELL_STYLE) { (expense.category) }
            td class=(TABLE_CELL_STYLE) { (format_quantity(expense.quantity)) " " (expense.unit) }
            td class=(TABLE_CELL_STYLE) { (format_currency(expense.amount, currency)) }
            td class=(TABLE_CELL_STYLE)
            {
                @if can_change {
                    div class="flex flex-wrap items-center gap-2"
                    {
                        form method="post" action=(endpoints::EDIT_EXPENSE)
                            class="flex items-center gap-1"
                        {
                            input type="hidden" name="id" value=(expense.id);
                            input type="text" name="item" value=(expense.item)
                                aria-label="Item" class=(FORM_TEXT_INPUT_STYLE) required;
                            input type="number" name="amount" value=(expense.amount)
                                step="0.01" min="0" aria-label="Amount"
                                class=(FORM_TEXT_INPUT_STYLE) required;
                            button type="submit" class=(LINK_STYLE) { "Save" }
                        }

                        (delete_button(
                            endpoints::DELETE_EXPENSE,
                            expense.id,
                            &format!("Delete {}?", expense.item),
                        ))
                    }
                }
            }
        }
    }
}
