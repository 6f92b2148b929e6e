//! This file defines the routes for displaying the log-in page and handling log-in requests.
//! The auth module handles the lower level authentication and cookie auth logic.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, CookieSettings, Error,
    auth::{normalize_redirect_url, set_auth_cookie},
    endpoints,
    feedback::{FeedbackQuery, feedback_banner},
    html::{BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, base, labelled_input},
    user::get_user_by_username,
};

/// How long the auth cookie should last if the user selects "remember me" at log-in.
const REMEMBER_ME_COOKIE_DURATION: Duration = Duration::days(7);

/// The message shown when the username or password is wrong.
pub const INVALID_CREDENTIALS_ERROR_MSG: &str = "Invalid Credentials";

fn log_in_form(redirect_url: Option<&str>) -> Markup {
    html! {
        form method="post" action=(endpoints::LOG_IN) class="space-y-4 md:space-y-6 w-full"
        {
            @if let Some(redirect_url) = redirect_url {
                input type="hidden" name="redirect_url" value=(redirect_url);
            }

            (labelled_input("username", "Username", "text", "", true))
            (labelled_input("password", "Password", "password", "", true))

            div class="flex items-center gap-x-3"
            {
                input
                    type="checkbox"
                    name="remember_me"
                    id="remember_me"
                    class="rounded-xs";

                label
                    for="remember_me"
                    class="block text-sm font-medium text-gray-900 dark:text-white"
                {
                    "Keep me logged in for one week"
                }
            }

            button type="submit" id="submit-button" class=(BUTTON_PRIMARY_STYLE)
            {
                "Log in"
            }
        }
    }
}

fn parse_redirect_url(raw_url: Option<&str>, source: &str) -> Option<String> {
    match raw_url.and_then(normalize_redirect_url) {
        Some(redirect_url) => Some(redirect_url),
        None => {
            if let Some(redirect_url) = raw_url {
                tracing::warn!("Invalid redirect URL from {source}: {redirect_url}");
            }
            None
        }
    }
}

/// The query parameters of the log-in page.
#[derive(Debug, Default, Deserialize)]
pub struct LogInQuery {
    /// Where to send the user after they log in.
    pub redirect_url: Option<String>,
    /// Why the last attempt failed.
    pub error: Option<String>,
}

/// Display the log-in page.
pub async fn get_log_in_page(Query(query): Query<LogInQuery>) -> Response {
    let redirect_url = parse_redirect_url(query.redirect_url.as_deref(), "log-in query");
    let feedback = FeedbackQuery {
        error: query.error,
        success: None,
    };

    let content = html! {
        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="my-6 text-xl font-bold leading-tight tracking-tight md:text-2xl"
            {
                "Log in to your account"
            }

            (feedback_banner(&feedback))
            (log_in_form(redirect_url.as_deref()))
        }
    };

    base("Log In", &content).into_response()
}

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// How long sessions last and whether cookies are HTTPS-only.
    pub cookie_settings: CookieSettings,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_settings: state.cookie_settings,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

fn invalid_credentials_redirect(redirect_url: Option<&str>) -> Redirect {
    let mut params = vec![("error", INVALID_CREDENTIALS_ERROR_MSG)];
    if let Some(redirect_url) = redirect_url {
        params.push(("redirect_url", redirect_url));
    }

    match serde_urlencoded::to_string(params) {
        Ok(query) => Redirect::to(&format!("{}?{query}", endpoints::LOG_IN)),
        Err(error) => {
            tracing::error!("Could not encode log-in error: {error}");
            Redirect::to(endpoints::LOG_IN)
        }
    }
}

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in request, the auth cookie set and the client is redirected to the home
/// page, or the page they were trying to reach. Otherwise, the client is sent back to the log-in
/// page with an error message.
pub async fn post_log_in(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<LogInData>,
) -> Response {
    let redirect_url = parse_redirect_url(user_data.redirect_url.as_deref(), "log-in form");
    let redirect_url = redirect_url.as_deref();

    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_response();
            }
        };

        match get_user_by_username(user_data.username.trim(), &connection) {
            Ok(user) => user,
            Err(Error::NotFound) => {
                return invalid_credentials_redirect(redirect_url).into_response();
            }
            Err(error) => {
                tracing::error!("Unhandled error while verifying credentials: {error}");
                return error.into_response();
            }
        }
    };

    match user.password_hash.verify(&user_data.password) {
        Ok(true) => {}
        Ok(false) => return invalid_credentials_redirect(redirect_url).into_response(),
        Err(error) => {
            tracing::warn!("Could not verify password for {}: {error}", user.username);
            return invalid_credentials_redirect(redirect_url).into_response();
        }
    }

    let cookie_duration = if user_data.remember_me.is_some() {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_settings.duration
    };

    match set_auth_cookie(jar, user.id, cookie_duration, state.cookie_settings.secure) {
        Ok(updated_jar) => {
            tracing::info!("User {} logged in", user.username);
            (
                updated_jar,
                Redirect::to(redirect_url.unwrap_or(endpoints::HOME)),
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!("Error setting auth cookie: {error}");
            error.into_response()
        }
    }
}

/// The raw data entered by the user in the log-in form.
///
/// The password is stored as a plain string. There is no need for validation here since
/// it will be compared against the password hash in the database.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    /// Username entered during log-in.
    pub username: String,

    /// Password entered during log-in.
    pub password: String,

    /// Whether to extend the initial auth cookie duration.
    ///
    /// This value comes from a checkbox, so it either has a string value or is not set
    /// (see the [MDN docs](https://developer.mozilla.org/en-US/docs/Web/HTML/Element/input/checkbox#value_2)).
    /// The `Some` variant should be interpreted as `true` irregardless of the
    /// string value, and the `None` variant should be interpreted as `false`.
    pub remember_me: Option<String>,

    /// Optional URL to redirect to after logging in.
    /// Only accepted from the log-in form submission.
    pub redirect_url: Option<String>,
}

#[cfg(test)]
mod log_in_page_tests {
    use axum::{
        extract::Query,
        http::{StatusCode, header::CONTENT_TYPE},
    };
    use scraper::Selector;

    use crate::{
        endpoints,
        test_utils::{assert_valid_html, parse_html_document},
    };

    use super::{LogInQuery, get_log_in_page};

    #[tokio::test]
    async fn log_in_page_displays_form() {
        let response = get_log_in_page(Query(LogInQuery::default())).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response
                .headers()
                .get(CONTENT_TYPE)
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("text/html")
        );

        let document = parse_html_document(response).await;
        assert_valid_html(&document);

        let forms = document
            .select(&Selector::parse("form").unwrap())
            .collect::<Vec<_>>();
        assert_eq!(forms.len(), 1, "want 1 form, got {}", forms.len());
        let form = forms.first().unwrap();
        assert_eq!(form.value().attr("action"), Some(endpoints::LOG_IN));
        assert_eq!(form.value().attr("method"), Some("post"));

        for selector in [
            "input[name=username]",
            "input[type=password]",
            "input[name=remember_me]",
            "button[type=submit]",
        ] {
            let count = form.select(&Selector::parse(selector).unwrap()).count();
            assert_eq!(count, 1, "want 1 {selector}, got {count}");
        }
    }

    #[tokio::test]
    async fn log_in_page_displays_error_message() {
        let response = get_log_in_page(Query(LogInQuery {
            redirect_url: None,
            error: Some("Invalid Credentials".to_owned()),
        }))
        .await;

        let document = parse_html_document(response).await;
        let error = document
            .select(&Selector::parse(".feedback-error").unwrap())
            .next()
            .expect("missing error banner");
        assert_eq!(error.text().collect::<String>().trim(), "Invalid Credentials");
    }

    #[tokio::test]
    async fn log_in_page_preserves_redirect_url() {
        let redirect_url = "/report?start=2024-01-01&end=2024-01-31".to_string();
        let response = get_log_in_page(Query(LogInQuery {
            redirect_url: Some(redirect_url.clone()),
            error: None,
        }))
        .await;

        let document = parse_html_document(response).await;
        assert_valid_html(&document);

        let inputs = document
            .select(&Selector::parse("input[name=redirect_url]").unwrap())
            .collect::<Vec<_>>();
        assert_eq!(inputs.len(), 1, "want 1 redirect_url input, got {}", inputs.len());
        assert_eq!(
            inputs.first().unwrap().value().attr("value"),
            Some(redirect_url.as_str()),
            "expected redirect_url value to be preserved"
        );
    }

    #[tokio::test]
    async fn log_in_page_drops_off_site_redirect_url() {
        let response = get_log_in_page(Query(LogInQuery {
            redirect_url: Some("https://example.com".to_owned()),
            error: None,
        }))
        .await;

        let document = parse_html_document(response).await;
        let count = document
            .select(&Selector::parse("input[name=redirect_url]").unwrap())
            .count();
        assert_eq!(count, 0);
    }
}
