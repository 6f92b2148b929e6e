//! Authentication middleware that validates cookies, extends sessions, and handles redirects.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::header::SET_COOKIE,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use rusqlite::Connection;

use crate::{
    AppState, CookieSettings, Error,
    auth::{
        cookie::{extend_auth_cookie_duration_if_needed, get_token_from_cookies},
        invalidate_auth_cookie,
        redirect::build_log_in_redirect_url,
    },
    user::get_user_by_id,
};

/// The state needed for the auth middleware
#[derive(Debug, Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// How long sessions last and whether cookies are HTTPS-only.
    pub cookie_settings: CookieSettings,
    /// The users are read from here on every request.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_settings: state.cookie_settings,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Middleware function that checks for a valid authorization cookie.
///
/// The user is loaded from the database and placed into the request, then the
/// request is executed normally. Otherwise the client is redirected to the
/// log-in page. A cookie for a user that no longer exists is cleared.
///
/// **Note**: Route handlers can use the function argument `Extension(user): Extension<User>` to receive the user.
///
/// **Note**: The app state must contain an `axum_extra::extract::cookie::Key` for decrypting and verifying the cookie contents.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    let log_in_redirect_url = build_log_in_redirect_url(&request);

    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(err) => {
            tracing::error!("Error getting cookie jar: {err:?}. Redirecting to log in page.");
            return Redirect::to(&log_in_redirect_url).into_response();
        }
    };
    let user_id = match get_token_from_cookies(&jar) {
        Ok(token) => token.user_id,
        Err(_) => return Redirect::to(&log_in_redirect_url).into_response(),
    };

    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_response();
            }
        };

        match get_user_by_id(user_id, &connection) {
            Ok(user) => user,
            Err(Error::NotFound) => {
                tracing::info!("User {user_id} no longer exists. Logging them out.");
                return (
                    invalidate_auth_cookie(jar),
                    Redirect::to(&log_in_redirect_url),
                )
                    .into_response();
            }
            Err(error) => return error.into_response(),
        }
    };

    parts.extensions.insert(user);
    let request = Request::from_parts(parts, body);
    let response = next.run(request).await;

    let (mut parts, body) = response.into_parts();
    let jar = match extend_auth_cookie_duration_if_needed(
        jar.clone(),
        state.cookie_settings.duration,
        state.cookie_settings.secure,
    ) {
        Ok(updated_jar) => updated_jar,
        Err(err) => {
            tracing::error!("Error extending cookie duration: {err:?}. Rolling back cookie jar.");
            jar
        }
    };
    for (key, val) in jar.into_response().headers().iter() {
        if key != SET_COOKIE {
            continue;
        }

        parts.headers.append(key, val.to_owned());
    }

    Response::from_parts(parts, body)
}

#[cfg(test)]
mod auth_guard_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Router,
        extract::{Path, State},
        middleware,
        routing::{get, post},
    };
    use axum_extra::extract::{
        PrivateCookieJar,
        cookie::{Cookie, Key},
    };
    use axum_test::TestServer;
    use rusqlite::Connection;
    use sha2::Digest;
    use time::{Duration, OffsetDateTime};

    use crate::{
        CookieSettings, Error, User, UserID,
        auth::{AuthState, COOKIE_TOKEN, auth_guard, set_auth_cookie},
        endpoints,
        user::{PasswordHash, create_user, create_user_table},
    };

    async fn test_handler(Extension(user): Extension<User>) -> String {
        user.username
    }

    async fn stub_log_in_route(
        State(state): State<AuthState>,
        Path(user_id): Path<i64>,
        jar: PrivateCookieJar,
    ) -> Result<PrivateCookieJar, Error> {
        set_auth_cookie(
            jar,
            UserID::new(user_id),
            state.cookie_settings.duration,
            state.cookie_settings.secure,
        )
    }

    const TEST_LOG_IN_ROUTE_PATH: &str = "/log_in/{user_id}";
    const TEST_PROTECTED_ROUTE: &str = "/protected";

    fn get_test_server(cookie_duration: Duration) -> TestServer {
        let connection = Connection::open_in_memory().unwrap();
        create_user_table(&connection).unwrap();
        create_user(
            "alice",
            PasswordHash::new_unchecked("hunter2"),
            false,
            &connection,
        )
        .unwrap();

        let hash = sha2::Sha512::digest("nafstenoas");
        let state = AuthState {
            cookie_key: Key::from(&hash),
            cookie_settings: CookieSettings {
                duration: cookie_duration,
                secure: true,
            },
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let app = Router::new()
            .route(TEST_PROTECTED_ROUTE, get(test_handler).post(test_handler))
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard))
            .route(TEST_LOG_IN_ROUTE_PATH, post(stub_log_in_route))
            .with_state(state);

        TestServer::new(app)
    }

    fn expected_log_in_location(target: &str) -> String {
        let expected_query = serde_urlencoded::to_string([("redirect_url", target)]).unwrap();
        format!("{}?{}", endpoints::LOG_IN, expected_query)
    }

    #[track_caller]
    fn assert_date_time_close(left: OffsetDateTime, right: OffsetDateTime) {
        assert!(
            (left - right).abs() < Duration::seconds(1),
            "got date time {left:?}, want {right:?}"
        );
    }

    #[tokio::test]
    async fn get_protected_route_with_valid_cookie() {
        let server = get_test_server(Duration::minutes(5));
        let response = server.post("/log_in/1").await;

        response.assert_status_ok();
        let token_cookie = response.cookie(COOKIE_TOKEN);

        let response = server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookie(token_cookie)
            .await;

        response.assert_status_ok();
        response.assert_text("alice");
    }

    #[tokio::test]
    async fn auth_guard_extends_valid_cookie_duration() {
        let server = get_test_server(Duration::seconds(5));
        let response = server.post("/log_in/1").await;

        response.assert_status_ok();
        let jar = response.cookies();

        let response = server.get(TEST_PROTECTED_ROUTE).add_cookies(jar).await;

        let auth_cookie = response.cookie(COOKIE_TOKEN);
        assert_date_time_close(
            auth_cookie.expires_datetime().unwrap(),
            OffsetDateTime::now_utc() + Duration::seconds(5),
        );
        assert_eq!(auth_cookie.secure(), Some(true));
        assert_eq!(auth_cookie.http_only(), Some(true));
    }

    #[tokio::test]
    async fn get_protected_route_with_no_auth_cookie_redirects_to_log_in() {
        let server = get_test_server(Duration::minutes(5));

        let response = server.get(TEST_PROTECTED_ROUTE).await;

        response.assert_status_see_other();
        assert_eq!(
            response.header("location"),
            expected_log_in_location(TEST_PROTECTED_ROUTE)
        );
    }

    #[tokio::test]
    async fn post_without_auth_cookie_redirects_to_plain_log_in() {
        let server = get_test_server(Duration::minutes(5));

        let response = server.post(TEST_PROTECTED_ROUTE).await;

        response.assert_status_see_other();
        assert_eq!(response.header("location"), endpoints::LOG_IN);
    }

    #[tokio::test]
    async fn get_protected_route_with_invalid_auth_cookie_redirects_to_log_in() {
        let server = get_test_server(Duration::minutes(5));

        let response = server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookie(Cookie::build((COOKIE_TOKEN, "FOOBAR")).build())
            .await;

        response.assert_status_see_other();
        assert_eq!(
            response.header("location"),
            expected_log_in_location(TEST_PROTECTED_ROUTE)
        );
    }

    #[tokio::test]
    async fn cookie_for_deleted_user_redirects_to_log_in() {
        let server = get_test_server(Duration::minutes(5));
        let response = server.post("/log_in/42").await;
        response.assert_status_ok();

        let response = server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookies(response.cookies())
            .await;

        response.assert_status_see_other();
        assert_eq!(
            response.header("location"),
            expected_log_in_location(TEST_PROTECTED_ROUTE)
        );
        assert_eq!(
            response.cookie(COOKIE_TOKEN).max_age(),
            Some(Duration::ZERO),
            "the stale cookie should be cleared"
        );
    }
}
