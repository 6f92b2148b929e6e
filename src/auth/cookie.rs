//! Defines functions for handling user authentication with cookies.

use std::cmp::max;

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

use crate::{Error, UserID, auth::Token};

pub(crate) const COOKIE_TOKEN: &str = "token";
/// The default duration for which auth cookies are valid.
///
/// Every authenticated request pushes the expiry out by this much again.
pub const DEFAULT_COOKIE_DURATION: Duration = Duration::minutes(30);

fn build_token_cookie(
    value: String,
    expiry: OffsetDateTime,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((COOKIE_TOKEN, value))
        .path("/")
        .expires(expiry)
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Add an auth cookie to the cookie jar, indicating that a user is logged in and authenticated.
///
/// Sets the initial expiry of the cookie to `duration` from the current time.
/// You can use [DEFAULT_COOKIE_DURATION] for the default duration.
/// `secure` restricts the cookie to HTTPS.
///
/// Returns the cookie jar with the cookie added.
///
/// # Errors
///
/// Returns a [Error::CookieError] if the expiry overflows or the token cannot be serialized.
pub fn set_auth_cookie(
    jar: PrivateCookieJar,
    user_id: UserID,
    duration: Duration,
    secure: bool,
) -> Result<PrivateCookieJar, Error> {
    let expires_at = OffsetDateTime::now_utc()
        .checked_add(duration)
        .ok_or_else(|| Error::CookieError(format!("expiry overflowed adding {duration}")))?;

    set_token_cookie(
        jar,
        Token {
            user_id,
            expires_at,
        },
        secure,
    )
}

fn set_token_cookie(
    jar: PrivateCookieJar,
    token: Token,
    secure: bool,
) -> Result<PrivateCookieJar, Error> {
    let value = serde_json::to_string(&token)
        .map_err(|error| Error::CookieError(error.to_string()))?;

    Ok(jar.add(build_token_cookie(value, token.expires_at, secure)))
}

/// Set the auth cookie to an invalid value and set its max age to zero, which should delete the cookie on the client side.
pub fn invalidate_auth_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    let mut cookie = build_token_cookie("deleted".to_owned(), OffsetDateTime::UNIX_EPOCH, false);
    cookie.set_max_age(Duration::ZERO);

    jar.add(cookie)
}

/// Read the token from the auth cookie in `jar`.
///
/// # Errors
///
/// Returns [Error::CookieMissing] if the cookie is not in the jar, could
/// not be decoded, or the token has expired.
pub(crate) fn get_token_from_cookies(jar: &PrivateCookieJar) -> Result<Token, Error> {
    let cookie = jar.get(COOKIE_TOKEN).ok_or(Error::CookieMissing)?;
    let token: Token =
        serde_json::from_str(cookie.value_trimmed()).map_err(|_| Error::CookieMissing)?;

    if token.is_expired(OffsetDateTime::now_utc()) {
        return Err(Error::CookieMissing);
    }

    Ok(token)
}

/// Set the expiry of the auth cookie in `jar` to the latest of UTC now
/// plus `duration` and the cookie's current expiry.
///
/// # Errors
///
/// The cookie jar is not modified if an error is returned.
///
/// Returns:
/// - [Error::CookieMissing] if the auth cookie is not in the jar or has expired.
/// - [Error::CookieError] if extending the cookie by `duration` would overflow the date time.
pub(crate) fn extend_auth_cookie_duration_if_needed(
    jar: PrivateCookieJar,
    duration: Duration,
    secure: bool,
) -> Result<PrivateCookieJar, Error> {
    let token = get_token_from_cookies(&jar)?;

    let new_expiry = OffsetDateTime::now_utc()
        .checked_add(duration)
        .ok_or_else(|| Error::CookieError(format!("expiry overflowed adding {duration}")))?;

    set_token_cookie(
        jar,
        Token {
            user_id: token.user_id,
            expires_at: max(token.expires_at, new_expiry),
        },
        secure,
    )
}
