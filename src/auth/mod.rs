use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, Key, SameSite},
};
use chrono::{Duration, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    schema::users,
    state::{DbPool, ThreadSafeConn},
    util_resp::FailureResponse,
};

pub mod login;
pub mod register;

pub const LOGIN_COOKIE: &str = "tally_session";

const SESSION_DAYS: i64 = 7;

#[derive(Debug, Queryable, Serialize, Deserialize, Clone)]
pub struct User<const TX: bool> {
    pub id: String,
    pub email: String,
    pub username: String,
    pub display_name: Option<String>,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
    pub last_sign_in_at: Option<NaiveDateTime>,
}

impl<const TX: bool> User<TX> {
    pub fn validate_username(username: &str) -> bool {
        (3..=32).contains(&username.chars().count())
            && username
                .chars()
                .all(|c| c.is_ascii() && !c.is_whitespace())
    }

    pub fn validate_password(password: &str) -> bool {
        password.len() >= 6
    }

    /// The name shown to other users.
    pub fn name(&self) -> String {
        display_name_of(
            self.display_name.as_deref(),
            &self.username,
            &self.email,
        )
    }
}

/// Display name, then username, then the local part of the email.
pub fn display_name_of(
    display_name: Option<&str>,
    username: &str,
    email: &str,
) -> String {
    match display_name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ if !username.is_empty() => username.to_string(),
        _ => email.split('@').next().unwrap_or_default().to_string(),
    }
}

/// Why a request could not be tied to a logged-in user.
#[derive(Debug)]
pub enum AuthError {
    NotLoggedIn,
    Database,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::NotLoggedIn => {
                (StatusCode::UNAUTHORIZED, "Please log in to continue")
                    .into_response()
            }
            AuthError::Database => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
                    .into_response()
            }
        }
    }
}

/// Contents of the (encrypted) login cookie.
#[derive(Serialize, Deserialize)]
pub struct LoginSession {
    user_id: String,
    expiry: NaiveDateTime,
}

impl LoginSession {
    fn issue(user_id: String, now: NaiveDateTime) -> LoginSession {
        LoginSession {
            user_id,
            expiry: now + Duration::days(SESSION_DAYS),
        }
    }

    /// The session stored in `jar`, unless it is missing, unreadable or
    /// expired.
    fn from_jar(jar: &PrivateCookieJar, now: NaiveDateTime) -> Option<LoginSession> {
        let cookie = jar.get(LOGIN_COOKIE)?;
        serde_json::from_str::<LoginSession>(cookie.value())
            .ok()
            .filter(|session| now < session.expiry)
    }
}

#[async_trait]
impl<const TX: bool, S> FromRequestParts<S> for User<TX>
where
    S: Send + Sync,
    DbPool: FromRef<S>,
    Key: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let jar = PrivateCookieJar::<Key>::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthError::NotLoggedIn)?;
        let Some(session) = LoginSession::from_jar(&jar, Utc::now().naive_utc())
        else {
            return Err(AuthError::NotLoggedIn);
        };

        // The connection is shared with the handler's `Conn<TX>`, so the lock
        // must be released before this returns.
        let shared = ThreadSafeConn::<TX>::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthError::Database)?;
        let mut conn = shared.inner.try_lock().map_err(|_| AuthError::Database)?;

        users::table
            .find(&session.user_id)
            .first::<User<TX>>(&mut *conn)
            .optional()
            .map_err(|e| {
                tracing::error!("could not load user {}: {e}", session.user_id);
                AuthError::Database
            })?
            .ok_or(AuthError::NotLoggedIn)
    }
}

pub fn set_login_cookie(
    user_id: String,
    jar: PrivateCookieJar,
) -> Result<PrivateCookieJar, FailureResponse> {
    let session = LoginSession::issue(user_id, Utc::now().naive_utc());
    let value = serde_json::to_string(&session).map_err(|e| {
        tracing::error!("could not encode session: {e}");
        FailureResponse::ServerError(())
    })?;

    let mut cookie = Cookie::new(LOGIN_COOKIE, value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);

    Ok(jar.add(cookie))
}

pub fn clear_login_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    let mut cookie = Cookie::from(LOGIN_COOKIE);
    cookie.set_path("/");
    jar.remove(cookie)
}
