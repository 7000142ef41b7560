use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
    extract::{Form, Query},
    response::Redirect,
};
use axum_extra::extract::PrivateCookieJar;
use chrono::Utc;
use diesel::prelude::*;
use hypertext::prelude::*;
use serde::Deserialize;
use url::Url;

use crate::{
    auth::{User, clear_login_cookie, set_login_cookie},
    schema::users,
    state::Conn,
    template::Page,
    util_resp::{FailureResponse, StandardResponse, bad_request, success},
    widgets::alert::ErrorAlert,
};

#[derive(Deserialize)]
pub struct NextQuery {
    next: Option<String>,
}

pub async fn login_page(
    user: Option<User<true>>,
    Query(query): Query<NextQuery>,
) -> StandardResponse {
    if user.is_some() {
        return bad_request(
            Page::new()
                .user_opt(user)
                .body(maud! {
                    ErrorAlert
                        msg = "You are already logged in, so cannot log in!";
                })
                .render(),
        );
    }

    let action = match &query.next {
        Some(next) => format!("/login?next={}", url_encode(next)),
        None => "/login".to_string(),
    };

    success(Page::new().title("Login").body(maud! {
        h1 { "Login" }
        form method="post" action=(action) class="mt-4" {
            div class="mb-3" {
                label for="id" class="form-label" { "Email address or username" }
                input type="text" class="form-control" id="id" name="id" required;
            }
            div class="mb-3" {
                label for="password" class="form-label" { "Password" }
                input type="password" class="form-control" id="password" name="password" required;
            }
            button type="submit" class="btn btn-primary" { "Log in" }
        }
    }).render())
}

fn url_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[derive(Deserialize)]
pub struct LoginForm {
    id: String,
    password: String,
}

/// Only the path of `next` is kept, so that a crafted link cannot redirect
/// the user to another site after logging in.
pub fn redirect_target(next: Option<&str>) -> String {
    next.and_then(|next| {
        Url::parse("http://localhost")
            .ok()
            .and_then(|base| base.join(next).ok())
    })
    .map(|url| url.path().to_string())
    .unwrap_or_else(|| "/".to_string())
}

pub async fn do_login(
    user: Option<User<true>>,
    Query(query): Query<NextQuery>,
    mut conn: Conn<true>,
    jar: PrivateCookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(PrivateCookieJar, Redirect), FailureResponse> {
    let id = form.id.trim();
    let user1 = match users::table
        .filter(users::email.eq(id).or(users::username.eq(id)))
        .first::<User<true>>(&mut *conn)
        .optional()?
    {
        Some(user) => user,
        None => {
            return Err(FailureResponse::BadRequest(
                Page::new()
                    .user_opt(user)
                    .body(maud! {
                        ErrorAlert
                            msg = "No such user exists. Please return to the
                                   previous page and try again.";
                    })
                    .render(),
            ));
        }
    };

    let parsed_hash = PasswordHash::new(&user1.password_hash).map_err(|e| {
        tracing::error!("stored hash for user {} is invalid: {e}", user1.id);
        FailureResponse::ServerError(())
    })?;
    if Argon2::default()
        .verify_password(form.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        tracing::info!("failed login attempt for user {}", user1.id);
        return Err(FailureResponse::BadRequest(
            Page::new()
                .user_opt(user)
                .body(maud! {
                    ErrorAlert msg =
                        "Incorrect password. Please return to the previous page
                         and try again.";
                })
                .render(),
        ));
    }

    diesel::update(users::table.filter(users::id.eq(&user1.id)))
        .set(users::last_sign_in_at.eq(Some(Utc::now().naive_utc())))
        .execute(&mut *conn)?;

    let jar = set_login_cookie(user1.id, jar)?;

    Ok((jar, Redirect::to(&redirect_target(query.next.as_deref()))))
}

pub async fn do_logout(jar: PrivateCookieJar) -> (PrivateCookieJar, Redirect) {
    (clear_login_cookie(jar), Redirect::to("/"))
}
