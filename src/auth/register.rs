use argon2::Argon2;
use argon2::PasswordHasher;
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use axum::{extract::Form, response::Redirect};
use chrono::Utc;
use diesel::{
    connection::LoadConnection, insert_into, prelude::*, sqlite::Sqlite,
};
use hypertext::prelude::*;
use serde::Deserialize;
use uuid::Uuid;

use crate::validation::*;
use crate::{
    auth::User,
    permission::Role,
    schema::users,
    state::Conn,
    template::Page,
    util_resp::{
        FailureResponse, StandardResponse, bad_request, see_other_ok, success,
    },
    widgets::alert::ErrorAlert,
};

pub async fn register_page(user: Option<User<true>>) -> StandardResponse {
    if user.is_some() {
        return see_other_ok(Redirect::to("/"));
    }

    success(
        Page::new()
            .title("Register")
            .body(maud! {
                h1 {"Register"}
                form method="post" class="mt-4" {
                    div class="mb-3" {
                        label for="username" class="form-label" { "Username" }
                        input type="text" class="form-control" id="username" name="username" minlength="3" maxlength="32" required;
                    }
                    div class="mb-3" {
                        label for="email" class="form-label" { "Email" }
                        input type="email" class="form-control" id="email" name="email" required;
                    }
                    div class="mb-3" {
                        label for="password" class="form-label" { "Password" }
                        input type="password" class="form-control" id="password" name="password" minlength="6" required;
                    }
                    div class="mb-3" {
                        label for="password2" class="form-label" { "Confirm Password" }
                        input type="password" class="form-control" id="password2" name="password2" minlength="6" required;
                    }
                    button type="submit" class="btn btn-primary" { "Register" }
                }
            })
            .render(),
    )
}

#[derive(Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password2: String,
}

impl RegisterForm {
    fn validate(&self) -> Result<(), String> {
        if !User::<true>::validate_username(&self.username) {
            return Err("Usernames must be 3 to 32 ASCII characters without \
                        spaces."
                .to_string());
        }
        is_ascii_no_spaces(&self.username)
            .map_err(|e| format!("Username {e}."))?;
        is_valid_email(&self.email).map_err(|e| format!("That is an {e}."))?;
        if !User::<true>::validate_password(&self.password) {
            return Err(
                "Passwords must be at least 6 characters long.".to_string()
            );
        }
        if self.password != self.password2 {
            return Err("The two passwords do not match.".to_string());
        }
        Ok(())
    }
}

pub fn hash_password(password: &str) -> Result<String, FailureResponse> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            tracing::error!("failed to hash password: {e}");
            FailureResponse::ServerError(())
        })
}

/// Creates a user with the default role. Returns the new user's id.
pub fn create_user(
    username: &str,
    email: &str,
    password: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<String, FailureResponse> {
    let id = Uuid::now_v7().to_string();
    let password_hash = hash_password(password)?;

    insert_into(users::table)
        .values((
            users::id.eq(&id),
            users::email.eq(email),
            users::username.eq(username),
            users::password_hash.eq(password_hash),
            users::created_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)?;
    Role::set(&id, Role::User, conn)?;

    Ok(id)
}

pub async fn do_register(
    user: Option<User<true>>,
    mut conn: Conn<true>,
    Form(form): Form<RegisterForm>,
) -> StandardResponse {
    if user.is_some() {
        return see_other_ok(Redirect::to("/"));
    }

    let form = RegisterForm {
        username: form.username.trim().to_string(),
        email: form.email.trim().to_string(),
        ..form
    };

    if let Err(msg) = form.validate() {
        return bad_request(
            Page::new()
                .body(maud! {
                    ErrorAlert msg=(&msg);
                })
                .render(),
        );
    }

    let existing = users::table
        .filter(
            users::username
                .eq(&form.username)
                .or(users::email.eq(&form.email)),
        )
        .first::<User<true>>(&mut *conn)
        .optional()?;

    if let Some(user) = existing {
        let is_email_problem = user.email == form.email;

        return bad_request(
            Page::new()
                .body(maud! {
                    div class="alert alert-danger" role="alert" {
                        @if is_email_problem {
                            "That email is already taken"
                        } @else {
                            "That username is already taken"
                        }

                        ". Please return to the previous page and try again."
                    }
                })
                .render(),
        );
    }

    let id = create_user(&form.username, &form.email, &form.password, &mut *conn)?;
    tracing::info!("registered user {id}");

    see_other_ok(Redirect::to("/login"))
}
