//! User administration.

use axum::{
    extract::{Form, Path},
    response::Redirect,
};
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use hypertext::prelude::*;
use serde::Deserialize;

use crate::{
    auth::User,
    logs::log_action,
    permission::{Role, require_role},
    schema::{user_roles, users},
    state::Conn,
    template::Page,
    util_resp::{
        StandardResponse, bad_request_msg, err_not_found, see_other_ok, success,
    },
};

pub mod profile;

pub const MAX_DISPLAY_NAME_LEN: usize = 64;

/// Trims a submitted display name. An empty name clears it.
pub fn clean_display_name(raw: &str) -> Result<Option<String>, String> {
    let name = raw.trim();
    if name.is_empty() {
        Ok(None)
    } else if name.chars().count() > MAX_DISPLAY_NAME_LEN {
        Err(format!(
            "Display names must be at most {MAX_DISPLAY_NAME_LEN} characters."
        ))
    } else {
        Ok(Some(name.to_string()))
    }
}

pub fn set_display_name(
    user_id: &str,
    display_name: Option<&str>,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<usize, diesel::result::Error> {
    diesel::update(users::table.find(user_id))
        .set(users::display_name.eq(display_name))
        .execute(conn)
}

/// Every user with their role, newest first.
pub fn list_users(
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Vec<(User<true>, Role)>, diesel::result::Error> {
    Ok(users::table
        .left_join(user_roles::table)
        .order_by(users::created_at.desc())
        .select((users::all_columns, user_roles::role.nullable()))
        .load::<(User<true>, Option<String>)>(conn)?
        .into_iter()
        .map(|(user, role)| {
            let role = role.and_then(|r| r.parse().ok()).unwrap_or(Role::User);
            (user, role)
        })
        .collect())
}

pub async fn users_page(
    user: User<true>,
    mut conn: Conn<true>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    let users = list_users(&mut *conn)?;

    success(
        Page::new()
            .user(user)
            .role(Role::Admin)
            .title("Users")
            .body(maud! {
                h1 { "Users" }
                table class="table align-middle" {
                    thead {
                        tr {
                            th { "Name" }
                            th { "Email" }
                            th { "Joined" }
                            th { "Role" }
                            th { "Display name" }
                        }
                    }
                    tbody {
                        @for (u, role) in &users {
                            tr {
                                td { (u.name()) br; small class="text-muted" { (u.username) } }
                                td { (u.email) }
                                td { (u.created_at.format("%Y-%m-%d").to_string()) }
                                td {
                                    form method="post" class="d-flex gap-1"
                                        action=(format!("/users/{}/role", u.id)) {
                                        select class="form-select form-select-sm" name="role" {
                                            @for choice in Role::ASSIGNABLE {
                                                option value=(choice.as_str()) selected[choice == *role] {
                                                    (choice.label())
                                                }
                                            }
                                        }
                                        button type="submit" class="btn btn-sm btn-outline-primary" { "Set" }
                                    }
                                }
                                td {
                                    form method="post" class="d-flex gap-1"
                                        action=(format!("/users/{}/display_name", u.id)) {
                                        input type="text" class="form-control form-control-sm"
                                            name="display_name"
                                            maxlength=(MAX_DISPLAY_NAME_LEN)
                                            value=(u.display_name.clone().unwrap_or_default());
                                        button type="submit" class="btn btn-sm btn-outline-primary" { "Save" }
                                    }
                                }
                            }
                        }
                    }
                }
            })
            .render(),
    )
}

#[derive(Deserialize)]
pub struct RoleForm {
    role: String,
}

pub async fn do_update_user_role(
    Path(user_id): Path<String>,
    user: User<true>,
    mut conn: Conn<true>,
    Form(form): Form<RoleForm>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;

    let role = match form.role.parse::<Role>() {
        Ok(Role::Anonymous) | Err(_) => {
            return bad_request_msg(format!("`{}` is not a role.", form.role));
        }
        Ok(role) => role,
    };

    let exists = diesel::select(diesel::dsl::exists(
        users::table.filter(users::id.eq(&user_id)),
    ))
    .get_result::<bool>(&mut *conn)?;
    if !exists {
        return err_not_found();
    }

    Role::set(&user_id, role, &mut *conn)?;
    log_action(
        &user.id,
        format!("set role of user {user_id} to {}", role.as_str()),
        &mut *conn,
    )?;

    see_other_ok(Redirect::to("/users"))
}

#[derive(Deserialize)]
pub struct DisplayNameForm {
    pub display_name: String,
}

pub async fn do_update_user_display_name(
    Path(user_id): Path<String>,
    user: User<true>,
    mut conn: Conn<true>,
    Form(form): Form<DisplayNameForm>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;

    let name = match clean_display_name(&form.display_name) {
        Ok(name) => name,
        Err(msg) => return bad_request_msg(msg),
    };
    if set_display_name(&user_id, name.as_deref(), &mut *conn)? == 0 {
        return err_not_found();
    }

    see_other_ok(Redirect::to("/users"))
}
