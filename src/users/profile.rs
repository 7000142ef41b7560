use axum::{extract::Form, response::Redirect};
use hypertext::prelude::*;

use crate::{
    auth::User,
    permission::Role,
    state::Conn,
    template::Page,
    users::{
        DisplayNameForm, MAX_DISPLAY_NAME_LEN, clean_display_name,
        set_display_name,
    },
    util_resp::{StandardResponse, bad_request_msg, see_other_ok, success},
};

pub async fn profile_page(
    user: User<true>,
    mut conn: Conn<true>,
) -> StandardResponse {
    let role = Role::of_user(&user.id, &mut *conn)?;
    let current = user.display_name.clone().unwrap_or_default();
    let username = user.username.clone();
    let email = user.email.clone();

    success(
        Page::new()
            .user(user)
            .role(role)
            .title("Profile")
            .body(maud! {
                h1 { "Profile" }
                dl class="row" {
                    dt class="col-sm-3" { "Username" }
                    dd class="col-sm-9" { (username) }
                    dt class="col-sm-3" { "Email" }
                    dd class="col-sm-9" { (email) }
                    dt class="col-sm-3" { "Role" }
                    dd class="col-sm-9" { (role.label()) }
                }
                form method="post" action="/profile" {
                    div class="mb-3" {
                        label for="display_name" class="form-label" { "Display name" }
                        input type="text" class="form-control" id="display_name"
                            name="display_name" maxlength=(MAX_DISPLAY_NAME_LEN)
                            value=(current);
                        div class="form-text" {
                            "Leave empty to be shown by your username."
                        }
                    }
                    button type="submit" class="btn btn-primary" { "Save" }
                }
            })
            .render(),
    )
}

pub async fn do_update_profile(
    user: User<true>,
    mut conn: Conn<true>,
    Form(form): Form<DisplayNameForm>,
) -> StandardResponse {
    let name = match clean_display_name(&form.display_name) {
        Ok(name) => name,
        Err(msg) => return bad_request_msg(msg),
    };
    set_display_name(&user.id, name.as_deref(), &mut *conn)?;

    see_other_ok(Redirect::to("/profile"))
}
