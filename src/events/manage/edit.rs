use axum::{
    extract::{Form, Path, State},
    response::Redirect,
};
use chrono::Utc;
use diesel::prelude::*;
use hypertext::prelude::*;

use crate::{
    auth::User,
    events::{
        Event,
        create::{EventFields, EventForm},
    },
    logs::log_action,
    msg::Live,
    permission::{Role, require_role},
    schema::events,
    state::Conn,
    template::Page,
    util_resp::{StandardResponse, bad_request_msg, see_other_ok, success},
};

pub async fn edit_event_page(
    Path(event_id): Path<String>,
    user: User<true>,
    mut conn: Conn<true>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    let event = Event::fetch(&event_id, &mut *conn)?;

    success(
        Page::new()
            .user(user)
            .role(Role::Admin)
            .event(event.clone())
            .body(maud! {
                h1 { "Edit " (event.title) }
                form method="post" class="mt-4" {
                    EventFields event=(Some(&event));
                    button type="submit" class="btn btn-primary" { "Save" }
                }
            })
            .render(),
    )
}

pub async fn do_edit_event(
    Path(event_id): Path<String>,
    user: User<true>,
    mut conn: Conn<true>,
    Form(form): Form<EventForm>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    let event = Event::fetch(&event_id, &mut *conn)?;

    let valid = match form.validate() {
        Ok(valid) => valid,
        Err(msg) => return bad_request_msg(msg),
    };

    diesel::update(events::table.find(&event.id))
        .set((
            events::title.eq(&valid.title),
            events::description.eq(&valid.description),
            events::duration.eq(valid.duration),
            events::time_start.eq(valid.time_start),
            events::time_end.eq(valid.time_end),
            events::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut *conn)?;

    log_action(&user.id, format!("updated event {}", event.id), &mut *conn)?;

    see_other_ok(Redirect::to(&format!("/events/{}", event.id)))
}

pub async fn do_delete_event(
    Path(event_id): Path<String>,
    user: User<true>,
    mut conn: Conn<true>,
    State(live): State<Live>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    // fails with 404 if the event was already deleted
    let event = Event::fetch(&event_id, &mut *conn)?;

    diesel::update(events::table.find(&event.id))
        .set((
            events::is_deleted.eq(true),
            events::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut *conn)?;

    log_action(&user.id, format!("deleted event {}", event.id), &mut *conn)?;
    live.clear_timer(&event.id);

    see_other_ok(Redirect::to("/events"))
}
