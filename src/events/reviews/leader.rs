//! Tools for the lead reviewer of an event.

use axum::{
    extract::{Form, Path, State},
    response::Redirect,
};
use chrono::Utc;
use diesel::prelude::*;
use hypertext::prelude::*;
use serde::Deserialize;

use crate::{
    auth::User,
    events::{
        Event, presentations::results::ResultsTable, scores::aggregate::Results,
    },
    logs::log_action,
    msg::{Channel, Live, MsgContents},
    permission::{Role, is_active_leader, require_admin_or_leader},
    schema::events,
    state::Conn,
    template::Page,
    util_resp::{StandardResponse, see_other_ok, success, unauthorized},
    widgets::actions::Actions,
};

pub async fn leader_results_page(
    Path(event_id): Path<String>,
    user: User<true>,
    mut conn: Conn<true>,
) -> StandardResponse {
    let event = Event::fetch(&event_id, &mut *conn)?;
    require_admin_or_leader(&user, &event, &mut *conn)?;
    let role = Role::of_user(&user.id, &mut *conn)?;
    let results = Results::load(&event, &mut *conn)?;

    success(
        Page::new()
            .user(user)
            .role(role)
            .event(event.clone())
            .title(format!("Scores for {}", event.title))
            .body(maud! {
                h1 { "Scores: " (event.title) }
                Actions options=(&[
                    (format!("/events/{}/results.csv", event.id).as_str(), "Download CSV"),
                    (format!("/reviews/{}", event.id).as_str(), "Back"),
                ]);
                ResultsTable results=(&results) compact=(false);
            })
            .render(),
    )
}

#[derive(Deserialize)]
pub struct ScoreEditForm {
    can_edit_score: bool,
}

/// Opens or locks scoring for every reviewer of the event.
pub async fn do_toggle_score_edit(
    Path(event_id): Path<String>,
    user: User<true>,
    mut conn: Conn<true>,
    State(live): State<Live>,
    Form(form): Form<ScoreEditForm>,
) -> StandardResponse {
    let event = Event::fetch(&event_id, &mut *conn)?;
    if !is_active_leader(&user.id, &event.id, &mut *conn)? {
        return unauthorized();
    }

    diesel::update(events::table.find(&event.id))
        .set((
            events::can_edit_score.eq(form.can_edit_score),
            events::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut *conn)?;

    log_action(
        &user.id,
        format!(
            "{} scoring for event {}",
            if form.can_edit_score { "opened" } else { "locked" },
            event.id
        ),
        &mut *conn,
    )?;

    live.send(
        &event.id,
        Channel::Reviewer,
        MsgContents::ToggleScoreEdit {
            event_id: event.id.clone(),
            can_edit_score: form.can_edit_score,
            toggled_by: user.id.clone(),
        },
    );

    see_other_ok(Redirect::to(&format!("/reviews/{}", event.id)))
}
