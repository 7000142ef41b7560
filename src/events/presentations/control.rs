use axum::{
    extract::{Form, Path, State},
    response::Redirect,
};
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;

use crate::{
    auth::User,
    events::{
        Event, PresentationStatus,
        teams::{Team, TeamStatus},
        timer::{TimerAction, TimerState},
    },
    logs::log_action,
    msg::{Channel, Live, MsgContents, TimerPayload},
    permission::{Role, require_role},
    schema::{event_reviewers, events, teams},
    state::Conn,
    util_resp::{StandardResponse, bad_request_msg, err_not_found, see_other_ok},
};

fn back(event_id: &str) -> Redirect {
    Redirect::to(&format!("/presentations/{event_id}"))
}

#[derive(Deserialize)]
pub struct StatusForm {
    status: String,
}

pub async fn do_update_presentation_status(
    Path(event_id): Path<String>,
    user: User<true>,
    mut conn: Conn<true>,
    State(live): State<Live>,
    Form(form): Form<StatusForm>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    let event = Event::fetch(&event_id, &mut *conn)?;
    let status: PresentationStatus = match form.status.parse() {
        Ok(status) => status,
        Err(e) => return bad_request_msg(e),
    };

    diesel::update(events::table.find(&event.id))
        .set((
            events::presentation_status.eq(status.as_str()),
            events::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut *conn)?;

    log_action(
        &user.id,
        format!("set status of event {} to {}", event.id, status.as_str()),
        &mut *conn,
    )?;

    if status != PresentationStatus::InProgress {
        live.clear_timer(&event.id);
    }

    live.send(
        &event.id,
        Channel::Present,
        MsgContents::PresentationStatus {
            event_id: event.id.clone(),
            status,
        },
    );

    see_other_ok(back(&event.id))
}

/// Makes `team_id` the team which is presenting. Only one team may present at
/// a time, and only while the event is in progress.
pub async fn do_start_team(
    Path((event_id, team_id)): Path<(String, String)>,
    user: User<true>,
    mut conn: Conn<true>,
    State(live): State<Live>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    let event = Event::fetch(&event_id, &mut *conn)?;
    let team = Team::fetch(&event.id, &team_id, &mut *conn)?;

    if event.status() != PresentationStatus::InProgress {
        return bad_request_msg(
            "Teams can only be started while the event is in progress.",
        );
    }

    let presenting = teams::table
        .filter(
            teams::event_id
                .eq(&event.id)
                .and(teams::is_deleted.eq(false))
                .and(teams::status.eq(TeamStatus::InProgress.as_str()))
                .and(teams::id.ne(&team.id)),
        )
        .select(teams::title)
        .first::<String>(&mut *conn)
        .optional()?;
    if let Some(other) = presenting {
        return bad_request_msg(format!(
            "{other} is still presenting. Mark them as done first."
        ));
    }

    diesel::update(teams::table.find(&team.id))
        .set((
            teams::status.eq(TeamStatus::InProgress.as_str()),
            teams::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut *conn)?;

    log_action(&user.id, format!("started team {}", team.id), &mut *conn)?;

    // In-memory state is only touched after the last database write.
    live.set_timer(&event.id, TimerState::new(&team.id, event.duration));

    live.send(
        &event.id,
        Channel::Present,
        MsgContents::AddTeamCurr {
            team_id: team.id.clone(),
        },
    );

    see_other_ok(back(&event.id))
}

pub async fn do_update_team_status(
    Path((event_id, team_id)): Path<(String, String)>,
    user: User<true>,
    mut conn: Conn<true>,
    State(live): State<Live>,
    Form(form): Form<StatusForm>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    let event = Event::fetch(&event_id, &mut *conn)?;
    let team = Team::fetch(&event.id, &team_id, &mut *conn)?;

    if event.status() != PresentationStatus::InProgress {
        return bad_request_msg(
            "Team statuses can only change while the event is in progress.",
        );
    }

    let status = match form.status.parse::<TeamStatus>() {
        Ok(TeamStatus::InProgress) => {
            return bad_request_msg("Use \"Start\" to make a team present.");
        }
        Ok(status) => status,
        Err(e) => return bad_request_msg(e),
    };

    diesel::update(teams::table.find(&team.id))
        .set((
            teams::status.eq(status.as_str()),
            teams::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut *conn)?;

    log_action(
        &user.id,
        format!("set status of team {} to {}", team.id, status.as_str()),
        &mut *conn,
    )?;

    if live
        .timer(&event.id)
        .is_some_and(|timer| timer.team_id == team.id)
    {
        live.clear_timer(&event.id);
    }

    live.send(
        &event.id,
        Channel::Present,
        MsgContents::RemoveTeamCurr {
            team_id: team.id.clone(),
            status,
        },
    );

    see_other_ok(back(&event.id))
}

pub async fn do_update_reviewer_status(
    Path((event_id, reviewer_user_id)): Path<(String, String)>,
    user: User<true>,
    mut conn: Conn<true>,
    Form(form): Form<StatusForm>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    let event = Event::fetch(&event_id, &mut *conn)?;
    let status: PresentationStatus = match form.status.parse() {
        Ok(status) => status,
        Err(e) => return bad_request_msg(e),
    };

    let n = diesel::update(
        event_reviewers::table.filter(
            event_reviewers::event_id
                .eq(&event.id)
                .and(event_reviewers::reviewer_id.eq(&reviewer_user_id))
                .and(event_reviewers::is_deleted.eq(false)),
        ),
    )
    .set((
        event_reviewers::presentation_status.eq(status.as_str()),
        event_reviewers::updated_at.eq(Utc::now().naive_utc()),
    ))
    .execute(&mut *conn)?;

    if n == 0 {
        return err_not_found();
    }

    see_other_ok(back(&event.id))
}

#[derive(Deserialize)]
pub struct TimerForm {
    team_id: String,
    action: String,
    #[serde(default)]
    time_left: Option<String>,
}

pub async fn do_timer_action(
    Path(event_id): Path<String>,
    user: User<true>,
    mut conn: Conn<true>,
    State(live): State<Live>,
    Form(form): Form<TimerForm>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    let event = Event::fetch(&event_id, &mut *conn)?;
    let team = Team::fetch(&event.id, &form.team_id, &mut *conn)?;

    let action: TimerAction = match form.action.parse() {
        Ok(action) => action,
        Err(e) => return bad_request_msg(e),
    };
    let time_left = match form.time_left.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match raw.parse::<i64>() {
            Ok(seconds) if seconds >= 0 => Some(seconds),
            _ => return bad_request_msg("The time left must be a number of seconds."),
        },
    };

    let (state, left) = TimerState::apply(
        live.timer(&event.id),
        &team.id,
        action,
        time_left,
        event.duration,
        Utc::now().naive_utc(),
    );
    live.set_timer(&event.id, state);

    live.send(
        &event.id,
        Channel::Present,
        MsgContents::timer(TimerPayload {
            team_id: team.id.clone(),
            action,
            time_left: Some(left),
        }),
    );

    see_other_ok(back(&event.id))
}
