//! Pages used by reviewers while an event runs.

use axum::extract::{Path, State};
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use hypertext::prelude::*;

use crate::{
    auth::User,
    events::{
        Event,
        presentations::{LiveScript, LiveSnapshot, TimerDisplay},
        reviewers::EventReviewer,
        teams::{Team, sort_by_status},
    },
    msg::Live,
    permission::{Role, require_role},
    schema::{event_reviewers, events},
    state::Conn,
    template::Page,
    util_resp::{FailureResponse, StandardResponse, success},
    widgets::{alert::InfoAlert, badge::StatusBadge},
};

pub mod leader;
pub mod submit;

/// Non-deleted events the user is an active reviewer of, newest first.
pub fn events_for_reviewer(
    user_id: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Vec<(Event, EventReviewer)>, diesel::result::Error> {
    events::table
        .inner_join(event_reviewers::table)
        .filter(
            event_reviewers::reviewer_id
                .eq(user_id)
                .and(event_reviewers::is_deleted.eq(false))
                .and(events::is_deleted.eq(false)),
        )
        .order_by(events::created_at.desc())
        .load::<(Event, EventReviewer)>(conn)
}

pub async fn reviews_page(
    user: User<true>,
    mut conn: Conn<true>,
) -> StandardResponse {
    require_role(&user, Role::Reviewer, &mut *conn)?;
    let events = events_for_reviewer(&user.id, &mut *conn)?;

    success(
        Page::new()
            .user(user)
            .role(Role::Reviewer)
            .title("My reviews")
            .body(maud! {
                h1 { "My reviews" }
                @if events.is_empty() {
                    InfoAlert msg="You have not been assigned to any events yet.";
                }
                div class="list-group" {
                    @for (event, row) in &events {
                        a class="list-group-item list-group-item-action d-flex justify-content-between align-items-center"
                          href=(format!("/reviews/{}", event.id)) {
                            span {
                                (event.title)
                                @if row.is_leader {
                                    " " span class="badge text-bg-warning" { "Leader" }
                                }
                            }
                            StatusBadge status=(event.status());
                        }
                    }
                }
            })
            .render(),
    )
}

/// Loads the event and checks that `user` is reviewing it.
pub fn reviewer_context(
    event_id: &str,
    user: &User<true>,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<(Event, EventReviewer), FailureResponse> {
    require_role(user, Role::Reviewer, conn)?;
    let event = Event::fetch(event_id, conn)?;
    let row = EventReviewer::require_active(&event.id, &user.id, conn)?;
    Ok((event, row))
}

pub async fn reviewer_event_page(
    Path(event_id): Path<String>,
    user: User<true>,
    mut conn: Conn<true>,
    State(live): State<Live>,
) -> StandardResponse {
    let (event, row) = reviewer_context(&event_id, &user, &mut *conn)?;

    let mut teams = Team::for_event(&event.id, &mut *conn)?;
    sort_by_status(&mut teams);
    let sheet = row.sheet();
    let snapshot = LiveSnapshot::new(&event, &teams, &live);
    let live_url = format!("/reviews/{}/live", event.id);

    success(
        Page::new()
            .user(user)
            .role(Role::Reviewer)
            .event(event.clone())
            .body(maud! {
                div class="d-flex justify-content-between align-items-center" {
                    h1 { (event.title) }
                    StatusBadge status=(event.status());
                }
                @if !event.can_edit_score {
                    div class="alert alert-warning" { "Scoring has been locked by the lead reviewer." }
                }
                @if row.is_leader {
                    div class="d-flex gap-2 mb-3" {
                        a class="btn btn-outline-primary" href=(format!("/reviews/{}/results", event.id)) {
                            "All reviewers' scores"
                        }
                        form method="post" action=(format!("/reviews/{}/score_edit", event.id)) {
                            input type="hidden" name="can_edit_score"
                                value=(if event.can_edit_score { "false" } else { "true" });
                            button type="submit" class="btn btn-outline-warning" {
                                @if event.can_edit_score { "Lock scoring" } @else { "Unlock scoring" }
                            }
                        }
                    }
                }

                @if let Some(team) = &snapshot.current_team {
                    div class="card mb-4" {
                        div class="card-body" {
                            h2 class="h5" { "Now presenting: " (team.title) }
                            TimerDisplay event=(&event) timer=(snapshot.timer.as_ref());
                            a class="btn btn-primary mt-2"
                              href=(format!("/reviews/{}/teams/{}", event.id, team.id)) {
                                "Score this team"
                            }
                        }
                    }
                }

                h2 class="h4" { "Teams" }
                table class="table align-middle" {
                    tbody {
                        @for team in &teams {
                            tr {
                                td { (team.seq) }
                                td { (team.title) }
                                td { StatusBadge status=(team.status()); }
                                td {
                                    @if sheet.has_scored(&team.id) {
                                        span class="badge text-bg-success" { "Scored" }
                                    } @else {
                                        span class="badge text-bg-light" { "Not scored" }
                                    }
                                }
                                td class="text-end" {
                                    a class="btn btn-sm btn-outline-primary"
                                      href=(format!("/reviews/{}/teams/{}", event.id, team.id)) {
                                        @if event.can_edit_score { "Score" } @else { "View" }
                                    }
                                }
                            }
                        }
                    }
                }
                LiveScript url=(&live_url);
            })
            .render(),
    )
}
