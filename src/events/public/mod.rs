//! The audience-facing view of an event. No login is needed.

use axum::{
    extract::{Path, State},
    response::Response,
};
use diesel::{connection::LoadConnection, sqlite::Sqlite};
use hypertext::prelude::*;
use serde::Serialize;

use crate::{
    auth::User,
    events::{
        Event,
        presentations::{LiveScript, LiveSnapshot, TimerDisplay},
        teams::{Team, TeamSummary},
    },
    msg::Live,
    permission::Role,
    state::Conn,
    template::Page,
    util_resp::{FailureResponse, StandardResponse, envelope_ok, success},
    widgets::badge::StatusBadge,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentData {
    pub event: Event,
    pub teams: Vec<TeamSummary>,
    pub live: LiveSnapshot,
}

impl PresentData {
    pub fn load(
        event_id: &str,
        live: &Live,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<PresentData, FailureResponse> {
        let event = Event::fetch(event_id, conn)?;
        let teams = Team::for_event(&event.id, conn)?;
        let snapshot = LiveSnapshot::new(&event, &teams, live);
        Ok(PresentData {
            teams: teams.iter().map(Team::summary).collect(),
            live: snapshot,
            event,
        })
    }
}

pub async fn present_view(
    Path(event_id): Path<String>,
    user: Option<User<true>>,
    mut conn: Conn<true>,
    State(live): State<Live>,
) -> StandardResponse {
    let data = PresentData::load(&event_id, &live, &mut *conn)?;
    let role = Role::of(user.as_ref(), &mut *conn)?;
    let live_url = format!("/present/{}/live", data.event.id);
    let event = &data.event;

    success(
        Page::new()
            .user_opt(user)
            .role(role)
            .event(event.clone())
            .body(maud! {
                div class="text-center mb-4" {
                    h1 class="display-5" { (event.title) }
                    @if !event.description.is_empty() {
                        p class="lead" { (event.description) }
                    }
                    StatusBadge status=(event.status());
                }
                @if let Some(team) = &data.live.current_team {
                    div class="card text-center mb-4" {
                        div class="card-body" {
                            p class="text-muted mb-1" { "Now presenting" }
                            h2 class="display-6" { (team.title) }
                            @if !team.members.is_empty() {
                                p { (team.members.join(", ")) }
                            }
                            TimerDisplay event=(event) timer=(data.live.timer.as_ref());
                        }
                    }
                }
                h2 class="h4" { "Running order" }
                ol class="list-group list-group-numbered" {
                    @for team in &data.teams {
                        li class="list-group-item d-flex justify-content-between align-items-start" {
                            div class="ms-2 me-auto" {
                                div class="fw-bold" { (team.title) }
                                @if !team.description.is_empty() {
                                    (team.description)
                                }
                            }
                            StatusBadge status=(team.status);
                        }
                    }
                }
                LiveScript url=(&live_url);
            })
            .render(),
    )
}

pub async fn present_api(
    Path(event_id): Path<String>,
    mut conn: Conn<false>,
    State(live): State<Live>,
) -> Response {
    match PresentData::load(&event_id, &live, &mut *conn) {
        Ok(data) => envelope_ok(data),
        Err(e) => e.into_envelope(),
    }
}
