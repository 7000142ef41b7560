//! Running an event: the administrator picks the team which is presenting,
//! controls its countdown and watches the results come in.

use axum::extract::{Path, State};
use chrono::Utc;
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use hypertext::prelude::*;
use serde::Serialize;

use crate::{
    auth::User,
    events::{
        Event, PresentationStatus,
        presentations::results::ResultsTable,
        reviewers::EventReviewer,
        scores::aggregate::Results,
        teams::{Team, TeamStatus, TeamSummary, current_team, sort_by_status},
        timer::{TimeStatus, TimerState, duration_seconds, format_time},
    },
    msg::Live,
    permission::{Role, require_role},
    schema::{event_reviewers, teams},
    state::Conn,
    template::Page,
    util_resp::{StandardResponse, success},
    widgets::{actions::PostButton, badge::StatusBadge},
};

pub mod control;
pub mod results;

/// What a client needs to show the current state of the session.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LiveSnapshot {
    pub status: PresentationStatus,
    pub current_team: Option<TeamSummary>,
    pub timer: Option<TimerView>,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    pub team_id: String,
    pub time_left: i64,
    pub running: bool,
}

impl TimerView {
    pub fn label(&self) -> String {
        format_time(self.time_left)
    }
}

impl LiveSnapshot {
    /// The timer only counts for the team which is presenting. If nothing has
    /// been recorded for that team yet it has the whole duration left.
    pub fn new(event: &Event, teams: &[Team], live: &Live) -> LiveSnapshot {
        let now = Utc::now().naive_utc();
        let current = current_team(teams);
        let timer = current.map(|team| {
            let state = live
                .timer(&event.id)
                .filter(|state| state.team_id == team.id)
                .unwrap_or_else(|| TimerState::new(&team.id, event.duration));
            TimerView {
                team_id: team.id.clone(),
                time_left: state.remaining(now),
                running: state.is_running(now),
            }
        });

        LiveSnapshot {
            status: event.status(),
            current_team: current.map(Team::summary),
            timer,
        }
    }
}

/// The countdown as shown on every live page. `live.js` keeps it up to date.
pub struct TimerDisplay<'r> {
    pub event: &'r Event,
    pub timer: Option<&'r TimerView>,
}

impl Renderable for TimerDisplay<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let (time_left, running, team) = match self.timer {
            Some(timer) => (timer.time_left, timer.running, timer.team_id.as_str()),
            None => (duration_seconds(self.event.duration), false, ""),
        };
        let status = TimeStatus::of(time_left);
        maud! {
            div class="display-4 font-monospace"
                id="timer"
                data-time-left=(time_left)
                data-running=(if running { "true" } else { "false" })
                data-team=(team)
                data-duration=(self.event.duration) {
                span id="timer-value" { (format_time(time_left)) }
                " "
                span id="timer-status" class=(status.badge_class()) style="font-size: 1rem" {
                    (status.label())
                }
            }
        }
        .render_to(buffer);
    }
}

/// Connects the page to the live channel at `url`.
pub struct LiveScript<'r> {
    pub url: &'r str,
}

impl Renderable for LiveScript<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud! {
            div id="live" data-url=(self.url) hidden {}
            script src="/static/live.js" defer {}
        }
        .render_to(buffer);
    }
}

#[derive(Clone, Debug)]
pub struct EventOverview {
    pub event: Event,
    pub teams: i64,
    pub reviewers: i64,
}

pub fn events_for_presentation(
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Vec<EventOverview>, diesel::result::Error> {
    let mut overviews = Vec::new();
    for event in Event::list(conn)? {
        let teams = teams::table
            .filter(teams::event_id.eq(&event.id).and(teams::is_deleted.eq(false)))
            .count()
            .get_result::<i64>(conn)?;
        let reviewers = event_reviewers::table
            .filter(
                event_reviewers::event_id
                    .eq(&event.id)
                    .and(event_reviewers::is_deleted.eq(false)),
            )
            .count()
            .get_result::<i64>(conn)?;
        overviews.push(EventOverview {
            event,
            teams,
            reviewers,
        });
    }
    Ok(overviews)
}

pub async fn presentations_page(
    user: User<true>,
    mut conn: Conn<true>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    let events = events_for_presentation(&mut *conn)?;

    success(
        Page::new()
            .user(user)
            .role(Role::Admin)
            .title("Presentations")
            .body(maud! {
                h1 { "Presentations" }
                @if events.is_empty() {
                    p class="text-muted" { "There are no events yet." }
                }
                div class="row row-cols-1 row-cols-md-2 g-3" {
                    @for overview in &events {
                        div class="col" {
                            div class="card h-100" {
                                div class="card-body" {
                                    h2 class="h5 card-title" { (overview.event.title) }
                                    p class="card-text text-muted" {
                                        (overview.teams) " teams, "
                                        (overview.reviewers) " reviewers, "
                                        (overview.event.duration) " minutes each"
                                    }
                                    StatusBadge status=(overview.event.status());
                                }
                                div class="card-footer" {
                                    a class="btn btn-primary btn-sm"
                                      href=(format!("/presentations/{}", overview.event.id)) {
                                        "Open"
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

pub async fn presentation_page(
    Path(event_id): Path<String>,
    user: User<true>,
    mut conn: Conn<true>,
    State(live): State<Live>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    let event = Event::fetch(&event_id, &mut *conn)?;

    let mut teams = Team::for_event(&event.id, &mut *conn)?;
    sort_by_status(&mut teams);
    let reviewers = EventReviewer::for_event(&event.id, &mut *conn)?;
    let snapshot = LiveSnapshot::new(&event, &teams, &live);
    let results = Results::load(&event, &mut *conn)?;
    let in_progress = event.status() == PresentationStatus::InProgress;
    let live_url = format!("/present/{}/live", event.id);

    success(
        Page::new()
            .user(user)
            .role(Role::Admin)
            .event(event.clone())
            .body(maud! {
                div class="d-flex justify-content-between align-items-center" {
                    h1 { (event.title) }
                    form method="post" action=(format!("/presentations/{}/status", event.id))
                        class="d-flex gap-2" {
                        select class="form-select" name="status" {
                            @for status in PresentationStatus::ALL {
                                option value=(status.as_str()) selected[status == event.status()] {
                                    (status.label())
                                }
                            }
                        }
                        button type="submit" class="btn btn-outline-primary" { "Update" }
                    }
                }
                @if !in_progress {
                    div class="alert alert-info" {
                        "Set the event to \"In progress\" to start teams."
                    }
                }

                div class="row mt-3" {
                    div class="col-lg-7" {
                        h2 class="h4" { "Current team" }
                        @if let Some(team) = &snapshot.current_team {
                            div class="card mb-3" {
                                div class="card-body" {
                                    h3 class="h5" { (team.title) }
                                    TimerDisplay event=(&event) timer=(snapshot.timer.as_ref());
                                    form method="post" action=(format!("/presentations/{}/timer", event.id))
                                        class="d-flex gap-2 mt-2" {
                                        input type="hidden" name="team_id" value=(&team.id);
                                        button type="submit" name="action" value="start"
                                            class="btn btn-success" { "Start" }
                                        button type="submit" name="action" value="pause"
                                            class="btn btn-warning" { "Pause" }
                                        button type="submit" name="action" value="stop"
                                            class="btn btn-outline-danger" { "Reset" }
                                    }
                                }
                            }
                        } @else {
                            p class="text-muted" { "No team is presenting." }
                        }

                        h2 class="h4" { "Teams" }
                        table class="table align-middle" {
                            tbody {
                                @for team in &teams {
                                    tr {
                                        td { (team.seq) }
                                        td { (team.title) }
                                        td { StatusBadge status=(team.status()); }
                                        td class="text-end text-nowrap" {
                                            @if in_progress {
                                                @if team.status() != TeamStatus::InProgress {
                                                    PostButton
                                                        action=(&format!("/presentations/{}/teams/{}/start", event.id, team.id))
                                                        label="Start"
                                                        class="btn btn-sm btn-primary me-1"
                                                        confirm=(None);
                                                }
                                                @if team.status() != TeamStatus::Done {
                                                    form method="post" class="d-inline"
                                                        action=(format!("/presentations/{}/teams/{}/status", event.id, team.id)) {
                                                        input type="hidden" name="status" value="done";
                                                        button type="submit" class="btn btn-sm btn-outline-success me-1" { "Done" }
                                                    }
                                                }
                                                @if team.status() != TeamStatus::Pending {
                                                    form method="post" class="d-inline"
                                                        action=(format!("/presentations/{}/teams/{}/status", event.id, team.id)) {
                                                        input type="hidden" name="status" value="pending";
                                                        button type="submit" class="btn btn-sm btn-outline-secondary" { "Back to pending" }
                                                    }
                                                }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                    div class="col-lg-5" {
                        h2 class="h4" { "Reviewers" }
                        ul class="list-group mb-3" {
                            @for reviewer in &reviewers {
                                li class="list-group-item d-flex justify-content-between align-items-center" {
                                    span {
                                        (reviewer.name())
                                        @if reviewer.row.is_leader {
                                            " " span class="badge text-bg-warning" { "Leader" }
                                        }
                                    }
                                    form method="post" class="d-flex gap-1"
                                        action=(format!("/presentations/{}/reviewers/{}/status", event.id, reviewer.user.id)) {
                                        select class="form-select form-select-sm" name="status" {
                                            @for status in PresentationStatus::ALL {
                                                option value=(status.as_str()) selected[status == reviewer.row.status()] {
                                                    (status.label())
                                                }
                                            }
                                        }
                                        button type="submit" class="btn btn-sm btn-outline-primary" { "Set" }
                                    }
                                }
                            }
                        }
                        div class="d-flex justify-content-between align-items-center" {
                            h2 class="h4" { "Results" }
                            a class="btn btn-sm btn-outline-primary"
                              href=(format!("/presentations/{}/results", event.id)) { "Full results" }
                        }
                        ResultsTable results=(&results) compact=(true);
                        p class="text-muted" {
                            "Scoring is " @if event.can_edit_score { "open" } @else { "locked" } "."
                        }
                    }
                }
                LiveScript url=(&live_url);
            })
            .render(),
    )
}
