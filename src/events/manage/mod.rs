use axum::extract::{Path, Query};
use hypertext::prelude::*;
use serde::Deserialize;

use crate::{
    auth::User,
    events::{
        Event,
        criteria::{Criteria, manage::CriteriaPanel},
        reviewers::{EventReviewer, available_reviewers, manage::ReviewersPanel},
        teams::{Team, manage::TeamsPanel},
    },
    permission::{Role, require_role},
    state::Conn,
    template::Page,
    util_resp::{StandardResponse, success},
    widgets::{actions::Actions, badge::StatusBadge},
};

pub mod edit;

pub async fn list_events_page(
    user: User<true>,
    mut conn: Conn<true>,
) -> StandardResponse {
    let role = Role::of_user(&user.id, &mut *conn)?;
    let events = Event::list(&mut *conn)?;

    success(
        Page::new()
            .user(user)
            .role(role)
            .title("Events")
            .body(maud! {
                h1 { "Events" }
                @if role == Role::Admin {
                    Actions options=(&[("/events/create", "Create event")]);
                }
                @if events.is_empty() {
                    p class="text-muted" { "There are no events yet." }
                } @else {
                    table class="table align-middle" {
                        thead {
                            tr {
                                th scope="col" { "Title" }
                                th scope="col" { "Starts" }
                                th scope="col" { "Length" }
                                th scope="col" { "Status" }
                                th scope="col" {}
                            }
                        }
                        tbody {
                            @for event in &events {
                                tr {
                                    td { (event.title) }
                                    td { (event.time_start.format("%Y-%m-%d %H:%M").to_string()) }
                                    td { (event.duration) " min" }
                                    td { StatusBadge status=(event.status()); }
                                    td class="text-end" {
                                        @if role == Role::Admin {
                                            a class="btn btn-sm btn-outline-primary me-2"
                                              href=(format!("/events/{}", event.id)) { "Manage" }
                                        }
                                        a class="btn btn-sm btn-outline-secondary"
                                          href=(format!("/present/{}", event.id)) { "Live view" }
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

#[derive(Deserialize, Default)]
pub struct TabQuery {
    #[serde(default)]
    tab: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Tab {
    Details,
    Teams,
    Reviewers,
    Criteria,
}

impl Tab {
    fn parse(tab: Option<&str>) -> Tab {
        match tab {
            Some("teams") => Tab::Teams,
            Some("reviewers") => Tab::Reviewers,
            Some("criteria") => Tab::Criteria,
            _ => Tab::Details,
        }
    }

    const ALL: [(Tab, &'static str, &'static str); 4] = [
        (Tab::Details, "details", "Details"),
        (Tab::Teams, "teams", "Teams"),
        (Tab::Reviewers, "reviewers", "Reviewers"),
        (Tab::Criteria, "criteria", "Criteria"),
    ];
}

/// The administration page of an event, split into tabs.
pub async fn event_detail_page(
    Path(event_id): Path<String>,
    Query(query): Query<TabQuery>,
    user: User<true>,
    mut conn: Conn<true>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    let event = Event::fetch(&event_id, &mut *conn)?;

    let tab = Tab::parse(query.tab.as_deref());
    let teams = Team::for_event(&event.id, &mut *conn)?;
    let reviewers = EventReviewer::for_event(&event.id, &mut *conn)?;
    let criteria = Criteria::for_event(&event.id, &mut *conn)?;
    let available = match tab {
        Tab::Reviewers => available_reviewers(&event.id, &mut *conn)?,
        _ => vec![],
    };

    success(
        Page::new()
            .user(user)
            .role(Role::Admin)
            .event(event.clone())
            .body(maud! {
                div class="d-flex justify-content-between align-items-center" {
                    h1 { (event.title) }
                    StatusBadge status=(event.status());
                }
                Actions options=(&[
                    (format!("/presentations/{}", event.id).as_str(), "Run presentation"),
                    (format!("/events/{}/results.csv", event.id).as_str(), "Export results"),
                ]);
                ul class="nav nav-tabs mb-3" {
                    @for (t, key, label) in Tab::ALL {
                        li class="nav-item" {
                            a class=(if t == tab { "nav-link active" } else { "nav-link" })
                              href=(format!("/events/{}?tab={key}", event.id)) {
                                (label)
                            }
                        }
                    }
                }
                @match tab {
                    Tab::Details => {
                        dl class="row" {
                            dt class="col-sm-3" { "Description" }
                            dd class="col-sm-9" { (event.description) }
                            dt class="col-sm-3" { "Presentation length" }
                            dd class="col-sm-9" { (event.duration) " minutes" }
                            dt class="col-sm-3" { "Schedule" }
                            dd class="col-sm-9" {
                                (event.time_start.format("%Y-%m-%d %H:%M").to_string())
                                " to "
                                (event.time_end.format("%Y-%m-%d %H:%M").to_string())
                            }
                            dt class="col-sm-3" { "Scoring" }
                            dd class="col-sm-9" {
                                @if event.can_edit_score { "Open" } @else { "Locked" }
                            }
                            dt class="col-sm-3" { "Teams" }
                            dd class="col-sm-9" { (teams.len()) }
                            dt class="col-sm-3" { "Reviewers" }
                            dd class="col-sm-9" { (reviewers.len()) }
                        }
                        Actions options=(&[
                            (format!("/events/{}/edit", event.id).as_str(), "Edit details"),
                        ]);
                        form method="post" action=(format!("/events/{}/delete", event.id)) {
                            button type="submit" class="btn btn-outline-danger"
                                onclick="return confirm('Delete this event?')" {
                                "Delete event"
                            }
                        }
                    }
                    Tab::Teams => {
                        TeamsPanel event=(&event) teams=(&teams);
                    }
                    Tab::Reviewers => {
                        ReviewersPanel event=(&event) reviewers=(&reviewers) available=(&available);
                    }
                    Tab::Criteria => {
                        CriteriaPanel event=(&event) criteria=(criteria.as_ref());
                    }
                }
            })
            .render(),
    )
}
