use axum::extract::Path;
use hypertext::prelude::*;

use crate::{
    auth::User,
    events::{
        Event,
        scores::aggregate::{Results, format_score},
    },
    permission::{Role, require_role},
    state::Conn,
    template::Page,
    util_resp::{StandardResponse, success},
    widgets::actions::Actions,
};

/// Ranking table. The compact form leaves out the per-reviewer columns.
pub struct ResultsTable<'r> {
    pub results: &'r Results,
    pub compact: bool,
}

fn rank_class(rank: usize) -> &'static str {
    match rank {
        1 => "badge text-bg-warning",
        2 => "badge text-bg-secondary",
        3 => "badge text-bg-danger",
        _ => "badge text-bg-light",
    }
}

impl Renderable for ResultsTable<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let max = self.results.max_possible_score;
        maud! {
            @if self.results.rows.is_empty() {
                p class="text-muted" { "There are no teams to rank yet." }
            } @else {
                div class="table-responsive" {
                    table class="table table-sm align-middle" {
                        thead {
                            tr {
                                th { "Rank" }
                                th { "Team" }
                                @if !self.compact {
                                    @for reviewer in &self.results.reviewers {
                                        th class="text-end" {
                                            (reviewer.name)
                                            @if reviewer.is_leader { " ★" }
                                        }
                                    }
                                }
                                th class="text-end" { "Average" }
                            }
                        }
                        tbody {
                            @for row in &self.results.rows {
                                tr {
                                    td {
                                        span class=(rank_class(row.rank)) { "#" (row.rank) }
                                    }
                                    td { (row.title) }
                                    @if !self.compact {
                                        @for total in &row.totals {
                                            td class="text-end" { (format_score(*total, 1)) }
                                        }
                                    }
                                    td class="text-end" {
                                        @if row.average > 0.0 {
                                            (format_score(row.average, 1))
                                            @if max > 0 { "/" (max) }
                                        } @else {
                                            span class="text-muted" { "Not scored" }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        .render_to(buffer);
    }
}

pub async fn presentation_results_page(
    Path(event_id): Path<String>,
    user: User<true>,
    mut conn: Conn<true>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    let event = Event::fetch(&event_id, &mut *conn)?;
    let results = Results::load(&event, &mut *conn)?;

    success(
        Page::new()
            .user(user)
            .role(Role::Admin)
            .event(event.clone())
            .title(format!("Results of {}", event.title))
            .body(maud! {
                h1 { "Results: " (event.title) }
                Actions options=(&[
                    (format!("/events/{}/results.csv", event.id).as_str(), "Download CSV"),
                    (format!("/presentations/{}", event.id).as_str(), "Back to presentation"),
                ]);
                p class="text-muted" {
                    "Maximum possible score: " (results.max_possible_score)
                }
                ResultsTable results=(&results) compact=(false);
            })
            .render(),
    )
}
