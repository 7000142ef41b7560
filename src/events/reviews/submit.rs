use axum::{
    extract::{Form, Path},
    response::{Redirect, Response},
};
use chrono::Utc;
use diesel::prelude::*;
use hypertext::prelude::*;
use indexmap::IndexMap;

use crate::{
    auth::User,
    events::{
        criteria::Criteria,
        reviews::reviewer_context,
        scores::{ScoreEntry, SubmittedScore, validate_submission},
        teams::Team,
    },
    permission::Role,
    schema::event_reviewers,
    state::Conn,
    template::Page,
    util_resp::{
        FailureResponse, StandardResponse, bad_request_msg, envelope_ok,
        see_other_ok, success,
    },
    widgets::{alert::InfoAlert, badge::StatusBadge},
};

/// Collects the `score_<record>` fields of a scoring form together with the
/// matching `comment_<record>` fields, in the order the form lists them.
pub fn submitted_from_form(
    form: &IndexMap<String, String>,
) -> Vec<SubmittedScore> {
    form
        .iter()
        .filter_map(|(key, score)| {
            let record_id = key.strip_prefix("score_")?;
            Some(SubmittedScore {
                record_id: record_id.to_string(),
                score: score.clone(),
                comment: form
                    .get(&format!("comment_{record_id}"))
                    .cloned()
                    .unwrap_or_default(),
            })
        })
        .collect()
}

pub async fn team_scoring_page(
    Path((event_id, team_id)): Path<(String, String)>,
    user: User<true>,
    mut conn: Conn<true>,
) -> StandardResponse {
    let (event, row) = reviewer_context(&event_id, &user, &mut *conn)?;
    let team = Team::fetch(&event.id, &team_id, &mut *conn)?;
    let criteria = Criteria::for_event(&event.id, &mut *conn)?;
    let sheet = row.sheet();
    let members = team.members();
    let locked = !event.can_edit_score;

    success(
        Page::new()
            .user(user)
            .role(Role::Reviewer)
            .event(event.clone())
            .title(format!("Scoring {}", team.title))
            .body(maud! {
                a href=(format!("/reviews/{}", event.id)) { "← " (event.title) }
                div class="d-flex justify-content-between align-items-center mt-2" {
                    h1 { (team.title) }
                    StatusBadge status=(team.status());
                }
                @if !team.description.is_empty() {
                    p { (team.description) }
                }
                @if !members.is_empty() {
                    p class="text-muted" { "Members: " (members.join(", ")) }
                }
                @if !team.url.is_empty() {
                    p { a href=(&team.url) target="_blank" rel="noopener" { (team.url) } }
                }

                @match &criteria {
                    None => {
                        InfoAlert msg="No criteria have been set for this event yet.";
                    }
                    Some(criteria) => {
                        @if locked {
                            div class="alert alert-warning" {
                                "Scoring has been locked. Your scores are shown below."
                            }
                        }
                        form method="post"
                            action=(format!("/reviews/{}/teams/{}", event.id, team.id)) {
                            h2 class="h4" { (criteria.template.title) }
                            @for record in &criteria.records {
                                @let existing = sheet.entry(&team.id, &record.id);
                                div class="mb-3 row" {
                                    label class="col-md-6 col-form-label"
                                        for=(format!("score_{}", record.id)) {
                                        (record.details)
                                        span class="text-muted" { " (0 to " (record.max_score) ")" }
                                    }
                                    div class="col-md-2" {
                                        input type="number" class="form-control" step="any"
                                            min="0" max=(record.max_score)
                                            id=(format!("score_{}", record.id))
                                            name=(format!("score_{}", record.id))
                                            value=(existing.map(|e| e.score.to_string()).unwrap_or_default())
                                            disabled[locked];
                                    }
                                    div class="col-md-4" {
                                        input type="text" class="form-control" placeholder="Comment"
                                            name=(format!("comment_{}", record.id))
                                            value=(existing.map(|e| e.comment.clone()).unwrap_or_default())
                                            disabled[locked];
                                    }
                                }
                            }
                            @if !locked {
                                button type="submit" class="btn btn-primary" { "Save scores" }
                            }
                        }
                    }
                }
            })
            .render(),
    )
}

pub async fn do_save_scores(
    Path((event_id, team_id)): Path<(String, String)>,
    user: User<true>,
    mut conn: Conn<true>,
    Form(form): Form<IndexMap<String, String>>,
) -> StandardResponse {
    let (event, row) = reviewer_context(&event_id, &user, &mut *conn)?;
    if !event.can_edit_score {
        return bad_request_msg("Scoring for this event has been locked.");
    }
    let team = Team::fetch(&event.id, &team_id, &mut *conn)?;
    let records = Criteria::records_for_event(&event.id, &mut *conn)?;

    let entries = match validate_submission(
        &team.id,
        submitted_from_form(&form),
        &records,
    ) {
        Ok(entries) => entries,
        Err(msg) => return bad_request_msg(msg),
    };

    let mut sheet = row.sheet();
    sheet.replace_team(&team.id, entries);

    diesel::update(event_reviewers::table.find(&row.id))
        .set((
            event_reviewers::scores.eq(sheet.to_json()),
            event_reviewers::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut *conn)?;

    tracing::info!(
        "reviewer {} scored team {} of event {}",
        user.id,
        team.id,
        event.id
    );

    see_other_ok(Redirect::to(&format!("/reviews/{}", event.id)))
}

fn own_entries(
    event_id: &str,
    team_id: &str,
    user: &User<true>,
    conn: &mut Conn<true>,
) -> Result<Vec<ScoreEntry>, FailureResponse> {
    let (event, row) = reviewer_context(event_id, user, &mut **conn)?;
    let team = Team::fetch(&event.id, team_id, &mut **conn)?;
    Ok(row.sheet().for_team(&team.id).cloned().collect())
}

/// The caller's own entries for one team, as JSON.
pub async fn scores_for_team(
    Path((event_id, team_id)): Path<(String, String)>,
    user: User<true>,
    mut conn: Conn<true>,
) -> Response {
    match own_entries(&event_id, &team_id, &user, &mut conn) {
        Ok(entries) => envelope_ok(entries),
        Err(e) => e.into_envelope(),
    }
}
