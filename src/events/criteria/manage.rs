use axum::{
    extract::{Form, Path},
    response::Redirect,
};
use chrono::Utc;
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use hypertext::prelude::*;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::User,
    events::{
        Event,
        criteria::{Criteria, CriteriaRecord, CriteriaTemplate, max_possible_score},
    },
    logs::log_action,
    permission::{Role, require_role},
    schema::{criteria_records, criteria_templates},
    state::Conn,
    util_resp::{FailureResponse, StandardResponse, bad_request_msg, see_other_ok},
    validation::required_text,
    widgets::actions::PostButton,
};

pub struct CriteriaPanel<'r> {
    pub event: &'r Event,
    pub criteria: Option<&'r Criteria>,
}

impl Renderable for CriteriaPanel<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let event_id = &self.event.id;
        maud! {
            @if let Some(criteria) = self.criteria {
                div class="d-flex justify-content-between align-items-center mb-2" {
                    h2 class="h4" { (criteria.template.title) }
                    PostButton
                        action=(&format!("/events/{event_id}/criteria/{}/delete", criteria.template.id))
                        label="Delete template"
                        class="btn btn-sm btn-outline-danger"
                        confirm=(Some("Delete the template and all of its criteria?"));
                }
                p class="text-muted" {
                    "Maximum possible score: " (max_possible_score(&criteria.records))
                }
                table class="table align-middle" {
                    thead {
                        tr {
                            th { "Criterion" }
                            th style="width: 10rem" { "Max score" }
                            th {}
                        }
                    }
                    tbody {
                        @for record in &criteria.records {
                            tr {
                                td colspan="2" {
                                    form method="post" class="row g-2"
                                        id=(format!("record-{}", record.id))
                                        action=(format!("/events/{event_id}/records/{}/edit", record.id)) {
                                        div class="col" {
                                            input type="text" class="form-control" name="details"
                                                required value=(&record.details);
                                        }
                                        div class="col-3" {
                                            input type="number" class="form-control" name="max_score"
                                                min="1" max=(MAX_RECORD_SCORE) required value=(record.max_score);
                                        }
                                    }
                                }
                                td class="text-end text-nowrap" {
                                    button type="submit" class="btn btn-sm btn-outline-primary me-1"
                                        form=(format!("record-{}", record.id)) { "Save" }
                                    PostButton
                                        action=(&format!("/events/{event_id}/records/{}/delete", record.id))
                                        label="Delete"
                                        class="btn btn-sm btn-outline-danger"
                                        confirm=(None);
                                }
                            }
                        }
                    }
                }
                h3 class="h5 mt-4" { "Add a criterion" }
                form method="post" class="row g-2 align-items-end"
                    action=(format!("/events/{event_id}/criteria/{}/records/create", criteria.template.id)) {
                    div class="col-md-7" {
                        label for="details" class="form-label" { "Description" }
                        input type="text" class="form-control" id="details" name="details" required;
                    }
                    div class="col-md-3" {
                        label for="max_score" class="form-label" { "Max score" }
                        input type="number" class="form-control" id="max_score" name="max_score"
                            min="1" value="10" required;
                    }
                    div class="col-md-2" {
                        button type="submit" class="btn btn-primary" { "Add" }
                    }
                }
            } @else {
                h2 class="h4" { "Criteria" }
                p class="text-muted" {
                    "This event has no scoring criteria yet. Create a template, then add criteria to it."
                }
                form method="post" class="row g-2 align-items-end"
                    action=(format!("/events/{event_id}/criteria/create")) {
                    div class="col-md-8" {
                        label for="title" class="form-label" { "Template name" }
                        input type="text" class="form-control" id="title" name="title" required;
                    }
                    div class="col-md-4" {
                        button type="submit" class="btn btn-primary" { "Create template" }
                    }
                }
            }
        }
        .render_to(buffer);
    }
}

fn criteria_tab(event_id: &str) -> Redirect {
    Redirect::to(&format!("/events/{event_id}?tab=criteria"))
}

fn fetch_template(
    event_id: &str,
    template_id: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<CriteriaTemplate, FailureResponse> {
    criteria_templates::table
        .filter(
            criteria_templates::id
                .eq(template_id)
                .and(criteria_templates::event_id.eq(event_id)),
        )
        .first::<CriteriaTemplate>(conn)
        .optional()?
        .ok_or(FailureResponse::NotFound(()))
}

/// A record of the event's template.
fn fetch_record(
    event_id: &str,
    record_id: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<CriteriaRecord, FailureResponse> {
    criteria_records::table
        .inner_join(criteria_templates::table)
        .filter(
            criteria_records::id
                .eq(record_id)
                .and(criteria_templates::event_id.eq(event_id)),
        )
        .select(criteria_records::all_columns)
        .first::<CriteriaRecord>(conn)
        .optional()?
        .ok_or(FailureResponse::NotFound(()))
}

#[derive(Deserialize)]
pub struct TemplateForm {
    title: String,
}

pub async fn do_create_template(
    Path(event_id): Path<String>,
    user: User<true>,
    mut conn: Conn<true>,
    Form(form): Form<TemplateForm>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    let event = Event::fetch(&event_id, &mut *conn)?;

    let title = match required_text("Template name", &form.title, 128) {
        Ok(title) => title,
        Err(msg) => return bad_request_msg(msg),
    };

    if Criteria::for_event(&event.id, &mut *conn)?.is_some() {
        return bad_request_msg(
            "This event already has a criteria template. Delete it first to start again.",
        );
    }

    let id = Uuid::now_v7().to_string();
    let now = Utc::now().naive_utc();
    diesel::insert_into(criteria_templates::table)
        .values((
            criteria_templates::id.eq(&id),
            criteria_templates::event_id.eq(&event.id),
            criteria_templates::title.eq(&title),
            criteria_templates::created_at.eq(now),
            criteria_templates::updated_at.eq(now),
        ))
        .execute(&mut *conn)?;

    log_action(&user.id, format!("created criteria template {id}"), &mut *conn)?;

    see_other_ok(criteria_tab(&event.id))
}

pub async fn do_delete_template(
    Path((event_id, template_id)): Path<(String, String)>,
    user: User<true>,
    mut conn: Conn<true>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    let event = Event::fetch(&event_id, &mut *conn)?;
    let template = fetch_template(&event.id, &template_id, &mut *conn)?;

    diesel::delete(
        criteria_records::table
            .filter(criteria_records::template_id.eq(&template.id)),
    )
    .execute(&mut *conn)?;
    diesel::delete(criteria_templates::table.find(&template.id))
        .execute(&mut *conn)?;

    log_action(
        &user.id,
        format!("deleted criteria template {}", template.id),
        &mut *conn,
    )?;

    see_other_ok(criteria_tab(&event.id))
}

/// Largest maximum score a single criterion can have.
pub const MAX_RECORD_SCORE: i64 = 1_000_000;

#[derive(Deserialize)]
pub struct RecordForm {
    details: String,
    max_score: String,
}

impl RecordForm {
    fn validate(&self) -> Result<(String, i64), String> {
        let details = required_text("The criterion", &self.details, 256)?;
        match self.max_score.trim().parse::<i64>() {
            Ok(max) if (1..=MAX_RECORD_SCORE).contains(&max) => Ok((details, max)),
            _ => Err(format!(
                "The maximum score must be a whole number between 1 and \
                 {MAX_RECORD_SCORE}."
            )),
        }
    }
}

pub async fn do_create_record(
    Path((event_id, template_id)): Path<(String, String)>,
    user: User<true>,
    mut conn: Conn<true>,
    Form(form): Form<RecordForm>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    let event = Event::fetch(&event_id, &mut *conn)?;
    let template = fetch_template(&event.id, &template_id, &mut *conn)?;

    let (details, max_score) = match form.validate() {
        Ok(valid) => valid,
        Err(msg) => return bad_request_msg(msg),
    };

    let now = Utc::now().naive_utc();
    diesel::insert_into(criteria_records::table)
        .values((
            criteria_records::id.eq(Uuid::now_v7().to_string()),
            criteria_records::template_id.eq(&template.id),
            criteria_records::details.eq(&details),
            criteria_records::max_score.eq(max_score),
            criteria_records::created_at.eq(now),
            criteria_records::updated_at.eq(now),
        ))
        .execute(&mut *conn)?;

    see_other_ok(criteria_tab(&event.id))
}

pub async fn do_edit_record(
    Path((event_id, record_id)): Path<(String, String)>,
    user: User<true>,
    mut conn: Conn<true>,
    Form(form): Form<RecordForm>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    let event = Event::fetch(&event_id, &mut *conn)?;
    let record = fetch_record(&event.id, &record_id, &mut *conn)?;

    let (details, max_score) = match form.validate() {
        Ok(valid) => valid,
        Err(msg) => return bad_request_msg(msg),
    };

    diesel::update(criteria_records::table.find(&record.id))
        .set((
            criteria_records::details.eq(&details),
            criteria_records::max_score.eq(max_score),
            criteria_records::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut *conn)?;

    see_other_ok(criteria_tab(&event.id))
}

pub async fn do_delete_record(
    Path((event_id, record_id)): Path<(String, String)>,
    user: User<true>,
    mut conn: Conn<true>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    let event = Event::fetch(&event_id, &mut *conn)?;
    let record = fetch_record(&event.id, &record_id, &mut *conn)?;

    diesel::delete(criteria_records::table.find(&record.id))
        .execute(&mut *conn)?;

    see_other_ok(criteria_tab(&event.id))
}

#[cfg(test)]
mod tests {
    use super::RecordForm;

    #[test]
    fn max_score_is_a_bounded_whole_number() {
        let form = |max: &str| RecordForm {
            details: "Presentation".into(),
            max_score: max.into(),
        };
        assert_eq!(form("10").validate(), Ok(("Presentation".into(), 10)));
        assert!(form("0").validate().is_err());
        assert!(form("2.5").validate().is_err());
        assert!(form("1000000").validate().is_ok());
        assert!(form("9223372036854775807").validate().is_err());
    }
}
