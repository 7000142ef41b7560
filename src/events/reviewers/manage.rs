use axum::{
    extract::{Form, Path},
    response::Redirect,
};
use chrono::Utc;
use diesel::prelude::*;
use hypertext::prelude::*;
use serde::Deserialize;

use crate::{
    auth::User,
    events::{
        Event,
        reviewers::{EventReviewer, Reviewer, add_reviewer},
    },
    logs::log_action,
    permission::{Role, require_role},
    schema::event_reviewers,
    state::Conn,
    util_resp::{StandardResponse, see_other_ok},
    widgets::{actions::PostButton, badge::StatusBadge},
};

pub struct ReviewersPanel<'r> {
    pub event: &'r Event,
    pub reviewers: &'r [Reviewer],
    pub available: &'r [User<true>],
}

impl Renderable for ReviewersPanel<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let event_id = &self.event.id;
        maud! {
            h2 class="h4" { "Reviewers" }
            @if self.reviewers.is_empty() {
                p class="text-muted" { "Nobody has been assigned to review this event." }
            } @else {
                table class="table align-middle" {
                    thead {
                        tr {
                            th { "Name" }
                            th { "Email" }
                            th { "Leader" }
                            th { "Status" }
                            th {}
                        }
                    }
                    tbody {
                        @for reviewer in self.reviewers {
                            tr {
                                td { (reviewer.name()) }
                                td { (reviewer.user.email) }
                                td {
                                    @if reviewer.row.is_leader {
                                        span class="badge text-bg-warning" { "Leader" }
                                    }
                                }
                                td { StatusBadge status=(reviewer.row.status()); }
                                td class="text-end text-nowrap" {
                                    form method="post" class="d-inline"
                                        action=(format!("/events/{event_id}/reviewers/{}/leader", reviewer.row.id)) {
                                        input type="hidden" name="is_leader"
                                            value=(if reviewer.row.is_leader { "false" } else { "true" });
                                        button type="submit" class="btn btn-sm btn-outline-secondary me-1" {
                                            @if reviewer.row.is_leader { "Remove leader" } @else { "Make leader" }
                                        }
                                    }
                                    PostButton
                                        action=(&format!("/events/{event_id}/reviewers/{}/remove", reviewer.row.id))
                                        label="Remove"
                                        class="btn btn-sm btn-outline-danger"
                                        confirm=(Some("Remove this reviewer from the event?"));
                                }
                            }
                        }
                    }
                }
            }

            h3 class="h5 mt-4" { "Add a reviewer" }
            @if self.available.is_empty() {
                p class="text-muted" {
                    "There are no other users with the reviewer role. Roles are assigned on the "
                    a href="/users" { "users page" }
                    "."
                }
            } @else {
                form method="post" action=(format!("/events/{event_id}/reviewers/add"))
                    class="row g-2 align-items-end" {
                    div class="col-md-6" {
                        label for="user_id" class="form-label" { "Reviewer" }
                        select class="form-select" id="user_id" name="user_id" required {
                            @for user in self.available {
                                option value=(&user.id) { (user.name()) " (" (user.email) ")" }
                            }
                        }
                    }
                    div class="col-md-3" {
                        div class="form-check" {
                            input class="form-check-input" type="checkbox" id="is_leader"
                                name="is_leader" value="true";
                            label class="form-check-label" for="is_leader" { "Leader" }
                        }
                    }
                    div class="col-md-3" {
                        button type="submit" class="btn btn-primary" { "Add" }
                    }
                }
            }
        }
        .render_to(buffer);
    }
}

/// Checkboxes are only submitted when ticked.
fn checked(value: &Option<String>) -> bool {
    matches!(value.as_deref(), Some("true" | "on" | "1"))
}

#[derive(Deserialize)]
pub struct AddReviewerForm {
    user_id: String,
    #[serde(default)]
    is_leader: Option<String>,
}

pub async fn do_add_reviewer(
    Path(event_id): Path<String>,
    user: User<true>,
    mut conn: Conn<true>,
    Form(form): Form<AddReviewerForm>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    let event = Event::fetch(&event_id, &mut *conn)?;

    add_reviewer(&event.id, &form.user_id, checked(&form.is_leader), &mut *conn)?;
    log_action(
        &user.id,
        format!("added reviewer {} to event {}", form.user_id, event.id),
        &mut *conn,
    )?;

    see_other_ok(Redirect::to(&format!("/events/{}?tab=reviewers", event.id)))
}

pub async fn do_remove_reviewer(
    Path((event_id, reviewer_id)): Path<(String, String)>,
    user: User<true>,
    mut conn: Conn<true>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    let event = Event::fetch(&event_id, &mut *conn)?;
    let reviewer = EventReviewer::fetch(&event.id, &reviewer_id, &mut *conn)?;

    diesel::update(event_reviewers::table.find(&reviewer.id))
        .set((
            event_reviewers::is_deleted.eq(true),
            event_reviewers::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut *conn)?;

    log_action(
        &user.id,
        format!("removed reviewer {} from event {}", reviewer.reviewer_id, event.id),
        &mut *conn,
    )?;

    see_other_ok(Redirect::to(&format!("/events/{}?tab=reviewers", event.id)))
}

#[derive(Deserialize)]
pub struct LeaderForm {
    #[serde(default)]
    is_leader: Option<String>,
}

pub async fn do_set_leader(
    Path((event_id, reviewer_id)): Path<(String, String)>,
    user: User<true>,
    mut conn: Conn<true>,
    Form(form): Form<LeaderForm>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    let event = Event::fetch(&event_id, &mut *conn)?;
    let reviewer = EventReviewer::fetch(&event.id, &reviewer_id, &mut *conn)?;
    let is_leader = checked(&form.is_leader);

    diesel::update(event_reviewers::table.find(&reviewer.id))
        .set((
            event_reviewers::is_leader.eq(is_leader),
            event_reviewers::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut *conn)?;

    log_action(
        &user.id,
        format!("set leader={is_leader} for reviewer {}", reviewer.reviewer_id),
        &mut *conn,
    )?;

    see_other_ok(Redirect::to(&format!("/events/{}?tab=reviewers", event.id)))
}

#[cfg(test)]
mod tests {
    use super::checked;

    #[test]
    fn unticked_checkboxes_are_false() {
        assert!(!checked(&None));
        assert!(!checked(&Some("false".into())));
        assert!(checked(&Some("on".into())));
        assert!(checked(&Some("true".into())));
    }
}
