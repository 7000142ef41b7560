use axum::{
    extract::{Form, Path, State},
    response::Redirect,
};
use chrono::Utc;
use diesel::prelude::*;
use hypertext::prelude::*;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::User,
    events::{
        Event,
        teams::{
            MAX_TEAM_ORDER, Team, TeamStatus, members_from_lines,
            members_to_json, next_seq, reorder,
        },
    },
    logs::log_action,
    msg::Live,
    permission::{Role, require_role},
    schema::teams,
    state::Conn,
    template::Page,
    util_resp::{
        StandardResponse, bad_request_msg, err_not_found, see_other_ok, success,
    },
    validation::{is_optional_http_url, required_text},
    widgets::{actions::PostButton, badge::StatusBadge},
};

pub struct TeamsPanel<'r> {
    pub event: &'r Event,
    pub teams: &'r [Team],
}

/// The running order with `i` and `j` swapped.
fn swapped(teams: &[Team], i: usize, j: usize) -> Vec<String> {
    let mut ids: Vec<String> = teams.iter().map(|t| t.id.clone()).collect();
    ids.swap(i, j);
    ids
}

impl Renderable for TeamsPanel<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let event_id = &self.event.id;
        let reorder_url = format!("/events/{event_id}/teams/reorder");
        maud! {
            div class="d-flex justify-content-between align-items-center mb-2" {
                h2 class="h4" { "Teams" }
                a class="btn btn-primary" href=(format!("/events/{event_id}/teams/create")) {
                    "Add team"
                }
            }
            @if self.teams.is_empty() {
                p class="text-muted" { "No teams have been added yet." }
            } @else {
                table class="table align-middle" {
                    thead {
                        tr {
                            th { "#" }
                            th { "Team" }
                            th { "Members" }
                            th { "Status" }
                            th {}
                        }
                    }
                    tbody {
                        @for (i, team) in self.teams.iter().enumerate() {
                            tr {
                                td { (team.seq) }
                                td {
                                    (team.title)
                                    @if !team.url.is_empty() {
                                        " "
                                        a href=(&team.url) target="_blank" rel="noopener" { "link" }
                                    }
                                }
                                td { (team.members().join(", ")) }
                                td { StatusBadge status=(team.status()); }
                                td class="text-end text-nowrap" {
                                    @if i > 0 {
                                        form method="post" action=(&reorder_url) class="d-inline" {
                                            @for id in swapped(self.teams, i, i - 1) {
                                                input type="hidden" name="ids" value=(id);
                                            }
                                            button type="submit" class="btn btn-sm btn-outline-secondary me-1"
                                                title="Move up" { "↑" }
                                        }
                                    }
                                    @if i + 1 < self.teams.len() {
                                        form method="post" action=(&reorder_url) class="d-inline" {
                                            @for id in swapped(self.teams, i, i + 1) {
                                                input type="hidden" name="ids" value=(id);
                                            }
                                            button type="submit" class="btn btn-sm btn-outline-secondary me-1"
                                                title="Move down" { "↓" }
                                        }
                                    }
                                    a class="btn btn-sm btn-outline-primary me-1"
                                      href=(format!("/events/{event_id}/teams/{}/edit", team.id)) {
                                        "Edit"
                                    }
                                    PostButton
                                        action=(&format!("/events/{event_id}/teams/{}/delete", team.id))
                                        label="Delete"
                                        class="btn btn-sm btn-outline-danger"
                                        confirm=(Some("Delete this team?"));
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

#[derive(Deserialize, Default, Debug)]
pub struct TeamForm {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub url: String,
    /// One member per line.
    #[serde(default)]
    pub members: String,
    #[serde(default)]
    pub order: Option<String>,
}

pub struct ValidTeam {
    pub title: String,
    pub description: String,
    pub image: String,
    pub url: String,
    pub members: Vec<String>,
    pub order: Option<i64>,
}

impl TeamForm {
    pub fn validate(&self) -> Result<ValidTeam, String> {
        let title = required_text("Team name", &self.title, 128)?;
        is_optional_http_url(&self.image)?;
        is_optional_http_url(&self.url)?;

        let order = match self.order.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(order) => match order.parse::<i64>() {
                Ok(order) if (1..=MAX_TEAM_ORDER).contains(&order) => Some(order),
                _ => {
                    return Err(format!(
                        "The order must be a number between 1 and \
                         {MAX_TEAM_ORDER}."
                    ));
                }
            },
        };

        Ok(ValidTeam {
            title,
            description: self.description.trim().to_string(),
            image: self.image.trim().to_string(),
            url: self.url.trim().to_string(),
            members: members_from_lines(&self.members),
            order,
        })
    }
}

struct TeamFields<'r> {
    team: Option<&'r Team>,
    show_order: bool,
}

impl Renderable for TeamFields<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let (title, description, image, url, members) = match self.team {
            Some(t) => (
                t.title.clone(),
                t.description.clone(),
                t.image.clone(),
                t.url.clone(),
                t.members().join("\n"),
            ),
            None => Default::default(),
        };

        maud! {
            div class="mb-3" {
                label for="title" class="form-label" { "Team name" }
                input type="text" class="form-control" id="title" name="title"
                    maxlength="128" required value=(title);
            }
            div class="mb-3" {
                label for="description" class="form-label" { "Description" }
                textarea class="form-control" id="description" name="description" rows="3" {
                    (description)
                }
            }
            div class="mb-3" {
                label for="members" class="form-label" { "Members (one per line)" }
                textarea class="form-control" id="members" name="members" rows="4" {
                    (members)
                }
            }
            div class="row" {
                div class="col-md mb-3" {
                    label for="image" class="form-label" { "Image URL" }
                    input type="url" class="form-control" id="image" name="image"
                        value=(image);
                }
                div class="col-md mb-3" {
                    label for="url" class="form-label" { "Project URL" }
                    input type="url" class="form-control" id="url" name="url"
                        value=(url);
                }
            }
            @if self.show_order {
                div class="mb-3" {
                    label for="order" class="form-label" { "Position (optional)" }
                    input type="number" class="form-control" id="order" name="order"
                        min="1" max=(MAX_TEAM_ORDER);
                    div class="form-text" { "Leave empty to add the team at the end." }
                }
            }
        }
        .render_to(buffer);
    }
}

pub async fn create_team_page(
    Path(event_id): Path<String>,
    user: User<true>,
    mut conn: Conn<true>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    let event = Event::fetch(&event_id, &mut *conn)?;

    success(
        Page::new()
            .user(user)
            .role(Role::Admin)
            .event(event.clone())
            .body(maud! {
                h1 { "Add a team to " (event.title) }
                form method="post" class="mt-4" {
                    TeamFields team=(None) show_order=(true);
                    button type="submit" class="btn btn-primary" { "Add team" }
                }
            })
            .render(),
    )
}

pub async fn do_create_team(
    Path(event_id): Path<String>,
    user: User<true>,
    mut conn: Conn<true>,
    Form(form): Form<TeamForm>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    let event = Event::fetch(&event_id, &mut *conn)?;

    let valid = match form.validate() {
        Ok(valid) => valid,
        Err(msg) => return bad_request_msg(msg),
    };

    let seq = match valid.order {
        Some(order) => order,
        None => next_seq(&event.id, &mut *conn)?,
    };

    let id = Uuid::now_v7().to_string();
    let now = Utc::now().naive_utc();
    diesel::insert_into(teams::table)
        .values((
            teams::id.eq(&id),
            teams::event_id.eq(&event.id),
            teams::title.eq(&valid.title),
            teams::description.eq(&valid.description),
            teams::image.eq(&valid.image),
            teams::url.eq(&valid.url),
            teams::members.eq(members_to_json(&valid.members)),
            teams::seq.eq(seq),
            teams::status.eq(TeamStatus::Pending.as_str()),
            teams::is_deleted.eq(false),
            teams::created_at.eq(now),
            teams::updated_at.eq(now),
        ))
        .execute(&mut *conn)?;

    log_action(&user.id, format!("created team {id} in event {}", event.id), &mut *conn)?;

    see_other_ok(Redirect::to(&format!("/events/{}?tab=teams", event.id)))
}

pub async fn edit_team_page(
    Path((event_id, team_id)): Path<(String, String)>,
    user: User<true>,
    mut conn: Conn<true>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    let event = Event::fetch(&event_id, &mut *conn)?;
    let team = Team::fetch(&event.id, &team_id, &mut *conn)?;

    success(
        Page::new()
            .user(user)
            .role(Role::Admin)
            .event(event.clone())
            .body(maud! {
                h1 { "Edit " (team.title) }
                form method="post" class="mt-4" {
                    TeamFields team=(Some(&team)) show_order=(false);
                    button type="submit" class="btn btn-primary" { "Save" }
                }
            })
            .render(),
    )
}

/// Updates the details of a team. The running order is changed separately,
/// see [`do_reorder_teams`].
pub async fn do_edit_team(
    Path((event_id, team_id)): Path<(String, String)>,
    user: User<true>,
    mut conn: Conn<true>,
    Form(form): Form<TeamForm>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    let event = Event::fetch(&event_id, &mut *conn)?;
    let team = Team::fetch(&event.id, &team_id, &mut *conn)?;

    let valid = match form.validate() {
        Ok(valid) => valid,
        Err(msg) => return bad_request_msg(msg),
    };

    diesel::update(teams::table.find(&team.id))
        .set((
            teams::title.eq(&valid.title),
            teams::description.eq(&valid.description),
            teams::image.eq(&valid.image),
            teams::url.eq(&valid.url),
            teams::members.eq(members_to_json(&valid.members)),
            teams::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut *conn)?;

    log_action(&user.id, format!("updated team {}", team.id), &mut *conn)?;

    see_other_ok(Redirect::to(&format!("/events/{}?tab=teams", event.id)))
}

pub async fn do_delete_team(
    Path((event_id, team_id)): Path<(String, String)>,
    user: User<true>,
    mut conn: Conn<true>,
    State(live): State<Live>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    let event = Event::fetch(&event_id, &mut *conn)?;

    let n = diesel::update(
        teams::table.filter(
            teams::id
                .eq(&team_id)
                .and(teams::event_id.eq(&event.id))
                .and(teams::is_deleted.eq(false)),
        ),
    )
    .set((
        teams::is_deleted.eq(true),
        teams::updated_at.eq(Utc::now().naive_utc()),
    ))
    .execute(&mut *conn)?;

    if n == 0 {
        return err_not_found();
    }

    log_action(&user.id, format!("deleted team {team_id}"), &mut *conn)?;
    if live
        .timer(&event.id)
        .is_some_and(|timer| timer.team_id == team_id)
    {
        live.clear_timer(&event.id);
    }

    see_other_ok(Redirect::to(&format!("/events/{}?tab=teams", event.id)))
}

#[derive(Deserialize)]
pub struct ReorderForm {
    #[serde(default)]
    pub ids: Vec<String>,
}

pub async fn do_reorder_teams(
    Path(event_id): Path<String>,
    user: User<true>,
    mut conn: Conn<true>,
    axum_extra::extract::Form(form): axum_extra::extract::Form<ReorderForm>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;
    let event = Event::fetch(&event_id, &mut *conn)?;

    reorder(&event.id, &form.ids, &mut *conn)?;
    log_action(&user.id, format!("reordered teams of {}", event.id), &mut *conn)?;

    see_other_ok(Redirect::to(&format!("/events/{}?tab=teams", event.id)))
}

#[cfg(test)]
mod tests {
    use super::TeamForm;

    #[test]
    fn order_is_optional_and_bounded() {
        let mut form = TeamForm {
            title: "Rustaceans".into(),
            ..Default::default()
        };
        assert_eq!(form.validate().unwrap().order, None);

        form.order = Some("3".into());
        assert_eq!(form.validate().unwrap().order, Some(3));

        form.order = Some("0".into());
        assert!(form.validate().is_err());

        form.order = Some("10000".into());
        assert_eq!(form.validate().unwrap().order, Some(10_000));

        form.order = Some("9223372036854775807".into());
        assert!(form.validate().is_err());
    }

    #[test]
    fn links_must_be_http() {
        let form = TeamForm {
            title: "Rustaceans".into(),
            url: "ftp://example.com".into(),
            ..Default::default()
        };
        assert!(form.validate().is_err());
    }
}
