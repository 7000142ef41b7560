use axum::{extract::Form, response::Redirect};
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use hypertext::prelude::*;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::User,
    events::{Event, PresentationStatus, format_datetime_local, parse_datetime_local},
    logs::log_action,
    permission::{Role, require_role},
    schema::events,
    state::Conn,
    template::Page,
    util_resp::{StandardResponse, bad_request_msg, see_other_ok, success},
    validation::required_text,
};

const MAX_TITLE_LEN: usize = 128;
/// One day.
pub const MAX_DURATION_MINUTES: i64 = 24 * 60;

#[derive(Deserialize, Debug, Default)]
pub struct EventForm {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub duration: String,
    pub time_start: String,
    pub time_end: String,
}

#[derive(Debug, PartialEq)]
pub struct ValidEvent {
    pub title: String,
    pub description: String,
    pub duration: i64,
    pub time_start: NaiveDateTime,
    pub time_end: NaiveDateTime,
}

impl EventForm {
    pub fn validate(&self) -> Result<ValidEvent, String> {
        let title = required_text("Title", &self.title, MAX_TITLE_LEN)?;

        let duration = match self.duration.trim().parse::<i64>() {
            Ok(d) if (1..=MAX_DURATION_MINUTES).contains(&d) => d,
            _ => {
                return Err(format!(
                    "Duration must be a whole number of minutes between 1 \
                     and {MAX_DURATION_MINUTES}."
                ));
            }
        };

        let time_start = parse_datetime_local(&self.time_start)
            .ok_or_else(|| "The start time is not a valid date.".to_string())?;
        let time_end = parse_datetime_local(&self.time_end)
            .ok_or_else(|| "The end time is not a valid date.".to_string())?;
        if time_end < time_start {
            return Err("The event cannot end before it starts.".to_string());
        }

        Ok(ValidEvent {
            title,
            description: self.description.trim().to_string(),
            duration,
            time_start,
            time_end,
        })
    }
}

/// The fields shared by the create and edit forms.
pub struct EventFields<'r> {
    pub event: Option<&'r Event>,
}

impl Renderable for EventFields<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let title = self.event.map(|e| e.title.as_str()).unwrap_or_default();
        let description =
            self.event.map(|e| e.description.as_str()).unwrap_or_default();
        let duration = self
            .event
            .map(|e| e.duration.to_string())
            .unwrap_or_else(|| "10".to_string());
        let start = self
            .event
            .map(|e| format_datetime_local(&e.time_start))
            .unwrap_or_default();
        let end = self
            .event
            .map(|e| format_datetime_local(&e.time_end))
            .unwrap_or_default();

        maud! {
            div class="mb-3" {
                label for="title" class="form-label" { "Title" }
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
                label for="duration" class="form-label" { "Presentation length (minutes)" }
                input type="number" class="form-control" id="duration" name="duration"
                    min="1" max=(MAX_DURATION_MINUTES) required value=(duration);
            }
            div class="row" {
                div class="col-md mb-3" {
                    label for="time_start" class="form-label" { "Starts" }
                    input type="datetime-local" class="form-control" id="time_start"
                        name="time_start" required value=(start);
                }
                div class="col-md mb-3" {
                    label for="time_end" class="form-label" { "Ends" }
                    input type="datetime-local" class="form-control" id="time_end"
                        name="time_end" required value=(end);
                }
            }
        }
        .render_to(buffer);
    }
}

pub async fn create_event_page(
    user: User<true>,
    mut conn: Conn<true>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;

    success(
        Page::new()
            .user(user)
            .role(Role::Admin)
            .title("New event")
            .body(maud! {
                h1 { "Create event" }
                form method="post" class="mt-4" {
                    EventFields event=(None);
                    button type="submit" class="btn btn-primary" { "Create" }
                }
            })
            .render(),
    )
}

pub async fn do_create_event(
    user: User<true>,
    mut conn: Conn<true>,
    Form(form): Form<EventForm>,
) -> StandardResponse {
    require_role(&user, Role::Admin, &mut *conn)?;

    let valid = match form.validate() {
        Ok(valid) => valid,
        Err(msg) => return bad_request_msg(msg),
    };

    let id = Uuid::now_v7().to_string();
    let now = Utc::now().naive_utc();
    diesel::insert_into(events::table)
        .values((
            events::id.eq(&id),
            events::title.eq(&valid.title),
            events::description.eq(&valid.description),
            events::duration.eq(valid.duration),
            events::time_start.eq(valid.time_start),
            events::time_end.eq(valid.time_end),
            events::presentation_status.eq(PresentationStatus::Pending.as_str()),
            events::can_edit_score.eq(true),
            events::is_deleted.eq(false),
            events::created_at.eq(now),
            events::updated_at.eq(now),
        ))
        .execute(&mut *conn)?;

    log_action(&user.id, format!("created event {id}"), &mut *conn)?;

    see_other_ok(Redirect::to(&format!("/events/{id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(duration: &str, start: &str, end: &str) -> EventForm {
        EventForm {
            title: " Demo day ".to_string(),
            description: String::new(),
            duration: duration.to_string(),
            time_start: start.to_string(),
            time_end: end.to_string(),
        }
    }

    #[test]
    fn valid_event_is_trimmed() {
        let valid = form("7", "2026-05-01T09:00", "2026-05-01T17:00")
            .validate()
            .unwrap();
        assert_eq!(valid.title, "Demo day");
        assert_eq!(valid.duration, 7);
    }

    #[test]
    fn duration_must_be_between_a_minute_and_a_day() {
        let day = "2026-05-01T09:00";
        let end = "2026-05-01T17:00";
        assert!(form("0", day, end).validate().is_err());
        assert!(form("five", day, end).validate().is_err());
        assert!(form("1440", day, end).validate().is_ok());
        assert!(form("1441", day, end).validate().is_err());
        assert!(form("9223372036854775807", day, end).validate().is_err());
    }

    #[test]
    fn end_may_not_precede_start() {
        assert!(form("5", "2026-05-02T09:00", "2026-05-01T17:00").validate().is_err());
        assert!(form("5", "2026-05-01T09:00", "2026-05-01T09:00").validate().is_ok());
    }
}
