use chrono::NaiveDateTime;
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};

use crate::{schema::events, util_resp::FailureResponse};

pub mod create;
pub mod criteria;
pub mod live;
pub mod manage;
pub mod presentations;
pub mod public;
pub mod reviewers;
pub mod reviews;
pub mod scores;
pub mod teams;
pub mod timer;

#[derive(Queryable, Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Minutes each team is given to present.
    pub duration: i64,
    pub time_start: NaiveDateTime,
    pub time_end: NaiveDateTime,
    pub presentation_status: String,
    pub can_edit_score: bool,
    pub is_deleted: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Event {
    /// Retrieves a non-deleted event.
    pub fn fetch(
        id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Event, FailureResponse> {
        events::table
            .filter(events::id.eq(id).and(events::is_deleted.eq(false)))
            .first::<Event>(conn)
            .optional()?
            .ok_or(FailureResponse::NotFound(()))
    }

    /// All non-deleted events, newest first.
    pub fn list(
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Vec<Event>, diesel::result::Error> {
        events::table
            .filter(events::is_deleted.eq(false))
            .order_by(events::created_at.desc())
            .load::<Event>(conn)
    }

    pub fn status(&self) -> PresentationStatus {
        self.presentation_status.parse().unwrap_or_else(|e| {
            tracing::warn!("event {} has {e}", self.id);
            PresentationStatus::Pending
        })
    }
}

/// State of an event's live session, or of a single team's turn.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum PresentationStatus {
    #[default]
    Pending,
    InProgress,
    Done,
}

impl PresentationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresentationStatus::Pending => "pending",
            PresentationStatus::InProgress => "in_progress",
            PresentationStatus::Done => "done",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PresentationStatus::Pending => "Pending",
            PresentationStatus::InProgress => "In progress",
            PresentationStatus::Done => "Done",
        }
    }

    pub fn badge_class(&self) -> &'static str {
        match self {
            PresentationStatus::Pending => "badge text-bg-secondary",
            PresentationStatus::InProgress => "badge text-bg-primary",
            PresentationStatus::Done => "badge text-bg-success",
        }
    }

    /// Position when listing teams: whoever is presenting comes first and
    /// teams which are finished come last.
    pub fn priority(&self) -> u8 {
        match self {
            PresentationStatus::InProgress => 0,
            PresentationStatus::Pending => 1,
            PresentationStatus::Done => 2,
        }
    }

    pub const ALL: [PresentationStatus; 3] = [
        PresentationStatus::Pending,
        PresentationStatus::InProgress,
        PresentationStatus::Done,
    ];
}

impl std::str::FromStr for PresentationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PresentationStatus::Pending),
            "in_progress" => Ok(PresentationStatus::InProgress),
            "done" => Ok(PresentationStatus::Done),
            other => Err(format!("unknown presentation status `{other}`")),
        }
    }
}

/// Parses the value of an `<input type="datetime-local">`.
pub fn parse_datetime_local(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

pub fn format_datetime_local(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datetime_local_accepts_optional_seconds() {
        let a = parse_datetime_local("2026-05-01T09:30").unwrap();
        let b = parse_datetime_local("2026-05-01T09:30:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(format_datetime_local(&a), "2026-05-01T09:30");
        assert!(parse_datetime_local("yesterday").is_none());
    }

    #[test]
    fn statuses_round_trip_through_their_column_value() {
        for status in PresentationStatus::ALL {
            assert_eq!(status.as_str().parse::<PresentationStatus>(), Ok(status));
        }
        assert!("paused".parse::<PresentationStatus>().is_err());
    }
}
