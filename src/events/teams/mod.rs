use chrono::{NaiveDateTime, Utc};
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::Serialize;

use crate::{
    events::PresentationStatus, schema::teams, util_resp::FailureResponse,
};

pub mod manage;

/// A team's turn uses the same three states as the event session.
pub type TeamStatus = PresentationStatus;

#[derive(Queryable, Clone, Debug)]
pub struct Team {
    pub id: String,
    pub event_id: String,
    pub title: String,
    pub description: String,
    pub image: String,
    pub url: String,
    pub members: String,
    /// Position of the team in the running order (starting from one).
    pub seq: i64,
    pub status: String,
    pub is_deleted: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Team {
    /// Retrieves an active team which belongs to `event_id`.
    pub fn fetch(
        event_id: &str,
        team_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Team, FailureResponse> {
        teams::table
            .filter(
                teams::id
                    .eq(team_id)
                    .and(teams::event_id.eq(event_id))
                    .and(teams::is_deleted.eq(false)),
            )
            .first::<Team>(conn)
            .optional()?
            .ok_or(FailureResponse::NotFound(()))
    }

    /// Active teams of the event in running order.
    pub fn for_event(
        event_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Vec<Team>, diesel::result::Error> {
        teams::table
            .filter(teams::event_id.eq(event_id).and(teams::is_deleted.eq(false)))
            .order_by((teams::seq.asc(), teams::created_at.asc()))
            .load::<Team>(conn)
    }

    pub fn status(&self) -> TeamStatus {
        self.status.parse().unwrap_or_else(|e| {
            tracing::warn!("team {} has {e}", self.id);
            TeamStatus::Pending
        })
    }

    pub fn members(&self) -> Vec<String> {
        parse_members(&self.members)
    }

    pub fn summary(&self) -> TeamSummary {
        TeamSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            image: self.image.clone(),
            url: self.url.clone(),
            members: self.members(),
            order: self.seq,
            status: self.status(),
        }
    }
}

/// The public representation of a team.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image: String,
    pub url: String,
    pub members: Vec<String>,
    pub order: i64,
    pub status: TeamStatus,
}

pub fn parse_members(text: &str) -> Vec<String> {
    serde_json::from_str::<Vec<String>>(text).unwrap_or_default()
}

/// Members are entered one per line.
pub fn members_from_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn members_to_json(members: &[String]) -> String {
    serde_json::to_string(members).unwrap_or_else(|_| "[]".to_string())
}

/// Orders teams for the presentation views: the team currently presenting,
/// then those still waiting, then those who are finished. Ties keep the
/// running order.
pub fn sort_by_status(teams: &mut [Team]) {
    teams.sort_by_key(|team| (team.status().priority(), team.seq));
}

pub fn current_team(teams: &[Team]) -> Option<&Team> {
    teams
        .iter()
        .find(|team| team.status() == TeamStatus::InProgress)
}

/// Largest position a team can be given in the running order.
pub const MAX_TEAM_ORDER: i64 = 10_000;

/// One past the last position in use, if that is still a valid position.
pub fn seq_after(max: Option<i64>) -> Option<i64> {
    max.unwrap_or(0)
        .checked_add(1)
        .filter(|seq| (1..=MAX_TEAM_ORDER).contains(seq))
}

pub fn next_seq(
    event_id: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<i64, FailureResponse> {
    let max = teams::table
        .filter(teams::event_id.eq(event_id).and(teams::is_deleted.eq(false)))
        .select(diesel::dsl::max(teams::seq))
        .first::<Option<i64>>(conn)?;
    seq_after(max).ok_or_else(|| {
        FailureResponse::bad_request_msg(format!(
            "The running order is full. Give the team a position between 1 \
             and {MAX_TEAM_ORDER}."
        ))
    })
}

#[derive(Debug, PartialEq, Eq)]
pub enum ReorderError {
    Duplicate(String),
    NotInEvent(String),
    Incomplete,
}

impl std::fmt::Display for ReorderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReorderError::Duplicate(id) => {
                write!(f, "team {id} appears more than once")
            }
            ReorderError::NotInEvent(id) => {
                write!(f, "team {id} is not an active team of this event")
            }
            ReorderError::Incomplete => {
                write!(f, "every team of the event must be listed")
            }
        }
    }
}

/// Checks that `ordered` is a permutation of `existing`.
pub fn check_reorder(
    existing: &[Team],
    ordered: &[String],
) -> Result<(), ReorderError> {
    let mut seen = std::collections::HashSet::new();
    for id in ordered {
        if !seen.insert(id.as_str()) {
            return Err(ReorderError::Duplicate(id.clone()));
        }
        if !existing.iter().any(|team| &team.id == id) {
            return Err(ReorderError::NotInEvent(id.clone()));
        }
    }
    if seen.len() != existing.len() {
        return Err(ReorderError::Incomplete);
    }
    Ok(())
}

/// Gives the listed teams the orders `1..=n`. Must be called inside the
/// request transaction so that a failure leaves the old order intact.
pub fn reorder(
    event_id: &str,
    ordered: &[String],
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<(), FailureResponse> {
    let existing = Team::for_event(event_id, conn)?;
    if let Err(e) = check_reorder(&existing, ordered) {
        return Err(FailureResponse::bad_request_msg(format!(
            "Could not reorder teams: {e}."
        )));
    }

    let now = Utc::now().naive_utc();
    for (i, id) in ordered.iter().enumerate() {
        diesel::update(
            teams::table.filter(teams::id.eq(id).and(teams::event_id.eq(event_id))),
        )
        .set((teams::seq.eq(i as i64 + 1), teams::updated_at.eq(now)))
        .execute(conn)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(id: &str, seq: i64, status: TeamStatus) -> Team {
        Team {
            id: id.to_string(),
            event_id: "e".to_string(),
            title: format!("Team {id}"),
            description: String::new(),
            image: String::new(),
            url: String::new(),
            members: "[]".to_string(),
            seq,
            status: status.as_str().to_string(),
            is_deleted: false,
            created_at: NaiveDateTime::default(),
            updated_at: NaiveDateTime::default(),
        }
    }

    #[test]
    fn presenting_team_first_then_waiting_then_finished() {
        let mut teams = vec![
            team("done", 1, TeamStatus::Done),
            team("waiting2", 4, TeamStatus::Pending),
            team("waiting1", 2, TeamStatus::Pending),
            team("live", 3, TeamStatus::InProgress),
        ];
        sort_by_status(&mut teams);

        let ids: Vec<_> = teams.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["live", "waiting1", "waiting2", "done"]);
        assert_eq!(current_team(&teams).map(|t| t.id.as_str()), Some("live"));
    }

    #[test]
    fn next_position_stays_in_range() {
        assert_eq!(seq_after(None), Some(1));
        assert_eq!(seq_after(Some(4)), Some(5));
        assert_eq!(seq_after(Some(MAX_TEAM_ORDER)), None);
        assert_eq!(seq_after(Some(i64::MAX)), None);
    }

    #[test]
    fn members_are_one_per_line() {
        let members = members_from_lines("Ada\n\n  Grace  \r\nAlan");
        assert_eq!(members, ["Ada", "Grace", "Alan"]);
        assert_eq!(parse_members(&members_to_json(&members)), members);
        assert!(parse_members("{\"not\": \"a list\"}").is_empty());
    }

    #[test]
    fn reorder_must_be_a_permutation() {
        let teams = [
            team("a", 1, TeamStatus::Pending),
            team("b", 2, TeamStatus::Pending),
        ];
        let ids = |ids: &[&str]| -> Vec<String> {
            ids.iter().map(|id| id.to_string()).collect()
        };

        assert_eq!(check_reorder(&teams, &ids(&["b", "a"])), Ok(()));
        assert_eq!(
            check_reorder(&teams, &ids(&["b", "b"])),
            Err(ReorderError::Duplicate("b".into()))
        );
        assert_eq!(
            check_reorder(&teams, &ids(&["a", "z"])),
            Err(ReorderError::NotInEvent("z".into()))
        );
        assert_eq!(
            check_reorder(&teams, &ids(&["a"])),
            Err(ReorderError::Incomplete)
        );
    }
}
