use chrono::{NaiveDateTime, Utc};
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use uuid::Uuid;

use crate::{
    auth::User,
    events::{PresentationStatus, scores::ScoreSheet},
    permission::Role,
    schema::{event_reviewers, user_roles, users},
    util_resp::FailureResponse,
};

pub mod manage;

#[derive(Queryable, Clone, Debug)]
pub struct EventReviewer {
    pub id: String,
    pub event_id: String,
    pub reviewer_id: String,
    pub is_leader: bool,
    pub scores: String,
    pub presentation_status: String,
    pub is_deleted: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A reviewer row together with the user it belongs to.
#[derive(Clone, Debug)]
pub struct Reviewer {
    pub row: EventReviewer,
    pub user: User<true>,
}

impl Reviewer {
    pub fn name(&self) -> String {
        self.user.name()
    }

    pub fn sheet(&self) -> ScoreSheet {
        self.row.sheet()
    }
}

impl EventReviewer {
    pub fn sheet(&self) -> ScoreSheet {
        ScoreSheet::parse(&self.scores)
    }

    pub fn status(&self) -> PresentationStatus {
        self.presentation_status.parse().unwrap_or_default()
    }

    /// Active reviewers of the event, in the order they were added.
    pub fn for_event(
        event_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Vec<Reviewer>, diesel::result::Error> {
        Ok(event_reviewers::table
            .inner_join(users::table)
            .filter(
                event_reviewers::event_id
                    .eq(event_id)
                    .and(event_reviewers::is_deleted.eq(false)),
            )
            .order_by(event_reviewers::created_at.asc())
            .load::<(EventReviewer, User<true>)>(conn)?
            .into_iter()
            .map(|(row, user)| Reviewer { row, user })
            .collect())
    }

    /// The active reviewer row of `user_id` for the event, if there is one.
    pub fn active(
        event_id: &str,
        user_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Option<EventReviewer>, diesel::result::Error> {
        event_reviewers::table
            .filter(
                event_reviewers::event_id
                    .eq(event_id)
                    .and(event_reviewers::reviewer_id.eq(user_id))
                    .and(event_reviewers::is_deleted.eq(false)),
            )
            .first::<EventReviewer>(conn)
            .optional()
    }

    /// Like [`EventReviewer::active`], but fails with `403 Forbidden` when
    /// the user is not reviewing the event.
    pub fn require_active(
        event_id: &str,
        user_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<EventReviewer, FailureResponse> {
        EventReviewer::active(event_id, user_id, conn)?
            .ok_or(FailureResponse::Unauthorized(()))
    }

    pub fn fetch(
        event_id: &str,
        id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<EventReviewer, FailureResponse> {
        event_reviewers::table
            .filter(
                event_reviewers::id
                    .eq(id)
                    .and(event_reviewers::event_id.eq(event_id))
                    .and(event_reviewers::is_deleted.eq(false)),
            )
            .first::<EventReviewer>(conn)
            .optional()?
            .ok_or(FailureResponse::NotFound(()))
    }
}

/// Leaders first, then by email.
pub fn sort_for_results(reviewers: &mut [Reviewer]) {
    reviewers.sort_by(|a, b| {
        b.row
            .is_leader
            .cmp(&a.row.is_leader)
            .then_with(|| a.user.email.cmp(&b.user.email))
    });
}

/// Assigns `user_id` to the event.
///
/// A reviewer who was previously removed is restored (keeping their score
/// sheet) with the new leader flag.
pub fn add_reviewer(
    event_id: &str,
    user_id: &str,
    is_leader: bool,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<(), FailureResponse> {
    let user_exists = diesel::select(diesel::dsl::exists(
        users::table.filter(users::id.eq(user_id)),
    ))
    .get_result::<bool>(conn)?;
    if !user_exists {
        return Err(FailureResponse::NotFound(()));
    }

    if Role::of_user(user_id, conn)? != Role::Reviewer {
        return Err(FailureResponse::bad_request_msg(
            "Only users with the reviewer role can be assigned to an event.",
        ));
    }

    let existing = event_reviewers::table
        .filter(
            event_reviewers::event_id
                .eq(event_id)
                .and(event_reviewers::reviewer_id.eq(user_id)),
        )
        .first::<EventReviewer>(conn)
        .optional()?;

    let now = Utc::now().naive_utc();
    match existing {
        Some(row) if !row.is_deleted => Err(FailureResponse::bad_request_msg(
            "That user is already a reviewer of this event.",
        )),
        Some(row) => {
            diesel::update(event_reviewers::table.find(&row.id))
                .set((
                    event_reviewers::is_deleted.eq(false),
                    event_reviewers::is_leader.eq(is_leader),
                    event_reviewers::updated_at.eq(now),
                ))
                .execute(conn)?;
            Ok(())
        }
        None => {
            diesel::insert_into(event_reviewers::table)
                .values((
                    event_reviewers::id.eq(Uuid::now_v7().to_string()),
                    event_reviewers::event_id.eq(event_id),
                    event_reviewers::reviewer_id.eq(user_id),
                    event_reviewers::is_leader.eq(is_leader),
                    event_reviewers::scores.eq("[]"),
                    event_reviewers::presentation_status
                        .eq(PresentationStatus::Pending.as_str()),
                    event_reviewers::is_deleted.eq(false),
                    event_reviewers::created_at.eq(now),
                    event_reviewers::updated_at.eq(now),
                ))
                .execute(conn)?;
            Ok(())
        }
    }
}

/// Users with the reviewer role who are not active reviewers of the event.
pub fn available_reviewers(
    event_id: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Vec<User<true>>, diesel::result::Error> {
    let active = event_reviewers::table
        .filter(
            event_reviewers::event_id
                .eq(event_id)
                .and(event_reviewers::is_deleted.eq(false)),
        )
        .select(event_reviewers::reviewer_id);

    users::table
        .inner_join(user_roles::table)
        .filter(user_roles::role.eq(Role::Reviewer.as_str()))
        .filter(users::id.ne_all(active))
        .order_by(users::email.asc())
        .select(users::all_columns)
        .load::<User<true>>(conn)
}
