//! Roles and the checks built on top of them.
//!
//! Roles are compared exactly: an administrator is not implicitly a reviewer.

use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};

use crate::{
    auth::User,
    events::Event,
    schema::{event_reviewers, user_roles},
    util_resp::FailureResponse,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Anonymous,
    User,
    Reviewer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Anonymous => "anonymous",
            Role::User => "user",
            Role::Reviewer => "reviewer",
            Role::Admin => "admin",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Anonymous => "Anonymous",
            Role::User => "User",
            Role::Reviewer => "Reviewer",
            Role::Admin => "Administrator",
        }
    }

    /// Roles which can be stored against a user.
    pub const ASSIGNABLE: [Role; 3] = [Role::User, Role::Reviewer, Role::Admin];

    pub fn of_user(
        user_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Role, diesel::result::Error> {
        let role = user_roles::table
            .filter(user_roles::user_id.eq(user_id))
            .select(user_roles::role)
            .first::<String>(conn)
            .optional()?;

        Ok(match role {
            Some(role) => role.parse().unwrap_or_else(|e| {
                tracing::warn!("user {user_id} has {e}");
                Role::User
            }),
            None => Role::User,
        })
    }

    pub fn of(
        user: Option<&User<true>>,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Role, diesel::result::Error> {
        match user {
            Some(user) => Role::of_user(&user.id, conn),
            None => Ok(Role::Anonymous),
        }
    }

    /// Stores `role` for the user. Callers must not pass
    /// [`Role::Anonymous`], which the database rejects.
    pub fn set(
        user_id: &str,
        role: Role,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<(), diesel::result::Error> {
        diesel::insert_into(user_roles::table)
            .values((
                user_roles::user_id.eq(user_id),
                user_roles::role.eq(role.as_str()),
            ))
            .on_conflict(user_roles::user_id)
            .do_update()
            .set(user_roles::role.eq(role.as_str()))
            .execute(conn)?;

        Ok(())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anonymous" => Ok(Role::Anonymous),
            "user" => Ok(Role::User),
            "reviewer" => Ok(Role::Reviewer),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role `{other}`")),
        }
    }
}

/// Fails with `403 Forbidden` unless `user` has exactly `role`.
pub fn require_role<const TX: bool>(
    user: &User<TX>,
    role: Role,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<(), FailureResponse> {
    let actual = Role::of_user(&user.id, conn)?;
    tracing::trace!(
        "user {} has role {}, needs {}",
        user.id,
        actual.as_str(),
        role.as_str()
    );
    if actual == role {
        Ok(())
    } else {
        Err(FailureResponse::Unauthorized(()))
    }
}

pub fn is_active_leader(
    user_id: &str,
    event_id: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<bool, diesel::result::Error> {
    diesel::select(diesel::dsl::exists(
        event_reviewers::table.filter(
            event_reviewers::event_id
                .eq(event_id)
                .and(event_reviewers::reviewer_id.eq(user_id))
                .and(event_reviewers::is_leader.eq(true))
                .and(event_reviewers::is_deleted.eq(false)),
        ),
    ))
    .get_result(conn)
}

/// Administrators and the leaders of `event` may see aggregated results.
pub fn require_admin_or_leader<const TX: bool>(
    user: &User<TX>,
    event: &Event,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<(), FailureResponse> {
    if Role::of_user(&user.id, conn)? == Role::Admin
        || is_active_leader(&user.id, &event.id, conn)?
    {
        Ok(())
    } else {
        Err(FailureResponse::Unauthorized(()))
    }
}

#[cfg(test)]
mod tests {
    use super::Role;

    #[test]
    fn roles_parse_from_their_names() {
        for role in Role::ASSIGNABLE {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert!("superuser".parse::<Role>().is_err());
    }
}
