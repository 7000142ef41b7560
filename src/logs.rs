//! Audit trail of administrative actions.

use chrono::Utc;
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use uuid::Uuid;

use crate::schema::action_logs;

pub fn log_action(
    user_id: &str,
    action: impl AsRef<str>,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<(), diesel::result::Error> {
    let action = action.as_ref();
    tracing::info!(user_id, action, "action");

    diesel::insert_into(action_logs::table)
        .values((
            action_logs::id.eq(Uuid::now_v7().to_string()),
            action_logs::user_id.eq(user_id),
            action_logs::action.eq(action),
            action_logs::created_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)?;

    Ok(())
}
