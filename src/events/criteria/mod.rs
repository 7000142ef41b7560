use chrono::NaiveDateTime;
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::Serialize;

use crate::schema::{criteria_records, criteria_templates};

pub mod manage;

#[derive(Queryable, Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriteriaTemplate {
    pub id: String,
    pub event_id: String,
    pub title: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Queryable, Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriteriaRecord {
    pub id: String,
    pub template_id: String,
    pub details: String,
    pub max_score: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// The template of an event together with its records (in the order they
/// were created).
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Criteria {
    pub template: CriteriaTemplate,
    pub records: Vec<CriteriaRecord>,
}

impl Criteria {
    pub fn for_event(
        event_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Option<Criteria>, diesel::result::Error> {
        let template = criteria_templates::table
            .filter(criteria_templates::event_id.eq(event_id))
            .order_by(criteria_templates::created_at.asc())
            .first::<CriteriaTemplate>(conn)
            .optional()?;

        let Some(template) = template else {
            return Ok(None);
        };

        let records = criteria_records::table
            .filter(criteria_records::template_id.eq(&template.id))
            .order_by((criteria_records::created_at.asc(), criteria_records::id.asc()))
            .load::<CriteriaRecord>(conn)?;

        Ok(Some(Criteria { template, records }))
    }

    /// Records of the event's template, or none when it has no template.
    pub fn records_for_event(
        event_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Vec<CriteriaRecord>, diesel::result::Error> {
        Ok(Criteria::for_event(event_id, conn)?
            .map(|criteria| criteria.records)
            .unwrap_or_default())
    }
}

pub fn max_possible_score(records: &[CriteriaRecord]) -> i64 {
    records
        .iter()
        .fold(0i64, |total, record| total.saturating_add(record.max_score))
}
