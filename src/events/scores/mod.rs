//! Score sheets.
//!
//! Every reviewer of an event has a single score sheet, stored as a JSON array
//! on their `event_reviewers` row. Each entry is the score one reviewer gave
//! one team for one criteria record.

use serde::{Deserialize, Serialize};

use crate::events::criteria::CriteriaRecord;

pub mod aggregate;
pub mod export;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    pub team_id: String,
    pub criteria_record_id: String,
    pub score: f64,
    #[serde(default)]
    pub comment: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreSheet(pub Vec<ScoreEntry>);

impl ScoreSheet {
    /// Reads a stored sheet. Anything other than an array yields an empty
    /// sheet, and malformed entries are skipped.
    pub fn parse(text: &str) -> ScoreSheet {
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(serde_json::Value::Array(items)) => ScoreSheet(
                items
                    .into_iter()
                    .filter_map(|item| serde_json::from_value(item).ok())
                    .collect(),
            ),
            Ok(_) => ScoreSheet::default(),
            Err(e) => {
                tracing::warn!("unreadable score sheet: {e}");
                ScoreSheet::default()
            }
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }

    /// Removes every entry for `team_id` and appends `entries`.
    pub fn replace_team(&mut self, team_id: &str, entries: Vec<ScoreEntry>) {
        self.0.retain(|entry| entry.team_id != team_id);
        self.0.extend(entries);
    }

    pub fn for_team<'a>(
        &'a self,
        team_id: &'a str,
    ) -> impl Iterator<Item = &'a ScoreEntry> + 'a {
        self.0.iter().filter(move |entry| entry.team_id == team_id)
    }

    pub fn entry<'a>(
        &'a self,
        team_id: &'a str,
        record_id: &str,
    ) -> Option<&'a ScoreEntry> {
        self.for_team(team_id)
            .find(|entry| entry.criteria_record_id == record_id)
    }

    pub fn total_for_team(&self, team_id: &str) -> f64 {
        self.for_team(team_id)
            .filter(|entry| entry.score.is_finite())
            .fold(0.0, |total, entry| total + entry.score)
    }

    pub fn has_scored(&self, team_id: &str) -> bool {
        self.for_team(team_id).next().is_some()
    }
}

/// One submitted criterion, before validation.
pub struct SubmittedScore {
    pub record_id: String,
    pub score: String,
    pub comment: String,
}

/// Checks a submission against the records of the event's criteria template.
///
/// Blank scores are left out, scores outside `[0, max_score]` are clamped and
/// anything that is not a finite number is rejected.
pub fn validate_submission(
    team_id: &str,
    submitted: Vec<SubmittedScore>,
    records: &[CriteriaRecord],
) -> Result<Vec<ScoreEntry>, String> {
    let mut entries = Vec::with_capacity(submitted.len());

    for item in submitted {
        let Some(record) = records.iter().find(|r| r.id == item.record_id)
        else {
            return Err(format!(
                "`{}` is not one of this event's criteria.",
                item.record_id
            ));
        };

        let raw = item.score.trim();
        if raw.is_empty() {
            continue;
        }

        let score: f64 = match raw.parse() {
            Ok(score) if f64::is_finite(score) => score,
            _ => {
                return Err(format!(
                    "The score for \"{}\" must be a number.",
                    record.details
                ));
            }
        };

        entries.push(ScoreEntry {
            team_id: team_id.to_string(),
            criteria_record_id: record.id.clone(),
            // `+ 0.0` turns a submitted `-0` into `0`.
            score: score.clamp(0.0, record.max_score as f64) + 0.0,
            comment: item.comment.trim().to_string(),
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;

    fn entry(team: &str, record: &str, score: f64) -> ScoreEntry {
        ScoreEntry {
            team_id: team.to_string(),
            criteria_record_id: record.to_string(),
            score,
            comment: String::new(),
        }
    }

    fn record(id: &str, max_score: i64) -> CriteriaRecord {
        CriteriaRecord {
            id: id.to_string(),
            template_id: "tpl".to_string(),
            details: format!("criterion {id}"),
            max_score,
            created_at: NaiveDateTime::default(),
            updated_at: NaiveDateTime::default(),
        }
    }

    #[test]
    fn non_array_sheets_are_empty() {
        assert_eq!(ScoreSheet::parse("{}"), ScoreSheet::default());
        assert_eq!(ScoreSheet::parse("null"), ScoreSheet::default());
        assert_eq!(ScoreSheet::parse("not json"), ScoreSheet::default());
    }

    #[test]
    fn stored_entries_use_camel_case_keys() {
        let sheet = ScoreSheet::parse(
            r#"[{"teamId":"a","criteriaRecordId":"r1","score":7.5,"comment":"ok"},
                {"unexpected":true}]"#,
        );
        assert_eq!(sheet.0.len(), 1);
        assert_eq!(sheet.total_for_team("a"), 7.5);
        assert!(sheet.to_json().contains("\"criteriaRecordId\":\"r1\""));
    }

    #[test]
    fn replacing_a_team_keeps_other_teams() {
        let mut sheet = ScoreSheet(vec![
            entry("a", "r1", 3.0),
            entry("b", "r1", 4.0),
            entry("a", "r2", 5.0),
        ]);
        sheet.replace_team("a", vec![entry("a", "r1", 9.0)]);

        assert_eq!(sheet.total_for_team("a"), 9.0);
        assert_eq!(sheet.total_for_team("b"), 4.0);
        assert!(sheet.has_scored("b"));
        assert!(!sheet.has_scored("c"));
    }

    #[test]
    fn submissions_are_clamped_and_blank_scores_skipped() {
        let records = [record("r1", 10), record("r2", 5)];
        let entries = validate_submission(
            "a",
            vec![
                SubmittedScore {
                    record_id: "r1".into(),
                    score: "12".into(),
                    comment: " great ".into(),
                },
                SubmittedScore {
                    record_id: "r2".into(),
                    score: "".into(),
                    comment: "".into(),
                },
            ],
            &records,
        )
        .unwrap();

        assert_eq!(entries, vec![ScoreEntry {
            team_id: "a".into(),
            criteria_record_id: "r1".into(),
            score: 10.0,
            comment: "great".into(),
        }]);

        let negative = validate_submission(
            "a",
            vec![SubmittedScore {
                record_id: "r2".into(),
                score: "-3".into(),
                comment: "".into(),
            }],
            &records,
        )
        .unwrap();
        assert_eq!(negative[0].score, 0.0);

        let signed_zero = validate_submission(
            "a",
            vec![SubmittedScore {
                record_id: "r2".into(),
                score: "-0".into(),
                comment: "".into(),
            }],
            &records,
        )
        .unwrap();
        assert!(signed_zero[0].score.is_sign_positive());
    }

    #[test]
    fn submissions_reject_unknown_records_and_non_numbers() {
        let records = [record("r1", 10)];
        assert!(
            validate_submission(
                "a",
                vec![SubmittedScore {
                    record_id: "other".into(),
                    score: "1".into(),
                    comment: "".into(),
                }],
                &records,
            )
            .is_err()
        );
        for bad in ["NaN", "inf", "ten"] {
            assert!(
                validate_submission(
                    "a",
                    vec![SubmittedScore {
                        record_id: "r1".into(),
                        score: bad.into(),
                        comment: "".into(),
                    }],
                    &records,
                )
                .is_err()
            );
        }
    }
}
