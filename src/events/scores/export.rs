use axum::{
    extract::Path,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::{NaiveDateTime, Utc};

use crate::{
    auth::User,
    events::{
        Event,
        scores::aggregate::{Results, format_score},
    },
    permission::require_admin_or_leader,
    state::Conn,
    util_resp::FailureResponse,
};

pub fn export_csv(results: &Results) -> Result<String, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(vec![]);

    let mut header = vec!["Rank".to_string(), "Team".to_string()];
    header.extend(results.reviewers.iter().map(|r| r.name.clone()));
    header.push("Average score".to_string());
    writer.write_record(&header)?;

    for row in &results.rows {
        let mut record = vec![
            if row.rank > 0 {
                format!("#{}", row.rank)
            } else {
                String::new()
            },
            row.title.clone(),
        ];
        record.extend(row.totals.iter().map(|total| format_score(*total, 1)));
        record.push(format_score(row.average, 2));
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn export_file_name(event_id: &str, at: NaiveDateTime) -> String {
    format!("event-results-{event_id}-{}.csv", at.format("%Y%m%d%H%M%S"))
}

pub async fn export_results_csv(
    Path(event_id): Path<String>,
    user: User<true>,
    mut conn: Conn<true>,
) -> Result<Response, FailureResponse> {
    let event = Event::fetch(&event_id, &mut *conn)?;
    require_admin_or_leader(&user, &event, &mut *conn)?;

    let results = Results::load(&event, &mut *conn)?;
    let body = export_csv(&results).map_err(|e| {
        tracing::error!("could not write results of {event_id}: {e}");
        FailureResponse::ServerError(())
    })?;

    let file_name = export_file_name(&event.id, Utc::now().naive_utc());
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::scores::{
        ScoreSheet,
        aggregate::{ResultRow, ReviewerColumn},
    };

    #[test]
    fn csv_quotes_awkward_values() {
        let results = Results {
            max_possible_score: 20,
            reviewers: vec![
                ReviewerColumn {
                    user_id: "u1".into(),
                    name: "Ada, Countess".into(),
                    email: "ada@x.org".into(),
                    is_leader: true,
                    sheet: ScoreSheet::default(),
                },
                ReviewerColumn {
                    user_id: "u2".into(),
                    name: "grace".into(),
                    email: "grace@x.org".into(),
                    is_leader: false,
                    sheet: ScoreSheet::default(),
                },
            ],
            rows: vec![ResultRow {
                rank: 1,
                team_id: "t".into(),
                title: "The \"Best\" Team".into(),
                order: 1,
                totals: vec![12.0, 7.5],
                average: 9.75,
            }],
        };

        let csv = export_csv(&results).unwrap();
        assert_eq!(
            csv,
            "Rank,Team,\"Ada, Countess\",grace,Average score\n\
             #1,\"The \"\"Best\"\" Team\",12.0,7.5,9.75\n"
        );
    }

    #[test]
    fn file_name_contains_event_and_time() {
        let at = chrono::NaiveDate::from_ymd_opt(2026, 4, 2)
            .unwrap()
            .and_hms_opt(13, 5, 9)
            .unwrap();
        assert_eq!(
            export_file_name("abc", at),
            "event-results-abc-20260402130509.csv"
        );
    }
}
