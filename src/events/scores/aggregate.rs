//! Turns the score sheets of an event's reviewers into a ranking.

use diesel::{connection::LoadConnection, sqlite::Sqlite};
use rust_decimal::{Decimal, RoundingStrategy, prelude::FromPrimitive};
use serde::Serialize;

use crate::events::{
    Event,
    criteria::{Criteria, max_possible_score},
    reviewers::{EventReviewer, Reviewer, sort_for_results},
    scores::ScoreSheet,
    teams::Team,
};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerColumn {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub is_leader: bool,
    #[serde(skip)]
    pub sheet: ScoreSheet,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRow {
    pub rank: usize,
    pub team_id: String,
    pub title: String,
    pub order: i64,
    /// One total per reviewer, in the same order as [`Results::reviewers`].
    pub totals: Vec<f64>,
    pub average: f64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Results {
    pub max_possible_score: i64,
    pub reviewers: Vec<ReviewerColumn>,
    pub rows: Vec<ResultRow>,
}

pub fn team_total(sheet: &ScoreSheet, team_id: &str) -> f64 {
    sheet.total_for_team(team_id)
}

/// Mean of the reviewers' totals for the team. Reviewers who have not given
/// the team any points are left out, so that a missing score sheet does not
/// pull the average down.
pub fn team_average<'a>(
    sheets: impl IntoIterator<Item = &'a ScoreSheet>,
    team_id: &str,
) -> f64 {
    let totals: Vec<f64> = sheets
        .into_iter()
        .map(|sheet| team_total(sheet, team_id))
        .filter(|total| *total > 0.0)
        .collect();

    if totals.is_empty() {
        0.0
    } else {
        totals.iter().sum::<f64>() / totals.len() as f64
    }
}

/// Competition ranking ("1224"): teams with equal averages share the rank of
/// the first of them, and the next distinct average is ranked by its
/// position. `rows` are sorted into display order (average descending, then
/// running order).
pub fn rank(rows: &mut [ResultRow]) {
    rows.sort_by(|a, b| {
        b.average
            .total_cmp(&a.average)
            .then_with(|| a.order.cmp(&b.order))
    });

    let mut last: Option<(f64, usize)> = None;
    for (i, row) in rows.iter_mut().enumerate() {
        let rank = match last {
            Some((average, rank)) if average == row.average => rank,
            _ => i + 1,
        };
        row.rank = rank;
        last = Some((row.average, rank));
    }
}

impl Results {
    pub fn compute(
        teams: &[Team],
        mut reviewers: Vec<Reviewer>,
        max_possible_score: i64,
    ) -> Results {
        sort_for_results(&mut reviewers);
        let reviewers: Vec<ReviewerColumn> = reviewers
            .into_iter()
            .map(|reviewer| ReviewerColumn {
                user_id: reviewer.user.id.clone(),
                name: reviewer.name(),
                email: reviewer.user.email.clone(),
                is_leader: reviewer.row.is_leader,
                sheet: reviewer.sheet(),
            })
            .collect();

        let mut rows: Vec<ResultRow> = teams
            .iter()
            .map(|team| ResultRow {
                rank: 0,
                team_id: team.id.clone(),
                title: team.title.clone(),
                order: team.seq,
                totals: reviewers
                    .iter()
                    .map(|reviewer| team_total(&reviewer.sheet, &team.id))
                    .collect(),
                average: team_average(
                    reviewers.iter().map(|reviewer| &reviewer.sheet),
                    &team.id,
                ),
            })
            .collect();
        rank(&mut rows);

        Results {
            max_possible_score,
            reviewers,
            rows,
        }
    }

    pub fn load(
        event: &Event,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Results, diesel::result::Error> {
        let teams = Team::for_event(&event.id, conn)?;
        let reviewers = EventReviewer::for_event(&event.id, conn)?;
        let records = Criteria::records_for_event(&event.id, conn)?;

        Ok(Results::compute(
            &teams,
            reviewers,
            max_possible_score(&records),
        ))
    }
}

/// Formats `value` with `dp` decimal places, rounding halves away from zero.
/// Negative zero is printed without its sign.
pub fn format_score(value: f64, dp: u32) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    match Decimal::from_f64(value) {
        Some(d) => {
            let rounded =
                d.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
            format!("{rounded:.prec$}", prec = dp as usize)
        }
        None => format!("{value:.prec$}", prec = dp as usize),
    }
}
