//! Seeds a database with a demo event: an administrator, reviewers, teams,
//! a criteria template and random scores.

use chrono::{Duration, Utc};
use clap::Parser;
use diesel::prelude::*;
use diesel_migrations::MigrationHarness;
use rand::Rng;
use tally::MIGRATIONS;
use tally::auth::register::create_user;
use tally::events::PresentationStatus;
use tally::events::criteria::CriteriaRecord;
use tally::events::reviewers::add_reviewer;
use tally::events::scores::{ScoreEntry, ScoreSheet};
use tally::events::teams::members_to_json;
use tally::permission::Role;
use tally::schema::{
    criteria_records, criteria_templates, event_reviewers, events, teams, users,
};
use uuid::Uuid;

const PASSWORD: &str = "password";
const EVENT_TITLE: &str = "Demo Day";

#[derive(Parser)]
pub struct Seed {
    database_url: Option<String>,
    /// Number of teams to create
    #[clap(long, short, default_value_t = 8)]
    teams: usize,
    /// Number of reviewers to create
    #[clap(long, short, default_value_t = 4)]
    reviewers: usize,
    /// Leave the score sheets empty
    #[clap(long, action)]
    no_scores: bool,
}

fn get_or_create_user(
    conn: &mut SqliteConnection,
    username: &str,
    role: Role,
) -> String {
    let existing = users::table
        .filter(users::username.eq(username))
        .select(users::id)
        .first::<String>(conn)
        .optional()
        .unwrap();

    let id = match existing {
        Some(id) => id,
        None => create_user(
            username,
            &format!("{username}@example.com"),
            PASSWORD,
            conn,
        )
        .unwrap(),
    };
    Role::set(&id, role, conn).unwrap();
    id
}

fn main() {
    let args = Seed::parse();
    let db_url = if let Some(url) = args.database_url {
        url
    } else {
        std::env::var("DATABASE_URL").expect(
            "please either set `DATABASE_URL` or pass the database url",
        )
    };

    let mut conn = diesel::SqliteConnection::establish(&db_url).unwrap();
    conn.run_pending_migrations(MIGRATIONS).unwrap();

    if events::table
        .filter(events::title.eq(EVENT_TITLE))
        .count()
        .get_result::<i64>(&mut conn)
        .unwrap()
        > 0
    {
        panic!("{EVENT_TITLE} event already exists!")
    }

    get_or_create_user(&mut conn, "admin", Role::Admin);
    let reviewer_ids: Vec<String> = (1..=args.reviewers)
        .map(|i| get_or_create_user(&mut conn, &format!("judge{i}"), Role::Reviewer))
        .collect();

    let now = Utc::now().naive_utc();
    let event_id = Uuid::now_v7().to_string();
    diesel::insert_into(events::table)
        .values((
            events::id.eq(&event_id),
            events::title.eq(EVENT_TITLE),
            events::description.eq("Teams present what they built this term."),
            events::duration.eq(7),
            events::time_start.eq(now),
            events::time_end.eq(now + Duration::hours(3)),
            events::presentation_status.eq(PresentationStatus::Pending.as_str()),
            events::can_edit_score.eq(true),
            events::is_deleted.eq(false),
            events::created_at.eq(now),
            events::updated_at.eq(now),
        ))
        .execute(&mut conn)
        .unwrap();

    let template_id = Uuid::now_v7().to_string();
    diesel::insert_into(criteria_templates::table)
        .values((
            criteria_templates::id.eq(&template_id),
            criteria_templates::event_id.eq(&event_id),
            criteria_templates::title.eq("Judging criteria"),
            criteria_templates::created_at.eq(now),
            criteria_templates::updated_at.eq(now),
        ))
        .execute(&mut conn)
        .unwrap();

    for (details, max_score) in [
        ("Problem and idea", 10),
        ("Technical execution", 20),
        ("Design", 10),
        ("Presentation", 10),
    ] {
        diesel::insert_into(criteria_records::table)
            .values((
                criteria_records::id.eq(Uuid::now_v7().to_string()),
                criteria_records::template_id.eq(&template_id),
                criteria_records::details.eq(details),
                criteria_records::max_score.eq(max_score as i64),
                criteria_records::created_at.eq(now),
                criteria_records::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .unwrap();
    }
    let records = criteria_records::table
        .filter(criteria_records::template_id.eq(&template_id))
        .load::<CriteriaRecord>(&mut conn)
        .unwrap();

    let mut team_ids = Vec::with_capacity(args.teams);
    for i in 1..=args.teams {
        let team_id = Uuid::now_v7().to_string();
        let members = vec![format!("Member {i}A"), format!("Member {i}B")];
        diesel::insert_into(teams::table)
            .values((
                teams::id.eq(&team_id),
                teams::event_id.eq(&event_id),
                teams::title.eq(format!("Team {i}")),
                teams::description.eq(format!("Project number {i}")),
                teams::image.eq(""),
                teams::url.eq(""),
                teams::members.eq(members_to_json(&members)),
                teams::seq.eq(i as i64),
                teams::status.eq(PresentationStatus::Pending.as_str()),
                teams::is_deleted.eq(false),
                teams::created_at.eq(now),
                teams::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .unwrap();
        team_ids.push(team_id);
    }

    let mut rng = rand::rng();
    for (i, reviewer_id) in reviewer_ids.iter().enumerate() {
        add_reviewer(&event_id, reviewer_id, i == 0, &mut conn).unwrap();
        if args.no_scores {
            continue;
        }

        let mut sheet = ScoreSheet::default();
        for team_id in &team_ids {
            let entries = records
                .iter()
                .map(|record| ScoreEntry {
                    team_id: team_id.clone(),
                    criteria_record_id: record.id.clone(),
                    score: rng.random_range(0..=record.max_score) as f64,
                    comment: String::new(),
                })
                .collect();
            sheet.replace_team(team_id, entries);
        }

        diesel::update(
            event_reviewers::table.filter(
                event_reviewers::event_id
                    .eq(&event_id)
                    .and(event_reviewers::reviewer_id.eq(reviewer_id)),
            ),
        )
        .set(event_reviewers::scores.eq(sheet.to_json()))
        .execute(&mut conn)
        .unwrap();
    }

    println!(
        "created event {event_id} with {} teams and {} reviewers (password `{PASSWORD}`)",
        team_ids.len(),
        reviewer_ids.len()
    );
}
