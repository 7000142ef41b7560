//! Numbers at the edges of what the forms accept, and the in-memory timer
//! state which has to follow the database.

use axum::http::StatusCode;
use diesel::prelude::*;

use super::{
    TestApp, assert_res_ok, body_string, create_event, create_team,
};
use crate::{
    permission::Role,
    schema::{criteria_templates, teams},
};

const I64_MAX: &str = "9223372036854775807";

#[tokio::test]
async fn oversized_numbers_are_rejected() {
    let app = TestApp::new();
    let (_, admin) = app.user_with_role("admin", Role::Admin).await;
    let event_id = create_event(&app, &admin, "Limits").await;

    let event_form = |duration: &'static str| {
        [
            ("title", "Limits"),
            ("duration", duration),
            ("time_start", "2026-05-01T09:00"),
            ("time_end", "2026-05-01T17:00"),
        ]
    };
    let response = app
        .post("/events/create", Some(&admin), &event_form(I64_MAX))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = app
        .post(
            &format!("/events/{event_id}/edit"),
            Some(&admin),
            &event_form(I64_MAX),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = app
        .post(
            &format!("/events/{event_id}/edit"),
            Some(&admin),
            &event_form("1440"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app
        .post(
            &format!("/events/{event_id}/teams/create"),
            Some(&admin),
            &[("title", "Far away"), ("order", I64_MAX)],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post(
            &format!("/events/{event_id}/criteria/create"),
            Some(&admin),
            &[("title", "Rubric")],
        )
        .await;
    assert_res_ok!(response);
    let template_id: String = {
        let mut conn = app.pool.get().unwrap();
        criteria_templates::table
            .filter(criteria_templates::event_id.eq(&event_id))
            .select(criteria_templates::id)
            .first(&mut conn)
            .unwrap()
    };
    let response = app
        .post(
            &format!("/events/{event_id}/criteria/{template_id}/records/create"),
            Some(&admin),
            &[("details", "Everything"), ("max_score", I64_MAX)],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // A day-long slot still counts down from the full length.
    let team = create_team(&app, &admin, &event_id, "Team A").await;
    let response = app
        .post(
            &format!("/presentations/{event_id}/status"),
            Some(&admin),
            &[("status", "in_progress")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let response = app
        .post(
            &format!("/presentations/{event_id}/teams/{team}/start"),
            Some(&admin),
            &[],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let timer = app.live.timer(&event_id).unwrap();
    assert_eq!(timer.time_left, 1440 * 60);

    let response = app
        .post(
            &format!("/presentations/{event_id}/timer"),
            Some(&admin),
            &[("team_id", team.as_str()), ("action", "pause"), ("time_left", I64_MAX)],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let response = app
        .get(&format!("/api/events/{event_id}/present"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn a_full_running_order_is_a_client_error() {
    let app = TestApp::new();
    let (_, admin) = app.user_with_role("admin", Role::Admin).await;
    let event_id = create_event(&app, &admin, "Crowded").await;

    let response = app
        .post(
            &format!("/events/{event_id}/teams/create"),
            Some(&admin),
            &[("title", "Last"), ("order", "10000")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app
        .post(
            &format!("/events/{event_id}/teams/create"),
            Some(&admin),
            &[("title", "One more")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Rows written before positions were bounded.
    {
        let mut conn = app.pool.get().unwrap();
        diesel::update(teams::table.filter(teams::event_id.eq(&event_id)))
            .set(teams::seq.eq(i64::MAX))
            .execute(&mut conn)
            .unwrap();
    }
    let response = app
        .post(
            &format!("/events/{event_id}/teams/create"),
            Some(&admin),
            &[("title", "One more")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reviewers_without_scores_export_plain_zeros() {
    let app = TestApp::new();
    let (_, admin) = app.user_with_role("admin", Role::Admin).await;
    let (judge_id, _) = app.user_with_role("judge", Role::Reviewer).await;
    let event_id = create_event(&app, &admin, "Quiet").await;
    create_team(&app, &admin, &event_id, "Team A").await;

    let response = app
        .post(
            &format!("/events/{event_id}/reviewers/add"),
            Some(&admin),
            &[("user_id", judge_id.as_str())],
        )
        .await;
    assert_res_ok!(response);

    let response = app
        .get(&format!("/events/{event_id}/results.csv"), Some(&admin))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_string(response).await,
        "Rank,Team,judge,Average score\n#1,Team A,0.0,0.00\n"
    );
}

#[tokio::test]
async fn timers_follow_the_database() {
    let app = TestApp::new();
    let (_, admin) = app.user_with_role("admin", Role::Admin).await;
    let event_id = create_event(&app, &admin, "Timers").await;
    let team_a = create_team(&app, &admin, &event_id, "Team A").await;
    let team_b = create_team(&app, &admin, &event_id, "Team B").await;
    let start = |team: &str| format!("/presentations/{event_id}/teams/{team}/start");

    // Rejected before the session opens: nothing is remembered.
    let response = app.post(&start(team_a.as_str()), Some(&admin), &[]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.live.timer(&event_id).is_none());

    let response = app
        .post(
            &format!("/presentations/{event_id}/status"),
            Some(&admin),
            &[("status", "in_progress")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let response = app.post(&start(team_a.as_str()), Some(&admin), &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    // A second presenter is refused and keeps the first team's countdown.
    let response = app.post(&start(team_b.as_str()), Some(&admin), &[]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.live.timer(&event_id).unwrap().team_id, team_a);

    let response = app
        .post(
            &format!("/events/{event_id}/teams/{team_a}/delete"),
            Some(&admin),
            &[],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(app.live.timer(&event_id).is_none());

    let response = app.post(&start(team_b.as_str()), Some(&admin), &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(app.live.timer(&event_id).is_some());

    let response = app
        .post(&format!("/events/{event_id}/delete"), Some(&admin), &[])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(app.live.timer(&event_id).is_none());
}
