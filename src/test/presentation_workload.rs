//! An administrator runs the live session of an event while the audience
//! follows along through the public API.

use axum::http::StatusCode;
use diesel::prelude::*;
use serde_json::Value;

use super::{
    TestApp, assert_res_ok, body_string, create_event, create_team,
};
use crate::{
    events::PresentationStatus,
    msg::{Channel, MsgContents},
    permission::Role,
    schema::event_reviewers,
};

async fn present_data(app: &TestApp, event_id: &str) -> Value {
    let response = app
        .get(&format!("/api/events/{event_id}/present"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert!(body["error"].is_null());
    body["data"]["payload"].clone()
}

async fn timer(app: &TestApp, cookie: &str, event_id: &str, team_id: &str, action: &str) {
    let response = app
        .post(
            &format!("/presentations/{event_id}/timer"),
            Some(cookie),
            &[("team_id", team_id), ("action", action)],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn running_a_presentation() {
    let app = TestApp::new();
    let (_, admin) = app.user_with_role("admin", Role::Admin).await;
    let event_id = create_event(&app, &admin, "Demo Day").await;
    let team_a = create_team(&app, &admin, &event_id, "Team A").await;
    let team_b = create_team(&app, &admin, &event_id, "Team B").await;

    let start_a = format!("/presentations/{event_id}/teams/{team_a}/start");
    let start_b = format!("/presentations/{event_id}/teams/{team_b}/start");

    // Teams can only present once the event is in progress.
    let response = app.post(&start_a, Some(&admin), &[]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut rx = app.live.subscribe();
    let response = app
        .post(
            &format!("/presentations/{event_id}/status"),
            Some(&admin),
            &[("status", "in_progress")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let msg = rx.try_recv().unwrap();
    assert_eq!(msg.channel, Channel::Present);
    assert_eq!(
        msg.inner,
        MsgContents::PresentationStatus {
            event_id: event_id.clone(),
            status: PresentationStatus::InProgress,
        }
    );

    let response = app.post(&start_a, Some(&admin), &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        rx.try_recv().unwrap().inner,
        MsgContents::AddTeamCurr {
            team_id: team_a.clone()
        }
    );

    // Only one team presents at a time.
    let response = app.post(&start_b, Some(&admin), &[]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let data = present_data(&app, &event_id).await;
    assert_eq!(data["live"]["status"], "in_progress");
    assert_eq!(data["live"]["currentTeam"]["id"], team_a.as_str());
    assert_eq!(data["live"]["timer"]["timeLeft"], 300);
    assert_eq!(data["live"]["timer"]["running"], false);

    timer(&app, &admin, &event_id, &team_a, "start").await;
    let data = present_data(&app, &event_id).await;
    assert_eq!(data["live"]["timer"]["running"], true);
    let left = data["live"]["timer"]["timeLeft"].as_i64().unwrap();
    assert!((295..=300).contains(&left), "time left = {left}");

    timer(&app, &admin, &event_id, &team_a, "pause").await;
    let data = present_data(&app, &event_id).await;
    assert_eq!(data["live"]["timer"]["running"], false);

    timer(&app, &admin, &event_id, &team_a, "stop").await;
    let data = present_data(&app, &event_id).await;
    assert_eq!(data["live"]["timer"]["timeLeft"], 300);

    // Draining the timer messages leaves the team status change.
    while let Ok(msg) = rx.try_recv() {
        if let MsgContents::RemoveTeamCurr { .. } = msg.inner {
            panic!("team removed too early");
        }
    }

    let response = app
        .post(
            &format!("/presentations/{event_id}/teams/{team_a}/status"),
            Some(&admin),
            &[("status", "done")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        rx.try_recv().unwrap().inner,
        MsgContents::RemoveTeamCurr {
            team_id: team_a.clone(),
            status: PresentationStatus::Done,
        }
    );

    let data = present_data(&app, &event_id).await;
    assert!(data["live"]["currentTeam"].is_null());
    assert!(data["live"]["timer"].is_null());
    assert_eq!(data["teams"][0]["status"], "done");

    let response = app.post(&start_b, Some(&admin), &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app
        .post(
            &format!("/presentations/{event_id}/teams/{team_b}/status"),
            Some(&admin),
            &[("status", "in_progress")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.get(&format!("/presentations/{event_id}"), Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("Team B"));
}

#[tokio::test]
async fn the_present_view_is_public() {
    let app = TestApp::new();
    let (_, admin) = app.user_with_role("admin", Role::Admin).await;
    let event_id = create_event(&app, &admin, "Open House").await;
    let team_a = create_team(&app, &admin, &event_id, "Team A").await;
    let team_b = create_team(&app, &admin, &event_id, "Team B").await;

    let response = app.get(&format!("/present/{event_id}"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Open House"));
    assert!(body.contains("Running order"));
    assert!(body.contains("/static/live.js"));

    let response = app
        .post(
            &format!("/events/{event_id}/teams/reorder"),
            Some(&admin),
            &[("ids", team_b.as_str()), ("ids", team_a.as_str())],
        )
        .await;
    assert_res_ok!(response);

    let data = present_data(&app, &event_id).await;
    assert_eq!(data["event"]["title"], "Open House");
    assert_eq!(data["teams"][0]["title"], "Team B");
    assert_eq!(data["teams"][0]["order"], 1);
    assert_eq!(data["teams"][1]["members"][1], "Grace");
    assert!(data["live"]["currentTeam"].is_null());

    let response = app.get("/api/events/missing/present", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"]["status"], 404);
    assert!(body["data"].is_null());

    let response = app.get("/static/live.js", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn only_admins_control_presentations() {
    let app = TestApp::new();
    let (_, admin) = app.user_with_role("admin", Role::Admin).await;
    let (judge_id, judge) = app.user_with_role("judge", Role::Reviewer).await;
    let event_id = create_event(&app, &admin, "Finals").await;

    let response = app
        .post(
            &format!("/events/{event_id}/reviewers/add"),
            Some(&admin),
            &[("user_id", judge_id.as_str())],
        )
        .await;
    assert_res_ok!(response);

    let response = app
        .post(
            &format!("/presentations/{event_id}/status"),
            Some(&judge),
            &[("status", "in_progress")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.get("/presentations", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .post(
            &format!("/presentations/{event_id}/reviewers/{judge_id}/status"),
            Some(&admin),
            &[("status", "done")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let status: String = {
        let mut conn = app.pool.get().unwrap();
        event_reviewers::table
            .filter(event_reviewers::reviewer_id.eq(&judge_id))
            .select(event_reviewers::presentation_status)
            .first(&mut conn)
            .unwrap()
    };
    assert_eq!(status, "done");

    let response = app
        .post(
            &format!("/presentations/{event_id}/reviewers/nobody/status"),
            Some(&admin),
            &[("status", "done")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
