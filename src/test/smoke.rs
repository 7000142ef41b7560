//! Quick checks through `axum-test`, plus a seeded run of malformed input
//! which must never make the server fail.

use axum_test::TestServer;
use diesel::prelude::*;
use rand::{Rng, SeedableRng, rngs::StdRng, seq::IndexedRandom};

use super::TestApp;
use crate::{
    auth::LOGIN_COOKIE,
    config::{create_app, make_pool},
    permission::Role,
    schema::teams,
    state::run_migrations,
};

#[tokio::test]
async fn anonymous_pages() {
    let pool = make_pool(":memory:").unwrap();
    run_migrations(&pool).unwrap();
    let server = TestServer::new(create_app(pool)).unwrap();

    for page in ["/", "/login", "/register"] {
        server.get(page).await.assert_status_ok();
    }
    assert_eq!(server.get("/events").await.status_code(), 401);
    assert_eq!(server.get("/present/nothing-here").await.status_code(), 404);
}

#[tokio::test]
async fn register_login_and_edit_profile() {
    let app = TestApp::new();
    let server = TestServer::new(app.app.clone()).unwrap();

    let response = server
        .post("/register")
        .form(&[
            ("username", "ada"),
            ("email", "ada@example.com"),
            ("password", "hunter22"),
            ("password2", "hunter22"),
        ])
        .await;
    assert_eq!(response.status_code(), 303);

    // Duplicate usernames are refused.
    let response = server
        .post("/register")
        .form(&[
            ("username", "ada"),
            ("email", "other@example.com"),
            ("password", "hunter22"),
            ("password2", "hunter22"),
        ])
        .await;
    assert_eq!(response.status_code(), 400);

    let response = server
        .post("/login")
        .form(&[("id", "ada@example.com"), ("password", "wrong!")])
        .await;
    assert_eq!(response.status_code(), 400);

    let response = server
        .post("/login?next=/profile")
        .form(&[("id", "ada"), ("password", "hunter22")])
        .await;
    assert_eq!(response.status_code(), 303);
    assert_eq!(response.header("location"), "/profile");
    let cookie = response.cookie(LOGIN_COOKIE);

    let response = server
        .post("/profile")
        .add_cookie(cookie.clone())
        .form(&[("display_name", "  Ada Lovelace ")])
        .await;
    assert_eq!(response.status_code(), 303);

    let response = server.get("/profile").add_cookie(cookie.clone()).await;
    response.assert_status_ok();
    assert!(response.text().contains("Ada Lovelace"));

    // Ordinary users cannot see the user list.
    let response = server.get("/users").add_cookie(cookie).await;
    assert_eq!(response.status_code(), 403);
}

#[tokio::test]
async fn admins_assign_roles() {
    let app = TestApp::new();
    let (_, admin) = app.user_with_role("admin", Role::Admin).await;
    let user_id = app.register("grace").await;

    let response = app
        .post(&format!("/users/{user_id}/role"), Some(&admin), &[("role", "reviewer")])
        .await;
    assert_eq!(response.status(), 303);
    let mut conn = app.pool.get().unwrap();
    assert_eq!(Role::of_user(&user_id, &mut conn).unwrap(), Role::Reviewer);
    drop(conn);

    let response = app
        .post(&format!("/users/{user_id}/role"), Some(&admin), &[("role", "anonymous")])
        .await;
    assert_eq!(response.status(), 400);

    let response = app
        .post("/users/missing/role", Some(&admin), &[("role", "admin")])
        .await;
    assert_eq!(response.status(), 404);

    let response = app.get("/users", Some(&admin)).await;
    assert_eq!(response.status(), 200);
}

fn any_team(app: &TestApp, event_id: &str) -> String {
    let mut conn = app.pool.get().unwrap();
    teams::table
        .filter(teams::event_id.eq(event_id))
        .select(teams::id)
        .first::<String>(&mut conn)
        .optional()
        .unwrap()
        .unwrap_or_else(|| "missing".to_string())
}

fn junk(rng: &mut StdRng) -> String {
    const PIECES: &[&str] = &[
        "", " ", "0", "-1", "7", "1e9", "NaN", "team", "é", "<b>", "\"", ",",
        "\n", "2026-05-01T09:00", "https://example.com", "javascript:x",
        "9223372036854775807", "-9223372036854775808", "-0", "1440",
        "in_progress",
    ];
    (0..rng.random_range(0..4))
        .map(|_| *PIECES.choose(rng).unwrap_or(&""))
        .collect()
}

#[tokio::test]
async fn malformed_input_is_never_a_server_error() {
    let app = TestApp::new();
    let (_, admin) = app.user_with_role("admin", Role::Admin).await;
    let event_id = super::create_event(&app, &admin, "Fuzzed").await;
    let mut rng = StdRng::seed_from_u64(0x7a11);

    for _ in 0..200 {
        let a = junk(&mut rng);
        let b = junk(&mut rng);
        let c = junk(&mut rng);
        let team = any_team(&app, &event_id);
        let (uri, form): (String, Vec<(&str, &str)>) = match rng.random_range(0..8) {
            0 => (
                "/events/create".into(),
                vec![("title", a.as_str()), ("duration", b.as_str()), ("time_start", c.as_str()), ("time_end", c.as_str())],
            ),
            1 => (
                format!("/events/{event_id}/teams/create"),
                vec![("title", a.as_str()), ("url", b.as_str()), ("order", c.as_str())],
            ),
            2 => (
                format!("/events/{event_id}/criteria/create"),
                vec![("title", a.as_str())],
            ),
            3 => (
                format!("/presentations/{event_id}/status"),
                vec![("status", a.as_str())],
            ),
            4 => (
                format!("/presentations/{event_id}/timer"),
                vec![("team_id", a.as_str()), ("action", b.as_str()), ("time_left", c.as_str())],
            ),
            5 => (
                format!("/events/{event_id}/edit"),
                vec![
                    ("title", "Fuzzed"),
                    ("duration", a.as_str()),
                    ("time_start", "2026-05-01T09:00"),
                    ("time_end", "2026-05-01T17:00"),
                ],
            ),
            6 => (
                format!("/presentations/{event_id}/teams/{team}/start"),
                vec![],
            ),
            _ => (
                "/register".into(),
                vec![("username", a.as_str()), ("email", b.as_str()), ("password", c.as_str()), ("password2", c.as_str())],
            ),
        };

        let response = app.post(&uri, Some(&admin), &form).await;
        assert!(
            !response.status().is_server_error(),
            "{uri} {form:?} -> {:?}",
            response.status()
        );
    }
}
