//! End-to-end workloads. These drive the real router against an in-memory
//! database.

use axum::{
    Router,
    body::Body,
    extract::Request,
    http::{StatusCode, header::COOKIE},
    response::Response,
};
use axum_extra::extract::cookie::Key;
use diesel::{
    SqliteConnection,
    prelude::*,
    r2d2::{ConnectionManager, Pool},
};
use diesel_migrations::MigrationHarness;
use tower::ServiceExt;

use crate::{
    MIGRATIONS,
    config::{DEFAULT_BROADCAST_CAPACITY, create_app_with},
    msg::Live,
    permission::Role,
    schema::{teams, users},
    state::{AppState, DbPool},
};

pub const PASSWORD: &str = "password";

// This is a macro rather than a function because the `assert!` panic
// then directly notes the span of the call site.
macro_rules! assert_res_ok {
    ($response:expr) => {
        assert!(
            $response.status().is_success()
                || $response.status().is_redirection(),
            "response status = {:?}, str = {}",
            $response.status(),
            {
                let body_bytes =
                    axum::body::to_bytes($response.into_body(), usize::MAX)
                        .await
                        .unwrap();
                String::from_utf8_lossy(&body_bytes).to_string()
            }
        );
    };
}

pub(crate) use assert_res_ok;

mod boundary_workload;
mod presentation_workload;
mod smoke;

pub struct TestApp {
    pub app: Router,
    pub pool: DbPool,
    pub live: Live,
}

impl TestApp {
    pub fn new() -> TestApp {
        let pool: DbPool = Pool::builder()
            .max_size(1)
            .build(ConnectionManager::<SqliteConnection>::new(":memory:"))
            .unwrap();
        pool.get()
            .unwrap()
            .run_pending_migrations(MIGRATIONS)
            .unwrap();

        let live = Live::new(DEFAULT_BROADCAST_CAPACITY);
        TestApp {
            app: create_app_with(AppState {
                pool: pool.clone(),
                key: Key::generate(),
                live: live.clone(),
            }),
            pool,
            live,
        }
    }

    pub async fn send(&self, request: Request) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut request = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    pub async fn post(
        &self,
        uri: &str,
        cookie: Option<&str>,
        form: &[(&str, &str)],
    ) -> Response {
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        self.send(
            request
                .body(Body::from(serde_urlencoded::to_string(form).unwrap()))
                .unwrap(),
        )
        .await
    }

    /// Registers `username` and returns their id.
    pub async fn register(&self, username: &str) -> String {
        let email = format!("{username}@example.com");
        let response = self
            .post(
                "/register",
                None,
                &[
                    ("username", username),
                    ("email", &email),
                    ("password", PASSWORD),
                    ("password2", PASSWORD),
                ],
            )
            .await;
        assert_res_ok!(response);

        let mut conn = self.pool.get().unwrap();
        users::table
            .filter(users::username.eq(username))
            .select(users::id)
            .first::<String>(&mut conn)
            .unwrap()
    }

    /// Logs in and returns the session cookie.
    pub async fn login(&self, username: &str) -> String {
        let response = self
            .post("/login", None, &[("id", username), ("password", PASSWORD)])
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        response
            .headers()
            .get("set-cookie")
            .unwrap()
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string()
    }

    pub fn grant(&self, user_id: &str, role: Role) {
        let mut conn = self.pool.get().unwrap();
        Role::set(user_id, role, &mut conn).unwrap();
    }

    /// Registers, grants `role` and logs in. Returns the id and cookie.
    pub async fn user_with_role(
        &self,
        username: &str,
        role: Role,
    ) -> (String, String) {
        let id = self.register(username).await;
        self.grant(&id, role);
        let cookie = self.login(username).await;
        (id, cookie)
    }
}

pub fn location(response: &Response) -> String {
    response
        .headers()
        .get("location")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8_lossy(&bytes).to_string()
}

/// Creates an event through the admin form and returns its id.
pub async fn create_event(app: &TestApp, cookie: &str, title: &str) -> String {
    let response = app
        .post(
            "/events/create",
            Some(cookie),
            &[
                ("title", title),
                ("description", "Final presentations"),
                ("duration", "5"),
                ("time_start", "2026-05-01T09:00"),
                ("time_end", "2026-05-01T17:00"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    location(&response)
        .strip_prefix("/events/")
        .unwrap()
        .to_string()
}

pub async fn create_team(
    app: &TestApp,
    cookie: &str,
    event_id: &str,
    title: &str,
) -> String {
    let response = app
        .post(
            &format!("/events/{event_id}/teams/create"),
            Some(cookie),
            &[
                ("title", title),
                ("description", ""),
                ("image", ""),
                ("url", ""),
                ("members", "Ada\nGrace"),
            ],
        )
        .await;
    assert_res_ok!(response);

    let mut conn = app.pool.get().unwrap();
    teams::table
        .filter(teams::event_id.eq(event_id).and(teams::title.eq(title)))
        .select(teams::id)
        .first::<String>(&mut conn)
        .unwrap()
}
