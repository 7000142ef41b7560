//! Server configuration and the application router.

use std::path::Path;

use axum::{
    Router,
    middleware,
    routing::{get, post},
};
use axum_extra::extract::cookie::Key;
use diesel::{
    SqliteConnection,
    r2d2::{ConnectionManager, Pool},
};
use hypertext::prelude::*;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::{
    auth::{
        User,
        login::{do_login, do_logout, login_page},
        register::{do_register, register_page},
    },
    events::{
        create::{create_event_page, do_create_event},
        criteria::manage::{
            do_create_record, do_create_template, do_delete_record,
            do_delete_template, do_edit_record,
        },
        live::{live_js, present_channel, reviewer_channel},
        manage::{
            edit::{do_delete_event, do_edit_event, edit_event_page},
            event_detail_page, list_events_page,
        },
        presentations::{
            control::{
                do_start_team, do_timer_action, do_update_presentation_status,
                do_update_reviewer_status, do_update_team_status,
            },
            presentation_page, presentations_page,
            results::presentation_results_page,
        },
        public::{present_api, present_view},
        reviewers::manage::{do_add_reviewer, do_remove_reviewer, do_set_leader},
        reviews::{
            leader::{do_toggle_score_edit, leader_results_page},
            reviewer_event_page, reviews_page,
            submit::{do_save_scores, scores_for_team, team_scoring_page},
        },
        scores::export::export_results_csv,
        teams::manage::{
            create_team_page, do_create_team, do_delete_team, do_edit_team,
            do_reorder_teams, edit_team_page,
        },
    },
    msg::Live,
    permission::Role,
    state::{AppState, Conn, DbPool, commit_transactions},
    template::Page,
    users::{
        do_update_user_display_name, do_update_user_role,
        profile::{do_update_profile, profile_page},
        users_page,
    },
    util_resp::{StandardResponse, success},
};

pub const DEFAULT_BROADCAST_CAPACITY: usize = 1000;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    pub database_url: String,
    /// At least 64 bytes. Without one, sessions end when the server restarts.
    pub secret_key: Option<String>,
    pub broadcast_capacity: usize,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            database_url: "tally.db".to_string(),
            secret_key: None,
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read(std::io::Error),
    Parse(toml::de::Error),
    ShortSecretKey(usize),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read(e) => write!(f, "could not read config: {e}"),
            ConfigError::Parse(e) => write!(f, "invalid config: {e}"),
            ConfigError::ShortSecretKey(len) => write!(
                f,
                "secret_key must be at least 64 bytes long (got {len})"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ServerConfig {
    pub fn from_toml(text: &str) -> Result<ServerConfig, ConfigError> {
        toml::from_str(text).map_err(ConfigError::Parse)
    }

    /// Reads `path` (if given) and applies the `DATABASE_URL`, `SECRET_KEY`
    /// and `BIND` environment variables on top.
    pub fn load(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
        let config = match path {
            Some(path) => ServerConfig::from_toml(
                &std::fs::read_to_string(path).map_err(ConfigError::Read)?,
            )?,
            None => ServerConfig::default(),
        };
        Ok(config.with_overrides(|name| std::env::var(name).ok()))
    }

    pub fn with_overrides(
        mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> ServerConfig {
        if let Some(url) = var("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(secret) = var("SECRET_KEY") {
            self.secret_key = Some(secret);
        }
        if let Some(bind) = var("BIND") {
            self.bind = bind;
        }
        self
    }

    pub fn key(&self) -> Result<Key, ConfigError> {
        match &self.secret_key {
            Some(secret) => Key::try_from(secret.as_bytes())
                .map_err(|_| ConfigError::ShortSecretKey(secret.len())),
            None => {
                tracing::warn!(
                    "no secret key configured; sessions will not survive a \
                     restart"
                );
                Ok(Key::generate())
            }
        }
    }

    pub fn pool(&self) -> Result<DbPool, diesel::r2d2::PoolError> {
        make_pool(&self.database_url)
    }
}

/// In-memory databases only exist on one connection, so the pool is limited
/// to a single connection for them.
pub fn make_pool(database_url: &str) -> Result<DbPool, diesel::r2d2::PoolError> {
    Pool::builder()
        .max_size(if database_url == ":memory:" { 1 } else { 10 })
        .build(ConnectionManager::<SqliteConnection>::new(database_url))
}

pub async fn home(
    user: Option<User<true>>,
    mut conn: Conn<true>,
) -> StandardResponse {
    let role = Role::of(user.as_ref(), &mut *conn)?;

    success(
        Page::new()
            .user_opt(user)
            .role(role)
            .body(maud! {
                h1 { "Tally" }
                p class="lead" {
                    "Scoring for presentations and competitions."
                }
                ul {
                    @match role {
                        Role::Anonymous => {
                            li { a href="/login" { "Log in" } }
                            li { a href="/register" { "Create an account" } }
                        }
                        Role::Admin => {
                            li { a href="/events/create" { "Create a new event" } }
                            li { a href="/events" { "Manage events" } }
                            li { a href="/presentations" { "Run a presentation" } }
                            li { a href="/users" { "Manage users" } }
                        }
                        Role::Reviewer => {
                            li { a href="/reviews" { "Events you are reviewing" } }
                            li { a href="/events" { "All events" } }
                        }
                        Role::User => {
                            li { a href="/events" { "Events" } }
                        }
                    }
                }
            })
            .render(),
    )
}

pub fn create_app(pool: DbPool) -> Router {
    create_app_with(AppState {
        pool,
        key: Key::generate(),
        live: Live::new(DEFAULT_BROADCAST_CAPACITY),
    })
}

pub fn create_app_with(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/static/live.js", get(live_js))
        .route("/login", get(login_page).post(do_login))
        .route("/register", get(register_page).post(do_register))
        .route("/logout", post(do_logout))
        .route("/profile", get(profile_page).post(do_update_profile))
        .route("/users", get(users_page))
        .route("/users/:user_id/role", post(do_update_user_role))
        .route(
            "/users/:user_id/display_name",
            post(do_update_user_display_name),
        )
        // events
        .route("/events", get(list_events_page))
        .route("/events/create", get(create_event_page).post(do_create_event))
        .route("/events/:event_id", get(event_detail_page))
        .route("/events/:event_id/edit", get(edit_event_page).post(do_edit_event))
        .route("/events/:event_id/delete", post(do_delete_event))
        .route("/events/:event_id/results.csv", get(export_results_csv))
        .route(
            "/events/:event_id/teams/create",
            get(create_team_page).post(do_create_team),
        )
        .route("/events/:event_id/teams/reorder", post(do_reorder_teams))
        .route(
            "/events/:event_id/teams/:team_id/edit",
            get(edit_team_page).post(do_edit_team),
        )
        .route("/events/:event_id/teams/:team_id/delete", post(do_delete_team))
        .route("/events/:event_id/reviewers/add", post(do_add_reviewer))
        .route(
            "/events/:event_id/reviewers/:reviewer_id/remove",
            post(do_remove_reviewer),
        )
        .route(
            "/events/:event_id/reviewers/:reviewer_id/leader",
            post(do_set_leader),
        )
        .route("/events/:event_id/criteria/create", post(do_create_template))
        .route(
            "/events/:event_id/criteria/:template_id/delete",
            post(do_delete_template),
        )
        .route(
            "/events/:event_id/criteria/:template_id/records/create",
            post(do_create_record),
        )
        .route("/events/:event_id/records/:record_id/edit", post(do_edit_record))
        .route(
            "/events/:event_id/records/:record_id/delete",
            post(do_delete_record),
        )
        // presentations
        .route("/presentations", get(presentations_page))
        .route("/presentations/:event_id", get(presentation_page))
        .route(
            "/presentations/:event_id/results",
            get(presentation_results_page),
        )
        .route(
            "/presentations/:event_id/status",
            post(do_update_presentation_status),
        )
        .route("/presentations/:event_id/timer", post(do_timer_action))
        .route(
            "/presentations/:event_id/teams/:team_id/start",
            post(do_start_team),
        )
        .route(
            "/presentations/:event_id/teams/:team_id/status",
            post(do_update_team_status),
        )
        .route(
            "/presentations/:event_id/reviewers/:user_id/status",
            post(do_update_reviewer_status),
        )
        // reviews
        .route("/reviews", get(reviews_page))
        .route("/reviews/:event_id", get(reviewer_event_page))
        .route("/reviews/:event_id/live", get(reviewer_channel))
        .route("/reviews/:event_id/results", get(leader_results_page))
        .route("/reviews/:event_id/score_edit", post(do_toggle_score_edit))
        .route(
            "/reviews/:event_id/teams/:team_id",
            get(team_scoring_page).post(do_save_scores),
        )
        .route(
            "/api/reviews/:event_id/teams/:team_id/scores",
            get(scores_for_team),
        )
        // public
        .route("/present/:event_id", get(present_view))
        .route("/present/:event_id/live", get(present_channel))
        .route("/api/events/:event_id/present", get(present_api))
        .layer(middleware::from_fn(commit_transactions))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_files_may_leave_out_fields() {
        let config = ServerConfig::from_toml(
            r#"
            bind = "0.0.0.0:9000"
            broadcast_capacity = 16
            "#,
        )
        .unwrap();

        assert_eq!(config.bind, "0.0.0.0:9000");
        assert_eq!(config.broadcast_capacity, 16);
        assert_eq!(config.database_url, "tally.db");
        assert!(config.secret_key.is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(ServerConfig::from_toml("port = 80").is_err());
    }

    #[test]
    fn environment_overrides_the_file() {
        let config = ServerConfig::default().with_overrides(|name| match name {
            "DATABASE_URL" => Some(":memory:".to_string()),
            "BIND" => Some("0.0.0.0:80".to_string()),
            _ => None,
        });
        assert_eq!(config.database_url, ":memory:");
        assert_eq!(config.bind, "0.0.0.0:80");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn short_secret_keys_are_rejected() {
        let config = ServerConfig {
            secret_key: Some("too short".to_string()),
            ..ServerConfig::default()
        };
        assert!(matches!(config.key(), Err(ConfigError::ShortSecretKey(9))));

        let config = ServerConfig {
            secret_key: Some("k".repeat(64)),
            ..ServerConfig::default()
        };
        assert!(config.key().is_ok());
    }
}
