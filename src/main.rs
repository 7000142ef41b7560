use std::path::PathBuf;

use clap::{Parser, Subcommand};
use diesel::prelude::*;
use tally::{
    config::{ServerConfig, create_app_with},
    msg::Live,
    permission::Role,
    schema::users,
    state::{AppState, run_migrations},
};
use tracing_subscriber::{
    EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Scoring server for presentations and competitions.
#[derive(Parser, Debug)]
#[command(name = "tally", version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the web server
    Serve,
    /// Give an existing user a role (e.g. to create the first administrator)
    GrantRole {
        /// Email address of the user
        email: String,
        /// One of `user`, `reviewer` or `admin`
        role: String,
    },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn grant_role(
    config: &ServerConfig,
    email: &str,
    role: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let role = match role.parse::<Role>()? {
        Role::Anonymous => return Err("cannot grant the anonymous role".into()),
        role => role,
    };

    let pool = config.pool()?;
    run_migrations(&pool)?;
    let mut conn = pool.get()?;

    let user_id = users::table
        .filter(users::email.eq(email))
        .select(users::id)
        .first::<String>(&mut conn)
        .optional()?
        .ok_or_else(|| format!("no user has the email {email}"))?;

    Role::set(&user_id, role, &mut conn)?;
    tracing::info!("granted {} to {email}", role.as_str());
    Ok(())
}

async fn serve(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pool = config.pool()?;
    run_migrations(&pool)?;
    tracing::info!("using database {}", config.database_url);

    let app = create_app_with(AppState {
        pool,
        key: config.key()?,
        live: Live::new(config.broadcast_capacity),
    });

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = ServerConfig::load(cli.config.as_deref())?;
    init_logging(&config.log_level);

    match cli.command {
        Command::Serve => serve(config).await,
        Command::GrantRole { email, role } => grant_role(&config, &email, &role),
    }
}
