use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use kind_app::{create_app_state, create_router, load_config};

#[derive(Parser)]
#[command(name = "kind-app")]
#[command(about = "Kind web app: accounts, sessions, API tokens and posts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Bind address, e.g. 0.0.0.0:8080
        #[arg(long, env = "KIND_BIND")]
        bind: Option<String>,
        #[arg(long, env = "KIND_DB_URL")]
        db_url: Option<String>,
        /// Path to kind.json
        #[arg(long, env = "KIND_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Initialize the database
    Init {
        #[arg(long, env = "KIND_DB_URL")]
        db_url: Option<String>,
    },
    /// Register a user
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long, env = "KIND_USER_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, env = "KIND_DB_URL")]
        db_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("kind_app=info".parse()?)
                .add_directive("surrealdb=warn".parse()?),
        )
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            db_url,
            config,
        } => {
            let app_config = load_config(config.as_deref())?;
            let bind = bind.unwrap_or_else(|| app_config.bind.clone());
            let db_config = app_config.database_with_url(db_url);
            info!("Using database url: {}", db_config.url);

            let state = create_app_state(db_config, app_config.auth).await?;
            let app = create_router(state);

            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .with_context(|| format!("failed to bind {}", bind))?;
            info!("Listening on http://{}", bind);

            axum::serve(listener, app).await?;
        }
        Commands::Init { db_url } => {
            let app_config = load_config(None)?;
            let db_config = app_config.database_with_url(db_url);
            info!("Using database url for initialization: {}", db_config.url);

            info!("Initializing database...");
            let db = kind_app::create_connection(db_config).await?;
            kind_app::ensure_schema(&db).await?;
            info!("Database initialized successfully");
        }
        Commands::CreateUser {
            username,
            password,
            db_url,
        } => {
            let app_config = load_config(None)?;
            let db_config = app_config.database_with_url(db_url);
            let state = create_app_state(db_config, app_config.auth).await?;

            state.auth.create_user(&username, &password).await?;
            println!("User '{}' created.", username);
        }
    }

    Ok(())
}
