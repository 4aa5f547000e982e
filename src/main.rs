use clap::{Parser, Subcommand};

mod admin;
mod app;
mod auth;
mod config;
mod db;
mod error;
mod extract;
mod recipes;
mod state;
mod storage;
#[cfg(test)]
mod test_support;

use crate::auth::services::{register_user, Role};
use crate::config::AppConfig;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "recipe-api")]
#[command(about = "Recipe and tag API with per-user ownership", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server (default)
    Serve,
    /// Create a staff superuser account
    CreateSuperuser {
        #[arg(long)]
        email: String,
        #[arg(long, env = "SUPERUSER_PASSWORD")]
        password: String,
        #[arg(long, default_value = "")]
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "recipe_api=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let addr = config.bind_addr();
    let app_state = AppState::init(config).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let app = app::build_app(app_state);
            app::serve(app, &addr).await?;
        }
        Command::CreateSuperuser {
            email,
            password,
            name,
        } => {
            let user = register_user(
                app_state.store.as_ref(),
                &email,
                &password,
                &name,
                Role::Superuser,
            )
            .await
            .map_err(|e| anyhow::anyhow!("could not create superuser: {e}"))?;
            tracing::info!(user_id = user.id, email = %user.email, "superuser created");
        }
    }

    Ok(())
}
