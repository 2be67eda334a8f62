//! PetMatch CLI - log in, manage pet profiles, swipe and chat with matches.

mod commands;
mod output;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use petmatch_core::models::{Gender, NewPet, PetType};
use petmatch_core::{ApiError, Config, Route, SessionController};
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::Context;
use output::OutputFormat;

// ============================================================================
// Constants
// ============================================================================

/// File name prefix for the rolling log in `--log-dir`
const LOG_FILE_PREFIX: &str = "petmatch.log";

const SESSION_EXPIRED: &str = "Session expired. Please log in again.";

/// PetMatch - find playmates for your pets.
#[derive(Parser)]
#[command(name = "petmatch")]
#[command(about = "Command-line client for the PetMatch service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    /// API base URL (overrides config and PETMATCH_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, env = "PETMATCH_LOG_DIR", global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with email and password
    Login {
        #[arg(short, long)]
        email: Option<String>,
        #[arg(long, env = "PETMATCH_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and log in
    Register {
        #[arg(short, long)]
        email: Option<String>,
        #[arg(short, long)]
        username: Option<String>,
        #[arg(long, env = "PETMATCH_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Log out and forget stored tokens
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Manage your pets
    Pets {
        #[command(subcommand)]
        command: PetCommands,
    },

    /// Show pets to swipe on
    Discover {
        /// Swipe as this pet instead of the active one
        #[arg(long = "as", value_name = "PET_ID")]
        as_pet: Option<i64>,
    },

    /// Like a pet
    Like {
        pet_id: i64,
        #[arg(long = "as", value_name = "PET_ID")]
        as_pet: Option<i64>,
    },

    /// Pass on a pet
    Pass {
        pet_id: i64,
        #[arg(long = "as", value_name = "PET_ID")]
        as_pet: Option<i64>,
    },

    /// List matches
    Matches,

    /// Show the conversation in a match
    Messages {
        match_id: i64,
    },

    /// Send a message in a match
    Send {
        match_id: i64,
        text: String,
    },
}

#[derive(Subcommand)]
enum PetCommands {
    /// List your pets
    List,
    /// Show a pet profile
    Show { id: i64 },
    /// Add a pet
    Add {
        name: String,
        /// dog, cat, bird, rabbit or other
        #[arg(short = 't', long = "type")]
        pet_type: PetType,
        #[arg(short, long)]
        breed: String,
        #[arg(short, long)]
        age: i32,
        /// male or female
        #[arg(short, long)]
        gender: Gender,
        #[arg(long, default_value = "")]
        bio: String,
        /// URL of the main photo
        #[arg(long)]
        image: Option<String>,
    },
    /// Make a pet the one you swipe as
    Activate { id: i64 },
    /// Delete a pet
    Remove { id: i64 },
}

impl Commands {
    /// Commands that only make sense with a session.
    fn requires_session(&self) -> bool {
        !matches!(
            self,
            Commands::Login { .. } | Commands::Register { .. } | Commands::Logout
        )
    }
}

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` controls the level (default `warn`). The returned guard must be
/// held until exit so buffered file output is flushed.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

/// Routes emitted since the last drain.
fn drain_routes(routes: &mut mpsc::UnboundedReceiver<Route>) -> Vec<Route> {
    let mut drained = Vec::new();
    while let Ok(route) = routes.try_recv() {
        debug!(route = route.path(), "Navigation");
        drained.push(route);
    }
    drained
}

/// Prefer the backend's wording for API failures.
fn error_message(error: &anyhow::Error) -> String {
    match error.downcast_ref::<ApiError>() {
        Some(api_error) => api_error.user_message(),
        None => error.to_string(),
    }
}

async fn dispatch(ctx: &mut Context, command: Commands) -> Result<()> {
    match command {
        Commands::Login { email, password } => commands::login(ctx, email, password).await,
        Commands::Register {
            email,
            username,
            password,
        } => commands::register(ctx, email, username, password).await,
        Commands::Logout => commands::logout(ctx),
        Commands::Whoami => commands::whoami(ctx),
        Commands::Pets { command } => match command {
            PetCommands::List => commands::pets_list(ctx).await,
            PetCommands::Show { id } => commands::pets_show(ctx, id).await,
            PetCommands::Add {
                name,
                pet_type,
                breed,
                age,
                gender,
                bio,
                image,
            } => {
                let pet = NewPet {
                    name,
                    pet_type,
                    breed,
                    age,
                    gender,
                    bio,
                    main_image: image,
                    additional_images: Vec::new(),
                };
                commands::pets_add(ctx, pet).await
            }
            PetCommands::Activate { id } => commands::pets_activate(ctx, id).await,
            PetCommands::Remove { id } => commands::pets_remove(ctx, id).await,
        },
        Commands::Discover { as_pet } => commands::discover(ctx, as_pet).await,
        Commands::Like { pet_id, as_pet } => commands::like(ctx, pet_id, as_pet).await,
        Commands::Pass { pet_id, as_pet } => commands::pass(ctx, pet_id, as_pet).await,
        Commands::Matches => commands::matches(ctx).await,
        Commands::Messages { match_id } => commands::messages(ctx, match_id).await,
        Commands::Send { match_id, text } => commands::send(ctx, match_id, &text).await,
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    config.apply_overrides(cli.api_url, None)?;
    debug!(api_url = %config.api_url, "Configuration loaded");

    let (session, mut routes) = SessionController::from_config(&config)?;
    let restored = session.restore_session().await;
    debug!(state = ?restored, "Session restored");
    drain_routes(&mut routes);

    let requires_session = cli.command.requires_session();
    let mut ctx = Context {
        session,
        config,
        format: cli.format,
    };
    let result = dispatch(&mut ctx, cli.command).await;

    // A refresh failure mid-command sends the session back to login
    if requires_session && drain_routes(&mut routes).contains(&Route::Login) {
        if let Err(e) = &result {
            debug!(error = %e, "Command failed after session loss");
        }
        return Err(anyhow!(SESSION_EXPIRED));
    }
    result
}

#[tokio::main]
async fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_dir.as_deref());
    info!("PetMatch CLI starting");

    let format = cli.format;
    if let Err(e) = run(cli).await {
        output::print_error(&error_message(&e), format);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_pets_add() {
        let cli = Cli::try_parse_from([
            "petmatch", "pets", "add", "Rex", "--type", "dog", "--breed", "Labrador", "--age", "3",
            "--gender", "m",
        ])
        .unwrap();

        match cli.command {
            Commands::Pets {
                command:
                    PetCommands::Add {
                        name,
                        pet_type,
                        gender,
                        bio,
                        image,
                        ..
                    },
            } => {
                assert_eq!(name, "Rex");
                assert_eq!(pet_type, PetType::Dog);
                assert_eq!(gender, Gender::Male);
                assert_eq!(bio, "");
                assert!(image.is_none());
            }
            _ => panic!("expected pets add"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_pet_type() {
        let result = Cli::try_parse_from([
            "petmatch", "pets", "add", "Rex", "--type", "dragon", "--breed", "x", "--age", "1",
            "--gender", "f",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_format_after_subcommand() {
        let cli = Cli::try_parse_from(["petmatch", "matches", "--format", "json"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.command.requires_session());
    }

    #[test]
    fn test_session_free_commands() {
        let cli = Cli::try_parse_from(["petmatch", "logout"]).unwrap();
        assert!(!cli.command.requires_session());
        let cli = Cli::try_parse_from(["petmatch", "login", "-e", "a@b.com"]).unwrap();
        assert!(!cli.command.requires_session());
    }

    #[test]
    fn test_api_errors_use_backend_wording() {
        let error = anyhow::Error::from(ApiError::NotFound("Not found.".to_string()));
        assert_eq!(error_message(&error), "Not found.");
        assert_eq!(error_message(&anyhow!("Not logged in")), "Not logged in");
    }
}
