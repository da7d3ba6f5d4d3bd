pub mod api;
pub mod catalog;
pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod domain;
pub mod form;
pub mod models;
pub mod notify;
pub mod services;
pub mod shell;
pub mod state;
pub mod storage;

use std::path::Path;

use anyhow::Context;
use cli::{Cli, Commands};
pub use config::Config;
use models::AnimePatch;
use state::SharedState;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Loads the config named on the command line, or searches the default
/// locations.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            dotenvy::dotenv().ok();
            let mut config = Config::load_from_path(path)?;
            config.apply_env_overrides(|key| std::env::var(key).ok());
            Ok(config)
        }
        None => Config::load(),
    }
}

pub fn init_tracing(config: &Config) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.general.log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    init_tracing(&config);

    let Some(command) = cli.command else {
        print_help();
        return Ok(());
    };

    if matches!(command, Commands::Init) {
        return cmd_init(cli.config.as_deref());
    }

    config.validate()?;
    let state = SharedState::new(config).await?;
    let result = dispatch(&state, command).await;
    state.shutdown();
    result
}

async fn dispatch(state: &SharedState, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::List {
            search,
            genre,
            status,
            min_rating,
            view,
        } => {
            let filter = catalog::AnimeFilter {
                search: search.unwrap_or_default(),
                genre: genre.unwrap_or_default(),
                status: status.map(|s| s.as_str().to_string()).unwrap_or_default(),
                min_rating: min_rating.unwrap_or_default(),
            };
            cli::cmd_list_anime(state, &filter, view).await
        }

        Commands::Show { id } => cli::cmd_show_anime(state, &id).await,

        Commands::Add { file } => cli::cmd_add_anime(state, &file).await,

        Commands::Update {
            id,
            title,
            description,
            synopsis,
            release_year,
            episode_count,
            studio,
            rating,
            status,
            thumbnail,
            genres,
        } => {
            let patch = AnimePatch {
                title,
                description,
                synopsis,
                release_year,
                episode_count,
                studio_name: studio,
                rating,
                status,
                thumbnail_url: thumbnail,
                genres: (!genres.is_empty()).then_some(genres),
                is_archived: None,
            };
            cli::cmd_update_anime(state, &id, patch).await
        }

        Commands::Remove { id, yes } => cli::cmd_remove_anime(state, &id, yes).await,

        Commands::Links {
            anime_id,
            episode_number,
            links,
            language,
            quality,
        } => {
            cli::cmd_add_links(
                state,
                &anime_id,
                episode_number,
                &links,
                &language,
                quality.as_deref(),
            )
            .await
        }

        Commands::Stats => cli::cmd_stats(state).await,

        Commands::Export { out } => cli::cmd_export(state, &out).await,

        Commands::Signup { email, password } => {
            cli::cmd_signup(state, &email, password.as_deref()).await
        }

        Commands::Login { email, password } => {
            cli::cmd_login(state, &email, password.as_deref()).await
        }

        Commands::Logout => cli::cmd_logout(state).await,

        Commands::ResetPassword { email } => cli::cmd_reset_password(state, &email).await,

        Commands::Serve => serve(state.clone()).await,

        Commands::Init => Ok(()),
    }
}

fn cmd_init(path: Option<&Path>) -> anyhow::Result<()> {
    let created = match path {
        Some(path) => Config::create_default_at(path)?,
        None => Config::create_default_if_missing()?,
    };
    if created {
        println!("✓ Created default config file");
    } else {
        println!("Config file already exists");
    }
    Ok(())
}

async fn serve(state: SharedState) -> anyhow::Result<()> {
    let port = state.config.server.port;
    info!(
        "anishelf v{} serving the {} backend",
        env!("CARGO_PKG_VERSION"),
        state.catalog.kind()
    );

    if let Err(e) = state.catalog.fetch().await {
        error!("Initial catalog load failed: {}", e);
    }

    let app = api::router(api::AppState::new(state));
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Web API running at http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }
}

fn print_help() {
    println!("anishelf v{}", env!("CARGO_PKG_VERSION"));
    println!("Anime catalog with episodes, streaming links and subtitles");
    println!();
    println!("USAGE:");
    println!("    anishelf <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!(
        "    list, ls              List anime (--search --genre --status --min-rating --view)"
    );
    println!("    show <id>             Show an anime with its episodes and links");
    println!("    add <draft.json>      Add an anime from a JSON draft");
    println!("    update <id>           Change fields (--title --rating --status ...)");
    println!("    remove, rm <id>       Remove an anime (--yes to skip confirmation)");
    println!("    links <id> [episode]  Add links (--link platform=url, --language)");
    println!("    stats                 Show collection statistics");
    println!("    export                Export the collection as JSON (--out dir)");
    println!("    signup <email>        Create an account");
    println!("    login <email>         Sign in");
    println!("    logout                Sign out");
    println!("    reset-password <email>");
    println!("    serve                 Start the HTTP API");
    println!("    init                  Create default config file");
}
