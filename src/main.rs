use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use colored::Colorize;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn, Level};

use nutrient_dashboard::api;
use nutrient_dashboard::commands::{self, FetchOptions};
use nutrient_dashboard::config::DashboardConfig;
use nutrient_dashboard::food::analysis::RdaProfile;
use nutrient_dashboard::food::api::{FoodSource, MockFoodSource, UsdaClient};
use nutrient_dashboard::food::{FoodCatalog, NutrientSession};

#[derive(Parser, Debug)]
#[command(author, version, about = "USDA food nutrient analysis dashboard", long_about = None)]
struct Args {
    /// trace, debug, info, warn or error
    #[arg(long, default_value = "info", global = true)]
    log_level: Level,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the dashboard (the default)
    Serve(ServeArgs),
    /// Download the food database from the USDA API
    Fetch(FetchArgs),
    /// Print or export the daily nutrient guidelines
    Guidelines(GuidelinesArgs),
}

#[derive(ClapArgs, Debug, Default)]
struct ServeArgs {
    #[arg(short, long)]
    port: Option<u16>,

    #[arg(long)]
    database: Option<PathBuf>,

    #[arg(short, long)]
    api_key: Option<String>,

    #[arg(long)]
    profile: Option<RdaProfile>,

    /// Use the built-in sample foods instead of the USDA API
    #[arg(long)]
    demo: bool,

    /// Open the dashboard in the default browser
    #[arg(long)]
    open: bool,
}

#[derive(ClapArgs, Debug)]
struct FetchArgs {
    #[arg(short, long)]
    api_key: Option<String>,

    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stop after this many foods
    #[arg(long)]
    max_foods: Option<usize>,

    /// Pause between detail requests, in milliseconds
    #[arg(long, default_value_t = 500)]
    delay_ms: u64,
}

#[derive(ClapArgs, Debug)]
struct GuidelinesArgs {
    /// Write the raw table as JSON instead of printing it
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long)]
    profile: Option<RdaProfile>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();
    tracing_subscriber::fmt().with_max_level(args.log_level).init();

    let config = DashboardConfig::from_env()?;

    match args.command.unwrap_or_else(|| Command::Serve(ServeArgs::default())) {
        Command::Serve(serve) => run_server(config, serve).await,
        Command::Fetch(fetch) => run_fetch(config, fetch).await,
        Command::Guidelines(guidelines) => {
            let profile = guidelines.profile.unwrap_or(config.rda_profile);
            commands::export_guidelines(profile, guidelines.output.as_deref())
        }
    }
}

async fn run_fetch(mut config: DashboardConfig, args: FetchArgs) -> Result<()> {
    if let Some(key) = args.api_key {
        config.food.usda_api_key = Some(key);
    }
    let client = UsdaClient::new(&config.food)?;

    let options = FetchOptions {
        output: args.output.unwrap_or(config.database_path),
        max_foods: args.max_foods,
        delay: Duration::from_millis(args.delay_ms),
        show_progress: true,
    };

    let summary = commands::fetch_database(&client, &options).await?;
    info!(
        listed = summary.listed,
        saved = summary.saved,
        failed = summary.failed,
        duplicates = summary.duplicates,
        "fetch finished"
    );
    Ok(())
}

async fn run_server(mut config: DashboardConfig, args: ServeArgs) -> Result<()> {
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(path) = args.database {
        config.database_path = path;
    }
    if let Some(profile) = args.profile {
        config.rda_profile = profile;
    }
    if let Some(key) = args.api_key {
        config.food.usda_api_key = Some(key);
    }

    let mut catalog = FoodCatalog::load(&config.database_path)
        .with_context(|| format!("Failed to read {}", config.database_path.display()))?;

    let source: Arc<dyn FoodSource> = if args.demo || config.food.usda_api_key.is_none() {
        if !args.demo {
            warn!("No USDA API key configured, serving the built-in sample foods");
        }
        if catalog.is_empty() {
            catalog = FoodCatalog::from_records(nutrient_dashboard::food::api::mock::sample_records());
        }
        Arc::new(MockFoodSource::new())
    } else {
        Arc::new(UsdaClient::new(&config.food)?)
    };

    let session = Arc::new(NutrientSession::new(
        source,
        catalog,
        config.cache_size,
        config.rda_profile,
    ));
    let app = api::create_api(session);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let url = format!("http://localhost:{}", config.port);
    println!("{} {}", "Dashboard running at".bright_green(), url.bright_yellow());
    if args.open {
        if let Err(e) = webbrowser::open(&url) {
            warn!("Could not open a browser: {}", e);
        }
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
