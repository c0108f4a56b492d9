//! ProfitLens CLI - Food-delivery profitability dashboards on Snowflake
//!
//! Usage:
//!   profitlens serve [--host <host>] [--port <port>]
//!   profitlens tab <name> [--city <city>]... [--from <date> --to <date>] [--top-n <n>]
//!   profitlens ask <question> [--city <city>]...
//!   profitlens filters
//!   profitlens check
//!
//! Examples:
//!   profitlens tab executive --city Pune --city Delhi --top-n 5
//!   profitlens ask "Which cuisine has the highest net profit?"

use clap::{Args, Parser, Subcommand};
use chrono::NaiveDate;
use profitlens::assistant::{model_from_settings, Assistant, CompletionModel};
use profitlens::chart::Theme;
use profitlens::config::Settings;
use profitlens::dashboard::{Dashboard, Tab, TopN};
use profitlens::filter::{load_options, FilterSelection};
use profitlens::runner::QueryRunner;
use profitlens::warehouse::ConnectionManager;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "profitlens")]
#[command(about = "ProfitLens - Profitability, restaurant and customer analytics for food delivery")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $PROFITLENS_CONFIG, ./profitlens.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the dashboard API
    #[cfg(feature = "ui")]
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Render one dashboard tab as JSON
    Tab {
        /// summary, executive, restaurants, customers or conclusion
        name: Tab,

        #[command(flatten)]
        filters: FilterArgs,

        /// Entries in ranked charts (clamped to 3..=20)
        #[arg(short = 'n', long, default_value_t = 10)]
        top_n: u32,

        #[arg(long)]
        theme: Option<Theme>,
    },

    /// Ask a question in plain language
    Ask {
        question: String,

        #[command(flatten)]
        filters: FilterArgs,

        #[arg(long)]
        theme: Option<Theme>,
    },

    /// List selectable filter values
    Filters,

    /// Test the warehouse connection
    Check,
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long = "city")]
    cities: Vec<String>,

    #[arg(long = "restaurant")]
    restaurants: Vec<String>,

    #[arg(long = "cuisine")]
    cuisines: Vec<String>,

    /// Start of the order date range (YYYY-MM-DD)
    #[arg(long, requires = "to")]
    from: Option<NaiveDate>,

    /// End of the order date range (YYYY-MM-DD)
    #[arg(long, requires = "from")]
    to: Option<NaiveDate>,
}

impl FilterArgs {
    fn selection(self) -> FilterSelection {
        let selection = FilterSelection::new()
            .with_cities(self.cities)
            .with_restaurants(self.restaurants)
            .with_cuisines(self.cuisines);
        match (self.from, self.to) {
            (Some(from), Some(to)) => selection.with_date_range(from, to),
            _ => selection,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("profitlens=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = match load_settings(cli.config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // A connection failure halts every command.
    let connection = match ConnectionManager::new(&settings).connect().await {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to connect to the warehouse: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let runner = QueryRunner::from_connection(connection, settings.cache.ttl());

    match cli.command {
        #[cfg(feature = "ui")]
        Commands::Serve { host, port } => cmd_serve(&settings, runner, host, port).await,
        Commands::Tab {
            name,
            filters,
            top_n,
            theme,
        } => {
            let Some(model) = completion_model(&settings, &runner) else {
                return ExitCode::FAILURE;
            };
            let dashboard = Dashboard::new(runner, model, settings.cache.summary_ttl());
            let view = dashboard
                .render(name, &filters.selection(), TopN::new(top_n))
                .await;
            print_json(&view.to_json(theme.unwrap_or(settings.server.theme)))
        }
        Commands::Ask {
            question,
            filters,
            theme,
        } => {
            let Some(model) = completion_model(&settings, &runner) else {
                return ExitCode::FAILURE;
            };
            let answer = Assistant::new(runner, model)
                .ask(&question, &filters.selection())
                .await;
            let code = print_json(&answer.to_json(theme.unwrap_or(settings.server.theme)));
            if answer.is_answered() {
                code
            } else {
                ExitCode::FAILURE
            }
        }
        Commands::Filters => print_json(&load_options(&runner).await),
        Commands::Check => {
            println!("Connected ({}, {:?})", runner.backend(), runner.dialect());
            ExitCode::SUCCESS
        }
    }
}

fn load_settings(path: Option<PathBuf>) -> Result<Settings, profitlens::config::SettingsError> {
    match path {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    }
}

fn completion_model(settings: &Settings, runner: &QueryRunner) -> Option<Arc<dyn CompletionModel>> {
    match model_from_settings(&settings.assistant, runner) {
        Ok(model) => Some(Arc::from(model)),
        Err(e) => {
            eprintln!("Assistant configuration error: {}", e);
            None
        }
    }
}

#[cfg(feature = "ui")]
async fn cmd_serve(
    settings: &Settings,
    runner: QueryRunner,
    host: Option<String>,
    port: Option<u16>,
) -> ExitCode {
    use profitlens::web::{serve, AppState};

    let Some(model) = completion_model(settings, &runner) else {
        return ExitCode::FAILURE;
    };
    let state = Arc::new(AppState {
        dashboard: Dashboard::new(runner.clone(), model.clone(), settings.cache.summary_ttl()),
        assistant: Assistant::new(runner, model),
        theme: settings.server.theme,
    });

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    println!("ProfitLens API");
    println!("   URL: http://{}:{}", host, port);
    println!();
    println!("   Press Ctrl+C to stop");

    match serve(state, &host, port).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to serialize output: {}", e);
            ExitCode::FAILURE
        }
    }
}
