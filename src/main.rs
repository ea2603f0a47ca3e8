//! waypoint command line.
//!
//! Loads a route table from TOML and either inspects it or drives an
//! in-memory location through a sequence of paths.
//!
//! ```text
//! waypoint --config routes.toml match /user/42/tasks/7
//! waypoint --config routes.toml href task userId=42 taskId=7 -q tab=notes
//! waypoint --config routes.toml navigate /user/42 /user/42/todos/7
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use waypoint::config::{load_config, HandlerRegistry};
use waypoint::location::MemoryLocation;
use waypoint::observability::init_logging;
use waypoint::routing::{Params, Query};
use waypoint::transition::{DispatchOutcome, ErrorMode};
use waypoint::Router;

/// Location changes followed per navigation before giving up on a redirect loop.
const MAX_HOPS: usize = 16;

#[derive(Parser)]
#[command(name = "waypoint")]
#[command(about = "Inspect and drive a nested route table", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "routes.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the match chain for a path as JSON
    Match { path: String },
    /// Build a path from a route name and key=value params
    Href {
        to: String,
        #[arg(value_parser = parse_key_value)]
        params: Vec<(String, String)>,
        #[arg(short, long = "query", value_parser = parse_key_value)]
        query: Vec<(String, String)>,
    },
    /// Navigate to each path in turn, printing the committed state
    Navigate {
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got \"{raw}\""))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    init_logging(&config.observability);

    tracing::info!(config = %cli.config.display(), "waypoint v0.1.0 starting");

    let initial_path = config.router.initial_path.clone().unwrap_or_else(|| "/".to_string());
    let location = Arc::new(MemoryLocation::new(initial_path));
    let router = Router::from_config(&config, &HandlerRegistry::new(), location.clone())?
        .error_mode(ErrorMode::Return)
        .build();

    match cli.command {
        Commands::Match { path } => {
            let matches = router.match_path(&path);
            println!("{}", serde_json::to_string_pretty(&matches)?);
        }
        Commands::Href { to, params, query } => {
            let params: Params = params.into_iter().collect();
            let query: Query = query.into_iter().collect();
            println!("{}", router.make_path(&to, &params, &query)?);
        }
        Commands::Navigate { paths } => {
            settle(&router).await?;
            for path in paths {
                location.push(path);
                settle(&router).await?;
                println!("{}", serde_json::to_string_pretty(&router.state().as_deref())?);
            }
            tracing::info!(history = ?location.entries(), "Navigation finished");
        }
    }

    Ok(())
}

/// Dispatch location changes until the router agrees with the location.
async fn settle(router: &Router) -> Result<(), Box<dyn std::error::Error>> {
    for _ in 0..MAX_HOPS {
        if let DispatchOutcome::Unchanged = router.handle_path_change().await? {
            return Ok(());
        }
    }
    tracing::warn!(
        path = %router.location().current_path(),
        hops = MAX_HOPS,
        "Location did not settle, possible redirect loop"
    );
    Ok(())
}
