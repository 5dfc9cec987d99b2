//! heatplan binary: compares district heating against heat pumps for a
//! set of buildings.

use clap::{Parser, Subcommand};
use heatplan::cli::{
    CliResult, cmd_compare, cmd_export, cmd_import, cmd_init, cmd_kpi, cmd_network, cmd_prepare,
    cmd_profiles, cmd_report, cmd_run, cmd_scenarios, cmd_serve, cmd_status, cmd_streets,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "heatplan", version)]
#[command(about = "District heating vs. heat pump scenario planning")]
struct Cli {
    /// Study configuration (JSON or YAML)
    #[arg(short, long, global = true, default_value = "heatplan.yaml")]
    config: PathBuf,

    /// Result store
    #[arg(short = 'D', long, global = true, env = "HEATPLAN_DB", default_value = "heatplan.redb")]
    database: PathBuf,

    /// Directory for generated files
    #[arg(short, long, global = true, default_value = "output")]
    output_dir: PathBuf,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an empty result store
    Init {
        /// Overwrite an existing store
        #[arg(long)]
        force: bool,
    },
    /// Load buildings and compute heat demand
    Prepare,
    /// Generate electricity load profiles
    Profiles,
    /// Route the district heating network and solve its hydraulics
    Network,
    /// Resolve and store the configured scenarios
    Scenarios,
    /// Simulate the stored scenarios
    Run {
        /// Worker threads (defaults to the config value)
        #[arg(short, long)]
        workers: Option<usize>,
    },
    /// Compute KPIs from stored results
    Kpi,
    /// List streets with their buildings
    Streets,
    /// Compare DH and HP for the buildings of one street
    Compare {
        /// Street name
        street: String,
        /// Worker threads (defaults to the config value)
        #[arg(short, long)]
        workers: Option<usize>,
    },
    /// Render the comparison report
    Report {
        /// markdown or text
        #[arg(short, long, default_value = "markdown")]
        format: String,
        /// One report per scenario, concatenated
        #[arg(long)]
        per_scenario: bool,
    },
    /// Show store contents
    Status,
    /// Export a snapshot
    Export {
        /// Output file
        output: PathBuf,
        /// binary, json or csv
        #[arg(short, long, default_value = "binary")]
        format: String,
    },
    /// Import a binary or JSON snapshot
    Import {
        /// Snapshot file
        input: PathBuf,
    },
    /// Start the HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "heatplan=debug,heatplan_core=debug,tower_http=debug"
    } else {
        "heatplan=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn dispatch(cli: Cli) -> CliResult {
    let db = &cli.database;
    let out = &cli.output_dir;
    let cfg = &cli.config;
    match cli.command {
        Commands::Init { force } => cmd_init(db, force),
        Commands::Prepare => cmd_prepare(cfg, out, cli.json),
        Commands::Profiles => cmd_profiles(cfg, out, cli.json),
        Commands::Network => cmd_network(cfg, out, cli.json),
        Commands::Scenarios => cmd_scenarios(cfg, db, cli.json),
        Commands::Run { workers } => cmd_run(cfg, db, workers, cli.json),
        Commands::Kpi => cmd_kpi(cfg, db, out, cli.json),
        Commands::Streets => cmd_streets(cfg, cli.json),
        Commands::Compare { ref street, workers } => cmd_compare(cfg, out, street, workers, cli.json),
        Commands::Report {
            ref format,
            per_scenario,
        } => cmd_report(cfg, db, out, format, per_scenario),
        Commands::Status => cmd_status(db, cli.json),
        Commands::Export { ref output, ref format } => cmd_export(db, output, format),
        Commands::Import { ref input } => cmd_import(db, input),
        Commands::Serve { bind } => cmd_serve(db, cfg, bind).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
