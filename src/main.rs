//! # Tech Radar CLI (`radar`)
//!
//! ## Usage
//!
//! ```bash
//! radar --config ./config/radar.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `radar init` | Create the SQLite database and run schema migrations |
//! | `radar migrate --dir <dir>` | Apply SQL migration files |
//! | `radar analyze "<text>"` | Analyze a tool without saving it |
//! | `radar add "<text>"` | Analyze a tool and save it |
//! | `radar list` | List tracked tools |
//! | `radar search "<query>"` | Search tools |
//! | `radar get <name>` | Show one tool in full |
//! | `radar stats` | Counts by ring and category |
//! | `radar radar` | Radar plot coordinates |
//! | `radar compare <a> <b>` | Model-written comparison |
//! | `radar export` | CSV or JSON export |
//! | `radar backup` | Snapshot the database |
//! | `radar serve` | Start the HTTP API |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tech_radar::models::{RadarPosition, ToolFilters};
use tech_radar::{add, backup, config, export, get, list, logging, migrate, search, server, stats};

/// Tech Radar: analyze, track and plot CX tools.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Missing files fall back to built-in defaults.
#[derive(Parser)]
#[command(
    name = "radar",
    about = "Tech Radar: analyze, track and plot customer-experience tools",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/radar.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Filters shared by `list` and `radar`.
#[derive(clap::Args, Debug, Default)]
struct FilterArgs {
    /// Exact category name.
    #[arg(long)]
    category: Option<String>,

    /// Radar position: Adopt, Trial, Assess or Hold.
    #[arg(long, value_parser = parse_position)]
    position: Option<RadarPosition>,

    /// Minimum CX relevance score (inclusive).
    #[arg(long)]
    min_cx: Option<i64>,

    /// Maximum CX relevance score (inclusive).
    #[arg(long)]
    max_cx: Option<i64>,

    /// Minimum integration score (inclusive).
    #[arg(long)]
    min_integration: Option<i64>,

    /// Maximum integration score (inclusive).
    #[arg(long)]
    max_integration: Option<i64>,
}

impl From<FilterArgs> for ToolFilters {
    fn from(a: FilterArgs) -> Self {
        ToolFilters {
            category: a.category,
            position: a.position,
            min_cx_score: a.min_cx,
            max_cx_score: a.max_cx,
            min_integration_score: a.min_integration,
            max_integration_score: a.max_integration,
        }
    }
}

fn parse_position(s: &str) -> Result<RadarPosition, String> {
    RadarPosition::parse(s)
        .ok_or_else(|| format!("invalid position '{}': use Adopt, Trial, Assess or Hold", s))
}

/// Input options shared by `analyze` and `add`.
#[derive(clap::Args, Debug)]
struct InputArgs {
    /// Tool description. Read from --file or stdin when omitted.
    text: Option<String>,

    /// Read the description from a file.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Source URL recorded with the tool.
    #[arg(long)]
    url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; also upgrades older databases in place.
    Init,

    /// Apply `*.sql` migration files from a directory.
    Migrate {
        #[arg(long, default_value = "./migrations")]
        dir: PathBuf,
    },

    /// Analyze a tool description and print the result without saving.
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Print the analysis as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Analyze a tool description and save it.
    Add {
        #[command(flatten)]
        input: InputArgs,
    },

    /// List tracked tools.
    List {
        #[command(flatten)]
        filters: FilterArgs,

        #[arg(long)]
        json: bool,
    },

    /// Search tool names, descriptions and categories.
    Search {
        query: String,

        #[arg(long)]
        json: bool,
    },

    /// Show one tool in full.
    Get {
        name: String,

        #[arg(long)]
        json: bool,
    },

    /// Show counts by radar position and category.
    Stats,

    /// Print radar plot coordinates.
    Radar {
        #[command(flatten)]
        filters: FilterArgs,

        #[arg(long)]
        json: bool,
    },

    /// Ask the model to compare two or more stored tools.
    Compare {
        #[arg(required = true, num_args = 2..)]
        names: Vec<String>,
    },

    /// Export tools as CSV or JSON.
    Export {
        /// Output format: csv or json.
        #[arg(long, default_value = "csv")]
        format: String,

        /// Export only tools matching this search.
        #[arg(long)]
        search: Option<String>,

        /// Output file or directory. Writes to stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Write a timestamped copy of the database.
    Backup {
        /// Target directory (default: `backups/` next to the database).
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.logging);

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Migrate { dir } => {
            let applied = migrate::apply_migration_dir(&cfg, &dir).await?;
            if applied.is_empty() {
                println!("No pending migrations.");
            } else {
                for version in &applied {
                    println!("Applied {}", version);
                }
            }
        }
        Commands::Analyze { input, json } => {
            add::run_analyze(&cfg, input.text, input.file.as_deref(), input.url, json).await?;
        }
        Commands::Add { input } => {
            add::run_add(&cfg, input.text, input.file.as_deref(), input.url).await?;
        }
        Commands::List { filters, json } => {
            list::run_list(&cfg, &filters.into(), json).await?;
        }
        Commands::Search { query, json } => {
            search::run_search(&cfg, &query, json).await?;
        }
        Commands::Get { name, json } => {
            get::run_get(&cfg, &name, json).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Radar { filters, json } => {
            list::run_radar(&cfg, &filters.into(), json).await?;
        }
        Commands::Compare { names } => {
            add::run_compare(&cfg, &names).await?;
        }
        Commands::Export {
            format,
            search,
            output,
        } => {
            export::run_export(&cfg, &format, search.as_deref(), output.as_deref()).await?;
        }
        Commands::Backup { dir } => {
            backup::run_backup(&cfg, dir.as_deref()).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
