use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use halfspace_progression::cache::{CacheKey, ResultCache};
use halfspace_progression::columns::{IN_LHS, IN_RHS, PROGRESSIVE};
use halfspace_progression::drive::{DriveClient, fetch_sources};
use halfspace_progression::halfspace::{HalfSpace, route};
use halfspace_progression::loader::load_table;
use halfspace_progression::progressive::label_progressive;
use halfspace_progression::report::{leaderboard, write_output, write_parquet};
use halfspace_progression::{AggregateOutcome, Config, aggregate};
use polars::prelude::*;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "halfspace-progression",
    about = "Progressive half-space actions per player",
    version
)]
struct Cli {
    /// JSON config file; defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Count progressive half-space passes and carries per player
    Aggregate {
        #[arg(long)]
        passes: PathBuf,

        #[arg(long)]
        carries: PathBuf,

        #[arg(long)]
        minutes: PathBuf,

        /// Write the full table to a .csv or .parquet file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Reuse results while the inputs are unchanged
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Rows shown in the printed leaderboard
        #[arg(long, default_value_t = 20)]
        top: usize,
    },
    /// Label every event of one table as progressive or not
    Progressive {
        #[arg(long)]
        events: PathBuf,

        #[arg(long, value_enum, default_value_t = Side::Any)]
        side: Side,

        /// Write the labelled events to a parquet file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Download the configured Drive CSV exports and convert them to parquet
    Fetch {
        #[arg(long, default_value = "data")]
        out_dir: PathBuf,

        /// Keep the downloaded CSV next to each parquet file
        #[arg(long)]
        keep_csv: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Side {
    Right,
    Left,
    Any,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("halfspace_progression={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Aggregate {
            passes,
            carries,
            minutes,
            output,
            cache_dir,
            top,
        } => {
            let cache = match &cache_dir {
                Some(dir) => {
                    let key = CacheKey::for_inputs(
                        &[passes.as_path(), carries.as_path(), minutes.as_path()],
                        &config.progression,
                    )?;
                    Some((ResultCache::open(dir)?, key))
                }
                None => None,
            };

            let cached = match &cache {
                Some((cache, key)) => cache.get(key)?,
                None => None,
            };

            let mut table = match cached {
                Some(table) => table,
                None => {
                    let outcome = aggregate(
                        &load_table(&passes)?,
                        &load_table(&carries)?,
                        &load_table(&minutes)?,
                        &config.progression,
                    );
                    match outcome {
                        AggregateOutcome::Complete(mut table) => {
                            if let Some((cache, key)) = &cache {
                                cache.put(key, &mut table)?;
                            }
                            table
                        }
                        AggregateOutcome::Partial { table, cause } => {
                            warn!(%cause, "Minutes could not be joined, rates are zero");
                            table
                        }
                        AggregateOutcome::Empty(reason) => {
                            eprintln!("No results: {}", reason);
                            return Ok(());
                        }
                    }
                }
            };

            println!("{}", leaderboard(&table, top)?);
            println!("{} players", table.height());

            if let Some(path) = output {
                write_output(&mut table, &path)?;
                info!(path = %path.display(), "Wrote aggregate table");
            }
        }
        Command::Progressive {
            events,
            side,
            output,
        } => {
            let events = load_table(&events)?;
            let events = match side {
                Side::Right => route(&events, HalfSpace::Right)?,
                Side::Left => route(&events, HalfSpace::Left)?,
                Side::Any => events,
            };

            let mut labelled = label_progressive(&events, &config.progression)?;
            let progressive = labelled
                .column(PROGRESSIVE)?
                .bool()?
                .into_iter()
                .filter(|flag| *flag == Some(true))
                .count();
            println!(
                "{} of {} events are progressive",
                progressive,
                labelled.height()
            );

            let shown: Vec<Expr> = labelled
                .get_column_names()
                .into_iter()
                .filter(|name| *name != IN_RHS && *name != IN_LHS)
                .map(col)
                .collect();
            println!("{}", labelled.clone().lazy().select(shown).limit(10).collect()?);

            if let Some(path) = output {
                if path.extension().and_then(|ext| ext.to_str()) != Some("parquet") {
                    bail!("--output for progressive must be a .parquet file");
                }
                write_parquet(&mut labelled, &path)?;
            }
        }
        Command::Fetch { out_dir, keep_csv } => {
            let client = DriveClient::new()?;
            let summary = fetch_sources(&client, &config.sources, &out_dir, keep_csv)?;
            for path in &summary.converted {
                println!("{}", path.display());
            }
            if !summary.failed.is_empty() {
                bail!(
                    "{} of {} downloads failed: {}",
                    summary.failed.len(),
                    config.sources.len(),
                    summary.failed.join(", ")
                );
            }
        }
    }

    Ok(())
}
