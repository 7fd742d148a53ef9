use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;

use spanstore::config::Config;
use spanstore::engine::{self, Direction, Store};
use spanstore::model::{Interval, IntervalId, Ms, Priority, Span};

/// Prioritized interval store.
///
/// Times are Unix milliseconds. Storage location and compaction are configured through
/// `SPANSTORE_*` environment variables.
#[derive(Debug, Parser)]
#[command(name = "spanstore", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Add one interval and commit.
    Add {
        #[arg(long)]
        id: IntervalId,
        #[arg(long)]
        start: Ms,
        #[arg(long)]
        end: Ms,
        #[arg(long)]
        priority: Priority,
        /// Stored as UTF-8 bytes.
        #[arg(long, default_value = "")]
        payload: String,
    },
    /// List intervals intersecting a window.
    Find {
        #[arg(long)]
        start: Ms,
        #[arg(long)]
        end: Ms,
        #[arg(long, default_value_t = f64::INFINITY)]
        max_priority: Priority,
        /// Order by descending end instead of ascending start.
        #[arg(long)]
        reverse: bool,
    },
    /// Find the first (or last) contiguous run reaching a minimum duration.
    FindSet {
        #[arg(long)]
        start: Ms,
        #[arg(long)]
        end: Ms,
        #[arg(long)]
        min_duration: Ms,
        #[arg(long, default_value_t = f64::INFINITY)]
        max_priority: Priority,
        /// Search from the end of the window.
        #[arg(long)]
        last: bool,
        /// Treat uncovered time as free intervals.
        #[arg(long)]
        fill_gaps: bool,
    },
    /// Check whether a span overlaps any occupied interval.
    Conflicts {
        #[arg(long)]
        start: Ms,
        #[arg(long)]
        end: Ms,
    },
    /// Rewrite the WAL from the current state.
    Compact,
    /// Print store statistics.
    Stats,
}

fn row(interval: &Interval) -> serde_json::Value {
    json!({
        "id": interval.id,
        "start": interval.span.start,
        "end": interval.span.end,
        "priority": interval.priority,
        "payload": String::from_utf8_lossy(&interval.payload),
        "synthetic": interval.synthetic,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = Config::from_env();
    spanstore::observability::init(config.metrics_port)?;

    let store = Store::from_config(&config)?;
    info!("wal: {}", config.wal_path().display());

    match cli.command {
        Command::Add {
            id,
            start,
            end,
            priority,
            payload,
        } => {
            let mut tx = store.begin_write().await;
            tx.add(Interval::new(id, Span::new(start, end), priority, payload.into_bytes()))?;
            tx.commit().await?;
        }
        Command::Find {
            start,
            end,
            max_priority,
            reverse,
        } => {
            let tx = store.begin_read().await;
            let found = if reverse {
                tx.find_rev(start, end, max_priority)?
            } else {
                tx.find_fwd(start, end, max_priority)?
            };
            for interval in &found {
                println!("{}", row(interval));
            }
        }
        Command::FindSet {
            start,
            end,
            min_duration,
            max_priority,
            last,
            fill_gaps,
        } => {
            let tx = store.begin_read().await;
            let direction = Direction::from_first(!last);
            let set = if fill_gaps {
                engine::find_set_with_gaps(&tx, direction, start, end, min_duration, max_priority)?
            } else {
                engine::find_set(&tx, direction, start, end, min_duration, max_priority)?
            };
            match set {
                Some(set) => {
                    for interval in &set {
                        println!("{}", row(interval));
                    }
                }
                None => info!("no run of {min_duration}ms in [{start}, {end})"),
            }
        }
        Command::Conflicts { start, end } => {
            let tx = store.begin_read().await;
            let candidate = Interval::new(0, Span::new(start, end), 0.0, Vec::new());
            println!("{}", json!({ "conflicts": engine::conflicts(&tx, &candidate)? }));
        }
        Command::Compact => {
            store.compact_wal().await?;
        }
        Command::Stats => {
            let tx = store.begin_read().await;
            println!("{}", json!({ "intervals": tx.len() }));
        }
    }
    Ok(())
}
