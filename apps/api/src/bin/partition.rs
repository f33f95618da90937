//! Offline corpus partitioner.
//!
//! Splits a flat course dump into one `<Department>.json` file per
//! department, the layout the API reads its course lists from.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use coursepath_api::corpus::{list_departments, partition_courses};

#[derive(Parser)]
#[command(
    name = "coursepath-partition",
    version,
    about = "Split a course dump into per-department course files."
)]
struct Cli {
    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write one JSON file per department.
    Split {
        /// Path to the flat course JSON array.
        input: PathBuf,

        /// Output directory for department files.
        #[arg(short, long, env = "DEPARTMENTS_DIR", default_value = "departments")]
        out: PathBuf,

        /// Print the partition report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the distinct department names found in the dump.
    List {
        /// Path to the flat course JSON array.
        input: PathBuf,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("coursepath_api={level},coursepath_partition={level}"))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Split { input, out, json } => {
            let report = partition_courses(&input, &out)
                .with_context(|| format!("Failed to partition {}", input.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for group in &report.groups {
                    println!("{:>6}  {}", group.courses, group.file.display());
                }
                println!(
                    "{} courses, {} department files",
                    report.total_courses,
                    report.groups.len()
                );
            }

            if !report.failed.is_empty() {
                for failed in &report.failed {
                    eprintln!("failed: {}: {}", failed.department, failed.error);
                }
                bail!("{} department files could not be written", report.failed.len());
            }
        }
        Command::List { input } => {
            let departments = list_departments(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            for department in departments {
                println!("{department}");
            }
        }
    }

    Ok(())
}
