//! Referee Tally Export - offline reconstruction CLI
//!
//! Turns a finished group's per-event score logs back into timeline
//! documents: plain relative-time logs, caption tracks for video overlay,
//! final standings, and contestant listings.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reftally_common::{config, report};
use reftally_export::captions::CaptionMode;
use reftally_export::export::{export_group, ExportOptions};

/// Command-line arguments for reftally-export
#[derive(Parser, Debug)]
#[command(name = "reftally-export")]
#[command(about = "Offline timeline reconstruction for referee score logs")]
#[command(version)]
struct Cli {
    /// Directory holding per-group score logs
    #[arg(short, long, env = "REFTALLY_DATA_DIR")]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render timeline documents for one group
    Export {
        /// Group whose logs to reconstruct
        group: String,

        /// Output directory
        #[arg(short, long, default_value = "export")]
        out: PathBuf,

        /// Write the plain tab-separated log
        #[arg(long)]
        txt: bool,

        /// Write the caption document
        #[arg(long)]
        srt: bool,

        /// Caption rendering mode
        #[arg(long, value_enum, default_value_t = CaptionMode::Total)]
        mode: CaptionMode,
    },

    /// Print final standings across all groups as JSON
    Report,

    /// List contestants with scored records in one group
    Players {
        /// Group to inspect
        group: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reftally_export=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let file_config = config::load_file_config();
    let data_dir = config::resolve_data_dir(cli.data_dir.as_deref(), &file_config);

    match cli.command {
        Commands::Export {
            group,
            out,
            txt,
            srt,
            mode,
        } => {
            if !txt && !srt {
                bail!("nothing to export: pass --txt and/or --srt");
            }
            let options = ExportOptions { txt, srt, mode };
            let summary = export_group(&data_dir, &out, &group, &options)?;
            println!(
                "{} file(s) written for {} contestant/referee pair(s)",
                summary.files.len(),
                summary.pairs
            );
            for path in &summary.files {
                println!("  {}", path.display());
            }
        }
        Commands::Report => {
            let rows = report::load_report(&data_dir);
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Commands::Players { group } => {
            for player in report::scored_players(&data_dir, &group) {
                println!("{player}");
            }
        }
    }

    Ok(())
}
