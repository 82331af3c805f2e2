//! CLI for the upq upload manager.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use upq_core::config::{self, UploadSettings};

use commands::{run_send, run_status};

/// Top-level CLI for the upq upload manager.
#[derive(Debug, Parser)]
#[command(name = "upq")]
#[command(about = "upq: queued multipart upload manager", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Upload one or more files to a receiver endpoint.
    Send {
        /// Files to upload, in order.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Receiver endpoint URL.
        #[arg(long)]
        receiver: String,

        /// Status monitor endpoint URL (defaults to the receiver).
        #[arg(long)]
        monitor: Option<String>,

        /// Extra query parameter appended to every request. Repeatable.
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Force the multi-file batch transport.
        #[arg(long)]
        batch: bool,

        /// Poll the monitor every N milliseconds (default from config).
        #[arg(long, value_name = "MS")]
        interval: Option<u64>,

        /// Skip files larger than this many bytes.
        #[arg(long, value_name = "BYTES")]
        max_size: Option<u64>,
    },

    /// Query the status monitor for one upload.
    Status {
        /// Status monitor endpoint URL.
        #[arg(long)]
        monitor: String,

        /// Process id of the send operation.
        #[arg(long)]
        pid: String,

        /// Upload index within the send operation.
        #[arg(long, default_value = "0", value_name = "N")]
        upload_index: u64,

        /// Ask the server to cancel the upload instead of reporting it.
        #[arg(long)]
        cancel: bool,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Send {
                files,
                receiver,
                monitor,
                params,
                batch,
                interval,
                max_size,
            } => {
                let settings = UploadSettings {
                    receiver,
                    monitor,
                    parameters: parse_params(&params)?,
                    maximum_size: max_size,
                    progress_interval_ms: interval,
                    ..UploadSettings::default()
                };
                run_send(&cfg, files, settings, batch).await?;
            }
            CliCommand::Status {
                monitor,
                pid,
                upload_index,
                cancel,
            } => run_status(&monitor, &pid, upload_index, cancel).await?,
        }

        Ok(())
    }
}

fn parse_params(raw: &[String]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .with_context(|| format!("invalid --param '{}': expected KEY=VALUE", pair))
        })
        .collect()
}

#[cfg(test)]
mod tests;
