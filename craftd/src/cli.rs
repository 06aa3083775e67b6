//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::domain::RequestStatus;

/// craftd - craft request daemon
#[derive(Parser)]
#[command(
    name = "craftd",
    about = "Craft request daemon: one request, many crafters, first claim wins",
    version = env!("GIT_DESCRIBE"),
    after_help = after_help()
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Daemon socket, overriding the config
    #[arg(short, long, global = true, help = "Path to the daemon socket")]
    pub socket: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the daemon in the foreground
    Serve {
        /// Render surfaces in memory instead of calling Discord
        #[arg(long)]
        dry_run: bool,
    },

    /// Ping the daemon to check if it's alive and responsive
    Ping,

    /// Stop the daemon
    Stop,

    /// Show request counts per status
    Status {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show one request
    Show {
        /// Request ID
        id: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Post the "Request Craft" card in a channel
    EntryPoint {
        /// Channel ID
        channel: String,
    },

    /// Submit a craft request
    Submit {
        /// Requesting user ID
        #[arg(short, long)]
        user: String,

        /// Item to craft
        item: String,

        /// Extra notes for the crafter
        #[arg(short, long)]
        notes: Option<String>,

        /// Confirmation that the order was placed in-game (type YES)
        #[arg(long, default_value = "")]
        confirm: String,
    },

    /// Claim a request
    Accept {
        /// Request ID
        id: String,

        /// Crafter user ID
        #[arg(short, long)]
        user: String,
    },

    /// Move a claimed request forward (in_progress, ready_for_pickup)
    Advance {
        /// Request ID
        id: String,

        /// Target status
        status: RequestStatus,

        /// Accepter user ID
        #[arg(short, long)]
        user: String,
    },

    /// Press a control by its custom id (craft:start, craft:accept:<ID>, ...)
    Press {
        /// Control custom id
        custom_id: String,

        /// Pressing user ID
        #[arg(short, long)]
        user: String,
    },

    /// Mark a request ready for pickup with an optional note
    Complete {
        /// Request ID
        id: String,

        /// Accepter user ID
        #[arg(short, long)]
        user: String,

        /// Note for the requester
        #[arg(short, long)]
        note: Option<String>,
    },
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("craftd")
        .join("logs")
        .join("craftd.log")
}

fn after_help() -> String {
    format!("Logs are written to: {}", get_log_path().display())
}

/// Output format for status/show commands
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}
