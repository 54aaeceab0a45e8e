//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Blocking document operations against a cluster.
#[derive(Parser, Debug)]
#[command(name = "cbsync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[arg(long, default_value = "couchbase://127.0.0.1")]
    pub connection_string: String,

    /// Cluster options as a JSON object, e.g. '{"bootstrapTimeout":2000}'
    #[arg(long, default_value = "{}")]
    pub options: String,

    /// Used when the options carry no authenticator
    #[arg(long, default_value = "Administrator")]
    pub username: String,

    #[arg(long, default_value = "password")]
    pub password: String,

    #[arg(long, default_value = "default")]
    pub bucket: String,

    /// JSON fixture seeding the in-memory cluster
    #[arg(long)]
    pub fixture: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch a document
    Get {
        key: String,
        /// Per-request options as a JSON object
        #[arg(long)]
        options: Option<String>,
    },

    /// Check whether a document exists
    Exists { key: String },

    /// Store a document
    Upsert {
        key: String,
        value: String,
        #[arg(long, default_value_t = 0)]
        flags: u32,
        #[arg(long)]
        options: Option<String>,
    },

    /// Remove a document
    Remove { key: String },

    /// Run a N1QL statement
    Query {
        statement: String,
        #[arg(long)]
        options: Option<String>,
    },

    /// Print the version of the first cluster node
    Version,
}
