//! `cbsync` entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Wire observability**: `tracing-subscriber` with an `EnvFilter`
//!    (default `info`) and either the human-readable or the JSON formatter.
//! 2. **Construct the cluster**: an in-memory cluster, seeded from a JSON
//!    fixture when one is given, injected into the connection as its
//!    connector.
//! 3. **Run one command**: open the connection and the bucket, perform a
//!    single blocking operation, print its result as JSON, close.

mod args;

use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use cluster::{CoreError, DocumentId};
use connection::Connection;
use memory_cluster::{Fixture, MemoryCluster};
use serde_json::{json, Value};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::args::{Cli, Command};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn parse_json(what: &str, text: &str) -> Result<Value> {
    serde_json::from_str(text).with_context(|| format!("{what} is not valid JSON"))
}

/// Cluster options with an authenticator filled in from the flags.
fn cluster_options(cli: &Cli) -> Result<Value> {
    let mut options = parse_json("--options", &cli.options)?;
    let Some(map) = options.as_object_mut() else {
        anyhow::bail!("--options must be a JSON object");
    };
    map.entry("authenticator").or_insert_with(|| {
        json!({
            "type": "password",
            "username": cli.username,
            "password": cli.password,
        })
    });
    Ok(options)
}

fn memory_cluster(cli: &Cli) -> Result<MemoryCluster> {
    match &cli.fixture {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("unable to read fixture {}", path.display()))?;
            let fixture = Fixture::from_json(&text)?;
            let cluster = MemoryCluster::from_fixture(&fixture)?;
            info!(
                fixture = %path.display(),
                buckets = fixture.buckets.len(),
                "Cluster seeded from fixture"
            );
            Ok(cluster)
        }
        None => Ok(MemoryCluster::new().with_bucket(&cli.bucket)),
    }
}

fn request_options(text: Option<&str>) -> Result<Option<Value>> {
    text.map(|text| parse_json("--options", text)).transpose()
}

/// Logs the diagnostics of a failed operation before it is reported.
fn report(err: CoreError) -> anyhow::Error {
    if let Some(context) = &err.context {
        let context = serde_json::to_string(context).unwrap_or_default();
        warn!(error_code = err.code.value(), %context, "Operation failed");
    }
    err.into()
}

fn run(cli: &Cli, connection: &Connection) -> Result<Value> {
    let id = |key: &str| DocumentId::in_default_collection(cli.bucket.as_str(), key);
    let output = match &cli.command {
        Command::Get { key, options } => {
            let options = request_options(options.as_deref())?;
            let result = connection
                .document_get(id(key), options.as_ref())
                .map_err(report)?;
            serde_json::to_value(result)?
        }
        Command::Exists { key } => {
            let result = connection.document_exists(id(key), None).map_err(report)?;
            serde_json::to_value(result)?
        }
        Command::Upsert {
            key,
            value,
            flags,
            options,
        } => {
            let options = request_options(options.as_deref())?;
            let result = connection
                .document_upsert(id(key), value, *flags, options.as_ref())
                .map_err(report)?;
            serde_json::to_value(result)?
        }
        Command::Remove { key } => {
            let result = connection.document_remove(id(key), None).map_err(report)?;
            serde_json::to_value(result)?
        }
        Command::Query { statement, options } => {
            let options = request_options(options.as_deref())?;
            let result = connection
                .query(statement, options.as_ref())
                .map_err(report)?;
            serde_json::to_value(result)?
        }
        Command::Version => json!({ "version": connection.cluster_version(&cli.bucket) }),
    };
    Ok(output)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let options = cluster_options(&cli)?;
    let cluster = memory_cluster(&cli)?;
    let connection = Connection::create(&cli.connection_string, &options, cluster.connector())
        .context("unable to connect")?;
    if !matches!(cli.command, Command::Version) {
        connection.bucket_open(&cli.bucket)?;
    }

    let outcome = run(&cli, &connection);
    connection.close()?;

    let output = outcome?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connect(cli: &Cli, cluster: &MemoryCluster) -> Connection {
        let options = cluster_options(cli).unwrap();
        let connection =
            Connection::create(&cli.connection_string, &options, cluster.connector()).unwrap();
        connection.bucket_open(&cli.bucket).unwrap();
        connection
    }

    #[test]
    fn exists_prints_every_response_field() {
        let cli = Cli::parse_from(["cbsync", "--bucket", "travel", "exists", "airline_10"]);
        let cluster = memory_cluster(&cli).unwrap();
        let id = DocumentId::in_default_collection("travel", "airline_10");
        cluster
            .insert_document(&id, r#"{"name":"40-Mile Air"}"#, 7)
            .unwrap();
        let connection = connect(&cli, &cluster);

        let output = run(&cli, &connection).unwrap();
        assert_eq!(output["exists"], true);
        assert_eq!(output["deleted"], false);
        assert_eq!(output["flags"], 7);
        assert!(output.get("datatype").is_some());
        assert!(output.get("sequenceNumber").is_some());
        connection.close().unwrap();
    }

    #[test]
    fn exists_reports_missing_document_as_absent() {
        let cli = Cli::parse_from(["cbsync", "--bucket", "travel", "exists", "nobody"]);
        let cluster = memory_cluster(&cli).unwrap();
        let connection = connect(&cli, &cluster);

        let output = run(&cli, &connection).unwrap();
        assert_eq!(output["exists"], false);
        assert_eq!(output["cas"], "0");
        connection.close().unwrap();
    }
}
