//! Portal CLI
//!
//! Runs GraphQL queries through the request pipeline from the shell:
//!
//! - `portal query files.graphql --variables '{"first": 20}'`
//! - `portal fingerprint files.graphql`
//!
//! Verbosity follows `RUST_LOG` (default `info`).

#![allow(clippy::print_stdout, reason = "CLI tool outputs to stdout")]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use portal_core::{config, logger, Pipeline};
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Executes a query and prints the JSON response
    Query {
        /// File holding the query text, or `-` for stdin
        query_file: PathBuf,
        /// Query variables as a JSON object
        #[arg(long)]
        variables: Option<String>,
        /// Configuration file (defaults to the user config dir)
        #[arg(long, env = "PORTAL_CONFIG")]
        config: Option<PathBuf>,
        /// Print pipeline counters in Prometheus text format after the query
        #[arg(long)]
        print_metrics: bool,
    },
    /// Prints the fingerprint the pipeline would attach to a query
    Fingerprint {
        /// File holding the query text, or `-` for stdin
        query_file: PathBuf,
        /// Query variables as a JSON object
        #[arg(long)]
        variables: Option<String>,
    },
}

fn read_query(source: &Path) -> Result<String> {
    if source == Path::new("-") {
        let mut query = String::new();
        std::io::stdin().read_to_string(&mut query).context("reading query from stdin")?;
        return Ok(query);
    }
    std::fs::read_to_string(source).with_context(|| format!("reading {}", source.display()))
}

fn parse_variables(raw: Option<&str>) -> Result<Value> {
    match raw {
        Some(raw) => serde_json::from_str(raw).context("--variables is not valid JSON"),
        None => Ok(Value::Object(serde_json::Map::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_logging("info");
    let cli = Cli::parse();

    match cli.command {
        Commands::Query { query_file, variables, config, print_metrics } => {
            let metrics = if print_metrics {
                Some(
                    PrometheusBuilder::new()
                        .install_recorder()
                        .context("installing metrics recorder")?,
                )
            } else {
                None
            };

            let query = read_query(&query_file)?;
            let variables = parse_variables(variables.as_deref())?;
            let config = config::load_config(config.as_deref())
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

            let pipeline = Pipeline::from_config(config)?;
            info!("Querying {}", pipeline.endpoint());
            let result = pipeline.execute_json(&query, &variables).await;

            if let Some(handle) = metrics {
                println!("{}", handle.render());
            }
            let body = result?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        },
        Commands::Fingerprint { query_file, variables } => {
            let query = read_query(&query_file)?;
            let variables = parse_variables(variables.as_deref())?;
            println!("{}", portal_core::fingerprint(&query, &variables));
        },
    }

    Ok(())
}
