//! # CLI Interface
//!
//! Command-line arguments for `lumentix-node`, defined with `clap` derive.
//! Subcommands: `run`, `status`, and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use lumentix_core::config;

use crate::logging::LogFormat;

/// Lumentix ticketing node.
///
/// Serves the ticket issuance and transfer API. Verifies payments against
/// the payments service and Horizon before minting tickets.
#[derive(Parser, Debug)]
#[command(
    name = "lumentix-node",
    about = "Lumentix ticketing service node",
    version,
    propagate_version = true
)]
pub struct LumentixCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the API server.
    Run(RunArgs),
    /// Query the health endpoint of a running node.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Directory holding the ticket database. Created if missing.
    #[arg(long, short = 'd', env = "LUMENTIX_DATA_DIR", default_value = "./lumentix-data")]
    pub data_dir: PathBuf,

    /// Port for the ticket HTTP API.
    #[arg(long, env = "LUMENTIX_API_PORT", default_value_t = config::DEFAULT_API_PORT)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "LUMENTIX_METRICS_PORT", default_value_t = config::DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Base URL of the payments service.
    #[arg(long, env = "LUMENTIX_PAYMENTS_URL", default_value = config::DEFAULT_PAYMENTS_URL)]
    pub payments_url: String,

    /// Horizon endpoint used to fetch chain transactions.
    #[arg(long, env = "LUMENTIX_HORIZON_URL", default_value = config::DEFAULT_HORIZON_URL)]
    pub horizon_url: String,

    /// Timeout, in seconds, for each call to the payments service or Horizon.
    #[arg(
        long,
        env = "LUMENTIX_UPSTREAM_TIMEOUT_SECS",
        default_value_t = config::DEFAULT_UPSTREAM_TIMEOUT.as_secs()
    )]
    pub upstream_timeout_secs: u64,

    /// Log output format.
    #[arg(long, env = "LUMENTIX_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// API endpoint of the running node.
    #[arg(long, default_value = "http://127.0.0.1:8640")]
    pub api_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        LumentixCli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = LumentixCli::try_parse_from(["lumentix-node", "run"]).unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.api_port, config::DEFAULT_API_PORT);
                assert_eq!(args.horizon_url, config::DEFAULT_HORIZON_URL);
                assert_eq!(args.log_format, LogFormat::Pretty);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn json_log_format_flag() {
        let cli =
            LumentixCli::try_parse_from(["lumentix-node", "run", "--log-format", "json"]).unwrap();
        match cli.command {
            Commands::Run(args) => assert_eq!(args.log_format, LogFormat::Json),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
