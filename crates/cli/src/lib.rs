use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const DEFAULT_CONFIG: &str = "config/foodhall.yaml";

#[derive(Parser, Debug)]
#[command(name = "foodhall")]
#[command(about = "Food hall order and ticket service")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP service with the given configuration
    Serve {
        /// Path to the configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Override HTTP port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override log format (pretty, json, compact)
        #[arg(long)]
        log_format: Option<String>,
    },

    /// Print the daily summary as JSON
    Summary {
        /// Path to the configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Business day (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Write a CSV report for one business day
    Report {
        /// Path to the configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Which report to produce
        #[arg(short, long, value_enum, default_value = "summary")]
        kind: ReportArg,

        /// Business day (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate configuration without starting the service
    Validate {
        /// Path to the configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },

    /// Initialize a new configuration file with all defaults
    Init {
        /// Output path for the new configuration file
        #[arg(short, long, default_value = "foodhall.yaml")]
        output: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportArg {
    /// One row of day totals
    Summary,

    /// One row per vendor with sales
    Vendors,
}

impl ReportArg {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportArg::Summary => "summary",
            ReportArg::Vendors => "vendors",
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_command() {
        let cli = Cli::try_parse_from([
            "foodhall", "report", "--kind", "vendors", "--date", "2024-05-01",
        ])
        .unwrap();

        match cli.command {
            Commands::Report { kind, date, output, config } => {
                assert_eq!(kind, ReportArg::Vendors);
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 5, 1));
                assert!(output.is_none());
                assert_eq!(config, PathBuf::from(DEFAULT_CONFIG));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from([
            "foodhall", "serve", "--port", "9000", "--log-format", "json",
        ])
        .unwrap();
        match cli.command {
            Commands::Serve { port, log_format, config } => {
                assert_eq!(port, Some(9000));
                assert_eq!(log_format.as_deref(), Some("json"));
                assert_eq!(config, PathBuf::from(DEFAULT_CONFIG));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_date() {
        assert!(Cli::try_parse_from(["foodhall", "summary", "--date", "01/05/2024"]).is_err());
    }
}
