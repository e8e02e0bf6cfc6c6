//! Logging initialization and configuration
//!
//! Sets up the tracing subscriber for the food hall services. The filter
//! comes from `RUST_LOG` when set, otherwise from the configured level.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    #[default]
    Pretty,
    /// One JSON object per line, for log shipping
    Json,
    /// Single-line human format
    Compact,
}

impl LogFormat {
    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
            Self::Compact => "compact",
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown log format: {}", s))
    }
}

/// Build the filter, preferring `RUST_LOG` over the configured level
fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the logging system
///
/// Fails if a global subscriber is already installed.
///
/// ```ignore
/// use observability::{init_logging, LogFormat};
///
/// init_logging("foodhall", LogFormat::Json, "info,ticketing=debug")?;
/// tracing::info!("Service started");
/// ```
pub fn init_logging(
    service_name: &str,
    format: LogFormat,
    default_level: &str,
) -> anyhow::Result<()> {
    let env_filter = build_filter(default_level);

    match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(true),
            )
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_current_span(true))
            .try_init()?,
        LogFormat::Compact => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().compact().with_target(false))
            .try_init()?,
    }

    tracing::info!(
        service = service_name,
        format = format.as_str(),
        "Logging initialized"
    );

    Ok(())
}
