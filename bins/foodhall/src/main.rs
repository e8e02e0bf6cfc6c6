//! Food hall ticketing service binary
//!
//! Entry point for serving the ticketing HTTP API, printing daily summaries
//! and writing CSV reports, plus config initialisation and validation.

mod refresher;
mod shutdown;
mod wiring;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use cli::{Cli, Commands, ReportArg};
use config::{
    generate_default_config, load_config, save_config, validate_config, FoodhallConfig,
};
use observability::{init_logging, init_metrics, LogFormat};
use std::fs;
use std::path::{Path, PathBuf};
use ticketing::api::models::SummaryResponse;
use ticketing::api::{create_router, ApiState};
use ticketing::ReportKind;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Serve {
            config,
            port,
            log_format,
        } => serve(config, port, log_format).await,
        Commands::Summary { config, date } => summary_command(config, date).await,
        Commands::Report {
            config,
            kind,
            date,
            output,
        } => report_command(config, kind, date, output).await,
        Commands::Validate { config } => {
            init_logging("foodhall", LogFormat::Pretty, "warn")?;
            validate_command(config).await
        }
        Commands::Init { output } => {
            init_logging("foodhall", LogFormat::Pretty, "info")?;
            init_command(output).await
        }
    }
}

/// Load the config, start logging from it and refuse to continue on errors
fn load_checked(path: &Path, log_format: Option<&str>) -> Result<FoodhallConfig> {
    let config = load_config(path)?;

    let format = log_format
        .or(Some(config.logging.format.as_str()))
        .and_then(LogFormat::parse)
        .unwrap_or(LogFormat::Pretty);
    init_logging(&config.service.name, format, &config.logging.level)?;
    debug!(?path, "Configuration file read");

    let report = validate_config(&config);
    for warning in &report.warnings {
        warn!(field = %warning.field, message = %warning.message, "Configuration warning");
    }
    if !report.is_valid() {
        error!(
            error_count = report.errors.len(),
            "Configuration validation failed"
        );
        for err in &report.errors {
            error!("{}", err);
        }
        anyhow::bail!("Cannot continue due to configuration errors");
    }

    Ok(config)
}

async fn serve(config_path: PathBuf, port: Option<u16>, log_format: Option<String>) -> Result<()> {
    let mut config = load_checked(&config_path, log_format.as_deref())?;
    if let Some(port) = port {
        config.server.http_port = port;
    }

    if config.metrics.enabled {
        init_metrics(config.metrics.port).context("Failed to start metrics exporter")?;
        info!(port = config.metrics.port, "Prometheus exporter listening");
    }

    let services = wiring::build_services(&config).await?;
    let token = shutdown::shutdown_signal();

    let refresher = tokio::spawn(refresher::run_summary_refresher(
        services.clone(),
        token.child_token(),
    ));

    let app = create_router(ApiState::new(services));
    let addr = config.server.http_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(service = %config.service.name, %addr, "HTTP server listening");

    let server_token = token.child_token();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            server_token.cancelled().await;
            info!("HTTP server received shutdown signal");
        })
        .await
        .context("HTTP server failed")?;

    token.cancel();
    if let Err(e) = refresher.await {
        warn!("Summary refresher ended abnormally: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}

async fn summary_command(config_path: PathBuf, date: Option<NaiveDate>) -> Result<()> {
    let config = load_checked(&config_path, None)?;
    let services = wiring::build_services(&config).await?;

    let summary = services
        .aggregation
        .summarize_strict(date)
        .await
        .context("Failed to compute summary")?;
    let response = SummaryResponse::from(summary);

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn report_command(
    config_path: PathBuf,
    kind: ReportArg,
    date: Option<NaiveDate>,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = load_checked(&config_path, None)?;
    let services = wiring::build_services(&config).await?;

    let kind = match kind {
        ReportArg::Summary => ReportKind::Summary,
        ReportArg::Vendors => ReportKind::Vendors,
    };
    let (date, csv) = services
        .reports
        .render(kind, date)
        .await
        .with_context(|| format!("Failed to build {} report", kind.as_str()))?;

    match output {
        Some(path) => {
            fs::write(&path, csv)
                .with_context(|| format!("Failed to write report: {:?}", path))?;
            info!(?path, %date, "Report written");
        }
        None => print!("{}", csv),
    }

    Ok(())
}

async fn validate_command<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "Failed to load configuration");
            anyhow::bail!(e);
        }
    };

    let report = validate_config(&config);

    println!("\n=== Configuration Validation Report ===\n");

    if !report.defaults_applied.is_empty() {
        println!("Defaults Applied ({}):", report.defaults_applied.len());
        for default in &report.defaults_applied {
            println!("  [info] {} = {}", default.field, default.value);
        }
        println!();
    }

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        println!();
        anyhow::bail!("Configuration validation failed");
    }

    println!("[ok] Configuration is valid!");
    println!();
    println!("Service: {}", config.service.name);
    println!("Currency: {}", config.service.currency);
    println!("Storage: {:?}", config.storage.backend);
    println!("Catalog: {:?}", config.catalog.source);
    println!(
        "Codes: {}-NNNN (tickets), {}-NNNN (orders)",
        config.orders.ticket_code_prefix, config.orders.order_code_prefix
    );

    Ok(())
}

async fn init_command<P: AsRef<Path>>(output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!(?output_path, "Initializing new configuration file");

    let config = generate_default_config();

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
    }

    save_config(&config, output_path)?;

    println!("[ok] Configuration file created successfully!");
    println!();
    println!("Location: {:?}", output_path);
    println!();
    println!("Next steps:");
    println!("  1. Point catalog.seed_path at your vendor and menu seed");
    println!("  2. Set DATABASE_URL if you switch storage.backend to postgres");
    println!(
        "  3. Run 'foodhall validate --config {:?}' to check configuration",
        output_path
    );
    println!(
        "  4. Run 'foodhall serve --config {:?}' to start the service",
        output_path
    );

    Ok(())
}
