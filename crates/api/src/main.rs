use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};

use paksa_config::{LogFormat, Settings};
use paksa_license::{
    Features, LicenseManager, MAX_EXPIRY_DAYS, SystemInfo, current_hardware_id, encode_key,
    hardware_id, hardware_signature,
};

/// Lower bound on how often idle rate-limit entries are dropped.
const RATE_LIMIT_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Parser)]
#[command(name = "paksa-api", version, about = "Paksa AI Assistant API server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Apply database migrations to DATABASE_URL.
    Migrate,
    /// License administration.
    License {
        #[command(subcommand)]
        action: LicenseCommand,
    },
}

#[derive(Debug, Subcommand)]
enum LicenseCommand {
    /// Issue a license key bound to this machine, signed with LICENSE_SECRET.
    Generate {
        #[arg(long)]
        customer_name: String,
        #[arg(long)]
        customer_email: String,
        #[arg(
            long,
            default_value_t = 365,
            value_parser = clap::value_parser!(i64).range(1..=MAX_EXPIRY_DAYS)
        )]
        expiry_days: i64,
        #[arg(long, default_value_t = 1)]
        max_users: u32,
        /// JSON object of features; defaults apply when omitted.
        #[arg(long)]
        features: Option<String>,
    },
    /// Print this machine's hardware id.
    HardwareId {
        /// Hash only MAC address and hostname.
        #[arg(long)]
        compact: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_env().context("invalid configuration")?;
    paksa_observability::init(&settings.log_level, settings.log_format == LogFormat::Json);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(settings).await,
        Command::Migrate => migrate(&settings).await,
        Command::License { action } => license(&settings, action),
    }
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(
        app = %settings.app_name,
        env = settings.app_env.as_str(),
        debug = settings.debug,
        "starting"
    );

    let services = paksa_api::app::build_services(settings.clone()).await?;
    let status = services.license.validate(Utc::now()).await;
    if status.valid {
        tracing::info!(message = %status.message, "license check passed");
    } else {
        tracing::warn!(message = %status.message, "license check failed; licensed features are disabled");
    }

    let pruner = services.rate_limit.as_ref().map(|limiter| {
        limiter.spawn_pruner(settings.rate_limit_period().max(RATE_LIMIT_PRUNE_INTERVAL))
    });

    let app = paksa_api::app::build_app_with(std::sync::Arc::new(services));
    let addr = settings.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    if let Some(pruner) = pruner {
        pruner.abort();
    }
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

async fn migrate(settings: &Settings) -> anyhow::Result<()> {
    let url = settings
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set to run migrations")?;
    let pool = sqlx::PgPool::connect(url)
        .await
        .context("failed to connect to DATABASE_URL")?;
    paksa_infra::run_migrations(&pool)
        .await
        .context("migration failed")?;
    tracing::info!("migrations applied");
    Ok(())
}

fn license(settings: &Settings, action: LicenseCommand) -> anyhow::Result<()> {
    match action {
        LicenseCommand::Generate {
            customer_name,
            customer_email,
            expiry_days,
            max_users,
            features,
        } => {
            let features: Option<Features> = features
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .context("--features must be a JSON object")?;

            let hw = hardware_signature(&current_hardware_id());
            let issuer = LicenseManager::new(None, settings.license_secret.clone(), hw);
            let data = issuer.generate_license(
                &customer_name,
                &customer_email,
                expiry_days,
                max_users,
                features,
                Utc::now(),
            )?;
            tracing::info!(license_id = %data.license_id, expires = %data.expiry_date, "license issued");
            println!("{}", encode_key(&data)?);
        }
        LicenseCommand::HardwareId { compact } => {
            println!("{}", hardware_id(&SystemInfo::collect(), !compact));
        }
    }
    Ok(())
}
