//! cadence: clone libraries, programs, and their parts from the command line.
//!
//! ```bash
//! cadence clone program 0190f1c4-... --attributes '{"name":"Leaves (live)"}'
//! cadence clone chord 0190f1c4-... --attributes '{"position":8.0}' --voicing-types bass
//! ```

use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use cadence_core::defaults;
use cadence_db::{
    log_pool_metrics, AccessContext, AggregateKind, ClonedAggregate, Database, HubGate,
    InstrumentType, PoolConfig, RootOverrides, UserRole,
};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(author, version, about = "Clone cadence content with its whole entity graph")]
#[command(propagate_version = true)]
struct Cli {
    /// Apply pending migrations before running the command
    #[arg(long, global = true)]
    migrate: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone an aggregate root and everything it owns
    Clone {
        /// Aggregate to clone: library, instrument, program, template, sequence, pattern, chord
        aggregate: AggregateKind,

        /// Id of the source root
        source_id: Uuid,

        /// JSON object of root attributes to override
        #[arg(short, long)]
        attributes: Option<String>,

        /// Chords only: clone voicings of these instrument types only
        #[arg(long, value_delimiter = ',')]
        voicing_types: Vec<InstrumentType>,

        #[command(flatten)]
        caller: Caller,
    },
}

/// Who is asking. Without any account or role the caller is internal.
#[derive(clap::Args)]
struct Caller {
    /// User id of the caller
    #[arg(long)]
    user_id: Option<Uuid>,

    /// Account the caller belongs to (can specify multiple)
    #[arg(long = "account-id")]
    account_ids: Vec<Uuid>,

    /// Role of the caller (can specify multiple)
    #[arg(long = "role")]
    roles: Vec<UserRole>,
}

impl Caller {
    fn context(&self) -> AccessContext {
        if self.account_ids.is_empty() && self.roles.is_empty() {
            return AccessContext::internal();
        }
        AccessContext::for_accounts(
            self.user_id.unwrap_or_default(),
            self.account_ids.clone(),
            self.roles.clone(),
        )
    }
}

fn overrides(
    aggregate: AggregateKind,
    attributes: Option<&str>,
    voicing_types: Vec<InstrumentType>,
) -> anyhow::Result<RootOverrides> {
    let voicing_types = (!voicing_types.is_empty()).then_some(voicing_types);
    if aggregate != AggregateKind::Chord && voicing_types.is_some() {
        anyhow::bail!("--voicing-types only applies to chord clones");
    }

    let Some(raw) = attributes else {
        return Ok(match aggregate {
            AggregateKind::Chord => RootOverrides::Chord {
                attributes: Default::default(),
                voicing_types,
            },
            other => RootOverrides::empty(other),
        });
    };

    let value: serde_json::Value =
        serde_json::from_str(raw).context("--attributes is not valid JSON")?;
    let tagged = match (aggregate, value) {
        (AggregateKind::Chord, attributes) => serde_json::json!({
            "aggregate": "chord",
            "attributes": attributes,
            "voicing_types": voicing_types,
        }),
        (other, serde_json::Value::Object(mut map)) => {
            map.insert("aggregate".to_string(), other.to_string().into());
            serde_json::Value::Object(map)
        }
        _ => anyhow::bail!("--attributes must be a JSON object"),
    };
    serde_json::from_value(tagged).context("--attributes does not match the aggregate")
}

fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors
    //   RUST_LOG    - standard env filter (default: defaults::LOG_FILTER)
    let log_format =
        std::env::var("LOG_FORMAT").unwrap_or_else(|_| defaults::LOG_FORMAT.to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| defaults::LOG_FILTER.into());

    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("cadence.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Logs go to stderr so stdout carries only the cloned JSON.
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        subsystem = "cli",
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stderr)"),
        "Logging initialized"
    );
    guard
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| defaults::DATABASE_URL.to_string());
    let db = Database::connect_with_config(&database_url, PoolConfig::from_env()?)
        .await
        .context("Failed to connect to database")?;
    log_pool_metrics(db.pool());

    if cli.migrate {
        db.migrate().await.context("Failed to run migrations")?;
        info!(subsystem = "cli", "Migrations applied");
    }

    match cli.command {
        Commands::Clone {
            aggregate,
            source_id,
            attributes,
            voicing_types,
            caller,
        } => {
            let overrides = overrides(aggregate, attributes.as_deref(), voicing_types)?;
            let manager = db.clone_manager(HubGate::new());
            let cloned: ClonedAggregate = manager
                .clone(&caller.context(), aggregate, source_id, overrides)
                .await?;
            println!("{}", serde_json::to_string_pretty(&cloned)?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _file_guard = init_logging();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            warn!(subsystem = "cli", error = %e, "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
