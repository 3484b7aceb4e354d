//! Rungs approval resolver.
//!
//! Loads a metadata snapshot, connects to the approval fact store and runs
//! one approval command as the given user, printing JSON to stdout. Logs go
//! to stderr. Failures print an error body to stdout and exit non-zero.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use rungs_core::approval::{ApprovalSettings, ApprovalStateResolver, DataApprovalService};
use rungs_core::snapshot::MetadataSnapshot;
use rungs_db::migration::{Migrator, MigratorTrait};
use rungs_db::{DataApprovalRepository, connect};
use rungs_shared::{AppConfig, AppError, ErrorBody};
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rungs")]
#[command(about = "Hierarchical data approval state resolution", long_about = None)]
struct Cli {
    /// Metadata snapshot (JSON)
    #[arg(long, short)]
    snapshot: PathBuf,

    /// Username of the acting user, as listed in the snapshot
    #[arg(long, short)]
    user: String,

    /// Run pending migrations before the command
    #[arg(long)]
    migrate: bool,

    #[command(subcommand)]
    command: Command,
}

/// Workflow and period every command acts on.
#[derive(Args)]
struct Target {
    /// Workflow UID or name
    #[arg(long)]
    workflow: String,

    /// ISO period code, e.g. 202401
    #[arg(long)]
    period: String,
}

#[derive(Args)]
struct ActionArgs {
    #[command(flatten)]
    target: Target,

    /// Org unit UIDs to act on
    #[arg(long = "org-unit", required = true)]
    org_units: Vec<String>,

    /// Attribute option combo UID
    #[arg(long)]
    combo: String,

    /// Approval level number; defaults to each pair's action level
    #[arg(long)]
    level: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve approval statuses with permissions
    Status {
        #[command(flatten)]
        target: Target,

        /// Only this org unit (UID)
        #[arg(long)]
        org_unit: Option<String>,

        /// Only option combos of this category combo (UID)
        #[arg(long)]
        category_combo: Option<String>,
    },

    /// Approve data
    Approve(ActionArgs),

    /// Withdraw approvals
    Unapprove(ActionArgs),

    /// Accept approvals
    Accept(ActionArgs),

    /// Withdraw acceptances
    Unaccept(ActionArgs),

    /// Check whether a pair is approved at its lowest applicable level
    IsApproved {
        #[command(flatten)]
        target: Target,

        /// Org unit UID
        #[arg(long)]
        org_unit: String,

        /// Attribute option combo UID
        #[arg(long)]
        combo: String,
    },
}

impl Command {
    const fn target(&self) -> &Target {
        match self {
            Self::Status { target, .. } | Self::IsApproved { target, .. } => target,
            Self::Approve(args)
            | Self::Unapprove(args)
            | Self::Accept(args)
            | Self::Unaccept(args) => &args.target,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match execute(cli).await {
        Ok(output) => {
            println!("{output:#}");
            ExitCode::SUCCESS
        }
        Err(body) => {
            error!(error = body.error, message = %body.message, "Command failed");
            println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
            ExitCode::from(body.exit_code())
        }
    }
}

async fn execute(cli: Cli) -> Result<Value, ErrorBody> {
    let config = AppConfig::load().map_err(AppError::from)?;

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let json = std::fs::read_to_string(&cli.snapshot).map_err(|e| {
        AppError::Validation(format!("Failed to read snapshot {}: {e}", cli.snapshot.display()))
    })?;
    let loaded = MetadataSnapshot::from_json(&json)
        .and_then(MetadataSnapshot::load)
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let target = cli.command.target();
    let workflow = loaded
        .workflow(&target.workflow)
        .ok_or_else(|| AppError::NotFound(format!("workflow '{}'", target.workflow)))?
        .clone();
    let period = loaded
        .period(&target.period)
        .ok_or_else(|| AppError::NotFound(format!("period '{}'", target.period)))?
        .clone();
    let user = loaded
        .user(&cli.user)
        .ok_or_else(|| AppError::NotFound(format!("user '{}'", cli.user)))?
        .clone();

    let db = connect(&config.database)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    info!("Connected to database");
    if cli.migrate {
        Migrator::up(&db, None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        info!("Migrations applied");
    }

    let resolver = ApprovalStateResolver::new(
        Arc::new(DataApprovalRepository::new(db)),
        Arc::new(loaded.metadata),
    );
    let service = DataApprovalService::new(resolver, ApprovalSettings::from(&config.approval));

    commands::run(cli.command, &service, &workflow, &period, &user).await
}
