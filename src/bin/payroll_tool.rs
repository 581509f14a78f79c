use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use payroll_store::records::AttendanceRecord;
use payroll_store::store::{AlternativeTimesTracker, StoreLayout};
use payroll_store::{DocumentScope, EntityRecord, PayrollWorkspace, StoreConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "payroll-tool")]
#[command(about = "Maintenance tooling for payroll data directories")]
struct Cli {
    /// Data root holding one directory per entity
    #[arg(long, env = "PAYROLL_ROOT", global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct ScopeArgs {
    #[arg(long)]
    entity: String,
    #[arg(long)]
    owner: Option<String>,
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    month: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// Convert legacy row files and legacy backups into documents
    Migrate {
        /// Limit to these entities (local or collection names)
        #[arg(long = "entity")]
        entities: Vec<String>,
    },
    /// Print the items of one document
    Show {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Print the backup history of one item, newest first
    History {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long)]
        item: String,
    },
    /// Print the alternative clock times recorded for an owner
    Alternatives {
        #[arg(long)]
        owner: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let workspace = PayrollWorkspace::open(StoreConfig::new(cli.root.clone()))
        .context("Failed to open payroll workspace")?;

    match cli.command {
        Command::Migrate { entities } => migrate(&workspace, &entities).await,
        Command::Show { scope } => show(&workspace, &scope).await,
        Command::History { scope, item } => history(&workspace, &scope, &item).await,
        Command::Alternatives { owner } => alternatives(&workspace, &owner).await,
    }
}

async fn migrate(workspace: &PayrollWorkspace, entities: &[String]) -> Result<()> {
    let root = workspace.config().root.clone();
    let migrator = workspace.migrator();
    let report = if entities.is_empty() {
        migrator.migrate(&root).await
    } else {
        let names = entities.iter().map(String::as_str).collect::<Vec<_>>();
        migrator.migrate_entities(&root, &names).await
    }
    .with_context(|| format!("Migration of '{}' aborted", root.display()))?;

    println!(
        "Migrated {} documents and {} backups",
        report.documents_written, report.backups_written
    );
    for failure in &report.failures {
        eprintln!("  failed: {} ({})", failure.path.display(), failure.reason);
    }
    if !report.is_clean() {
        return Err(anyhow!("{} legacy files could not be migrated", report.failures.len()));
    }
    Ok(())
}

fn resolve_scope(
    workspace: &PayrollWorkspace,
    args: &ScopeArgs,
) -> Result<(Arc<dyn payroll_store::sync::EntityHandle>, DocumentScope)> {
    let handle = workspace
        .registry()
        .get(&args.entity)
        .ok_or_else(|| anyhow!("Unknown entity '{}'", args.entity))?;
    let scope = DocumentScope::from_parts(
        handle.scope_shape(),
        args.owner.clone(),
        args.year,
        args.month,
    )
    .with_context(|| format!("Invalid scope for '{}'", args.entity))?;
    Ok((handle, scope))
}

async fn show(workspace: &PayrollWorkspace, args: &ScopeArgs) -> Result<()> {
    let (handle, scope) = resolve_scope(workspace, args)?;
    let items = handle
        .load_json(workspace.file_system(), workspace.config(), &scope)
        .await
        .with_context(|| format!("Failed to load {} {scope}", handle.name()))?;
    println!("{}", serde_json::to_string_pretty(&items)?);
    Ok(())
}

async fn history(workspace: &PayrollWorkspace, args: &ScopeArgs, item: &str) -> Result<()> {
    let (handle, scope) = resolve_scope(workspace, args)?;
    let entries = handle
        .history_json(workspace.file_system(), workspace.config(), &scope, item)
        .await
        .with_context(|| format!("Failed to read history of {} '{item}'", handle.name()))?;
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

async fn alternatives(workspace: &PayrollWorkspace, owner: &str) -> Result<()> {
    let tracker = AlternativeTimesTracker::new(
        workspace.file_system(),
        StoreLayout::new(workspace.config().root.clone(), AttendanceRecord::ENTITY),
    );
    let times = tracker
        .load(owner)
        .await
        .with_context(|| format!("Failed to read alternative times for '{owner}'"))?;
    for time in times {
        println!("{time}");
    }
    Ok(())
}
