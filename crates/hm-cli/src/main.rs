//! CLI entry point for the legacy dump migration engine.
//!
//! This binary previews legacy SQL dumps and migrates them into a JSON file
//! datastore.
//!
//! # Usage
//!
//! ```bash
//! hm-migrate [OPTIONS] <COMMAND>
//!
//! # List targets and their fields
//! hm-migrate targets
//!
//! # Preview a dump and cache the preview for review
//! hm-migrate preview --dump legacy.sql --target patients --output preview.json
//!
//! # Execute the reviewed preview
//! hm-migrate execute --dump legacy.sql --preview preview.json --store store.json --user admin
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{WrapErr, eyre};
use hm_core::{Config, FieldMapping, MigrationResult, PreviewData, TargetKind};
use hm_engine::{JsonFileStore, MigrationEngine, MigrationPlan, MigrationUpdate, RowOutcome};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Preview and migrate legacy SQL dumps into the hospital records datastore.
#[derive(Parser)]
#[command(name = "hm-migrate", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Engine configuration file (JSON).
    #[arg(short, long, global = true, env = "HM_MIGRATE_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List migration targets with their fields and dedup keys.
    Targets {
        /// Print the catalog as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Parse a dump and write a preview with a suggested mapping.
    Preview {
        /// Dump file to read.
        #[arg(short, long)]
        dump: Utf8PathBuf,

        /// Migration target (`patients`, `lab_results`).
        #[arg(short, long)]
        target: TargetKind,

        /// Source table to sample (defaults to the first table with valid rows).
        #[arg(long)]
        source_table: Option<String>,

        /// Write the preview JSON here instead of stdout.
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,
    },

    /// Migrate a dump into the datastore.
    Execute {
        /// Dump file to read.
        #[arg(short, long)]
        dump: Utf8PathBuf,

        /// Reviewed preview JSON; supplies target, source table and mapping.
        #[arg(long, conflicts_with = "target", required_unless_present = "target")]
        preview: Option<Utf8PathBuf>,

        /// Migration target, when no preview is given.
        #[arg(short, long)]
        target: Option<TargetKind>,

        /// Mapping JSON (`{"target_field": "source_column"}`), overriding the
        /// suggested one.
        #[arg(short, long)]
        mapping: Option<Utf8PathBuf>,

        /// Source table to migrate.
        #[arg(long)]
        source_table: Option<String>,

        /// Datastore file (created if missing).
        #[arg(short, long, env = "HM_MIGRATE_STORE")]
        store: Utf8PathBuf,

        /// Acting user, recorded on every write.
        #[arg(short, long, env = "HM_MIGRATE_USER")]
        user: String,

        /// Organisational unit to scope dedup lookups to.
        #[arg(long)]
        scope: Option<String>,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},tokio=warn,rayon=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Loads the configuration file, or the defaults.
fn load_config(path: Option<&Utf8Path>) -> color_eyre::Result<Config> {
    match path {
        Some(path) => {
            let config = Config::load(path)?;
            info!(path = %path, "Loaded configuration");
            Ok(config)
        }
        None => Ok(Config::default()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Utf8Path, what: &str) -> color_eyre::Result<T> {
    let text = std::fs::read_to_string(path).wrap_err_with(|| format!("failed to read {what} {path}"))?;
    serde_json::from_str(&text).wrap_err_with(|| format!("invalid {what} {path}"))
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Lists the catalog.
fn run_targets(json: bool) -> color_eyre::Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    if json {
        let schemas: Vec<_> = hm_schema::catalog::all().collect();
        writeln!(handle, "{}", serde_json::to_string_pretty(&schemas)?)?;
        return Ok(());
    }

    for target in TargetKind::ALL {
        writeln!(handle, "{target} ({})", target.label())?;
        writeln!(
            handle,
            "  dedup key: {}",
            hm_schema::dedup_key_for(target).join(", ")
        )?;
        for rule in hm_schema::rules_for(target) {
            let mut line = format!("  - {:<36} {}", rule.name, rule.field_type.as_str());
            if rule.required {
                line.push_str(", required");
            }
            if let Some(max) = rule.max_length {
                line.push_str(&format!(", max {max}"));
            }
            if !rule.allowed.is_empty() {
                line.push_str(&format!(", one of {}", rule.allowed.join("/")));
            }
            if rule.case_insensitive {
                line.push_str(", case-insensitive");
            }
            writeln!(handle, "{line}")?;
        }
        writeln!(handle)?;
    }
    Ok(())
}

/// Builds a preview and writes it as JSON.
fn run_preview(
    config: &Config,
    dump: &Utf8Path,
    target: TargetKind,
    source_table: Option<&str>,
    output: Option<&Utf8Path>,
) -> color_eyre::Result<()> {
    info!(dump = %dump, target = %target, "Previewing dump");

    let text = hm_dump::read_dump(dump)?;
    let preview = hm_engine::PreviewBuilder::new(config).build(&text, target, source_table)?;
    let json = preview.to_json_pretty()?;

    if let Some(output_path) = output {
        std::fs::write(output_path.as_std_path(), &json)?;
        info!(path = %output_path, "Preview written");
        print_preview_summary(&preview);
    } else {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{json}")?;
    }

    if !preview.is_mapping_complete() {
        warn!(
            unmapped = ?preview.unmapped_required,
            "Suggested mapping leaves required fields unmapped; supply --mapping when executing"
        );
    }
    Ok(())
}

/// Arguments of the `execute` command.
struct ExecuteArgs {
    dump: Utf8PathBuf,
    preview: Option<Utf8PathBuf>,
    target: Option<TargetKind>,
    mapping: Option<Utf8PathBuf>,
    source_table: Option<String>,
    store: Utf8PathBuf,
    user: String,
    scope: Option<String>,
    json: bool,
}

/// Resolves the plan from a cached preview or a target plus mapping.
fn build_plan(args: &ExecuteArgs, config: &Config, text: &str) -> color_eyre::Result<MigrationPlan> {
    let mut plan = match (&args.preview, args.target) {
        (Some(path), _) => {
            let preview: PreviewData = read_json(path, "preview")?;
            MigrationPlan::from_preview(&preview)
        }
        (None, Some(target)) => {
            let mapping = match &args.mapping {
                Some(_) => FieldMapping::new(),
                None => {
                    hm_engine::PreviewBuilder::new(config)
                        .build(text, target, args.source_table.as_deref())?
                        .suggested_mapping
                }
            };
            MigrationPlan::new(target, mapping)
        }
        (None, None) => return Err(eyre!("either --preview or --target is required")),
    };

    if let Some(path) = &args.mapping {
        plan.mapping = read_json(path, "mapping")?;
    }
    if let Some(table) = &args.source_table {
        plan.source_table = Some(table.clone());
    }
    Ok(plan)
}

/// Runs a migration, reporting progress as rows are written.
async fn run_execute(mut config: Config, args: ExecuteArgs) -> color_eyre::Result<()> {
    if args.scope.is_some() {
        config.execute.scope.clone_from(&args.scope);
    }

    let text = hm_dump::read_dump(&args.dump)?;
    let plan = build_plan(&args, &config, &text)?;
    info!(
        dump = %args.dump,
        target = %plan.target,
        source_table = plan.source_table.as_deref().unwrap_or("-"),
        mapped = plan.mapping.len(),
        "Executing migration"
    );

    let store = JsonFileStore::open(args.store.clone())?;
    let engine = MigrationEngine::new(Arc::new(store), config)?;

    let (tx, mut rx) = mpsc::channel(256);
    let worker = {
        let engine = engine.clone();
        let user = args.user.clone();
        tokio::task::spawn_blocking(move || engine.execute_streaming(&text, &plan, &user, tx))
    };

    while let Some(update) = rx.recv().await {
        match update {
            MigrationUpdate::Started {
                source_table,
                rows,
                malformed,
            } => info!(source_table = %source_table, rows, malformed, "Migration started"),
            MigrationUpdate::Row(report) => {
                if let RowOutcome::Skipped(errors) = &report.outcome {
                    for error in errors {
                        warn!(position = %report.position, "{error}");
                    }
                }
            }
            MigrationUpdate::Progress(snapshot) => info!(
                processed = snapshot.processed(),
                total = snapshot.total,
                "Progress {:.1}%",
                snapshot.progress_percent()
            ),
            MigrationUpdate::Complete(_) => {}
        }
    }

    let outcome = worker.await?;
    // Rows written before a failure are kept.
    engine.store().save()?;

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            if let Some(partial) = e.partial_result() {
                print_result_summary(partial);
            }
            return Err(e.into());
        }
    };

    if args.json {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{}", serde_json::to_string_pretty(&result)?)?;
    } else {
        print_result_summary(&result);
    }

    if result.success {
        Ok(())
    } else {
        Err(eyre!(
            "migration finished with {} skipped rows",
            result.records_skipped
        ))
    }
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Prints a summary of a preview.
fn print_preview_summary(preview: &PreviewData) {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    let _ = writeln!(handle);
    let _ = writeln!(handle, "Preview of {} → {}", preview.source_table, preview.target);
    let _ = writeln!(handle, "=========================");
    let _ = writeln!(handle, "Rows:      {}", preview.total_rows);
    let _ = writeln!(handle, "Malformed: {}", preview.malformed_count);
    let _ = writeln!(handle, "Columns:   {}", preview.columns.join(", "));
    if !preview.other_tables.is_empty() {
        let _ = writeln!(handle, "Other tables: {}", preview.other_tables.join(", "));
    }
    let _ = writeln!(handle);
    let _ = writeln!(handle, "Suggested mapping:");
    for (field, column) in preview.suggested_mapping.iter() {
        let _ = writeln!(handle, "  {field:<36} ← {column}");
    }
    if !preview.unmapped_required.is_empty() {
        let _ = writeln!(
            handle,
            "Unmapped required fields: {}",
            preview.unmapped_required.join(", ")
        );
    }
}

/// Prints a summary of a migration result.
fn print_result_summary(result: &MigrationResult) {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    let _ = writeln!(handle);
    let _ = writeln!(handle, "Migration Summary");
    let _ = writeln!(handle, "=================");
    let _ = writeln!(handle, "  Inserted:  {}", result.records_inserted);
    let _ = writeln!(handle, "  Updated:   {}", result.records_updated);
    let _ = writeln!(handle, "  Skipped:   {}", result.records_skipped);
    let _ = writeln!(handle, "  Malformed: {} (not counted)", result.malformed_rows.len());
    let _ = writeln!(handle, "  Completed: {}", if result.completed { "yes" } else { "no" });
    let _ = writeln!(handle, "  Success:   {}", if result.success { "yes" } else { "no" });

    if !result.per_row_errors.is_empty() {
        let _ = writeln!(handle);
        let _ = writeln!(handle, "Skipped rows ({}):", result.per_row_errors.len());
        for row in &result.per_row_errors {
            let reasons: Vec<String> = row.errors.iter().map(ToString::to_string).collect();
            let _ = writeln!(handle, "  {}: {}", row.position, reasons.join("; "));
        }
    }

    if !result.malformed_rows.is_empty() {
        let _ = writeln!(handle);
        let _ = writeln!(handle, "Malformed rows ({}):", result.malformed_rows.len());
        for issue in &result.malformed_rows {
            let _ = writeln!(handle, "  {issue}");
        }
    }
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.no_color);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Targets { json } => run_targets(json),
        Commands::Preview {
            dump,
            target,
            source_table,
            output,
        } => run_preview(
            &config,
            &dump,
            target,
            source_table.as_deref(),
            output.as_deref(),
        ),
        Commands::Execute {
            dump,
            preview,
            target,
            mapping,
            source_table,
            store,
            user,
            scope,
            json,
        } => {
            let args = ExecuteArgs {
                dump,
                preview,
                target,
                mapping,
                source_table,
                store,
                user,
                scope,
                json,
            };
            run_execute(config, args).await
        }
    }
}
