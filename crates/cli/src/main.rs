//! boilersync command-line tool.
//!
//! Provides subcommands for analysing a fork against its boilerplate,
//! running the merge/resolution workflows (merge, squash, rebase),
//! inspecting tracked customizations, and generating / validating the
//! configuration file.

mod report;
mod style;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dialoguer::Confirm;
use tracing::info;
use tracing_subscriber::EnvFilter;

use boilersync_core::analyzer::{AnalysisOutcome, Analyzer};
use boilersync_core::errors::SyncError;
use boilersync_core::models::{SyncResult, SyncStatus};
use boilersync_core::orchestrator::{AutoGate, ConfirmGate, SyncOrchestrator};
use boilersync_core::settings::SyncSettings;
use boilersync_core::swizzle::tracker::record_is_valid;
use boilersync_core::swizzle::{OverridePatterns, SwizzleStore, SwizzleTracker};
use boilersync_core::vcs::{GitVcs, VersionControl};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// boilersync command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "boilersync",
    version,
    about = "Keep a fork reconciled with the boilerplate it was generated from"
)]
struct Cli {
    /// Path to the TOML configuration file. Defaults to ./boilersync.toml,
    /// falling back to the platform config directory.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./boilersync.toml")]
        output: PathBuf,
    },

    /// Validate the configuration file.
    Validate,

    /// Analyse every boilerplate file against the fork and print the report.
    Analyze {
        /// Emit the full analysis as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Analyse, then merge upstream changes into the fork.
    Sync(SyncArgs),

    /// Analyse, then squash-merge upstream changes into one fork commit.
    Squash(SyncArgs),

    /// Analyse, then rebase the fork branch onto the upstream ref.
    Rebase(SyncArgs),

    /// List tracked customizations and their validity.
    Swizzles,
}

#[derive(Args, Debug)]
struct SyncArgs {
    /// Do not push the result, even if the config says to.
    #[arg(long)]
    no_push: bool,

    /// Never prompt; abort instead of waiting for manual resolution.
    #[arg(long)]
    non_interactive: bool,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style::error(&format!("{e:#}")));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.unwrap_or_else(default_config_path);

    match cli.command {
        Commands::Init { output } => {
            init_tracing("warn");
            cmd_init(&output)
        }
        Commands::Validate => {
            init_tracing("warn");
            cmd_validate(&config_path)
        }
        Commands::Analyze { json } => {
            let settings = load_settings(&config_path, json)?;
            cmd_analyze(&settings, json).await
        }
        Commands::Sync(args) => {
            let settings = load_settings(&config_path, false)?;
            cmd_sync(settings, args, Workflow::Merge).await
        }
        Commands::Squash(args) => {
            let settings = load_settings(&config_path, false)?;
            cmd_sync(settings, args, Workflow::Squash).await
        }
        Commands::Rebase(args) => {
            let settings = load_settings(&config_path, false)?;
            cmd_sync(settings, args, Workflow::Rebase).await
        }
        Commands::Swizzles => {
            let settings = load_settings(&config_path, false)?;
            cmd_swizzles(&settings).await
        }
    }
}

enum Workflow {
    Merge,
    Squash,
    Rebase,
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn default_config_path() -> PathBuf {
    let local = PathBuf::from("boilersync.toml");
    if local.exists() {
        return local;
    }
    dirs::config_dir()
        .map(|d| d.join("boilersync/config.toml"))
        .unwrap_or(local)
}

fn load_settings(path: &PathBuf, quiet: bool) -> Result<SyncSettings> {
    let settings = SyncSettings::load_and_validate(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    // The subscriber level comes from the config, so init after loading.
    init_tracing(if quiet { "error" } else { &settings.analysis.log_level });
    Ok(settings)
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn tracker_for(settings: &SyncSettings) -> SwizzleTracker {
    SwizzleTracker::new(OverridePatterns {
        treat_as_edited: settings.swizzle.treat_as_edited.clone(),
        treat_as_removed: settings.swizzle.treat_as_removed.clone(),
    })
}

async fn run_analysis(settings: &SyncSettings) -> Result<(SwizzleStore, AnalysisOutcome)> {
    info!(
        boilerplate = %settings.repos.boilerplate_path.display(),
        fork = %settings.repos.fork_path.display(),
        "analysing boilerplate/fork pair"
    );
    let store = SwizzleStore::load(settings.store_path())
        .context("failed to load the customization store")?;
    let vcs: Arc<dyn VersionControl> = Arc::new(GitVcs::new(settings.repos.remote.clone()));
    let analyzer = Analyzer::new(vcs, tracker_for(settings), settings.clone());
    let outcome = analyzer.analyze(&store).await.context("analysis failed")?;
    Ok((store, outcome))
}

fn flush_detections(store: &mut SwizzleStore, outcome: AnalysisOutcome, quiet: bool) -> Result<()> {
    let detected = outcome.detected.len();
    store.merge(outcome.detected);
    store.flush().context("failed to write the customization store")?;
    if detected > 0 && !quiet {
        println!(
            "{}",
            style::dim(&format!("{detected} new customization(s) recorded"))
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_init(output: &PathBuf) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, SyncSettings::default_template())
        .context("failed to write config file")?;

    println!("Default configuration written to {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit the config file with your repository paths and branches");
    println!("  2. Add the boilerplate as the fork's 'upstream' remote");
    println!(
        "  3. Validate with: boilersync validate --config {}",
        output.display()
    );
    println!(
        "  4. Inspect the pair with: boilersync analyze --config {}",
        output.display()
    );

    Ok(())
}

fn cmd_validate(config_path: &PathBuf) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let settings =
        SyncSettings::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    match settings.validate() {
        Ok(()) => println!("  [OK] All required fields are valid"),
        Err(e) => {
            println!("  [FAIL] Validation error: {e}");
            anyhow::bail!("configuration validation failed");
        }
    }

    println!();
    println!("Configuration summary:");
    println!(
        "  Boilerplate : {} ({})",
        settings.repos.boilerplate_path.display(),
        settings.repos.boilerplate_branch
    );
    println!(
        "  Fork        : {} ({})",
        settings.repos.fork_path.display(),
        settings.repos.fork_branch
    );
    println!("  Merge ref   : {}", settings.merge_source());
    println!("  Remote      : {}", settings.repos.remote);
    println!("  Store       : {}", settings.store_path().display());
    println!("  Concurrency : {}", settings.analysis.concurrency);
    println!("  Push        : {}", settings.sync.push);
    println!();
    println!("Configuration is valid.");

    Ok(())
}

async fn cmd_analyze(settings: &SyncSettings, json: bool) -> Result<()> {
    let (mut store, outcome) = run_analysis(settings).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.files)?);
    } else {
        report::print_analysis(&outcome.files);
    }

    flush_detections(&mut store, outcome, json)
}

async fn cmd_sync(mut settings: SyncSettings, args: SyncArgs, workflow: Workflow) -> Result<()> {
    if args.no_push {
        settings.sync.push = false;
    }

    let (mut store, outcome) = run_analysis(&settings).await?;
    report::print_analysis(&outcome.files);
    println!();

    let gate: Arc<dyn ConfirmGate> = if args.non_interactive {
        Arc::new(AutoGate { answer: false })
    } else {
        Arc::new(PromptGate)
    };
    let vcs: Arc<dyn VersionControl> = Arc::new(GitVcs::new(settings.repos.remote.clone()));
    let orchestrator = SyncOrchestrator::new(vcs, gate, settings.clone());

    let result = match workflow {
        Workflow::Merge => orchestrator.run_sync(&outcome.files).await,
        Workflow::Squash => orchestrator.run_squash(&outcome.files).await,
        Workflow::Rebase => orchestrator.run_rebase(&outcome.files).await,
    }
    .context("sync run failed")?;

    print_sync_result(&result);
    match result.status {
        SyncStatus::Done => {
            // The store only moves forward once a run completes.
            flush_detections(&mut store, outcome, false)
        }
        SyncStatus::Aborted => {
            anyhow::bail!(
                "sync aborted with {} unresolved conflict(s)",
                result.unresolved_paths.len()
            )
        }
    }
}

fn print_sync_result(result: &SyncResult) {
    match result.status {
        SyncStatus::Done => {
            println!(
                "{}",
                style::success(&format!(
                    "Sync complete: {} conflict(s) auto-resolved, {}",
                    result.auto_resolved,
                    if result.pushed { "pushed" } else { "not pushed" }
                ))
            );
        }
        SyncStatus::Aborted => {
            println!("{}", style::warn("Sync aborted; nothing committed or pushed."));
            println!("Unresolved conflicts:");
            for path in &result.unresolved_paths {
                println!("  {path}");
            }
        }
    }
}

async fn cmd_swizzles(settings: &SyncSettings) -> Result<()> {
    use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

    let store = SwizzleStore::load(settings.store_path())
        .context("failed to load the customization store")?;
    if store.is_empty() {
        println!();
        println!("{}", style::success("No customizations tracked"));
        return Ok(());
    }

    // Validity needs the current boilerplate state.
    let vcs = GitVcs::new(settings.repos.remote.clone());
    let boiler_files = vcs
        .list_tracked_files(
            &settings.repos.boilerplate_path,
            &settings.repos.boilerplate_branch,
        )
        .await
        .context("failed to list boilerplate files")?;
    let by_path: std::collections::HashMap<&str, _> = boiler_files
        .iter()
        .map(|f| (f.path.as_str(), f))
        .collect();

    println!();
    println!(
        "{}",
        style::header(&format!("Tracked customizations ({})", store.len()))
    );
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["File", "Event", "Active", "Validity", "Recorded"]);

    for record in store.entries() {
        let validity = match by_path.get(record.path.as_str()) {
            Some(current) if record_is_valid(record, current) => {
                Cell::new("valid").fg(comfy_table::Color::Green)
            }
            Some(_) => Cell::new("stale").fg(comfy_table::Color::Red),
            None => Cell::new("gone upstream").fg(comfy_table::Color::Yellow),
        };
        table.add_row(vec![
            Cell::new(&record.path),
            Cell::new(record.event.to_string()),
            Cell::new(if record.active { "yes" } else { "no" }),
            validity,
            Cell::new(record.recorded_at.format("%Y-%m-%d").to_string()),
        ]);
    }
    println!("{table}");

    if let Some(last) = store.last_sync_at() {
        println!();
        println!("{}", style::dim(&format!("Last sync: {last}")));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Human confirmation gate
// ---------------------------------------------------------------------------

/// Interactive gate backed by a terminal prompt. Blocks without timeout.
struct PromptGate;

impl ConfirmGate for PromptGate {
    fn confirm_resolved(&self, unresolved: &[String]) -> Result<bool, SyncError> {
        println!();
        println!(
            "{}",
            style::warn(&format!(
                "{} conflict(s) need manual resolution:",
                unresolved.len()
            ))
        );
        for path in unresolved {
            println!("  {path}");
        }
        println!("Resolve them in the fork checkout, then continue.");

        Confirm::new()
            .with_prompt("Re-scan for conflicts? (choosing 'no' aborts the sync)")
            .default(true)
            .interact()
            .map_err(|e| SyncError::GateFailed(e.to_string()))
    }
}
