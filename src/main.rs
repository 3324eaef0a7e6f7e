mod cache;
mod checkpoint;
mod cli;
mod config;
mod engine;
mod logging;
mod report;
mod runner;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "taskline")]
#[command(about = "Declarative workflow runner with caching, retries and checkpoints")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Working directory (defaults to current)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Suppress normal output
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow
    Run {
        /// Workflow name (omit when resuming)
        workflow: Option<String>,

        /// Resume an interrupted run from a checkpoint id
        #[arg(long, conflicts_with = "workflow")]
        resume: Option<String>,

        /// Show the execution plan and exit without running
        #[arg(long)]
        dry_run: bool,

        /// Max concurrent steps within a parallel group
        #[arg(long)]
        max_concurrency: Option<usize>,

        /// Skip the result cache for this run
        #[arg(long)]
        no_cache: bool,

        /// Disable retries for this run
        #[arg(long)]
        no_retry: bool,

        /// Max retries after the first attempt
        #[arg(long)]
        max_retries: Option<u32>,

        /// Initial retry delay in milliseconds
        #[arg(long)]
        retry_delay: Option<u64>,

        /// Disable checkpointing for this run
        #[arg(long)]
        no_checkpoint: bool,

        /// Checkpoint auto-save interval in seconds
        #[arg(long)]
        checkpoint_interval: Option<u64>,

        /// Stop at the first failing group instead of continuing
        #[arg(long)]
        abort_on_error: bool,

        /// Runner to use ("noop" or "command")
        #[arg(long)]
        runner: Option<String>,
    },

    /// Show the execution plan for a workflow
    Plan {
        /// Workflow name
        workflow: String,
    },

    /// Validate a workflow without running
    Validate {
        /// Workflow name
        workflow: String,
    },

    /// Inspect stored checkpoints
    Checkpoints {
        #[command(subcommand)]
        command: CheckpointCommands,
    },

    /// Manage the result cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// List available workflows
    Workflows,
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Remove expired cache entries
    Sweep,
}

#[derive(Subcommand)]
enum CheckpointCommands {
    /// List checkpoints, most recently updated first
    List,

    /// Delete a checkpoint
    Delete {
        /// Checkpoint id
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_file = match &cli.command {
        Commands::Run {
            workflow: Some(name),
            ..
        } => logging::default_log_path(name).ok(),
        _ => None,
    };
    logging::init_logging(cli.debug, cli.quiet, log_file)?;

    let project_dir = cli.dir.as_deref();
    let config = config::TasklineConfig::load(project_dir)?;
    let registry = config::WorkflowRegistry::load(project_dir)?;

    let exit_code = match cli.command {
        Commands::Run {
            workflow,
            resume,
            dry_run,
            max_concurrency,
            no_cache,
            no_retry,
            max_retries,
            retry_delay,
            no_checkpoint,
            checkpoint_interval,
            abort_on_error,
            runner,
        } => {
            let overrides = cli::RunOverrides {
                max_concurrency,
                no_cache,
                no_retry,
                max_retries,
                retry_delay_ms: retry_delay,
                no_checkpoint,
                checkpoint_interval,
                abort_on_error,
                runner,
                working_dir: cli.dir.clone(),
            };
            cli::run_workflow(
                workflow.as_deref(),
                resume.as_deref(),
                dry_run,
                &config,
                registry,
                overrides,
                cli.quiet,
            )
            .await?
        }

        Commands::Plan { workflow } => cli::plan_workflow(&workflow, &config, &registry)?,

        Commands::Validate { workflow } => cli::validate_workflow(&workflow, &config, &registry)?,

        Commands::Checkpoints { command } => match command {
            CheckpointCommands::List => cli::list_checkpoints(&config)?,
            CheckpointCommands::Delete { id } => cli::delete_checkpoint(&config, &id)?,
        },

        Commands::Cache { command } => match command {
            CacheCommands::Sweep => cli::sweep_cache(&config)?,
        },

        Commands::Workflows => cli::list_workflows(&registry)?,
    };

    if exit_code != 0 {
        std::process::exit(exit_code);
    }

    Ok(())
}
