mod bundle;
mod cohort;
mod commands;
mod core;
mod dist;
mod docs;
mod graph;
mod release;
mod ui;
mod utils;

use clap::{Parser, Subcommand};
use core::error::{YardError, print_error};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Cohort-driven build and release orchestration
#[derive(Parser)]
#[command(name = "shipyard")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// Verbose logging to stderr (overridden by SHIPYARD_LOG)
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  // ============================================================================
  // Inspection
  // ============================================================================
  /// Show the wired task graph in topological order
  Plan {
    /// Output the plan in JSON format
    #[arg(long)]
    json: bool,
    /// Output the task graph in Graphviz DOT format
    #[arg(long, conflicts_with = "json")]
    dot: bool,
  },

  /// Show cohort membership and which cohort each treatment applies to
  Cohorts {
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Classify a version and show its repository and signing policy
  #[command(disable_version_flag = true)]
  Channel {
    /// Version to classify (default: the project version)
    #[arg(long)]
    version: Option<String>,
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Print the bundle metadata generated for a module
  Descriptor {
    /// Name of the module
    module: String,
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Show the aggregated documentation inputs
  Docs {
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },

  // ============================================================================
  // Execution
  // ============================================================================
  /// Execute tasks (default: dry-run showing the waves)
  Run {
    /// Tasks to run together with their predecessors (default: every task)
    targets: Vec<String>,
    /// Actually run the tasks
    #[arg(long)]
    apply: bool,
    /// Maximum number of tasks running at once (default: available parallelism)
    #[arg(short, long)]
    jobs: Option<usize>,
    /// Stop starting new tasks after the first failure
    #[arg(long)]
    fail_fast: bool,
    /// Output the report in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Preview or assemble the distribution archive
  Dist {
    /// Write the archive (default: list the entries)
    #[arg(long)]
    apply: bool,
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Cyan))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Cyan))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn init_logging(verbose: bool) {
  let default = if verbose { "shipyard=debug" } else { "shipyard=warn" };
  let filter = EnvFilter::try_from_env("SHIPYARD_LOG").unwrap_or_else(|_| EnvFilter::new(default));

  tracing_subscriber::registry()
    .with(
      fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time(),
    )
    .with(filter)
    .init();
}

fn main() {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let root = match std::env::current_dir() {
    Ok(dir) => dir,
    Err(e) => handle_error(YardError::message(format!("Failed to get current directory: {}", e))),
  };

  // Configuration, cohorts and the channel load once; every command shares them
  let ctx = match core::context::BuildContext::build(&root) {
    Ok(ctx) => ctx,
    Err(e) => handle_error(e),
  };

  let result = match cli.command {
    Commands::Plan { json, dot } => commands::run_plan(&ctx, json, dot),
    Commands::Cohorts { json } => commands::run_cohorts(&ctx, json),
    Commands::Channel { version, json } => commands::run_channel(&ctx, version, json),
    Commands::Descriptor { module, json } => commands::run_descriptor(&ctx, &module, json),
    Commands::Docs { json } => commands::run_docs(&ctx, json),
    Commands::Run {
      targets,
      apply,
      jobs,
      fail_fast,
      json,
    } => commands::run_run(
      &ctx,
      commands::RunOptions {
        targets,
        apply,
        jobs,
        fail_fast,
        json,
      },
    ),
    Commands::Dist { apply, json } => commands::run_dist(&ctx, apply, json),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: YardError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
