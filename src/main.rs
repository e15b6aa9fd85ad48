use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use kitchen_sim::config::{KitchenConfig, MAX_POOL_SIZE};
use kitchen_sim::loader::RecipeBook;
use kitchen_sim::progress::{ProgressBoard, ProgressEvent, ProgressStatus};
use kitchen_sim::shutdown::install_shutdown_handler;
use kitchen_sim::station::StationReport;
use kitchen_sim::Kitchen;

#[derive(Parser, Debug)]
#[command(name = "kitchen-sim")]
#[command(version)]
#[command(about = "Simulate kitchen stations cooking through a backlog of recipes")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Cook every recipe in a recipe file
    Run(RunArgs),

    /// Show the contents of a recipe file without cooking anything
    Inspect {
        /// Path to the recipe file (JSON)
        recipes: PathBuf,

        /// Output format
        #[arg(long, short = 'o', default_value = "table")]
        output: OutputFormat,
    },
}

// =============================================================================
// Run Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct RunArgs {
    /// Path to the recipe file (JSON)
    recipes: PathBuf,

    /// Number of stations cooking in parallel
    #[arg(long, short = 's', default_value = "2")]
    stations: usize,

    /// Simulation speed; step durations are divided by this value
    #[arg(long, default_value = "1.0")]
    speed: f64,

    /// Output format for progress events
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

/// Commands accepted on stdin while the kitchen runs.
#[derive(Debug, PartialEq)]
enum ConsoleCommand {
    Stations(usize),
    Status,
    Stop,
}

// =============================================================================
// JSON Output Types
// =============================================================================

#[derive(Serialize)]
struct StationSummaryOutput {
    station: usize,
    exit: String,
    completed: usize,
    cancelled: usize,
    failed: usize,
    skipped: usize,
}

#[derive(Serialize)]
struct RunSummaryOutput {
    all_complete: bool,
    completed: usize,
    cancelled: usize,
    failed: usize,
    stations: Vec<StationSummaryOutput>,
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_console_command(line: &str) -> Option<ConsoleCommand> {
    let mut parts = line.split_whitespace();
    let command = parts.next()?;
    match (command, parts.next()) {
        ("stations" | "resize", Some(n)) => n.parse().ok().map(ConsoleCommand::Stations),
        ("status", None) => Some(ConsoleCommand::Status),
        ("stop" | "quit", None) => Some(ConsoleCommand::Stop),
        _ => None,
    }
}

fn print_event(event: &ProgressEvent, output_format: &OutputFormat) {
    match output_format {
        OutputFormat::Json => match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!(error = %e, "Failed to encode event"),
        },
        OutputFormat::Table => {
            let detail = match event {
                ProgressEvent::Created {
                    station,
                    current_step,
                    ..
                } => format!("station {}: {}", station, current_step),
                ProgressEvent::Updated {
                    percent,
                    current_step,
                    ..
                } => format!("{:>5.1}%  {}", percent, current_step),
                ProgressEvent::Completed { .. } => "100.0%".to_string(),
                ProgressEvent::Cancelled { percent, .. } => format!("{:>5.1}%", percent),
                ProgressEvent::Failed { reason, .. } => reason.clone(),
                ProgressEvent::Retracted { station } => format!("station {} retired", station),
            };
            let recipe = event.recipe().unwrap_or("-");
            println!("{:<10} {:<25} {}", event.kind(), recipe, detail);
        }
    }
}

fn print_board(board: &ProgressBoard) {
    println!();
    println!(
        "{:<25} {:<8} {:<12} {:>7}  CURRENT STEP",
        "RECIPE", "STATION", "STATUS", "DONE"
    );
    println!("{}", "-".repeat(75));
    for record in board.records() {
        println!(
            "{:<25} {:<8} {:<12} {:>6.1}%  {}",
            record.recipe_name,
            record.station,
            record.status.to_string(),
            record.percent,
            record.current_step
        );
    }
    println!();
}

fn print_summary(
    board: &ProgressBoard,
    reports: &[StationReport],
    all_complete: bool,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match output_format {
        OutputFormat::Json => {
            let output = RunSummaryOutput {
                all_complete,
                completed: board.count(ProgressStatus::Completed),
                cancelled: board.count(ProgressStatus::Cancelled),
                failed: board.count(ProgressStatus::Failed),
                stations: reports
                    .iter()
                    .map(|r| StationSummaryOutput {
                        station: r.ordinal,
                        exit: r.exit.to_string(),
                        completed: r.completed,
                        cancelled: r.cancelled,
                        failed: r.failed,
                        skipped: r.skipped,
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            print_board(board);
            println!(
                "{:<8} {:<10} {:>9} {:>9} {:>6}",
                "STATION", "EXIT", "COMPLETED", "CANCELLED", "FAILED"
            );
            println!("{}", "-".repeat(46));
            for r in reports {
                println!(
                    "{:<8} {:<10} {:>9} {:>9} {:>6}",
                    r.ordinal,
                    r.exit.to_string(),
                    r.completed,
                    r.cancelled,
                    r.failed
                );
            }
            println!();
            if all_complete {
                println!("All recipes completed.");
            } else {
                println!("Kitchen stopped before every recipe was completed.");
            }
        }
    }
    Ok(())
}

// =============================================================================
// Command Handlers
// =============================================================================

async fn run_kitchen(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = KitchenConfig::new(args.stations, args.speed);
    config.validate()?;

    // Load errors are fatal and surface before any station exists.
    let book = RecipeBook::load(&args.recipes).await?;

    let shutdown = install_shutdown_handler()?;
    let (mut kitchen, mut events) = Kitchen::new();
    kitchen.start_with_config(book.recipes(), &config)?;

    let mut board = ProgressBoard::new();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                board.apply(&event);
                print_event(&event, &args.output);
            }

            line = stdin.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) => match parse_console_command(&line) {
                        Some(ConsoleCommand::Stations(n)) => {
                            if let Err(e) = kitchen.resize(n) {
                                tracing::warn!(error = %e, "Resize rejected");
                            }
                        }
                        Some(ConsoleCommand::Status) => print_board(&board),
                        Some(ConsoleCommand::Stop) => break,
                        None => tracing::warn!(
                            input = %line.trim(),
                            "Unknown command, expected `stations <1-{}>`, `status` or `stop`",
                            MAX_POOL_SIZE
                        ),
                    },
                    Ok(None) => stdin_open = false,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to read stdin, console disabled");
                        stdin_open = false;
                    }
                }
            }

            _ = kitchen.wait_finished() => break,

            _ = shutdown.cancelled() => break,
        }
    }

    let all_complete = kitchen.is_all_complete().await;
    let reports = kitchen.stop().await;

    // Stations have all terminated, so whatever is buffered is the full tail.
    while let Ok(event) = events.try_recv() {
        board.apply(&event);
        print_event(&event, &args.output);
    }

    print_summary(&board, &reports, all_complete, &args.output)
}

fn inspect_recipes(
    book: &RecipeBook,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(book)?);
        }
        OutputFormat::Table => {
            println!("Recipes");
            println!("{}", "=".repeat(60));
            println!(
                "{:<25} {:<10} {:>5} {:>8}  EQUIPMENT",
                "NAME", "DIFFICULTY", "STEPS", "SECONDS"
            );
            for recipe in &book.recipes {
                let total: u64 = recipe.steps.iter().map(|s| s.duration_secs).sum();
                println!(
                    "{:<25} {:<10} {:>5} {:>8}  {}",
                    recipe.name,
                    recipe.difficulty,
                    recipe.steps.len(),
                    total,
                    recipe.equipment.join(", ")
                );
            }
            println!();
            println!("Ingredients");
            println!("{}", "=".repeat(60));
            for ingredient in &book.ingredients {
                println!(
                    "{:<25} {:>6} {}",
                    ingredient.name, ingredient.quantity, ingredient.unit
                );
            }
        }
    }
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Logs go to stderr so stdout carries only progress output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Commands::Run(run_args) => {
            run_kitchen(run_args).await?;
        }
        Commands::Inspect { recipes, output } => {
            let book = RecipeBook::load(&recipes).await?;
            inspect_recipes(&book, &output)?;
        }
    }

    Ok(())
}
