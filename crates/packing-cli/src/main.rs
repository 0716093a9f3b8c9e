use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use packing_core::{
    validate_layout, CostModel, PackingConfig, PackingRequest, PackingResult, Packer,
    Perturbation, SearchStrategy, ValidationReport,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod io;

#[derive(Parser)]
#[command(name = "packer")]
#[command(about = "Container Packer - Search box placements for a fixed-size container", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack one set of boxes into one container
    Pack {
        /// Full request (container, boxes, config) as YAML or JSON
        #[arg(short, long, conflicts_with_all = ["boxes", "container"])]
        input: Option<PathBuf>,

        /// Box list (CSV, YAML or JSON)
        #[arg(short, long, requires = "container")]
        boxes: Option<PathBuf>,

        /// Container size (YAML or JSON)
        #[arg(short, long, requires = "boxes")]
        container: Option<PathBuf>,

        #[command(flatten)]
        tuning: Tuning,

        /// Output file: CSV for placements only, JSON or YAML for the full result
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Pack every task_NN_boxes.csv / task_NN_container.json pair in a directory
    Batch {
        /// Directory holding the task files
        #[arg(short, long)]
        dir: PathBuf,

        /// First task number
        #[arg(long, default_value_t = 1)]
        first: u32,

        /// Last task number (inclusive)
        #[arg(long, default_value_t = 10)]
        last: u32,

        #[command(flatten)]
        tuning: Tuning,

        /// Summary CSV
        #[arg(short, long, default_value = "evaluation_results.csv")]
        output: PathBuf,
    },

    /// Recheck a finished layout for overlaps and boundary violations
    Validate {
        /// Placements (CSV or JSON)
        #[arg(short, long)]
        placements: PathBuf,

        /// Container size (YAML or JSON)
        #[arg(short, long)]
        container: PathBuf,
    },
}

/// Search settings shared by `pack` and `batch`
#[derive(Args, Debug, Default)]
struct Tuning {
    /// Search configuration (YAML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Number of independent restarts
    #[arg(long)]
    restarts: Option<usize>,

    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Annealing iteration cap
    #[arg(long)]
    iterations: Option<usize>,

    #[arg(long, value_enum)]
    perturbation: Option<PerturbationArg>,

    #[arg(long, value_enum)]
    cost_model: Option<CostModelArg>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    Annealing,
    InputOrder,
    LargestFirst,
    RandomSearch,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PerturbationArg {
    Swap,
    Relocate,
    Shuffle,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CostModelArg {
    Standard,
    Classic,
}

impl Tuning {
    /// Starts from `base` (or the config file, if given) and applies the flag overrides.
    fn resolve(&self, base: PackingConfig) -> Result<PackingConfig> {
        let mut config = match &self.config {
            Some(path) => io::read_document(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => base,
        };

        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(restarts) = self.restarts {
            config.restarts = restarts;
        }
        if let Some(iterations) = self.iterations {
            config.annealing.max_iterations = iterations;
        }
        if let Some(strategy) = self.strategy {
            config.strategy = match strategy {
                StrategyArg::Annealing => SearchStrategy::Annealing,
                StrategyArg::InputOrder => SearchStrategy::InputOrder,
                StrategyArg::LargestFirst => SearchStrategy::LargestFirst,
                StrategyArg::RandomSearch => SearchStrategy::RandomSearch,
            };
        }
        if let Some(perturbation) = self.perturbation {
            config.annealing.perturbation = match perturbation {
                PerturbationArg::Swap => Perturbation::Swap,
                PerturbationArg::Relocate => Perturbation::Relocate,
                PerturbationArg::Shuffle => Perturbation::Shuffle,
            };
        }
        if let Some(model) = self.cost_model {
            config.cost.model = match model {
                CostModelArg::Standard => CostModel::Standard,
                CostModelArg::Classic => CostModel::Classic,
            };
        }

        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Pack {
            input,
            boxes,
            container,
            tuning,
            output,
        } => {
            pack_command(input, boxes, container, tuning, output)?;
        }
        Commands::Batch {
            dir,
            first,
            last,
            tuning,
            output,
        } => {
            batch_command(&dir, first, last, &tuning, &output)?;
        }
        Commands::Validate {
            placements,
            container,
        } => {
            validate_command(&placements, &container)?;
        }
    }

    Ok(())
}

fn pack_command(
    input: Option<PathBuf>,
    boxes: Option<PathBuf>,
    container: Option<PathBuf>,
    tuning: Tuning,
    output: Option<PathBuf>,
) -> Result<()> {
    println!("{}", "🔍 Loading input...".bright_blue());

    let mut request: PackingRequest = match (input, boxes, container) {
        (Some(input), _, _) => io::read_document(&input)?,
        (None, Some(boxes), Some(container)) => PackingRequest {
            container: io::load_container(&container)?,
            boxes: io::load_boxes(&boxes)?,
            config: PackingConfig::default(),
        },
        _ => bail!("Provide either --input or both --boxes and --container"),
    };
    request.config = tuning.resolve(request.config)?;

    println!(
        "  {} boxes to place",
        request.boxes.len().to_string().bright_white().bold()
    );
    println!(
        "  Container {} x {} x {}",
        request.container.width, request.container.height, request.container.depth
    );
    println!();

    println!(
        "{} ({})",
        "🚀 Running search...".bright_blue(),
        request.config.strategy
    );

    let packer = Packer::new(request)?;
    let result = packer.pack()?;

    println!();
    print_result(&result);

    if let Some(output_path) = output {
        io::write_result(&output_path, &result)?;
        println!(
            "💾 Saved result to {}",
            output_path.display().to_string().bright_white()
        );
    } else {
        let json = serde_json::to_string_pretty(&result.placements)?;
        println!("{}", json);
    }

    Ok(())
}

fn print_result(result: &PackingResult) {
    if result.feasible {
        println!("{}", "✅ Packing complete!".bright_green().bold());
    } else {
        println!(
            "{}",
            "⚠️  No complete placement found - some boxes do not fit"
                .bright_red()
                .bold()
        );
    }
    println!();

    println!("{}", "📊 Results:".bright_yellow().bold());
    println!(
        "  Placed boxes: {} / {}",
        result.summary.placed_boxes.to_string().bright_white().bold(),
        result.summary.total_boxes
    );
    println!(
        "  Utilization: {}%",
        format!("{:.2}", result.summary.utilization_percentage).bright_white()
    );
    println!(
        "  Max stack height: {}",
        result.summary.max_stack_height.to_string().bright_white()
    );
    println!("  Seed: {}", result.seed.to_string().bright_white());
    println!(
        "  Cost: {}",
        format!("{:.4}", result.cost).bright_white().bold()
    );

    let terms = &result.breakdown;
    println!("  Cost terms:");
    println!("    • centroid deviation: {:.4}", terms.centroid_deviation);
    println!(
        "    • fragile penalty: {:.1} ({} stacked)",
        terms.fragile_penalty, terms.fragile_violations
    );
    println!("    • unused volume: {:.4}", terms.unused_volume);
    println!("    • height penalty: {:.4}", terms.height_penalty);
    println!("    • position bias: {:.1}", terms.position_bias);
    println!(
        "    • edge penalty: {:.1} ({} small boxes)",
        terms.edge_penalty, terms.small_boxes_on_edges
    );

    if result.restart_costs.len() > 1 {
        println!("  Restart costs:");
        for (i, cost) in result.restart_costs.iter().enumerate() {
            println!("    • #{}: {:.4}", i + 1, cost);
        }
    }
    println!();
}

/// One line of the batch summary
#[derive(Debug, Serialize)]
struct BatchRow {
    task: String,
    seed: u64,
    placed: usize,
    total: usize,
    utilization: f64,
    cost: f64,
    feasible: bool,
    centroid_deviation: f64,
    fragile_penalty: f64,
    volume_penalty: f64,
    height_penalty: f64,
    position_bias: f64,
    edge_penalty: f64,
}

fn run_task(dir: &Path, task: u32, config: &PackingConfig) -> Result<BatchRow> {
    let name = format!("task_{:02}", task);
    let boxes = io::load_boxes(&dir.join(format!("{}_boxes.csv", name)))?;
    let container = io::load_container(&dir.join(format!("{}_container.json", name)))?;

    let result = Packer::new(PackingRequest {
        container,
        boxes,
        config: config.clone(),
    })?
    .pack()?;

    let terms = result.breakdown;
    Ok(BatchRow {
        task: name,
        seed: result.seed,
        placed: result.summary.placed_boxes,
        total: result.summary.total_boxes,
        utilization: (result.summary.utilization_percentage * 100.0).round() / 100.0,
        cost: (result.cost * 100.0).round() / 100.0,
        feasible: result.feasible,
        centroid_deviation: terms.centroid_deviation,
        fragile_penalty: terms.fragile_penalty,
        volume_penalty: terms.unused_volume,
        height_penalty: terms.height_penalty,
        position_bias: terms.position_bias,
        edge_penalty: terms.edge_penalty,
    })
}

fn batch_command(dir: &Path, first: u32, last: u32, tuning: &Tuning, output: &Path) -> Result<()> {
    if first > last {
        bail!("--first ({}) must not exceed --last ({})", first, last);
    }
    let config = tuning.resolve(PackingConfig::default())?;

    println!(
        "{} tasks {:02}..={:02} in {}",
        "🚀 Running".bright_blue(),
        first,
        last,
        dir.display()
    );

    let mut rows = Vec::new();
    for task in first..=last {
        match run_task(dir, task, &config) {
            Ok(row) => {
                let status = if row.feasible {
                    "✅".to_string()
                } else {
                    "⚠️ ".to_string()
                };
                println!(
                    "  {} {}: {}/{} placed, {:.2}% used, cost {:.2}",
                    status, row.task, row.placed, row.total, row.utilization, row.cost
                );
                rows.push(row);
            }
            Err(err) => {
                println!("  {} Task {:02} failed: {:#}", "❌".red(), task, err);
            }
        }
    }

    io::write_csv(output, &rows)?;
    println!();
    println!(
        "{} {} tasks evaluated, saved to {}",
        "✅".bright_green(),
        rows.len(),
        output.display().to_string().bright_white()
    );

    Ok(())
}

fn validate_command(placements: &Path, container: &Path) -> Result<()> {
    println!("{}", "🔍 Loading layout...".bright_blue());

    let container = io::load_container(container)?.build()?;
    let placements = io::load_placements(placements)?;
    let report = validate_layout(&container, &placements);

    print_report(&report);

    if !report.is_valid() {
        bail!("Layout failed validation");
    }
    Ok(())
}

fn check(ok: bool, pass: &str, fail: String) {
    if ok {
        println!("{} {}", "✅".bright_green(), pass);
    } else {
        println!("{} {}", "❌".red(), fail);
    }
}

fn print_report(report: &ValidationReport) {
    check(
        report.duplicate_ids.is_empty(),
        "No duplicate unique ids",
        format!("Duplicate unique ids: {:?}", report.duplicate_ids),
    );
    check(
        report.boundary_violations.is_empty(),
        "No boundary violations",
        format!("Boxes out of boundary: {:?}", report.boundary_violations),
    );
    check(
        report.overlapping_pairs.is_empty(),
        "No overlapping boxes",
        format!("Overlapping box pairs: {:?}", report.overlapping_pairs),
    );

    let m = &report.metrics;
    println!();
    println!("{}", "==== Evaluation Report ====".bright_yellow().bold());
    println!("Container Volume:             {}", m.container_volume);
    println!("Total Box Volume:             {}", m.total_box_volume);
    println!("Space Utilization (%):        {:.2}", m.space_utilization);
    println!("Boxes Against Walls:          {}", m.boxes_against_walls);
    println!(
        "Fragile Boxes Supported:      {}",
        if m.fragile_supported { "Yes" } else { "No" }
    );
    println!("Proportion Supported (%):     {:.2}", m.proportion_supported);
    println!("Small Boxes on Edges:         {}", m.small_boxes_on_edges);
    println!("Maximum Stack Height:         {}", m.max_stack_height);
    println!("Average Center Offset:        {:.2}", m.average_center_offset);
}
