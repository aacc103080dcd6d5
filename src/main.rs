use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use maxflow::{Network, ReverseEdgeRule, Solution};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
pub struct Cli {
    /// Paths to the network files.
    #[arg(required = true)]
    pub networks: Vec<PathBuf>,
    /// Reverse-edge update rule (overrides the one in the network file).
    #[arg(short, long)]
    pub reverse_rule: Option<ReverseRule>,
    /// Output format.
    #[arg(short, long, default_value = "text")]
    pub format: Format,
    /// Number of threads to use (use all available threads if not specified).
    #[arg(short = 't', long)]
    pub num_of_threads: Option<usize>,
}

#[derive(Debug, ValueEnum, Clone, Copy, PartialEq, Eq)]
pub enum ReverseRule {
    Accumulate,
    Mirror,
}

impl From<ReverseRule> for ReverseEdgeRule {
    fn from(rule: ReverseRule) -> Self {
        match rule {
            ReverseRule::Accumulate => ReverseEdgeRule::Accumulate,
            ReverseRule::Mirror => ReverseEdgeRule::Mirror,
        }
    }
}

#[derive(Debug, ValueEnum, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

#[derive(Serialize)]
struct Report<'a> {
    network: String,
    solution: &'a Solution,
}

fn run(path: &Path, rule: Option<ReverseRule>) -> anyhow::Result<Solution> {
    let mut network =
        Network::load(path).with_context(|| format!("failed to load {}", path.display()))?;
    if let Some(rule) = rule {
        network.reverse_rule = rule.into();
    }
    info!(
        "Network loaded: {} ({} vertices)",
        path.display(),
        network.capacity.len()
    );
    network
        .solve()
        .with_context(|| format!("failed to solve {}", path.display()))
}

fn print_text(path: &Path, solution: &Solution) {
    println!("== {}", path.display());
    println!(
        "max flow {} -> {}: {} ({} augmentations)",
        solution.source,
        solution.sink,
        solution.flow,
        solution.augmentations.len()
    );
    println!("flow matrix:");
    print!("{}", solution.flow_matrix);
    println!("residual matrix:");
    print!("{}", solution.residual_matrix);
    println!(
        "min cut: {:?} (capacity {})",
        solution.min_cut.source_side, solution.min_cut.capacity
    );
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("MAXFLOW_LOG_LEVEL")
                .from_env_lossy(),
        )
        .init();
    let cli = Cli::parse();
    let thd_cnt = cli.num_of_threads.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|x| x.get())
            .unwrap_or(1)
    });
    rayon::ThreadPoolBuilder::new()
        .num_threads(thd_cnt)
        .build_global()?;

    let results: Vec<_> = cli
        .networks
        .par_iter()
        .map(|path| (path, run(path, cli.reverse_rule)))
        .collect();

    let mut failed = 0;
    let mut reports = vec![];
    for (path, result) in &results {
        match result {
            Ok(solution) => match cli.format {
                Format::Text => print_text(path, solution),
                Format::Json => reports.push(Report {
                    network: path.display().to_string(),
                    solution,
                }),
            },
            Err(err) => {
                error!("{err:#}");
                failed += 1;
            }
        }
    }
    if cli.format == Format::Json {
        println!("{}", simd_json::to_string_pretty(&reports)?);
    }

    if failed > 0 {
        error!("{failed} of {} networks failed", results.len());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
