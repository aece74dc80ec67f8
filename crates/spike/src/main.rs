use anyhow::{Context, Result};
use boids_core::config::SimConfig;
use boids_core::spatial::IndexBackend;
use boids_core::world::World;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::info;

const WORLD_SIZE: f32 = 50.0;
const WARMUP_STEPS: usize = 10;
const BENCHMARK_STEPS: usize = 200;
const TARGET_SPS: f64 = 60.0;

#[derive(Parser)]
#[command(name = "boids")]
#[command(about = "Headless 3D flocking simulation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single simulation from a config file
    Run {
        /// Path to config file (JSON)
        #[arg(long)]
        config: PathBuf,

        /// Output directory for results (optional)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Number of simulation steps to run
        #[arg(long, default_value_t = 3600)]
        steps: usize,

        /// Record metrics every N steps
        #[arg(long, default_value_t = 60)]
        sample_every: usize,

        /// Capture a full agent snapshot every N steps (0 disables)
        #[arg(long, default_value_t = 0)]
        snapshot_every: usize,
    },
    /// Run the performance benchmark suite
    Benchmark,
    /// Dump the default configuration to stdout
    DumpDefaultConfig,
}

fn run_benchmark(num_prey: usize, num_predators: usize, backend: IndexBackend) -> Result<()> {
    let config = SimConfig {
        world_size: WORLD_SIZE,
        num_prey,
        num_predators,
        index_backend: backend,
        ..SimConfig::default()
    };
    let mut world = World::populated(config).context("failed to initialize benchmark world")?;

    for _ in 0..WARMUP_STEPS {
        world.step();
    }

    let mut total_prune = 0u64;
    let mut total_index = 0u64;
    let mut total_agents = 0u64;
    let mut total_time = 0u64;
    for _ in 0..BENCHMARK_STEPS {
        let timings = world.step();
        total_prune += timings.prune_us;
        total_index += timings.index_build_us;
        total_agents += timings.agent_update_us;
        total_time += timings.total_us;
    }

    let steps = BENCHMARK_STEPS as f64;
    let avg_step_us = (total_time as f64 / steps).max(1.0);
    let steps_per_sec = 1_000_000.0 / avg_step_us;

    let total = num_prey + num_predators;
    println!("--- {total} agents ({num_prey} prey, {num_predators} predators) ---");
    println!("  Avg step:      {avg_step_us:.0} us ({steps_per_sec:.1} steps/sec)");
    println!(
        "  Breakdown:     prune={:.0} us, index={:.0} us, agents={:.0} us",
        total_prune as f64 / steps,
        total_index as f64 / steps,
        total_agents as f64 / steps,
    );
    let verdict = if steps_per_sec >= TARGET_SPS {
        "GO"
    } else {
        "NO-GO"
    };
    println!("  Verdict:       {verdict} (target: >={TARGET_SPS} steps/sec)");
    println!("  Alive:         {}", world.alive_count());
    println!();
    Ok(())
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Commands::DumpDefaultConfig => {
            let config = SimConfig::default();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Benchmark => {
            if cfg!(debug_assertions) {
                eprintln!("WARNING: running in debug mode. Results are not representative.");
                eprintln!("         Use: cargo run -p boids-spike --release -- benchmark");
                eprintln!();
            }
            println!("=== Boids Benchmark ===");
            println!("Warmup: {WARMUP_STEPS} steps, Benchmark: {BENCHMARK_STEPS} steps");
            println!("Target: >={TARGET_SPS} steps/sec");
            println!();

            let populations = [(100, 5), (500, 25), (2000, 100), (5000, 250)];
            for backend in [IndexBackend::Octree, IndexBackend::RTree] {
                println!("=== Index: {backend:?} ===");
                for (prey, predators) in populations {
                    run_benchmark(prey, predators, backend)?;
                }
            }
        }
        Commands::Run {
            config,
            out,
            steps,
            sample_every,
            snapshot_every,
        } => {
            let file = File::open(&config).context("failed to open config file")?;
            let reader = BufReader::new(file);
            let sim_config: SimConfig =
                serde_json::from_reader(reader).context("failed to parse config")?;

            info!(path = ?config, steps, "loaded config");
            let mut world = World::populated(sim_config).context("failed to initialize world")?;
            let summary = world
                .run_experiment_with_snapshots(steps, sample_every, snapshot_every)
                .context("invalid experiment parameters")?;

            if let Some(out_dir) = out {
                std::fs::create_dir_all(&out_dir).context("failed to create output directory")?;
                let summary_path = out_dir.join("summary.json");
                let file = File::create(summary_path).context("failed to create summary file")?;
                serde_json::to_writer_pretty(file, &summary).context("failed to write summary")?;
                println!("Run complete. Results saved to {:?}", out_dir);
            } else {
                println!(
                    "Run complete. Final alive: {}, deaths: {}",
                    summary.final_alive_count, summary.total_deaths
                );
            }
        }
    }
    Ok(())
}
