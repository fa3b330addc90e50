//! STRAINLAB - CLI Entry Point
//!
//! Cannabis genetics and breeding simulator.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use strainlab::checkpoint::GeneticsCheckpoint;
use strainlab::{
    benchmark, AdaptationScheduler, BreedingMethod, Config, EnvironmentalConditions,
    GeneticsEngine, StrainProfile,
};

#[derive(Parser)]
#[command(name = "strainlab")]
#[command(version)]
#[command(about = "Cannabis genetics and breeding simulator with lineage and environmental adaptation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Breed successive generations from the built-in founder strains
    Breed {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Number of generations to breed
        #[arg(short, long, default_value = "5")]
        generations: u32,

        /// Crosses per generation
        #[arg(long, default_value = "4")]
        crosses: usize,

        /// Breeding method (standard_cross, backcross, line_breeding, outbreeding)
        #[arg(short, long, default_value = "standard_cross")]
        method: String,

        /// Research ids to complete before breeding
        #[arg(long)]
        research: Vec<String>,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Checkpoint file to write when done
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Expose a population to environmental conditions
    Adapt {
        /// Checkpoint to load; founders are created when omitted
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// Configuration file used when no checkpoint is given
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Temperature in degrees Celsius
        #[arg(long, default_value = "25.0")]
        temperature: f32,

        /// Relative humidity in percent
        #[arg(long, default_value = "50.0")]
        humidity: f32,

        /// Light intensity in PPFD
        #[arg(long, default_value = "800.0")]
        light: f32,

        /// CO2 in ppm
        #[arg(long, default_value = "400.0")]
        co2: f32,

        /// Number of ticks to run
        #[arg(short, long, default_value = "10")]
        ticks: u64,

        /// Simulated seconds per tick
        #[arg(short, long, default_value = "1.0")]
        elapsed: f32,

        /// Drive ticks from the background scheduler in real time
        #[arg(long)]
        live: bool,

        /// Checkpoint file to write when done
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Inspect a checkpoint file
    Inspect {
        /// Checkpoint file
        checkpoint: PathBuf,

        /// Print lineage and phenotype of one genotype as JSON
        #[arg(short, long)]
        genotype: Option<String>,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of crosses
        #[arg(short, long, default_value = "500")]
        crosses: usize,

        /// Founder population size
        #[arg(short, long, default_value = "6")]
        founders: usize,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = match &cli.command {
        Commands::Breed { config, .. } | Commands::Adapt { config, .. } => Some(config.clone()),
        _ => None,
    };
    let config = load_config(config_path.as_deref())?;

    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.log_level.as_str()),
    )
    .init();

    match cli.command {
        Commands::Breed {
            generations,
            crosses,
            method,
            research,
            seed,
            output,
            quiet,
            ..
        } => run_breeding(config, generations, crosses, &method, &research, seed, output, quiet),

        Commands::Adapt {
            checkpoint,
            temperature,
            humidity,
            light,
            co2,
            ticks,
            elapsed,
            live,
            output,
            ..
        } => {
            let conditions = EnvironmentalConditions::new(temperature, humidity, light, co2);
            run_adaptation(config, checkpoint, conditions, ticks, elapsed, live, output)
        }

        Commands::Inspect {
            checkpoint,
            genotype,
        } => inspect_checkpoint(checkpoint, genotype),

        Commands::Benchmark { crosses, founders } => run_benchmark(crosses, founders),

        Commands::Init { output } => generate_config(output),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    match path {
        Some(path) if path.exists() => {
            println!("Loading config from: {:?}", path);
            Ok(Config::from_file(path)?)
        }
        Some(_) => {
            println!("Using default configuration");
            Ok(Config::default())
        }
        None => Ok(Config::default()),
    }
}

fn parse_method(name: &str) -> Result<BreedingMethod, Box<dyn std::error::Error>> {
    BreedingMethod::ALL
        .iter()
        .copied()
        .find(|m| m.name().to_lowercase().replace(' ', "_") == name.to_lowercase())
        .ok_or_else(|| format!("unknown breeding method: {}", name).into())
}

fn seed_founders(engine: &mut GeneticsEngine) -> Result<(), Box<dyn std::error::Error>> {
    for strain in [
        StrainProfile::strain_a(),
        StrainProfile::strain_b(),
        StrainProfile::ruderalis_line(),
    ] {
        engine.create_founder(&strain)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_breeding(
    config: Config,
    generations: u32,
    crosses: usize,
    method: &str,
    research: &[String],
    seed: Option<u64>,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let method = parse_method(method)?;

    let mut engine = if let Some(s) = seed {
        println!("Using seed: {}", s);
        GeneticsEngine::new_with_seed(config, s)
    } else {
        GeneticsEngine::new(config)
    };
    engine.init();
    let events = engine.subscribe();

    seed_founders(&mut engine)?;
    for id in research {
        let unlocked = engine.complete_research(id)?;
        println!("Research {}: unlocked {:?}", id, unlocked);
    }

    println!("Starting breeding");
    println!("  Founders: {}", engine.population());
    println!("  Method: {}", method);
    println!("  Generations: {}", generations);
    println!();

    let start = Instant::now();
    let mut total_crosses = 0;

    for generation in 1..=generations {
        // Parents are the previous generation, in insertion order
        let pool: Vec<String> = engine
            .repository()
            .genotype_ids()
            .into_iter()
            .filter(|id| {
                engine
                    .get_genotype(id)
                    .map(|g| g.generation + 1 == generation)
                    .unwrap_or(false)
            })
            .collect();

        if pool.len() < 2 {
            println!("\nNot enough parents for generation {}", generation);
            break;
        }

        let mut vigor_crosses = 0;
        for i in 0..crosses.min(pool.len()) {
            let p1 = &pool[i];
            let p2 = &pool[(i + 1) % pool.len()];
            match engine.perform_breeding(p1, p2, method) {
                Ok(result) => {
                    total_crosses += 1;
                    if result.hybrid_vigor.is_some() {
                        vigor_crosses += 1;
                    }
                }
                Err(e) => eprintln!("  Cross {} x {} failed: {}", p1, p2, e),
            }
        }

        if !quiet {
            println!(
                "Gen {:>3} | population: {:>5} | vigor crosses: {} | {}",
                generation,
                engine.population(),
                vigor_crosses,
                engine.diversity_metrics().summary()
            );
        }
    }

    let discoveries = events
        .try_iter()
        .filter(|e| e.kind() == "new_trait_discovered")
        .count();

    let elapsed = start.elapsed();

    println!();
    println!("=== Breeding Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Crosses: {}", total_crosses);
    println!("Final population: {}", engine.population());
    println!("Traits discovered: {}", discoveries);
    println!("Diversity: {:.4}", engine.overall_diversity());
    println!("{}", engine.stats_string());

    if let Some(path) = output {
        engine.create_checkpoint().save(&path)?;
        println!("Checkpoint: {:?}", path);
    }

    engine.shutdown();
    Ok(())
}

fn run_adaptation(
    config: Config,
    checkpoint: Option<PathBuf>,
    conditions: EnvironmentalConditions,
    ticks: u64,
    elapsed: f32,
    live: bool,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = match checkpoint {
        Some(path) => {
            println!("Loading checkpoint: {:?}", path);
            GeneticsEngine::from_checkpoint(GeneticsCheckpoint::load(&path)?)
        }
        None => {
            let mut engine = GeneticsEngine::new(config);
            seed_founders(&mut engine)?;
            engine
        }
    };
    engine.init();

    let stressors = conditions.stressors(&engine.config().adaptation);
    println!("Conditions: {:?}", conditions);
    println!("Stressors: {:?}", stressors);
    println!("Population: {}", engine.population());
    println!();

    let mut adapted = 0;

    let engine = if live {
        let shared = engine.into_shared();
        let interval = Duration::from_millis(shared.read().config().adaptation.tick_interval_ms);
        let mut scheduler = AdaptationScheduler::spawn(shared.clone(), conditions);

        for _ in 0..ticks {
            match scheduler.recv_report_timeout(interval * 10) {
                Some(report) => {
                    adapted += report.adapted.len();
                    println!(
                        "Tick {:>4} | adapted: {} | epigenetic marks: {}",
                        report.tick,
                        report.adapted.len(),
                        report.epigenetic_marked
                    );
                }
                None => {
                    eprintln!("Scheduler stopped reporting");
                    break;
                }
            }
        }
        scheduler.shutdown();

        let shared = std::sync::Arc::try_unwrap(shared)
            .map_err(|_| "engine still shared after scheduler shutdown")?;
        shared.into_inner()
    } else {
        for _ in 0..ticks {
            let report = engine.process_adaptation_tick(&conditions, elapsed);
            adapted += report.adapted.len();
            println!(
                "Tick {:>4} | adapted: {} | epigenetic marks: {}",
                report.tick,
                report.adapted.len(),
                report.epigenetic_marked
            );
        }
        engine
    };

    println!();
    println!("=== Adaptation Complete ===");
    println!("Adaptations applied: {}", adapted);
    println!("Ticks processed: {}", engine.tick_count());
    println!("Diversity: {:.4}", engine.overall_diversity());

    if let Some(path) = output {
        engine.create_checkpoint().save(&path)?;
        println!("Checkpoint: {:?}", path);
    }

    Ok(())
}

fn inspect_checkpoint(
    checkpoint_path: PathBuf,
    genotype: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Inspecting: {:?}", checkpoint_path);

    let checkpoint = GeneticsCheckpoint::load(&checkpoint_path)?;
    println!("{}", checkpoint.summary());
    println!("Size: {} bytes", checkpoint.size_bytes());

    let mut engine = GeneticsEngine::from_checkpoint(checkpoint);

    match genotype {
        Some(id) => {
            let lineage = engine.get_genetic_lineage(&id)?.clone();
            let phenotype = engine.compute_phenotype(&id, None)?;
            println!("Lineage:");
            println!("{}", serde_json::to_string_pretty(&lineage)?);
            println!("Phenotype:");
            println!("{}", serde_json::to_string_pretty(&phenotype)?);
        }
        None => {
            println!();
            println!("Strains:");
            for strain_id in engine.repository().strain_ids() {
                println!(
                    "  {}: {} genotypes",
                    strain_id,
                    engine.get_genotypes_by_strain(strain_id).len()
                );
            }
            println!();
            println!("Recent crosses:");
            for record in engine.get_breeding_history().iter().take(10) {
                println!(
                    "  {} x {} ({}): {} offspring",
                    record.parent1,
                    record.parent2,
                    record.method,
                    record.offspring_ids.len()
                );
            }
            println!();
            println!("Diversity: {}", engine.diversity_metrics().summary());
        }
    }

    Ok(())
}

fn run_benchmark(crosses: usize, founders: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("Running benchmark...");
    println!("  Crosses: {}", crosses);
    println!("  Founders: {}", founders);
    println!();

    let result = benchmark(crosses, founders);
    println!("{}", result);

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}
