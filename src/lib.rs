//! # STRAINLAB
//!
//! Cannabis genetics and breeding simulation engine.
//!
//! ## Features
//!
//! - **Diploid**: exactly two alleles per registered gene, always
//! - **Mendelian**: uniform allele draws with per-gene recombination
//! - **Heterosis**: hybrid vigor for outcrossed standard crosses
//! - **Tracked**: bounded lineage and running population diversity
//! - **Adaptive**: slow environmental adaptation and inheritable epigenetics
//! - **Reproducible**: seeded random number generation
//!
//! ## Quick Start
//!
//! ```rust
//! use strainlab::{BreedingMethod, Config, GeneticsEngine, StrainProfile};
//!
//! let mut engine = GeneticsEngine::new_with_seed(Config::default(), 42);
//! engine.init();
//!
//! let a = engine.create_founder(&StrainProfile::strain_a()).unwrap();
//! let b = engine.create_founder(&StrainProfile::strain_b()).unwrap();
//!
//! let result = engine
//!     .perform_breeding(&a.id, &b.id, BreedingMethod::StandardCross)
//!     .unwrap();
//! assert!(result.success);
//! assert_eq!(result.hybrid_vigor, Some(1.2));
//!
//! println!("Diversity: {:.4}", engine.overall_diversity());
//! ```
//!
//! ## Adaptation
//!
//! ```rust,no_run
//! use strainlab::{AdaptationScheduler, Config, EnvironmentalConditions, GeneticsEngine};
//!
//! let engine = GeneticsEngine::new(Config::default()).into_shared();
//! let heat = EnvironmentalConditions::new(34.0, 50.0, 900.0, 400.0);
//!
//! let mut scheduler = AdaptationScheduler::spawn(engine.clone(), heat);
//! std::thread::sleep(std::time::Duration::from_secs(10));
//! scheduler.shutdown();
//! ```
//!
//! ## Checkpoints
//!
//! ```rust,no_run
//! use strainlab::{Config, GeneticsEngine};
//! use strainlab::checkpoint::GeneticsCheckpoint;
//!
//! let engine = GeneticsEngine::new(Config::default());
//!
//! // Save checkpoint
//! let checkpoint = engine.create_checkpoint();
//! checkpoint.save("engine.cgen").unwrap();
//!
//! // Load checkpoint
//! let loaded = GeneticsCheckpoint::load("engine.cgen").unwrap();
//! let restored = GeneticsEngine::from_checkpoint(loaded);
//! ```

pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod environment;
pub mod error;
pub mod events;
pub mod genetics;
pub mod repository;
pub mod scheduler;

// Re-export main types
pub use config::Config;
pub use engine::{GeneticsEngine, SharedEngine};
pub use environment::{EnvironmentalConditions, Stressor};
pub use error::{GeneticsError, GeneticsResult};
pub use events::GeneticsEvent;
pub use genetics::{BreedingMethod, BreedingResult, CannabisGenotype, StrainProfile};
pub use scheduler::AdaptationScheduler;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a quick benchmark: random standard crosses over a growing population
pub fn benchmark(crosses: usize, founders: usize) -> BenchmarkResult {
    use std::time::Instant;

    let mut engine = GeneticsEngine::new_with_seed(Config::default(), 42);
    let mut picker = ChaCha8Rng::seed_from_u64(7);
    let strains = [
        StrainProfile::strain_a(),
        StrainProfile::strain_b(),
        StrainProfile::ruderalis_line(),
    ];

    for i in 0..founders.max(2) {
        if let Err(e) = engine.create_founder(&strains[i % strains.len()]) {
            log::error!("Benchmark founder failed: {}", e);
        }
    }

    let start = Instant::now();
    let mut completed = 0;
    for _ in 0..crosses {
        let ids = engine.repository().genotype_ids();
        let a = &ids[picker.gen_range(0..ids.len())];
        let b = &ids[picker.gen_range(0..ids.len())];
        if engine.perform_breeding(a, b, BreedingMethod::StandardCross).is_ok() {
            completed += 1;
        }
    }
    let elapsed = start.elapsed();

    BenchmarkResult {
        crosses: completed,
        founders: founders.max(2),
        final_population: engine.population(),
        elapsed_secs: elapsed.as_secs_f64(),
        crosses_per_second: completed as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
        max_generation: engine
            .repository()
            .genotypes()
            .map(|g| g.generation)
            .max()
            .unwrap_or(0),
        overall_diversity: engine.overall_diversity(),
    }
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub crosses: usize,
    pub founders: usize,
    pub final_population: usize,
    pub elapsed_secs: f64,
    pub crosses_per_second: f64,
    pub max_generation: u32,
    pub overall_diversity: f32,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Crosses: {}", self.crosses)?;
        writeln!(f, "Population: {} -> {}", self.founders, self.final_population)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.1} crosses/s", self.crosses_per_second)?;
        writeln!(f, "Max generation: {}", self.max_generation)?;
        writeln!(f, "Diversity: {:.4}", self.overall_diversity)?;
        Ok(())
    }
}
