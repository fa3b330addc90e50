//! Checkpoint system for saving and loading engine state.

use crate::config::Config;
use crate::error::CheckpointError;
use crate::genetics::gene::GeneCatalog;
use crate::genetics::gene::GeneType;
use crate::repository::GeneticsRepository;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const MAGIC: &[u8; 4] = b"CGEN";

/// Complete engine state for checkpointing
#[derive(Clone, Serialize, Deserialize)]
pub struct GeneticsCheckpoint {
    /// Version for compatibility checking
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub config: Config,
    /// Gene catalog, including unlocked research
    pub catalog: GeneCatalog,
    /// Genotypes, records, lineage, diversity and adaptation state
    pub repository: GeneticsRepository,
    /// Trait types already reported as discovered
    pub discovered_traits: BTreeSet<GeneType>,
    /// Adaptation ticks processed
    pub tick_count: u64,
    /// Random seed (for reproducibility)
    pub random_seed: u64,
    /// Position in the seeded random stream
    pub rng_word_pos: u128,
}

impl GeneticsCheckpoint {
    /// Current checkpoint version
    pub const VERSION: u32 = 2;

    /// Save checkpoint to binary file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointError> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(MAGIC)?;
        let encoded = bincode::serialize(self)?;
        writer.write_all(&encoded)?;
        writer.flush()?;

        log::info!("Checkpoint saved to {:?} ({} bytes)", path, encoded.len() + MAGIC.len());
        Ok(())
    }

    /// Load checkpoint from binary file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            log::error!("Not a checkpoint file: {:?}", path);
            return Err(CheckpointError::InvalidFormat("Invalid magic bytes".to_string()));
        }

        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        let checkpoint: GeneticsCheckpoint = bincode::deserialize(&buffer)?;

        if checkpoint.version != Self::VERSION {
            log::error!(
                "Checkpoint {:?} has version {}, expected {}",
                path,
                checkpoint.version,
                Self::VERSION
            );
            return Err(CheckpointError::VersionMismatch {
                expected: Self::VERSION,
                found: checkpoint.version,
            });
        }

        log::info!("Checkpoint loaded from {:?}", path);
        Ok(checkpoint)
    }

    /// Get approximate size in bytes
    pub fn size_bytes(&self) -> usize {
        bincode::serialized_size(self).unwrap_or(0) as usize
    }

    /// One-line description for logs and the CLI
    pub fn summary(&self) -> String {
        format!(
            "Checkpoint v{} ({}): {} genotypes, {} breeding records, {} genes, seed {}",
            self.version,
            self.created_at.format("%Y-%m-%d %H:%M:%S"),
            self.repository.len(),
            self.repository.breeding_record_count(),
            self.catalog.len(),
            self.random_seed
        )
    }
}
