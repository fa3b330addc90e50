//! Configuration system for the genetics engine.
//!
//! Supports YAML configuration files with sensible defaults.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub breeding: BreedingConfig,
    #[serde(default)]
    pub mutation: MutationConfig,
    #[serde(default)]
    pub lineage: LineageConfig,
    #[serde(default)]
    pub adaptation: AdaptationConfig,
    #[serde(default)]
    pub diversity: DiversityConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Cross and offspring settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreedingConfig {
    /// Expression multiplier for outcrossed StandardCross offspring
    pub hybrid_vigor_multiplier: f32,
    /// Offspring produced per cross, by method
    pub offspring: OffspringCounts,
    /// Run the mutation engine over freshly bred alleles
    pub mutate_offspring: bool,
    /// Share of the parents' mean epigenetic marks passed to offspring
    pub epigenetic_inheritance: f32,
    /// Expressed value at which a gene type counts as a discovered trait
    pub trait_discovery_threshold: f32,
    /// Maximum breeding records kept (0 = unbounded)
    pub max_history: usize,
}

/// Offspring count policy per breeding method
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffspringCounts {
    pub standard_cross: usize,
    pub backcross: usize,
    pub line_breeding: usize,
    pub outbreeding: usize,
}

/// Per-allele mutation magnitudes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationConfig {
    /// Mutation rate given to newly created founder alleles
    pub default_mutation_rate: f32,
    /// Half-width of the point mutation expression delta
    pub point_delta: f32,
    /// Half-width of the dominance shift delta
    pub dominance_delta: f32,
    /// Half-width of the stability change delta
    pub stability_delta: f32,
    /// Half-width of the hue perturbation
    pub hue_delta: f32,
    /// Half-width of the saturation/value perturbation
    pub tone_delta: f32,
}

/// How outcrosses are distinguished from inbreeding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcrossPolicy {
    /// Outcross when the two ancestor sets are disjoint
    DisjointAncestors,
    /// Outcross when no shared ancestor (or either genotype itself) lies
    /// within the given number of generations
    GenerationWindow { generations: u32 },
}

/// Lineage bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageConfig {
    /// Maximum ancestor ids kept per genotype
    pub max_ancestors: usize,
    pub outcross_policy: OutcrossPolicy,
}

/// Environmental adaptation and epigenetics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptationConfig {
    pub enabled: bool,
    /// Milliseconds between scheduler ticks
    pub tick_interval_ms: u64,
    /// Progress gained per second of exposure
    pub adaptation_rate: f32,
    /// Progress above which the one-shot adaptive change is applied
    pub apply_threshold: f32,
    /// Expression shift applied to favoured genes on adaptation
    pub adaptive_delta: f32,
    /// Expression shift used by the environmental pressure step of variation
    pub pressure_delta: f32,
    pub min_temperature: f32,
    pub max_temperature: f32,
    pub max_light: f32,
    pub min_humidity: f32,
    pub max_humidity: f32,
    /// Amount added to an epigenetic mark per stressed pass
    pub epigenetic_increment: f32,
    /// Ticks between epigenetic passes
    pub epigenetic_interval_ticks: u64,
    /// Bucket widths used to group environmental conditions
    pub temperature_bucket: f32,
    pub humidity_bucket: f32,
    pub light_bucket: f32,
    pub co2_bucket: f32,
}

/// Population diversity settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiversityConfig {
    /// Expression difference above which a locus counts as heterozygous
    pub heterozygosity_threshold: f32,
    /// Maximum history records kept
    pub history_limit: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for BreedingConfig {
    fn default() -> Self {
        Self {
            hybrid_vigor_multiplier: 1.2,
            offspring: OffspringCounts::default(),
            mutate_offspring: true,
            epigenetic_inheritance: 0.5,
            trait_discovery_threshold: 0.9,
            max_history: 0,
        }
    }
}

impl Default for OffspringCounts {
    fn default() -> Self {
        Self {
            standard_cross: 3,
            backcross: 2,
            line_breeding: 2,
            outbreeding: 4,
        }
    }
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            default_mutation_rate: 0.05,
            point_delta: 0.1,
            dominance_delta: 0.2,
            stability_delta: 0.1,
            hue_delta: 0.05,
            tone_delta: 0.1,
        }
    }
}

impl Default for LineageConfig {
    fn default() -> Self {
        Self {
            max_ancestors: 20,
            outcross_policy: OutcrossPolicy::DisjointAncestors,
        }
    }
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_interval_ms: 1000,
            adaptation_rate: 0.1,
            apply_threshold: 0.5,
            adaptive_delta: 0.05,
            pressure_delta: 0.02,
            min_temperature: 18.0,
            max_temperature: 30.0,
            max_light: 1200.0,
            min_humidity: 30.0,
            max_humidity: 70.0,
            epigenetic_increment: 0.01,
            epigenetic_interval_ticks: 1,
            temperature_bucket: 5.0,
            humidity_bucket: 10.0,
            light_bucket: 200.0,
            co2_bucket: 200.0,
        }
    }
}

impl Default for DiversityConfig {
    fn default() -> Self {
        Self {
            heterozygosity_threshold: 0.05,
            history_limit: 1000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.breeding.hybrid_vigor_multiplier < 1.0 {
            return invalid("hybrid_vigor_multiplier must be >= 1.0");
        }
        let counts = &self.breeding.offspring;
        if counts.standard_cross == 0
            || counts.backcross == 0
            || counts.line_breeding == 0
            || counts.outbreeding == 0
        {
            return invalid("offspring counts must be > 0");
        }
        if !(0.0..=1.0).contains(&self.breeding.epigenetic_inheritance) {
            return invalid("epigenetic_inheritance must be between 0 and 1");
        }
        if !(0.0..=1.0).contains(&self.mutation.default_mutation_rate) {
            return invalid("default_mutation_rate must be between 0 and 1");
        }
        if self.lineage.max_ancestors == 0 {
            return invalid("max_ancestors must be > 0");
        }
        if let OutcrossPolicy::GenerationWindow { generations: 0 } = self.lineage.outcross_policy {
            return invalid("generation window must be > 0");
        }
        let adaptation = &self.adaptation;
        if adaptation.tick_interval_ms == 0 {
            return invalid("tick_interval_ms must be > 0");
        }
        if !(0.0..=1.0).contains(&adaptation.apply_threshold) {
            return invalid("apply_threshold must be between 0 and 1");
        }
        if adaptation.min_temperature >= adaptation.max_temperature {
            return invalid("min_temperature must be below max_temperature");
        }
        if adaptation.min_humidity >= adaptation.max_humidity {
            return invalid("min_humidity must be below max_humidity");
        }
        if adaptation.temperature_bucket <= 0.0
            || adaptation.humidity_bucket <= 0.0
            || adaptation.light_bucket <= 0.0
            || adaptation.co2_bucket <= 0.0
        {
            return invalid("condition bucket widths must be > 0");
        }
        if adaptation.epigenetic_interval_ticks == 0 {
            return invalid("epigenetic_interval_ticks must be > 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.breeding.hybrid_vigor_multiplier, 1.2);
        assert_eq!(config.lineage.max_ancestors, 20);
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.lineage.outcross_policy = OutcrossPolicy::GenerationWindow { generations: 3 };
        let yaml = serde_yaml::to_string(&config).unwrap();
        let loaded: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(loaded.lineage.outcross_policy, config.lineage.outcross_policy);
        assert_eq!(loaded.breeding.offspring.outbreeding, 4);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "breeding:\n  hybrid_vigor_multiplier: 1.5\n  offspring:\n    standard_cross: 1\n    backcross: 1\n    line_breeding: 1\n    outbreeding: 1\n  mutate_offspring: false\n  epigenetic_inheritance: 0.0\n  trait_discovery_threshold: 0.95\n  max_history: 10\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.breeding.hybrid_vigor_multiplier, 1.5);
        assert_eq!(config.adaptation.tick_interval_ms, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.breeding.hybrid_vigor_multiplier = 0.8;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.adaptation.min_temperature = 35.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.lineage.max_ancestors = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let config = Config::default();
        config.save(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.adaptation.max_light, 1200.0);
    }
}
