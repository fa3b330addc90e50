//! Slow environmental adaptation and epigenetic accumulation.
//!
//! Every stressed (genotype, conditions bucket) pair is tracked separately.
//! Progress accumulates with exposure time and, the first time it exceeds the
//! apply threshold, a one-shot shift is applied to the genes the stressors
//! favour. The pair is then terminal; conditions that land in a different
//! bucket start a fresh record.

use crate::config::AdaptationConfig;
use crate::environment::conditions::{ConditionsBucket, EnvironmentalConditions, Stressor};
use crate::genetics::gene::{GeneCatalog, GeneType};
use crate::genetics::genotype::{CannabisGenotype, GenotypeId};
use crate::repository::GeneticsRepository;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Adaptation state for one genotype under one conditions bucket
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalAdaptation {
    pub genotype_id: GenotypeId,
    /// Conditions at the time tracking started
    pub conditions: EnvironmentalConditions,
    pub bucket: ConditionsBucket,
    pub stressors: Vec<Stressor>,
    /// Exposure progress in [0, 1]
    pub progress: f32,
    /// Set once the adaptive change has been applied; never cleared
    pub applied: bool,
    pub created_at: DateTime<Utc>,
    pub applied_at: Option<DateTime<Utc>>,
}

impl EnvironmentalAdaptation {
    pub fn new(genotype_id: &str, conditions: EnvironmentalConditions, config: &AdaptationConfig) -> Self {
        Self {
            genotype_id: genotype_id.to_string(),
            conditions,
            bucket: conditions.bucket(config),
            stressors: conditions.stressors(config),
            progress: 0.0,
            applied: false,
            created_at: Utc::now(),
            applied_at: None,
        }
    }
}

/// Genes shifted for a stressor, with the sign of the shift
pub fn favoured_genes(stressor: Stressor) -> &'static [(GeneType, f32)] {
    match stressor {
        Stressor::Heat => &[(GeneType::HeatTolerance, 1.0), (GeneType::LeafSize, -1.0)],
        Stressor::Cold => &[(GeneType::ColdTolerance, 1.0), (GeneType::GrowthRate, -1.0)],
        Stressor::HighLight => &[(GeneType::TrichomeDensity, 1.0), (GeneType::ThcProduction, 1.0)],
        Stressor::Drought => &[(GeneType::DroughtTolerance, 1.0), (GeneType::LeafSize, -1.0)],
        Stressor::HighHumidity => &[(GeneType::DiseaseResistance, 1.0)],
    }
}

/// Shift the expression of every allele of the genes a stressor favours.
///
/// Only registered genes are touched. Returns the number of genes shifted.
pub fn apply_stressor_shift(
    genotype: &mut CannabisGenotype,
    catalog: &GeneCatalog,
    stressor: Stressor,
    delta: f32,
) -> usize {
    let mut shifted = 0;
    for &(gene_type, sign) in favoured_genes(stressor) {
        let Some(gene) = catalog.by_type(gene_type) else {
            continue;
        };
        if let Some(pair) = genotype.alleles.get_mut(&gene.id) {
            for allele in pair.iter_mut() {
                allele.shift_expression(sign * delta);
            }
            shifted += 1;
        }
    }
    if shifted > 0 {
        genotype.phenotype = None;
    }
    shifted
}

/// Result of one adaptation tick
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    /// Genotypes that adapted this tick, with the triggering stressors
    pub adapted: Vec<(GenotypeId, Vec<Stressor>)>,
    /// Genotypes given epigenetic marks this tick
    pub epigenetic_marked: usize,
}

/// Drives adaptation progress and the periodic epigenetic pass
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AdaptationManager {
    config: AdaptationConfig,
    tick_count: u64,
    /// One-shot adaptive changes applied
    pub adaptations_applied: u64,
    /// Epigenetic passes that found stress
    pub epigenetic_passes: u64,
}

impl AdaptationManager {
    pub fn new(config: AdaptationConfig) -> Self {
        Self {
            config,
            tick_count: 0,
            adaptations_applied: 0,
            epigenetic_passes: 0,
        }
    }

    pub fn config(&self) -> &AdaptationConfig {
        &self.config
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Resume tick numbering after a checkpoint load
    pub fn restore_tick_count(&mut self, tick_count: u64) {
        self.tick_count = tick_count;
    }

    /// Advance every stored genotype by `elapsed_secs` of exposure
    pub fn tick(
        &mut self,
        repository: &mut GeneticsRepository,
        catalog: &GeneCatalog,
        conditions: &EnvironmentalConditions,
        elapsed_secs: f32,
    ) -> TickReport {
        self.tick_count += 1;
        let mut report = TickReport {
            tick: self.tick_count,
            ..TickReport::default()
        };

        if !self.config.enabled {
            return report;
        }

        let stressors = conditions.stressors(&self.config);
        let ids = repository.genotype_ids();

        if !stressors.is_empty() {
            for id in &ids {
                if self.advance(repository, catalog, id, conditions, elapsed_secs) {
                    report.adapted.push((id.clone(), stressors.clone()));
                }
            }
        }

        if self.tick_count % self.config.epigenetic_interval_ticks.max(1) == 0 {
            report.epigenetic_marked = self.epigenetic_pass(repository, &ids, conditions);
        }

        report
    }

    /// Advance one genotype; returns true when its adaptive change fired
    fn advance(
        &mut self,
        repository: &mut GeneticsRepository,
        catalog: &GeneCatalog,
        genotype_id: &str,
        conditions: &EnvironmentalConditions,
        elapsed_secs: f32,
    ) -> bool {
        let config = &self.config;
        let record = repository.adaptation_entry(genotype_id, conditions, config);
        if record.applied {
            return false;
        }

        record.progress = (record.progress + config.adaptation_rate * elapsed_secs).clamp(0.0, 1.0);
        if record.progress <= config.apply_threshold {
            return false;
        }

        record.applied = true;
        record.applied_at = Some(Utc::now());
        let stressors = record.stressors.clone();

        let delta = config.adaptive_delta;
        if let Ok(genotype) = repository.get_mut(genotype_id) {
            for &stressor in &stressors {
                apply_stressor_shift(genotype, catalog, stressor, delta);
            }
        }

        self.adaptations_applied += 1;
        log::info!(
            "Genotype {} adapted to {:?}",
            genotype_id,
            stressors.iter().map(Stressor::name).collect::<Vec<_>>()
        );
        true
    }

    /// Add marks for temperature and light stress to every genotype
    fn epigenetic_pass(
        &mut self,
        repository: &mut GeneticsRepository,
        ids: &[GenotypeId],
        conditions: &EnvironmentalConditions,
    ) -> usize {
        let stressors = conditions.epigenetic_stressors(&self.config);
        if stressors.is_empty() {
            return 0;
        }

        let increment = self.config.epigenetic_increment;
        let mut marked = 0;
        for id in ids {
            if let Ok(genotype) = repository.get_mut(id) {
                for stressor in &stressors {
                    genotype.add_epigenetic(stressor.mark_key(), increment);
                }
                genotype.phenotype = None;
                marked += 1;
            }
        }

        self.epigenetic_passes += 1;
        log::debug!(
            "Epigenetic pass {}: {} genotypes marked for {} stressors",
            self.epigenetic_passes,
            marked,
            stressors.len()
        );
        marked
    }

    /// One environmental pressure step per stressor, used when generating variants
    pub fn apply_pressure(
        &self,
        genotype: &mut CannabisGenotype,
        catalog: &GeneCatalog,
        conditions: &EnvironmentalConditions,
    ) -> usize {
        conditions
            .stressors(&self.config)
            .into_iter()
            .map(|stressor| apply_stressor_shift(genotype, catalog, stressor, self.config.pressure_delta))
            .sum()
    }
}
