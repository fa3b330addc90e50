//! Owned store of genotypes, breeding records, lineage, diversity and
//! adaptation state.

use crate::config::{AdaptationConfig, Config};
use crate::environment::adaptation::EnvironmentalAdaptation;
use crate::environment::conditions::{ConditionsBucket, EnvironmentalConditions};
use crate::error::{GeneticsError, GeneticsResult};
use crate::genetics::breeding::BreedingRecord;
use crate::genetics::diversity::DiversityTracker;
use crate::genetics::genotype::{CannabisGenotype, GenotypeId};
use crate::genetics::lineage::{GeneticLineage, LineageTracker};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Every piece of mutable genetics state, owned by one engine instance
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GeneticsRepository {
    genotypes: HashMap<GenotypeId, CannabisGenotype>,
    /// Genotype ids in insertion order
    order: Vec<GenotypeId>,
    strain_index: HashMap<String, Vec<GenotypeId>>,
    /// Oldest first
    breeding_records: VecDeque<BreedingRecord>,
    max_history: usize,
    lineage: LineageTracker,
    diversity: DiversityTracker,
    adaptations: BTreeMap<(GenotypeId, ConditionsBucket), EnvironmentalAdaptation>,
}

impl GeneticsRepository {
    pub fn new(config: &Config) -> Self {
        Self {
            genotypes: HashMap::new(),
            order: Vec::new(),
            strain_index: HashMap::new(),
            breeding_records: VecDeque::new(),
            max_history: config.breeding.max_history,
            lineage: LineageTracker::new(config.lineage.clone()),
            diversity: DiversityTracker::new(config.diversity.clone()),
            adaptations: BTreeMap::new(),
        }
    }

    /// Store a genotype, record its lineage and refresh diversity
    pub fn insert(&mut self, genotype: CannabisGenotype) -> GeneticsResult<&CannabisGenotype> {
        let id = genotype.id.clone();
        self.insert_all(vec![genotype])?;
        self.get(&id)
    }

    /// Store several genotypes at once; fails without storing any of them if
    /// an id is already present or repeated
    pub fn insert_all(&mut self, genotypes: Vec<CannabisGenotype>) -> GeneticsResult<()> {
        let mut incoming = HashSet::new();
        for genotype in &genotypes {
            if self.genotypes.contains_key(&genotype.id) || !incoming.insert(genotype.id.as_str()) {
                return Err(GeneticsError::DuplicateGenotype(genotype.id.clone()));
            }
        }

        for genotype in genotypes {
            if genotype.parent_genotypes.is_empty() {
                self.lineage.record_founder(&genotype.id, genotype.generation);
            } else {
                self.lineage
                    .record_lineage(&genotype.id, &genotype.parent_genotypes, genotype.generation);
            }
            self.strain_index
                .entry(genotype.strain_id.clone())
                .or_default()
                .push(genotype.id.clone());
            self.order.push(genotype.id.clone());
            self.genotypes.insert(genotype.id.clone(), genotype);
        }

        self.refresh_diversity();
        Ok(())
    }

    pub fn get(&self, id: &str) -> GeneticsResult<&CannabisGenotype> {
        self.genotypes.get(id).ok_or_else(|| {
            log::warn!("Genotype not found: {}", id);
            GeneticsError::NotFound(id.to_string())
        })
    }

    pub fn get_mut(&mut self, id: &str) -> GeneticsResult<&mut CannabisGenotype> {
        self.genotypes.get_mut(id).ok_or_else(|| {
            log::warn!("Genotype not found: {}", id);
            GeneticsError::NotFound(id.to_string())
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.genotypes.contains_key(id)
    }

    /// Genotypes of a strain, in insertion order
    pub fn list_by_strain(&self, strain_id: &str) -> Vec<&CannabisGenotype> {
        self.strain_index
            .get(strain_id)
            .map(|ids| ids.iter().filter_map(|id| self.genotypes.get(id)).collect())
            .unwrap_or_default()
    }

    /// Strain ids with at least one genotype, sorted
    pub fn strain_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.strain_index.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Genotype ids in insertion order
    pub fn genotype_ids(&self) -> Vec<GenotypeId> {
        self.order.clone()
    }

    /// Genotypes in insertion order
    pub fn genotypes(&self) -> impl Iterator<Item = &CannabisGenotype> {
        self.order.iter().filter_map(|id| self.genotypes.get(id))
    }

    pub fn len(&self) -> usize {
        self.genotypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genotypes.is_empty()
    }

    /// Append a breeding record, trimming the oldest past the retention limit
    pub fn append_record(&mut self, record: BreedingRecord) {
        self.breeding_records.push_back(record);
        if self.max_history > 0 {
            while self.breeding_records.len() > self.max_history {
                if let Some(dropped) = self.breeding_records.pop_front() {
                    log::debug!("Breeding record {} dropped from history", dropped.id);
                }
            }
        }
    }

    pub fn breeding_record(&self, id: &str) -> GeneticsResult<&BreedingRecord> {
        self.breeding_records
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| {
                log::warn!("Breeding record not found: {}", id);
                GeneticsError::NotFound(id.to_string())
            })
    }

    /// Breeding records, newest first
    pub fn breeding_history(&self) -> Vec<&BreedingRecord> {
        self.breeding_records.iter().rev().collect()
    }

    pub fn lineage(&self) -> &LineageTracker {
        &self.lineage
    }

    pub fn get_lineage(&self, id: &str) -> GeneticsResult<&GeneticLineage> {
        self.lineage.get(id).ok_or_else(|| {
            log::warn!("Lineage not found: {}", id);
            GeneticsError::NotFound(id.to_string())
        })
    }

    pub fn diversity(&self) -> &DiversityTracker {
        &self.diversity
    }

    /// Recompute diversity if the population size changed
    pub fn refresh_diversity(&mut self) -> bool {
        let population = ordered(&self.order, &self.genotypes);
        self.diversity.observe(&population)
    }

    /// Recompute diversity unconditionally (after in-place allele changes)
    pub fn recompute_diversity(&mut self) {
        let population = ordered(&self.order, &self.genotypes);
        self.diversity.recompute(&population);
    }

    pub fn adaptation(&self, genotype_id: &str, bucket: &ConditionsBucket) -> Option<&EnvironmentalAdaptation> {
        self.adaptations.get(&(genotype_id.to_string(), *bucket))
    }

    /// Adaptation record for the conditions' bucket, created on first exposure
    pub fn adaptation_entry(
        &mut self,
        genotype_id: &str,
        conditions: &EnvironmentalConditions,
        config: &AdaptationConfig,
    ) -> &mut EnvironmentalAdaptation {
        let key = (genotype_id.to_string(), conditions.bucket(config));
        self.adaptations
            .entry(key)
            .or_insert_with(|| EnvironmentalAdaptation::new(genotype_id, *conditions, config))
    }

    pub fn adaptations(&self) -> impl Iterator<Item = &EnvironmentalAdaptation> {
        self.adaptations.values()
    }

    /// Adaptation records belonging to one genotype
    pub fn adaptations_for(&self, genotype_id: &str) -> Vec<&EnvironmentalAdaptation> {
        self.adaptations
            .values()
            .filter(|a| a.genotype_id == genotype_id)
            .collect()
    }

    pub fn breeding_record_count(&self) -> usize {
        self.breeding_records.len()
    }
}

fn ordered<'a>(
    order: &[GenotypeId],
    genotypes: &'a HashMap<GenotypeId, CannabisGenotype>,
) -> Vec<&'a CannabisGenotype> {
    order.iter().filter_map(|id| genotypes.get(id)).collect()
}
