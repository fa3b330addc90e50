//! Sexual reproduction between two genotypes.
//!
//! Each offspring draws one allele per parent for every registered gene,
//! optionally recombines the pair, and receives freshly identified copies so
//! parent alleles are never shared or modified.

use crate::config::BreedingConfig;
use crate::genetics::allele::{random_id, Allele};
use crate::genetics::gene::{GeneCatalog, GeneDefinition};
use crate::genetics::genotype::{AllelePair, CannabisGenotype, GenotypeId};
use crate::genetics::mutation::MutationEngine;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Separator used in hybrid strain names and ids
const CROSS_SEPARATOR: &str = " x ";
const CROSS_ID_SEPARATOR: &str = "_x_";

/// Breeding strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BreedingMethod {
    StandardCross,
    Backcross,
    LineBreeding,
    Outbreeding,
}

impl BreedingMethod {
    pub const ALL: [BreedingMethod; 4] = [
        BreedingMethod::StandardCross,
        BreedingMethod::Backcross,
        BreedingMethod::LineBreeding,
        BreedingMethod::Outbreeding,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BreedingMethod::StandardCross => "Standard Cross",
            BreedingMethod::Backcross => "Backcross",
            BreedingMethod::LineBreeding => "Line Breeding",
            BreedingMethod::Outbreeding => "Outbreeding",
        }
    }
}

impl fmt::Display for BreedingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Append-only log entry for one breeding attempt
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BreedingRecord {
    pub id: String,
    pub parent1: GenotypeId,
    pub parent2: GenotypeId,
    pub method: BreedingMethod,
    pub timestamp: DateTime<Utc>,
    pub offspring_ids: Vec<GenotypeId>,
    pub success: bool,
    pub notes: String,
}

/// Outcome of a successful breeding call
#[derive(Clone, Debug)]
pub struct BreedingResult {
    pub success: bool,
    pub record_id: String,
    pub method: BreedingMethod,
    /// Whether the parents counted as an outcross
    pub outcross: bool,
    /// Multiplier applied to offspring, if any
    pub hybrid_vigor: Option<f32>,
    /// Offspring as stored, with phenotypes computed
    pub offspring: Vec<CannabisGenotype>,
}

/// Breeding simulator with running statistics
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BreedingSimulator {
    config: BreedingConfig,
    /// Crosses performed
    pub total_crosses: u64,
    /// Crosses where hybrid vigor was applied
    pub hybrid_vigor_crosses: u64,
    /// Genes recombined across all offspring
    pub recombination_events: u64,
    /// Genes synthesized from defaults because a parent lacked them
    pub synthesized_genes: u64,
    /// Mutations applied to offspring alleles
    pub mutations_applied: u64,
    /// Offspring produced
    pub offspring_produced: u64,
}

impl BreedingSimulator {
    pub fn new(config: BreedingConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &BreedingConfig {
        &self.config
    }

    /// Offspring produced per cross for a method
    pub fn offspring_count(&self, method: BreedingMethod) -> usize {
        let counts = &self.config.offspring;
        match method {
            BreedingMethod::StandardCross => counts.standard_cross,
            BreedingMethod::Backcross => counts.backcross,
            BreedingMethod::LineBreeding => counts.line_breeding,
            BreedingMethod::Outbreeding => counts.outbreeding,
        }
    }

    /// Hybrid vigor multiplier for a cross, if it qualifies
    pub fn hybrid_vigor_for(&self, method: BreedingMethod, outcross: bool) -> Option<f32> {
        (method == BreedingMethod::StandardCross && outcross)
            .then_some(self.config.hybrid_vigor_multiplier)
    }

    /// Cross two parents, producing the method's offspring count.
    ///
    /// Parents are only read. Offspring carry no phenotype yet.
    pub fn cross<R: Rng>(
        &mut self,
        parents: (&CannabisGenotype, &CannabisGenotype),
        method: BreedingMethod,
        outcross: bool,
        catalog: &GeneCatalog,
        mutation: &mut MutationEngine,
        rng: &mut R,
    ) -> Vec<CannabisGenotype> {
        self.total_crosses += 1;

        let vigor = self.hybrid_vigor_for(method, outcross);
        if vigor.is_some() {
            self.hybrid_vigor_crosses += 1;
        }

        let count = self.offspring_count(method);
        let offspring: Vec<_> = (0..count)
            .map(|_| self.create_offspring(parents, vigor, catalog, mutation, rng))
            .collect();

        self.offspring_produced += offspring.len() as u64;
        offspring
    }

    fn create_offspring<R: Rng>(
        &mut self,
        (parent1, parent2): (&CannabisGenotype, &CannabisGenotype),
        vigor: Option<f32>,
        catalog: &GeneCatalog,
        mutation: &mut MutationEngine,
        rng: &mut R,
    ) -> CannabisGenotype {
        let alleles = catalog
            .genes()
            .map(|gene| (gene.id.clone(), self.inherit_gene(gene, parent1, parent2, rng)))
            .collect();

        let strain_id = hybrid_label(&parent1.strain_id, &parent2.strain_id, CROSS_ID_SEPARATOR);
        let strain_name = hybrid_label(&parent1.strain_name, &parent2.strain_name, CROSS_SEPARATOR);

        let mut child = CannabisGenotype {
            id: format!("{}-{}", slug(&strain_name), random_id(rng)),
            strain_id,
            strain_name,
            generation: parent1.generation.max(parent2.generation) + 1,
            created_at: Utc::now(),
            is_founder: false,
            is_hybrid: true,
            parent_genotypes: vec![parent1.id.clone(), parent2.id.clone()],
            alleles,
            phenotype: None,
            hybrid_vigor: None,
            epigenetic_modifications: self.inherit_epigenetics(parent1, parent2),
        };

        if self.config.mutate_offspring {
            let mutated = mutation.mutate_all(child.all_alleles_mut(), rng);
            self.mutations_applied += mutated as u64;
        }

        if let Some(multiplier) = vigor {
            for allele in child.all_alleles_mut() {
                allele.expression = (allele.expression * multiplier).clamp(0.0, 1.0);
            }
            child.hybrid_vigor = Some(multiplier);
        }

        child
    }

    /// Mendelian draw plus optional recombination for one gene
    fn inherit_gene<R: Rng>(
        &mut self,
        gene: &GeneDefinition,
        parent1: &CannabisGenotype,
        parent2: &CannabisGenotype,
        rng: &mut R,
    ) -> AllelePair {
        let (mut from1, mut from2) =
            match (parent1.allele_pair(&gene.id), parent2.allele_pair(&gene.id)) {
                (Some(pair1), Some(pair2)) => (
                    pair1[rng.gen_range(0..2)].clone(),
                    pair2[rng.gen_range(0..2)].clone(),
                ),
                _ => {
                    log::debug!("Synthesizing default alleles for gene {}", gene.id);
                    self.synthesized_genes += 1;
                    (
                        Allele::default_for(gene, String::new()),
                        Allele::default_for(gene, String::new()),
                    )
                }
            };

        if gene.allows_recombination && rng.gen::<f32>() < gene.recombination_rate {
            recombine(&mut from1, &mut from2);
            self.recombination_events += 1;
        }

        [
            from1.clone_with_id(random_id(rng)),
            from2.clone_with_id(random_id(rng)),
        ]
    }

    /// Mean of both parents' marks, scaled by the inheritance factor
    fn inherit_epigenetics(
        &self,
        parent1: &CannabisGenotype,
        parent2: &CannabisGenotype,
    ) -> BTreeMap<String, f32> {
        let factor = self.config.epigenetic_inheritance;
        if factor <= 0.0 {
            return BTreeMap::new();
        }

        parent1
            .epigenetic_modifications
            .keys()
            .chain(parent2.epigenetic_modifications.keys())
            .map(|key| {
                let mean = (parent1.epigenetic(key) + parent2.epigenetic(key)) / 2.0;
                (key.clone(), mean * factor)
            })
            .collect()
    }

    pub fn stats_string(&self) -> String {
        format!(
            "Crosses: {} (hybrid vigor: {}), offspring: {}, recombinations: {}, mutations: {}",
            self.total_crosses,
            self.hybrid_vigor_crosses,
            self.offspring_produced,
            self.recombination_events,
            self.mutations_applied
        )
    }
}

/// Average expression and blend colors 50/50 into both alleles
fn recombine(a: &mut Allele, b: &mut Allele) {
    let expression = (a.expression + b.expression) / 2.0;
    a.expression = expression;
    b.expression = expression;

    if let (Some(ca), Some(cb)) = (a.color, b.color) {
        let blended = ca.lerp(&cb, 0.5);
        a.color = Some(blended);
        b.color = Some(blended);
    }
}

/// Joins the distinct roots of both labels in order, so repeated crosses
/// keep every ancestor without growing names
fn hybrid_label(a: &str, b: &str, separator: &str) -> String {
    let mut roots: Vec<&str> = Vec::new();
    for root in a.split(separator).chain(b.split(separator)) {
        if !roots.contains(&root) {
            roots.push(root);
        }
    }
    roots.join(separator)
}

fn slug(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect()
}
