//! Diploid genotypes and the strain profiles founders are seeded from.

use crate::error::{GeneticsError, GeneticsResult};
use crate::genetics::allele::{random_id, Allele, Hsv, Morphology, StrainType};
use crate::genetics::gene::{GeneCatalog, GeneDefinition, GeneId, GeneType};
use crate::genetics::phenotype::CannabisPhenotype;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unique genotype identifier
pub type GenotypeId = String;

/// Exactly two alleles per gene
pub type AllelePair = [Allele; 2];

/// Template a founder genotype is seeded from
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StrainProfile {
    pub id: String,
    pub name: String,
    /// Indica/Sativa/Ruderalis weights
    pub strain_weights: BTreeMap<StrainType, f32>,
    /// Baseline expression per trait; missing traits default to 0.5
    pub baselines: BTreeMap<GeneType, f32>,
    pub leaf_color: Hsv,
    pub bud_color: Hsv,
    pub morphology: Morphology,
}

impl StrainProfile {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            strain_weights: BTreeMap::new(),
            baselines: BTreeMap::new(),
            leaf_color: Hsv::new(0.33, 0.7, 0.5),
            bud_color: Hsv::new(0.25, 0.4, 0.6),
            morphology: Morphology::Intermediate,
        }
    }

    pub fn with_weight(mut self, strain_type: StrainType, weight: f32) -> Self {
        self.strain_weights.insert(strain_type, weight.clamp(0.0, 1.0));
        self
    }

    pub fn with_baseline(mut self, gene_type: GeneType, value: f32) -> Self {
        self.baselines.insert(gene_type, value.clamp(0.0, 1.0));
        self
    }

    pub fn with_colors(mut self, leaf: Hsv, bud: Hsv) -> Self {
        self.leaf_color = leaf;
        self.bud_color = bud;
        self
    }

    pub fn with_morphology(mut self, morphology: Morphology) -> Self {
        self.morphology = morphology;
        self
    }

    pub fn baseline(&self, gene_type: GeneType) -> f32 {
        self.baselines.get(&gene_type).copied().unwrap_or(0.5)
    }

    /// Short, broad-leaf, resinous indica line
    pub fn strain_a() -> Self {
        Self::new("strain_a", "Strain A")
            .with_weight(StrainType::Indica, 0.8)
            .with_weight(StrainType::Sativa, 0.2)
            .with_baseline(GeneType::PlantHeight, 0.35)
            .with_baseline(GeneType::PlantWidth, 0.65)
            .with_baseline(GeneType::LeafSize, 0.7)
            .with_baseline(GeneType::BudDensity, 0.75)
            .with_baseline(GeneType::TrichomeDensity, 0.7)
            .with_baseline(GeneType::ThcProduction, 0.65)
            .with_baseline(GeneType::CbdProduction, 0.3)
            .with_baseline(GeneType::FloweringTime, 0.35)
            .with_baseline(GeneType::ColdTolerance, 0.6)
            .with_colors(Hsv::new(0.36, 0.8, 0.35), Hsv::new(0.8, 0.5, 0.45))
            .with_morphology(Morphology::BroadLeaf)
    }

    /// Tall, narrow-leaf, heat-hardy sativa line
    pub fn strain_b() -> Self {
        Self::new("strain_b", "Strain B")
            .with_weight(StrainType::Sativa, 0.85)
            .with_weight(StrainType::Indica, 0.15)
            .with_baseline(GeneType::PlantHeight, 0.8)
            .with_baseline(GeneType::PlantWidth, 0.4)
            .with_baseline(GeneType::LeafSize, 0.4)
            .with_baseline(GeneType::BudDensity, 0.45)
            .with_baseline(GeneType::ThcProduction, 0.7)
            .with_baseline(GeneType::CbdProduction, 0.15)
            .with_baseline(GeneType::FloweringTime, 0.75)
            .with_baseline(GeneType::YieldPotential, 0.65)
            .with_baseline(GeneType::HeatTolerance, 0.7)
            .with_colors(Hsv::new(0.28, 0.6, 0.6), Hsv::new(0.2, 0.35, 0.7))
            .with_morphology(Morphology::NarrowLeaf)
    }

    /// Compact autoflowering ruderalis line
    pub fn ruderalis_line() -> Self {
        Self::new("ruderalis", "Ruderalis Line")
            .with_weight(StrainType::Ruderalis, 0.9)
            .with_weight(StrainType::Indica, 0.1)
            .with_baseline(GeneType::PlantHeight, 0.2)
            .with_baseline(GeneType::ThcProduction, 0.2)
            .with_baseline(GeneType::CbdProduction, 0.45)
            .with_baseline(GeneType::FloweringTime, 0.15)
            .with_baseline(GeneType::DiseaseResistance, 0.75)
            .with_baseline(GeneType::ColdTolerance, 0.8)
            .with_baseline(GeneType::DroughtTolerance, 0.7)
            .with_morphology(Morphology::Compact)
    }
}

/// A cannabis plant's diploid genetic makeup
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CannabisGenotype {
    pub id: GenotypeId,
    pub strain_id: String,
    pub strain_name: String,
    pub generation: u32,
    pub created_at: DateTime<Utc>,
    pub is_founder: bool,
    pub is_hybrid: bool,
    /// Empty for founders, both parents for offspring, the base for variants
    pub parent_genotypes: Vec<GenotypeId>,
    /// Gene id -> allele pair
    pub alleles: BTreeMap<GeneId, AllelePair>,
    /// Last computed phenotype; stale after any mutation
    pub phenotype: Option<CannabisPhenotype>,
    pub hybrid_vigor: Option<f32>,
    /// Accumulated epigenetic marks; additive and never reset
    pub epigenetic_modifications: BTreeMap<String, f32>,
}

impl CannabisGenotype {
    /// Create a founder genotype from a strain profile
    pub fn founder<R: Rng>(
        strain: &StrainProfile,
        catalog: &GeneCatalog,
        mutation_rate: f32,
        rng: &mut R,
    ) -> Self {
        let alleles = catalog
            .genes()
            .map(|gene| {
                let pair = [
                    founder_allele(gene, strain, mutation_rate, rng),
                    founder_allele(gene, strain, mutation_rate, rng),
                ];
                (gene.id.clone(), pair)
            })
            .collect();

        Self {
            id: random_id(rng),
            strain_id: strain.id.clone(),
            strain_name: strain.name.clone(),
            generation: 0,
            created_at: Utc::now(),
            is_founder: true,
            is_hybrid: false,
            parent_genotypes: Vec::new(),
            alleles,
            phenotype: None,
            hybrid_vigor: None,
            epigenetic_modifications: BTreeMap::new(),
        }
    }

    pub fn allele_pair(&self, gene_id: &str) -> Option<&AllelePair> {
        self.alleles.get(gene_id)
    }

    /// All alleles, two per gene
    pub fn all_alleles(&self) -> impl Iterator<Item = &Allele> {
        self.alleles.values().flat_map(|pair| pair.iter())
    }

    pub fn all_alleles_mut(&mut self) -> impl Iterator<Item = &mut Allele> {
        self.alleles.values_mut().flat_map(|pair| pair.iter_mut())
    }

    /// Check every registered gene carries an allele pair
    pub fn validate_diploid(&self, catalog: &GeneCatalog) -> GeneticsResult<()> {
        match catalog.genes().find(|gene| !self.alleles.contains_key(&gene.id)) {
            Some(gene) => Err(GeneticsError::DiploidViolation {
                genotype: self.id.clone(),
                gene: gene.id.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Fill any missing registered gene with two default alleles.
    ///
    /// Returns the ids of backfilled genes.
    pub fn ensure_diploid<R: Rng>(&mut self, catalog: &GeneCatalog, rng: &mut R) -> Vec<GeneId> {
        let mut filled = Vec::new();
        for gene in catalog.genes() {
            if !self.alleles.contains_key(&gene.id) {
                let pair = [
                    Allele::default_for(gene, random_id(rng)),
                    Allele::default_for(gene, random_id(rng)),
                ];
                self.alleles.insert(gene.id.clone(), pair);
                filled.push(gene.id.clone());
            }
        }
        if !filled.is_empty() {
            self.phenotype = None;
        }
        filled
    }

    pub fn epigenetic(&self, key: &str) -> f32 {
        self.epigenetic_modifications.get(key).copied().unwrap_or(0.0)
    }

    pub fn add_epigenetic(&mut self, key: &str, amount: f32) {
        *self
            .epigenetic_modifications
            .entry(key.to_string())
            .or_insert(0.0) += amount;
    }

    /// Whether every allele lies inside its valid parameter ranges
    pub fn is_valid(&self) -> bool {
        self.all_alleles().all(Allele::is_valid)
    }
}

fn founder_allele<R: Rng>(
    gene: &GeneDefinition,
    strain: &StrainProfile,
    mutation_rate: f32,
    rng: &mut R,
) -> Allele {
    let mut allele = Allele::default_for(gene, random_id(rng));
    allele.name = format!("{} {}", strain.name, gene.name);
    allele.expression = strain.baseline(gene.gene_type) + rng.gen_range(-0.05..0.05);
    allele.dominance = rng.gen_range(0.3..0.8);
    allele.stability = rng.gen_range(0.6..1.0);
    allele.mutation_rate = mutation_rate;
    allele.strain_influence = strain.strain_weights.clone();

    allele.color = match gene.gene_type {
        GeneType::LeafColor => Some(strain.leaf_color),
        GeneType::BudColor => Some(strain.bud_color),
        _ => None,
    }
    .map(|c| {
        c.perturb(
            rng.gen_range(-0.02..0.02),
            rng.gen_range(-0.05..0.05),
            rng.gen_range(-0.05..0.05),
        )
    });

    if gene.gene_type.is_morphology() {
        allele.morphology = Some(strain.morphology);
    }

    allele.clamp();
    allele
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_founder_is_diploid() {
        let catalog = GeneCatalog::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let founder = CannabisGenotype::founder(&StrainProfile::strain_a(), &catalog, 0.05, &mut rng);

        assert!(founder.is_founder);
        assert_eq!(founder.generation, 0);
        assert!(founder.parent_genotypes.is_empty());
        assert_eq!(founder.alleles.len(), catalog.len());
        assert!(founder.validate_diploid(&catalog).is_ok());
        assert!(founder.is_valid());
    }

    #[test]
    fn test_founder_follows_baseline() {
        let catalog = GeneCatalog::new();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let strain = StrainProfile::strain_b();
        let founder = CannabisGenotype::founder(&strain, &catalog, 0.05, &mut rng);

        let pair = founder.allele_pair("plant_height").unwrap();
        for allele in pair {
            assert!((allele.expression - 0.8).abs() <= 0.05 + 1e-6);
            assert_eq!(allele.strain_influence.get(&StrainType::Sativa), Some(&0.85));
        }

        let shape = founder.allele_pair("leaf_shape").unwrap();
        assert_eq!(shape[0].morphology, Some(Morphology::NarrowLeaf));
    }

    #[test]
    fn test_seeded_founders_reproduce() {
        let catalog = GeneCatalog::new();
        let mut rng1 = ChaCha8Rng::seed_from_u64(7);
        let mut rng2 = ChaCha8Rng::seed_from_u64(7);
        let a = CannabisGenotype::founder(&StrainProfile::strain_a(), &catalog, 0.05, &mut rng1);
        let b = CannabisGenotype::founder(&StrainProfile::strain_a(), &catalog, 0.05, &mut rng2);
        assert_eq!(a.id, b.id);
        assert_eq!(a.alleles, b.alleles);
    }

    #[test]
    fn test_ensure_diploid_backfills() {
        let mut catalog = GeneCatalog::new();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut founder =
            CannabisGenotype::founder(&StrainProfile::strain_a(), &catalog, 0.05, &mut rng);

        catalog.complete_research("plant_pathology").unwrap();
        assert!(founder.validate_diploid(&catalog).is_err());

        let filled = founder.ensure_diploid(&catalog, &mut rng);
        assert_eq!(filled, vec!["pest_resistance".to_string()]);
        assert!(founder.validate_diploid(&catalog).is_ok());
    }

    #[test]
    fn test_epigenetic_accumulates() {
        let catalog = GeneCatalog::new();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut founder =
            CannabisGenotype::founder(&StrainProfile::strain_a(), &catalog, 0.05, &mut rng);

        founder.add_epigenetic("heat_stress", 0.01);
        founder.add_epigenetic("heat_stress", 0.01);
        assert!((founder.epigenetic("heat_stress") - 0.02).abs() < 1e-6);
        assert_eq!(founder.epigenetic("cold_stress"), 0.0);
    }
}
