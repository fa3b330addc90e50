//! Gene definitions and the catalog of registered genes.

use crate::error::{GeneticsError, GeneticsResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Gene identifier
pub type GeneId = String;

/// Trait category a gene controls
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GeneType {
    PlantHeight,
    PlantWidth,
    LeafSize,
    LeafShape,
    LeafColor,
    BudDensity,
    BudColor,
    TrichomeDensity,
    ThcProduction,
    CbdProduction,
    TerpeneProfile,
    FloweringTime,
    YieldPotential,
    GrowthRate,
    DiseaseResistance,
    PestResistance,
    HeatTolerance,
    ColdTolerance,
    DroughtTolerance,
}

impl GeneType {
    /// Every gene type, in catalog order
    pub const ALL: [GeneType; 19] = [
        GeneType::PlantHeight,
        GeneType::PlantWidth,
        GeneType::LeafSize,
        GeneType::LeafShape,
        GeneType::LeafColor,
        GeneType::BudDensity,
        GeneType::BudColor,
        GeneType::TrichomeDensity,
        GeneType::ThcProduction,
        GeneType::CbdProduction,
        GeneType::TerpeneProfile,
        GeneType::FloweringTime,
        GeneType::YieldPotential,
        GeneType::GrowthRate,
        GeneType::DiseaseResistance,
        GeneType::PestResistance,
        GeneType::HeatTolerance,
        GeneType::ColdTolerance,
        GeneType::DroughtTolerance,
    ];

    /// Stable snake_case key, also used as the gene id
    pub fn key(&self) -> &'static str {
        match self {
            GeneType::PlantHeight => "plant_height",
            GeneType::PlantWidth => "plant_width",
            GeneType::LeafSize => "leaf_size",
            GeneType::LeafShape => "leaf_shape",
            GeneType::LeafColor => "leaf_color",
            GeneType::BudDensity => "bud_density",
            GeneType::BudColor => "bud_color",
            GeneType::TrichomeDensity => "trichome_density",
            GeneType::ThcProduction => "thc_production",
            GeneType::CbdProduction => "cbd_production",
            GeneType::TerpeneProfile => "terpene_profile",
            GeneType::FloweringTime => "flowering_time",
            GeneType::YieldPotential => "yield_potential",
            GeneType::GrowthRate => "growth_rate",
            GeneType::DiseaseResistance => "disease_resistance",
            GeneType::PestResistance => "pest_resistance",
            GeneType::HeatTolerance => "heat_tolerance",
            GeneType::ColdTolerance => "cold_tolerance",
            GeneType::DroughtTolerance => "drought_tolerance",
        }
    }

    /// Get display name
    pub fn name(&self) -> &'static str {
        match self {
            GeneType::PlantHeight => "Plant Height",
            GeneType::PlantWidth => "Plant Width",
            GeneType::LeafSize => "Leaf Size",
            GeneType::LeafShape => "Leaf Shape",
            GeneType::LeafColor => "Leaf Color",
            GeneType::BudDensity => "Bud Density",
            GeneType::BudColor => "Bud Color",
            GeneType::TrichomeDensity => "Trichome Density",
            GeneType::ThcProduction => "THC Production",
            GeneType::CbdProduction => "CBD Production",
            GeneType::TerpeneProfile => "Terpene Profile",
            GeneType::FloweringTime => "Flowering Time",
            GeneType::YieldPotential => "Yield Potential",
            GeneType::GrowthRate => "Growth Rate",
            GeneType::DiseaseResistance => "Disease Resistance",
            GeneType::PestResistance => "Pest Resistance",
            GeneType::HeatTolerance => "Heat Tolerance",
            GeneType::ColdTolerance => "Cold Tolerance",
            GeneType::DroughtTolerance => "Drought Tolerance",
        }
    }

    /// Genes whose expressed value is an interpolated color
    pub fn is_color(&self) -> bool {
        matches!(self, GeneType::LeafColor | GeneType::BudColor)
    }

    /// Genes whose expressed value is a discrete morphology tag
    pub fn is_morphology(&self) -> bool {
        matches!(self, GeneType::LeafShape)
    }

    /// Genes that buffer a plant against environmental stress
    pub fn is_environmental_tolerance(&self) -> bool {
        matches!(
            self,
            GeneType::HeatTolerance | GeneType::ColdTolerance | GeneType::DroughtTolerance
        )
    }
}

/// Immutable definition of one gene
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneDefinition {
    pub id: GeneId,
    pub name: String,
    pub gene_type: GeneType,
    /// Whether crossover may blend the two inherited alleles
    pub allows_recombination: bool,
    /// Probability of crossover per offspring, in [0, 1]
    pub recombination_rate: f32,
}

impl GeneDefinition {
    pub fn new(gene_type: GeneType, allows_recombination: bool, recombination_rate: f32) -> Self {
        Self {
            id: gene_type.key().to_string(),
            name: gene_type.name().to_string(),
            gene_type,
            allows_recombination,
            recombination_rate: recombination_rate.clamp(0.0, 1.0),
        }
    }
}

/// Genes available from the start
const BASE_GENES: [GeneType; 14] = [
    GeneType::PlantHeight,
    GeneType::PlantWidth,
    GeneType::LeafSize,
    GeneType::LeafShape,
    GeneType::LeafColor,
    GeneType::BudDensity,
    GeneType::TrichomeDensity,
    GeneType::ThcProduction,
    GeneType::CbdProduction,
    GeneType::FloweringTime,
    GeneType::YieldPotential,
    GeneType::GrowthRate,
    GeneType::DiseaseResistance,
    GeneType::HeatTolerance,
];

/// Research id -> gene types unlocked on completion
const RESEARCH_UNLOCKS: [(&str, &[GeneType]); 3] = [
    (
        "advanced_cannabinoids",
        &[GeneType::TerpeneProfile, GeneType::BudColor],
    ),
    ("plant_pathology", &[GeneType::PestResistance]),
    (
        "climate_adaptation",
        &[GeneType::ColdTolerance, GeneType::DroughtTolerance],
    ),
];

/// Default recombination behaviour per gene type
fn default_definition(gene_type: GeneType) -> GeneDefinition {
    match gene_type {
        // Discrete leaf shape is inherited whole
        GeneType::LeafShape => GeneDefinition::new(gene_type, false, 0.0),
        GeneType::LeafColor | GeneType::BudColor => GeneDefinition::new(gene_type, true, 0.3),
        GeneType::ThcProduction | GeneType::CbdProduction | GeneType::TerpeneProfile => {
            GeneDefinition::new(gene_type, true, 0.25)
        }
        GeneType::FloweringTime => GeneDefinition::new(gene_type, true, 0.1),
        _ => GeneDefinition::new(gene_type, true, 0.2),
    }
}

/// Registry of gene definitions.
///
/// Holds every known definition; only unlocked genes are "registered" and
/// therefore carried by genotypes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneCatalog {
    definitions: BTreeMap<GeneId, GeneDefinition>,
    unlocked: BTreeSet<GeneId>,
    completed_research: BTreeSet<String>,
}

impl Default for GeneCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneCatalog {
    /// Catalog with every definition known and the base genes unlocked
    pub fn new() -> Self {
        let definitions = GeneType::ALL
            .iter()
            .map(|&t| (t.key().to_string(), default_definition(t)))
            .collect();
        let unlocked = BASE_GENES.iter().map(|t| t.key().to_string()).collect();

        Self {
            definitions,
            unlocked,
            completed_research: BTreeSet::new(),
        }
    }

    /// Catalog with every gene unlocked
    pub fn fully_unlocked() -> Self {
        let mut catalog = Self::new();
        catalog.unlocked = catalog.definitions.keys().cloned().collect();
        catalog
    }

    /// Registered (unlocked) genes, in stable id order
    pub fn genes(&self) -> impl Iterator<Item = &GeneDefinition> {
        self.unlocked.iter().filter_map(|id| self.definitions.get(id))
    }

    pub fn len(&self) -> usize {
        self.unlocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unlocked.is_empty()
    }

    /// Look up a registered gene
    pub fn get(&self, id: &str) -> Option<&GeneDefinition> {
        if self.unlocked.contains(id) {
            self.definitions.get(id)
        } else {
            None
        }
    }

    /// Look up the registered gene controlling a trait type
    pub fn by_type(&self, gene_type: GeneType) -> Option<&GeneDefinition> {
        self.get(gene_type.key())
    }

    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked.contains(id)
    }

    /// Gene types unlocked by a research id
    pub fn research_unlocks(research_id: &str) -> Option<&'static [GeneType]> {
        RESEARCH_UNLOCKS
            .iter()
            .find(|(id, _)| *id == research_id)
            .map(|(_, genes)| *genes)
    }

    /// Research ids already consumed
    pub fn completed_research(&self) -> impl Iterator<Item = &String> {
        self.completed_research.iter()
    }

    /// Unlock the genes mapped to a research id.
    ///
    /// Returns the ids of genes that were newly registered; repeating a
    /// research id yields an empty list.
    pub fn complete_research(&mut self, research_id: &str) -> GeneticsResult<Vec<GeneId>> {
        let genes = Self::research_unlocks(research_id)
            .ok_or_else(|| GeneticsError::UnknownResearch(research_id.to_string()))?;

        self.completed_research.insert(research_id.to_string());

        let newly_unlocked = genes
            .iter()
            .map(|t| t.key().to_string())
            .filter(|id| self.unlocked.insert(id.clone()))
            .collect();

        Ok(newly_unlocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_catalog() {
        let catalog = GeneCatalog::new();
        assert_eq!(catalog.len(), 14);
        assert!(catalog.by_type(GeneType::PlantHeight).is_some());
        assert!(catalog.by_type(GeneType::TerpeneProfile).is_none());
    }

    #[test]
    fn test_leaf_shape_never_recombines() {
        let catalog = GeneCatalog::new();
        let shape = catalog.by_type(GeneType::LeafShape).unwrap();
        assert!(!shape.allows_recombination);
    }

    #[test]
    fn test_complete_research_unlocks_once() {
        let mut catalog = GeneCatalog::new();

        let unlocked = catalog.complete_research("climate_adaptation").unwrap();
        assert_eq!(unlocked, vec!["cold_tolerance", "drought_tolerance"]);
        assert_eq!(catalog.len(), 16);

        let again = catalog.complete_research("climate_adaptation").unwrap();
        assert!(again.is_empty());
        assert_eq!(catalog.len(), 16);
    }

    #[test]
    fn test_unknown_research() {
        let mut catalog = GeneCatalog::new();
        let err = catalog.complete_research("time_travel").unwrap_err();
        assert_eq!(err, GeneticsError::UnknownResearch("time_travel".to_string()));
    }

    #[test]
    fn test_fully_unlocked() {
        let catalog = GeneCatalog::fully_unlocked();
        assert_eq!(catalog.len(), GeneType::ALL.len());
    }
}
