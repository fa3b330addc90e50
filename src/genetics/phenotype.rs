//! Phenotype expression: resolving allele pairs into observable traits.

use crate::config::AdaptationConfig;
use crate::environment::conditions::EnvironmentalConditions;
use crate::genetics::allele::{Allele, Hsv, Morphology, StrainType};
use crate::genetics::gene::{GeneCatalog, GeneType};
use crate::genetics::genotype::{AllelePair, CannabisGenotype};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Combined weights below this fall back to a plain mean
const WEIGHT_EPSILON: f32 = 1e-6;

/// Expressed value used for genes not (yet) registered
const NEUTRAL_VALUE: f32 = 0.5;

/// Observable trait snapshot of a genotype
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CannabisPhenotype {
    pub height_cm: f32,
    pub width_cm: f32,
    pub leaf_size: f32,
    pub leaf_shape: Morphology,
    pub leaf_color: Hsv,
    /// Only expressed once the bud color gene is unlocked
    pub bud_color: Option<Hsv>,
    pub bud_density: f32,
    pub trichome_density: f32,
    pub thc_percent: f32,
    pub cbd_percent: f32,
    pub terpene_intensity: f32,
    pub flowering_days: f32,
    pub yield_grams: f32,
    pub growth_rate: f32,
    pub disease_resistance: f32,
    pub pest_resistance: f32,
    pub heat_tolerance: f32,
    pub cold_tolerance: f32,
    pub drought_tolerance: f32,
    /// Combined environmental stress the plant is under, in [0, 1]
    pub environmental_stress: f32,
    pub dominant_strain: Option<StrainType>,
    /// Normalized strain family weights
    pub strain_balance: BTreeMap<StrainType, f32>,
    /// Raw expressed value per registered gene type, in [0, 1]
    pub traits: BTreeMap<GeneType, f32>,
}

/// Resolve an allele pair into one value.
///
/// Each allele contributes `expression` weighted by `dominance * stability`.
pub fn resolve_value(pair: &AllelePair) -> f32 {
    let weights = [allele_weight(&pair[0]), allele_weight(&pair[1])];
    let total: f32 = weights.iter().sum();

    let value = if total < WEIGHT_EPSILON {
        (pair[0].expression + pair[1].expression) / 2.0
    } else {
        (pair[0].expression * weights[0] + pair[1].expression * weights[1]) / total
    };
    value.clamp(0.0, 1.0)
}

/// Interpolate allele colors by weight
pub fn resolve_color(pair: &AllelePair) -> Option<Hsv> {
    match (pair[0].color, pair[1].color) {
        (Some(c1), Some(c2)) => {
            let (w1, w2) = (allele_weight(&pair[0]), allele_weight(&pair[1]));
            let t = if w1 + w2 < WEIGHT_EPSILON { 0.5 } else { w2 / (w1 + w2) };
            Some(c1.lerp(&c2, t))
        }
        (Some(c), None) | (None, Some(c)) => Some(c),
        (None, None) => None,
    }
}

/// The allele with the larger dominance × stability weight sets the
/// morphology; ties go to the first slot
pub fn resolve_morphology(pair: &AllelePair) -> Option<Morphology> {
    match (pair[0].morphology, pair[1].morphology) {
        (Some(m1), Some(m2)) => {
            if allele_weight(&pair[1]) > allele_weight(&pair[0]) {
                Some(m2)
            } else {
                Some(m1)
            }
        }
        (Some(m), None) | (None, Some(m)) => Some(m),
        (None, None) => None,
    }
}

fn allele_weight(allele: &Allele) -> f32 {
    allele.dominance * allele.stability
}

/// Pure genotype -> phenotype expression
#[derive(Clone, Debug, Default)]
pub struct PhenotypeEngine {
    thresholds: AdaptationConfig,
}

impl PhenotypeEngine {
    pub fn new(thresholds: AdaptationConfig) -> Self {
        Self { thresholds }
    }

    /// Compute the phenotype of a genotype, optionally under given conditions
    pub fn express(
        &self,
        genotype: &CannabisGenotype,
        catalog: &GeneCatalog,
        environment: Option<&EnvironmentalConditions>,
    ) -> CannabisPhenotype {
        let traits: BTreeMap<GeneType, f32> = catalog
            .genes()
            .filter_map(|gene| {
                genotype
                    .allele_pair(&gene.id)
                    .map(|pair| (gene.gene_type, resolve_value(pair)))
            })
            .collect();

        let trait_of = |t: GeneType| traits.get(&t).copied().unwrap_or(NEUTRAL_VALUE);
        let mark = |key: &str| genotype.epigenetic(key).max(0.0);

        let heat_tolerance = (trait_of(GeneType::HeatTolerance) + mark("heat_stress")).min(1.0);
        let cold_tolerance = (trait_of(GeneType::ColdTolerance) + mark("cold_stress")).min(1.0);
        let drought_tolerance =
            (trait_of(GeneType::DroughtTolerance) + mark("drought_stress")).min(1.0);
        let trichome_density =
            (trait_of(GeneType::TrichomeDensity) + mark("light_stress")).min(1.0);
        let disease_resistance =
            (trait_of(GeneType::DiseaseResistance) + mark("humidity_stress")).min(1.0);

        let environmental_stress = environment
            .map(|conditions| {
                let levels = conditions.stress_levels(&self.thresholds);
                let effective = [
                    levels.heat * (1.0 - heat_tolerance),
                    levels.cold * (1.0 - cold_tolerance),
                    levels.drought * (1.0 - drought_tolerance),
                    levels.light * (1.0 - trichome_density),
                    levels.humidity * (1.0 - disease_resistance),
                ];
                1.0 - effective.iter().map(|s| 1.0 - s).product::<f32>()
            })
            .unwrap_or(0.0);
        let vigor = 1.0 - 0.5 * environmental_stress;

        let leaf_color = self
            .color_of(genotype, catalog, GeneType::LeafColor)
            .unwrap_or(Hsv::new(0.33, 0.7, 0.5));
        let bud_color = self.color_of(genotype, catalog, GeneType::BudColor);
        let leaf_shape = catalog
            .by_type(GeneType::LeafShape)
            .and_then(|gene| genotype.allele_pair(&gene.id))
            .and_then(resolve_morphology)
            .unwrap_or(Morphology::Intermediate);

        let strain_balance = strain_balance(genotype);
        let dominant_strain = strain_balance
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(t, _)| *t);

        let bud_density = trait_of(GeneType::BudDensity);

        CannabisPhenotype {
            height_cm: 30.0 + 170.0 * trait_of(GeneType::PlantHeight),
            width_cm: 20.0 + 100.0 * trait_of(GeneType::PlantWidth),
            leaf_size: trait_of(GeneType::LeafSize),
            leaf_shape,
            leaf_color,
            bud_color,
            bud_density,
            trichome_density,
            thc_percent: 30.0 * trait_of(GeneType::ThcProduction),
            cbd_percent: 20.0 * trait_of(GeneType::CbdProduction),
            terpene_intensity: traits.get(&GeneType::TerpeneProfile).copied().unwrap_or(0.0),
            flowering_days: 45.0 + 60.0 * trait_of(GeneType::FloweringTime),
            yield_grams: (50.0 + 550.0 * trait_of(GeneType::YieldPotential))
                * (0.5 + 0.5 * bud_density)
                * vigor,
            growth_rate: trait_of(GeneType::GrowthRate) * vigor,
            disease_resistance,
            pest_resistance: trait_of(GeneType::PestResistance),
            heat_tolerance,
            cold_tolerance,
            drought_tolerance,
            environmental_stress,
            dominant_strain,
            strain_balance,
            traits,
        }
    }

    fn color_of(
        &self,
        genotype: &CannabisGenotype,
        catalog: &GeneCatalog,
        gene_type: GeneType,
    ) -> Option<Hsv> {
        catalog
            .by_type(gene_type)
            .and_then(|gene| genotype.allele_pair(&gene.id))
            .and_then(resolve_color)
    }
}

/// Mean strain influence over all alleles, normalized to sum to 1
fn strain_balance(genotype: &CannabisGenotype) -> BTreeMap<StrainType, f32> {
    let mut totals: BTreeMap<StrainType, f32> = BTreeMap::new();
    for allele in genotype.all_alleles() {
        for (strain, weight) in &allele.strain_influence {
            *totals.entry(*strain).or_insert(0.0) += weight;
        }
    }

    let sum: f32 = totals.values().sum();
    if sum > WEIGHT_EPSILON {
        totals.values_mut().for_each(|w| *w /= sum);
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genetics::genotype::StrainProfile;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn allele(expression: f32, dominance: f32, stability: f32) -> Allele {
        let catalog = GeneCatalog::new();
        let gene = catalog.by_type(GeneType::PlantHeight).unwrap();
        let mut allele = Allele::default_for(gene, "a".to_string());
        allele.expression = expression;
        allele.dominance = dominance;
        allele.stability = stability;
        allele
    }

    #[test]
    fn test_dominant_allele_contributes_more() {
        let pair = [allele(1.0, 0.9, 1.0), allele(0.0, 0.1, 1.0)];
        let value = resolve_value(&pair);
        assert!((value - 0.9).abs() < 1e-5);
    }

    #[test]
    fn test_zero_weights_fall_back_to_mean() {
        let pair = [allele(0.8, 0.0, 1.0), allele(0.2, 0.0, 1.0)];
        assert!((resolve_value(&pair) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_morphology_tie_goes_to_first_slot() {
        let mut a = allele(0.5, 0.5, 1.0);
        let mut b = allele(0.5, 0.5, 1.0);
        a.morphology = Some(Morphology::BroadLeaf);
        b.morphology = Some(Morphology::NarrowLeaf);
        assert_eq!(resolve_morphology(&[a.clone(), b.clone()]), Some(Morphology::BroadLeaf));

        b.dominance = 0.6;
        assert_eq!(resolve_morphology(&[a, b]), Some(Morphology::NarrowLeaf));
    }

    #[test]
    fn test_morphology_weighs_stability() {
        // Higher dominance but unstable: 0.9 * 0.2 < 0.5 * 1.0
        let mut a = allele(0.5, 0.9, 0.2);
        let mut b = allele(0.5, 0.5, 1.0);
        a.morphology = Some(Morphology::BroadLeaf);
        b.morphology = Some(Morphology::Compact);
        assert_eq!(resolve_morphology(&[a.clone(), b.clone()]), Some(Morphology::Compact));

        a.stability = 1.0;
        assert_eq!(resolve_morphology(&[a, b]), Some(Morphology::BroadLeaf));
    }

    #[test]
    fn test_color_interpolation() {
        let mut a = allele(0.5, 0.5, 1.0);
        let mut b = allele(0.5, 0.5, 1.0);
        a.color = Some(Hsv::new(0.2, 0.0, 0.0));
        b.color = Some(Hsv::new(0.4, 1.0, 1.0));
        let color = resolve_color(&[a, b]).unwrap();
        assert!((color.hue - 0.3).abs() < 1e-5);
        assert!((color.saturation - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_express_founder() {
        let catalog = GeneCatalog::new();
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        let founder =
            CannabisGenotype::founder(&StrainProfile::strain_a(), &catalog, 0.05, &mut rng);

        let engine = PhenotypeEngine::default();
        let phenotype = engine.express(&founder, &catalog, None);

        assert_eq!(phenotype.traits.len(), catalog.len());
        assert_eq!(phenotype.leaf_shape, Morphology::BroadLeaf);
        assert_eq!(phenotype.dominant_strain, Some(StrainType::Indica));
        assert!(phenotype.bud_color.is_none());
        assert_eq!(phenotype.environmental_stress, 0.0);
        assert!(phenotype.traits.values().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_stress_reduces_yield() {
        let catalog = GeneCatalog::new();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let founder =
            CannabisGenotype::founder(&StrainProfile::strain_a(), &catalog, 0.05, &mut rng);

        let engine = PhenotypeEngine::new(AdaptationConfig::default());
        let calm = engine.express(&founder, &catalog, Some(&EnvironmentalConditions::default()));
        let hot = engine.express(
            &founder,
            &catalog,
            Some(&EnvironmentalConditions::new(38.0, 20.0, 1600.0, 400.0)),
        );

        assert!(hot.environmental_stress > 0.0);
        assert!(hot.yield_grams < calm.yield_grams);
    }

    #[test]
    fn test_epigenetic_marks_raise_tolerance() {
        let catalog = GeneCatalog::new();
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let mut founder =
            CannabisGenotype::founder(&StrainProfile::strain_a(), &catalog, 0.05, &mut rng);

        let engine = PhenotypeEngine::default();
        let before = engine.express(&founder, &catalog, None).heat_tolerance;
        founder.add_epigenetic("heat_stress", 0.1);
        let after = engine.express(&founder, &catalog, None).heat_tolerance;
        assert!(after > before || after == 1.0);
    }
}
