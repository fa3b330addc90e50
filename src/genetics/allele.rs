//! Allele model - one copy of a gene with continuous trait parameters.

use crate::genetics::gene::{GeneDefinition, GeneId, GeneType};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Allele identifier
pub type AlleleId = String;

/// Lower bound for allele stability
pub const MIN_STABILITY: f32 = 0.1;

/// Cannabis strain families
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StrainType {
    Indica,
    Sativa,
    Ruderalis,
}

impl StrainType {
    pub const ALL: [StrainType; 3] = [StrainType::Indica, StrainType::Sativa, StrainType::Ruderalis];

    pub fn name(&self) -> &'static str {
        match self {
            StrainType::Indica => "Indica",
            StrainType::Sativa => "Sativa",
            StrainType::Ruderalis => "Ruderalis",
        }
    }
}

/// Discrete leaf morphology
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Morphology {
    BroadLeaf,
    NarrowLeaf,
    Intermediate,
    Compact,
}

/// Color in HSV space, every channel in [0, 1]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hsv {
    pub hue: f32,
    pub saturation: f32,
    pub value: f32,
}

impl Hsv {
    pub fn new(hue: f32, saturation: f32, value: f32) -> Self {
        Self {
            hue: hue.rem_euclid(1.0),
            saturation: saturation.clamp(0.0, 1.0),
            value: value.clamp(0.0, 1.0),
        }
    }

    /// Interpolate towards `other`; hue travels the shorter way round
    pub fn lerp(&self, other: &Hsv, t: f32) -> Hsv {
        let t = t.clamp(0.0, 1.0);
        let mut dh = other.hue - self.hue;
        if dh > 0.5 {
            dh -= 1.0;
        } else if dh < -0.5 {
            dh += 1.0;
        }
        Hsv::new(
            self.hue + dh * t,
            self.saturation + (other.saturation - self.saturation) * t,
            self.value + (other.value - self.value) * t,
        )
    }

    /// Shift each channel; hue wraps, saturation and value clamp
    pub fn perturb(&self, dh: f32, ds: f32, dv: f32) -> Hsv {
        Hsv::new(self.hue + dh, self.saturation + ds, self.value + dv)
    }
}

/// One copy of a gene carried by a genotype
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Allele {
    pub id: AlleleId,
    pub gene_id: GeneId,
    pub name: String,
    /// Contribution weight when resolving the expressed value, in [0, 1]
    pub dominance: f32,
    /// Intrinsic trait strength, in [0, 1]
    pub expression: f32,
    /// Resistance to drift, in [0.1, 1]
    pub stability: f32,
    /// Per-allele mutation probability
    pub mutation_rate: f32,
    pub color: Option<Hsv>,
    pub morphology: Option<Morphology>,
    /// Strain family weights this allele carries
    pub strain_influence: BTreeMap<StrainType, f32>,
}

impl Allele {
    /// Neutral allele used when a parent lacks data for a gene
    pub fn default_for(gene: &GeneDefinition, id: AlleleId) -> Self {
        let color = match gene.gene_type {
            GeneType::LeafColor => Some(Hsv::new(0.33, 0.7, 0.5)),
            GeneType::BudColor => Some(Hsv::new(0.25, 0.4, 0.6)),
            _ => None,
        };
        let morphology = gene
            .gene_type
            .is_morphology()
            .then_some(Morphology::Intermediate);

        Self {
            id,
            name: format!("{} (wild)", gene.name),
            gene_id: gene.id.clone(),
            dominance: 0.5,
            expression: 0.5,
            stability: 0.8,
            mutation_rate: 0.01,
            color,
            morphology,
            strain_influence: BTreeMap::new(),
        }
    }

    /// Deep copy carrying a fresh id
    pub fn clone_with_id(&self, id: AlleleId) -> Self {
        Self { id, ..self.clone() }
    }

    /// Force every parameter back into its valid range
    pub fn clamp(&mut self) {
        self.dominance = self.dominance.clamp(0.0, 1.0);
        self.expression = self.expression.clamp(0.0, 1.0);
        self.stability = self.stability.clamp(MIN_STABILITY, 1.0);
        self.mutation_rate = self.mutation_rate.clamp(0.0, 1.0);
    }

    /// Add to expression, keeping it in [0, 1]
    pub fn shift_expression(&mut self, delta: f32) {
        self.expression = (self.expression + delta).clamp(0.0, 1.0);
    }

    /// Whether every parameter lies in its valid range
    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.dominance)
            && (0.0..=1.0).contains(&self.expression)
            && (MIN_STABILITY..=1.0).contains(&self.stability)
    }

    /// Strain family with the largest influence weight
    pub fn dominant_strain(&self) -> Option<StrainType> {
        self.strain_influence
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(t, _)| *t)
    }
}

/// Build an id from RNG bytes so seeded runs reproduce identifiers
pub fn random_id<R: Rng>(rng: &mut R) -> String {
    uuid::Builder::from_random_bytes(rng.gen())
        .into_uuid()
        .to_string()
}
