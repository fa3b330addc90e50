//! Per-allele mutation.
//!
//! Each allele mutates independently with probability equal to its own
//! `mutation_rate`; the kind of mutation is chosen uniformly.

use crate::config::MutationConfig;
use crate::genetics::allele::Allele;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// The four mutation kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationKind {
    /// Nudge expression
    Point,
    /// Nudge dominance
    DominanceShift,
    /// Nudge stability
    StabilityChange,
    /// Perturb hue/saturation/value of a colored allele
    Color,
}

impl MutationKind {
    pub const ALL: [MutationKind; 4] = [
        MutationKind::Point,
        MutationKind::DominanceShift,
        MutationKind::StabilityChange,
        MutationKind::Color,
    ];

    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

/// Mutation engine with running counters
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MutationEngine {
    config: MutationConfig,
    /// Total mutations applied
    pub total_mutations: u64,
    /// Color mutations drawn for alleles without a color
    pub skipped_color: u64,
}

impl MutationEngine {
    pub fn new(config: MutationConfig) -> Self {
        Self {
            config,
            total_mutations: 0,
            skipped_color: 0,
        }
    }

    /// Roll the allele's own mutation rate and mutate on success.
    ///
    /// Returns the mutation kind applied, if any.
    pub fn maybe_mutate<R: Rng>(&mut self, allele: &mut Allele, rng: &mut R) -> Option<MutationKind> {
        if rng.gen::<f32>() >= allele.mutation_rate {
            return None;
        }
        let kind = MutationKind::random(rng);
        self.apply(allele, kind, rng).then_some(kind)
    }

    /// Apply a specific mutation kind.
    ///
    /// Returns false when the kind had nothing to act on (color mutation on a
    /// colorless allele).
    pub fn apply<R: Rng>(&mut self, allele: &mut Allele, kind: MutationKind, rng: &mut R) -> bool {
        let cfg = &self.config;
        match kind {
            MutationKind::Point => {
                allele.expression += symmetric(rng, cfg.point_delta);
            }
            MutationKind::DominanceShift => {
                allele.dominance += symmetric(rng, cfg.dominance_delta);
            }
            MutationKind::StabilityChange => {
                allele.stability += symmetric(rng, cfg.stability_delta);
            }
            MutationKind::Color => match allele.color {
                Some(color) => {
                    allele.color = Some(color.perturb(
                        symmetric(rng, cfg.hue_delta),
                        symmetric(rng, cfg.tone_delta),
                        symmetric(rng, cfg.tone_delta),
                    ));
                }
                None => {
                    self.skipped_color += 1;
                    return false;
                }
            },
        }
        allele.clamp();
        self.total_mutations += 1;
        true
    }

    /// Run `maybe_mutate` over every allele; returns the number mutated
    pub fn mutate_all<'a, R, I>(&mut self, alleles: I, rng: &mut R) -> usize
    where
        R: Rng,
        I: IntoIterator<Item = &'a mut Allele>,
    {
        alleles
            .into_iter()
            .filter_map(|allele| self.maybe_mutate(allele, rng))
            .count()
    }

    pub fn stats_string(&self) -> String {
        format!(
            "Mutations: {} (color skipped: {})",
            self.total_mutations, self.skipped_color
        )
    }
}

/// Uniform draw from (-half_width, half_width); zero width gives zero
fn symmetric<R: Rng>(rng: &mut R, half_width: f32) -> f32 {
    if half_width <= 0.0 {
        0.0
    } else {
        rng.gen_range(-half_width..half_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genetics::allele::Hsv;
    use crate::genetics::gene::{GeneCatalog, GeneType};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_allele(gene_type: GeneType) -> Allele {
        let catalog = GeneCatalog::fully_unlocked();
        Allele::default_for(catalog.by_type(gene_type).unwrap(), "a".to_string())
    }

    #[test]
    fn test_dominance_shift_stays_in_range() {
        let mut engine = MutationEngine::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        for _ in 0..500 {
            let mut allele = test_allele(GeneType::PlantHeight);
            allele.dominance = 0.9;
            assert!(engine.apply(&mut allele, MutationKind::DominanceShift, &mut rng));
            assert!(allele.dominance >= 0.7 && allele.dominance <= 1.0);
        }
    }

    #[test]
    fn test_point_mutation_clamps() {
        let mut engine = MutationEngine::default();
        let mut rng = ChaCha8Rng::seed_from_u64(6);

        for _ in 0..200 {
            let mut allele = test_allele(GeneType::ThcProduction);
            allele.expression = 0.98;
            engine.apply(&mut allele, MutationKind::Point, &mut rng);
            assert!(allele.expression <= 1.0 && allele.expression >= 0.88);
        }
    }

    #[test]
    fn test_stability_floor() {
        let mut engine = MutationEngine::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..200 {
            let mut allele = test_allele(GeneType::GrowthRate);
            allele.stability = 0.12;
            engine.apply(&mut allele, MutationKind::StabilityChange, &mut rng);
            assert!(allele.stability >= 0.1);
        }
    }

    #[test]
    fn test_color_mutation() {
        let mut engine = MutationEngine::default();
        let mut rng = ChaCha8Rng::seed_from_u64(8);

        let mut plain = test_allele(GeneType::PlantHeight);
        assert!(!engine.apply(&mut plain, MutationKind::Color, &mut rng));
        assert_eq!(engine.skipped_color, 1);

        let mut colored = test_allele(GeneType::LeafColor);
        colored.color = Some(Hsv::new(0.99, 1.0, 0.0));
        assert!(engine.apply(&mut colored, MutationKind::Color, &mut rng));
        let color = colored.color.unwrap();
        assert!((0.0..1.0).contains(&color.hue));
        assert!((0.0..=1.0).contains(&color.saturation));
        assert!((0.0..=1.0).contains(&color.value));
    }

    #[test]
    fn test_mutation_rate_gates() {
        let mut engine = MutationEngine::default();
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        let mut never = test_allele(GeneType::PlantHeight);
        never.mutation_rate = 0.0;
        for _ in 0..100 {
            assert!(engine.maybe_mutate(&mut never, &mut rng).is_none());
        }

        let mut always = test_allele(GeneType::PlantHeight);
        always.mutation_rate = 1.0;
        let applied = (0..100)
            .filter(|_| engine.maybe_mutate(&mut always, &mut rng).is_some())
            .count();
        // Color draws on a colorless allele are the only misses
        assert!(applied > 50);
        assert!(always.is_valid());
    }
}
