//! Genetics module - genes, alleles, genotypes, breeding, mutation, lineage and diversity.

pub mod allele;
pub mod breeding;
pub mod diversity;
pub mod gene;
pub mod genotype;
pub mod lineage;
pub mod mutation;
pub mod phenotype;

pub use allele::{Allele, AlleleId, Hsv, Morphology, StrainType};
pub use breeding::{BreedingMethod, BreedingRecord, BreedingResult, BreedingSimulator};
pub use diversity::{DiversityHistory, DiversityMetrics, DiversityTracker};
pub use gene::{GeneCatalog, GeneDefinition, GeneId, GeneType};
pub use genotype::{AllelePair, CannabisGenotype, GenotypeId, StrainProfile};
pub use lineage::{GeneticLineage, LineageTracker};
pub use mutation::{MutationEngine, MutationKind};
pub use phenotype::{CannabisPhenotype, PhenotypeEngine};
