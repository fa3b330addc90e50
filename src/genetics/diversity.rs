//! Population-level genetic diversity metrics.

use crate::config::DiversityConfig;
use crate::genetics::gene::GeneId;
use crate::genetics::genotype::CannabisGenotype;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Collection of diversity metrics for a population
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiversityMetrics {
    /// Number of genotypes measured
    pub population: usize,
    /// Mean per-gene variance of allele expression
    pub expression_variance: f32,
    /// Mean per-gene variance of allele dominance
    pub dominance_variance: f32,
    /// Share of loci whose two alleles differ noticeably in expression
    pub heterozygosity: f32,
    /// Simpson's index over source strains (0 = one strain)
    pub strain_simpson: f32,
    /// Overall score: mean over genes of expression + dominance variance
    pub overall: f32,
}

impl DiversityMetrics {
    /// Format as a human-readable string
    pub fn summary(&self) -> String {
        format!(
            "Diversity: overall={:.4}, expr_var={:.4}, dom_var={:.4}, Ho={:.3}, Simpson={:.3}, N={}",
            self.overall,
            self.expression_variance,
            self.dominance_variance,
            self.heterozygosity,
            self.strain_simpson,
            self.population
        )
    }
}

/// Running sums for one gene
#[derive(Clone, Copy, Debug, Default)]
struct GeneAccumulator {
    n: f64,
    sum_expression: f64,
    sum_sq_expression: f64,
    sum_dominance: f64,
    sum_sq_dominance: f64,
}

impl GeneAccumulator {
    fn add(&mut self, expression: f32, dominance: f32) {
        let (e, d) = (expression as f64, dominance as f64);
        self.n += 1.0;
        self.sum_expression += e;
        self.sum_sq_expression += e * e;
        self.sum_dominance += d;
        self.sum_sq_dominance += d * d;
    }

    fn merge(&mut self, other: &GeneAccumulator) {
        self.n += other.n;
        self.sum_expression += other.sum_expression;
        self.sum_sq_expression += other.sum_sq_expression;
        self.sum_dominance += other.sum_dominance;
        self.sum_sq_dominance += other.sum_sq_dominance;
    }

    fn variances(&self) -> (f64, f64) {
        if self.n == 0.0 {
            return (0.0, 0.0);
        }
        let var = |sum: f64, sum_sq: f64| (sum_sq / self.n - (sum / self.n).powi(2)).max(0.0);
        (
            var(self.sum_expression, self.sum_sq_expression),
            var(self.sum_dominance, self.sum_sq_dominance),
        )
    }
}

/// Partial result folded per genotype and reduced across the population
#[derive(Clone, Debug, Default)]
struct Partial {
    genes: HashMap<GeneId, GeneAccumulator>,
    loci: u64,
    heterozygous_loci: u64,
}

impl Partial {
    fn from_genotype(genotype: &CannabisGenotype, threshold: f32) -> Self {
        let mut partial = Partial::default();
        for (gene_id, pair) in &genotype.alleles {
            let acc = partial.genes.entry(gene_id.clone()).or_default();
            for allele in pair {
                acc.add(allele.expression, allele.dominance);
            }
            partial.loci += 1;
            if (pair[0].expression - pair[1].expression).abs() > threshold {
                partial.heterozygous_loci += 1;
            }
        }
        partial
    }

    fn merge(mut self, other: Partial) -> Self {
        for (gene_id, acc) in other.genes {
            self.genes.entry(gene_id).or_default().merge(&acc);
        }
        self.loci += other.loci;
        self.heterozygous_loci += other.heterozygous_loci;
        self
    }
}

/// Compute every metric over a population
pub fn calculate_metrics(genotypes: &[&CannabisGenotype], config: &DiversityConfig) -> DiversityMetrics {
    if genotypes.is_empty() {
        return DiversityMetrics::default();
    }

    let threshold = config.heterozygosity_threshold;
    let partial = genotypes
        .par_iter()
        .map(|g| Partial::from_genotype(g, threshold))
        .reduce(Partial::default, Partial::merge);

    let gene_count = partial.genes.len().max(1) as f64;
    let (expr_total, dom_total) = partial
        .genes
        .values()
        .map(GeneAccumulator::variances)
        .fold((0.0, 0.0), |(e, d), (ve, vd)| (e + ve, d + vd));

    let expression_variance = (expr_total / gene_count) as f32;
    let dominance_variance = (dom_total / gene_count) as f32;

    let heterozygosity = if partial.loci == 0 {
        0.0
    } else {
        partial.heterozygous_loci as f32 / partial.loci as f32
    };

    DiversityMetrics {
        population: genotypes.len(),
        expression_variance,
        dominance_variance,
        heterozygosity,
        strain_simpson: calculate_strain_simpson(genotypes),
        overall: expression_variance + dominance_variance,
    }
}

/// Simpson's diversity index over source strains
/// D = 1 - Σ(p_i²) where p_i is the proportion of strain i
pub fn calculate_strain_simpson(genotypes: &[&CannabisGenotype]) -> f32 {
    if genotypes.is_empty() {
        return 0.0;
    }

    let mut strain_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for genotype in genotypes {
        *strain_counts.entry(genotype.strain_id.as_str()).or_insert(0) += 1;
    }

    let total = genotypes.len() as f32;
    let sum_squares: f32 = strain_counts
        .values()
        .map(|&count| (count as f32 / total).powi(2))
        .sum();

    1.0 - sum_squares
}

/// One recomputation of the population metrics
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiversityRecord {
    pub sequence: u64,
    pub metrics: DiversityMetrics,
}

/// Track diversity over time
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DiversityHistory {
    pub records: Vec<DiversityRecord>,
    pub limit: usize,
    next_sequence: u64,
}

impl DiversityHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            records: Vec::new(),
            limit,
            next_sequence: 0,
        }
    }

    pub fn record(&mut self, metrics: DiversityMetrics) {
        self.records.push(DiversityRecord {
            sequence: self.next_sequence,
            metrics,
        });
        self.next_sequence += 1;

        if self.limit > 0 && self.records.len() > self.limit {
            let excess = self.records.len() - self.limit;
            self.records.drain(..excess);
        }
    }

    /// Get latest record
    pub fn latest(&self) -> Option<&DiversityRecord> {
        self.records.last()
    }

    /// Change in overall diversity over the last `window` records
    pub fn diversity_trend(&self, window: usize) -> f32 {
        let recent: Vec<_> = self.records.iter().rev().take(window).collect();

        match (recent.last(), recent.first()) {
            (Some(first), Some(last)) if recent.len() >= 2 => {
                last.metrics.overall - first.metrics.overall
            }
            _ => 0.0,
        }
    }

    /// Export to CSV format
    pub fn to_csv(&self) -> String {
        let mut csv = String::from(
            "sequence,population,overall,expression_variance,dominance_variance,heterozygosity,strain_simpson\n",
        );

        for record in &self.records {
            csv.push_str(&format!(
                "{},{},{:.6},{:.6},{:.6},{:.4},{:.4}\n",
                record.sequence,
                record.metrics.population,
                record.metrics.overall,
                record.metrics.expression_variance,
                record.metrics.dominance_variance,
                record.metrics.heterozygosity,
                record.metrics.strain_simpson,
            ));
        }

        csv
    }
}

/// Running diversity score, recomputed whenever the population size changes
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DiversityTracker {
    config: DiversityConfig,
    metrics: DiversityMetrics,
    observed_population: usize,
    history: DiversityHistory,
}

impl DiversityTracker {
    pub fn new(config: DiversityConfig) -> Self {
        let history = DiversityHistory::new(config.history_limit);
        Self {
            config,
            metrics: DiversityMetrics::default(),
            observed_population: 0,
            history,
        }
    }

    /// Recompute if the population size differs from the last observation.
    ///
    /// Returns true when the metrics were recomputed.
    pub fn observe(&mut self, genotypes: &[&CannabisGenotype]) -> bool {
        if genotypes.len() == self.observed_population {
            return false;
        }
        self.recompute(genotypes);
        true
    }

    /// Unconditionally recompute the metrics
    pub fn recompute(&mut self, genotypes: &[&CannabisGenotype]) {
        self.metrics = calculate_metrics(genotypes, &self.config);
        self.observed_population = genotypes.len();
        self.history.record(self.metrics.clone());
        log::debug!("{}", self.metrics.summary());
    }

    /// Overall diversity score (>= 0)
    pub fn overall_diversity(&self) -> f32 {
        self.metrics.overall
    }

    pub fn metrics(&self) -> &DiversityMetrics {
        &self.metrics
    }

    pub fn history(&self) -> &DiversityHistory {
        &self.history
    }
}
