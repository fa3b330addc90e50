//! The genetics engine: one composed object owning every collaborator.

use crate::checkpoint::GeneticsCheckpoint;
use crate::config::Config;
use crate::environment::adaptation::{AdaptationManager, TickReport};
use crate::environment::conditions::EnvironmentalConditions;
use crate::error::{GeneticsError, GeneticsResult};
use crate::events::{EventBus, GeneticsEvent};
use crate::genetics::allele::random_id;
use crate::genetics::breeding::{BreedingMethod, BreedingRecord, BreedingResult, BreedingSimulator};
use crate::genetics::diversity::DiversityMetrics;
use crate::genetics::gene::{GeneCatalog, GeneId, GeneType};
use crate::genetics::genotype::{CannabisGenotype, StrainProfile};
use crate::genetics::lineage::GeneticLineage;
use crate::genetics::mutation::MutationEngine;
use crate::genetics::phenotype::{CannabisPhenotype, PhenotypeEngine};
use crate::repository::GeneticsRepository;
use chrono::Utc;
use parking_lot::RwLock;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

/// Engine behind a single-writer, many-reader lock
pub type SharedEngine = Arc<RwLock<GeneticsEngine>>;

/// Genetics and breeding simulation engine
pub struct GeneticsEngine {
    config: Config,
    catalog: GeneCatalog,
    repository: GeneticsRepository,
    breeder: BreedingSimulator,
    mutation: MutationEngine,
    phenotypes: PhenotypeEngine,
    adaptation: AdaptationManager,
    events: EventBus,
    discovered_traits: BTreeSet<GeneType>,
    running: bool,
    // Random number generator (seeded for reproducibility)
    rng: ChaCha8Rng,
    seed: u64,
}

impl GeneticsEngine {
    /// Create an engine with a random seed
    pub fn new(config: Config) -> Self {
        let seed = rand::thread_rng().gen();
        Self::new_with_seed(config, seed)
    }

    /// Create an engine with a specific seed for reproducibility
    pub fn new_with_seed(config: Config, seed: u64) -> Self {
        Self {
            catalog: GeneCatalog::new(),
            repository: GeneticsRepository::new(&config),
            breeder: BreedingSimulator::new(config.breeding.clone()),
            mutation: MutationEngine::new(config.mutation.clone()),
            phenotypes: PhenotypeEngine::new(config.adaptation.clone()),
            adaptation: AdaptationManager::new(config.adaptation.clone()),
            events: EventBus::new(),
            discovered_traits: BTreeSet::new(),
            running: false,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            config,
        }
    }

    /// Restore an engine from a checkpoint.
    ///
    /// The random stream resumes where the checkpointed engine left off.
    pub fn from_checkpoint(checkpoint: GeneticsCheckpoint) -> Self {
        let config = checkpoint.config;
        let mut rng = ChaCha8Rng::seed_from_u64(checkpoint.random_seed);
        rng.set_word_pos(checkpoint.rng_word_pos);
        let mut adaptation = AdaptationManager::new(config.adaptation.clone());
        adaptation.restore_tick_count(checkpoint.tick_count);

        log::info!(
            "Engine restored: {} genotypes, seed {}",
            checkpoint.repository.len(),
            checkpoint.random_seed
        );

        Self {
            catalog: checkpoint.catalog,
            repository: checkpoint.repository,
            breeder: BreedingSimulator::new(config.breeding.clone()),
            mutation: MutationEngine::new(config.mutation.clone()),
            phenotypes: PhenotypeEngine::new(config.adaptation.clone()),
            adaptation,
            events: EventBus::new(),
            discovered_traits: checkpoint.discovered_traits,
            running: false,
            rng,
            seed: checkpoint.random_seed,
            config,
        }
    }

    /// Create checkpoint of current state
    pub fn create_checkpoint(&self) -> GeneticsCheckpoint {
        GeneticsCheckpoint {
            version: GeneticsCheckpoint::VERSION,
            created_at: Utc::now(),
            config: self.config.clone(),
            catalog: self.catalog.clone(),
            repository: self.repository.clone(),
            discovered_traits: self.discovered_traits.clone(),
            tick_count: self.adaptation.tick_count(),
            random_seed: self.seed,
            rng_word_pos: self.rng.get_word_pos(),
        }
    }

    /// Wrap the engine for sharing with the adaptation scheduler
    pub fn into_shared(self) -> SharedEngine {
        Arc::new(RwLock::new(self))
    }

    /// Start accepting work
    pub fn init(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        log::info!(
            "Genetics engine initialized: {} genes registered, {} genotypes, seed {}",
            self.catalog.len(),
            self.repository.len(),
            self.seed
        );
    }

    /// Stop and disconnect every subscriber
    pub fn shutdown(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.events.clear();
        log::info!("Genetics engine shut down. {}", self.stats_string());
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Receive every event published from now on
    pub fn subscribe(&self) -> Receiver<GeneticsEvent> {
        self.events.subscribe()
    }

    /// Seed a founder genotype from a strain profile and store it
    pub fn create_founder(&mut self, strain: &StrainProfile) -> GeneticsResult<CannabisGenotype> {
        let mut founder = CannabisGenotype::founder(
            strain,
            &self.catalog,
            self.config.mutation.default_mutation_rate,
            &mut self.rng,
        );
        founder.phenotype = Some(self.phenotypes.express(&founder, &self.catalog, None));

        self.repository.insert(founder.clone())?;
        log::info!("Founder {} created for strain {}", founder.id, strain.name);
        self.discover_traits(&founder);

        Ok(founder)
    }

    /// Derive a mutated variant of a stored genotype.
    ///
    /// With conditions, one environmental pressure step per stressor follows
    /// the mutation pass.
    pub fn generate_genetic_variation(
        &mut self,
        base_id: &str,
        conditions: Option<&EnvironmentalConditions>,
    ) -> GeneticsResult<CannabisGenotype> {
        let base = self.repository.get(base_id)?;

        let mut variant = base.clone();
        variant.id = random_id(&mut self.rng);
        variant.created_at = Utc::now();
        variant.is_founder = false;
        variant.parent_genotypes = vec![base.id.clone()];
        variant.hybrid_vigor = None;
        for allele in variant.all_alleles_mut() {
            *allele = allele.clone_with_id(random_id(&mut self.rng));
        }

        let mutated = self.mutation.mutate_all(variant.all_alleles_mut(), &mut self.rng);
        let pressured = conditions
            .map(|c| self.adaptation.apply_pressure(&mut variant, &self.catalog, c))
            .unwrap_or(0);
        variant.phenotype = Some(self.phenotypes.express(&variant, &self.catalog, conditions));

        self.repository.insert(variant.clone())?;
        log::info!(
            "Variant {} generated from {} ({} mutations, {} pressured genes)",
            variant.id,
            base_id,
            mutated,
            pressured
        );

        self.events.publish(GeneticsEvent::NewGenotypeGenerated {
            genotype_id: variant.id.clone(),
            base_id: base_id.to_string(),
        });
        self.discover_traits(&variant);

        Ok(variant)
    }

    /// Whether two ids name distinct stored genotypes
    pub fn can_perform_breeding(&self, parent1_id: &str, parent2_id: &str) -> bool {
        parent1_id != parent2_id
            && self.repository.contains(parent1_id)
            && self.repository.contains(parent2_id)
    }

    /// Cross two stored genotypes and store the offspring.
    ///
    /// Fails with `InvalidSelfBreed` or `ParentNotFound` before any state
    /// changes.
    pub fn perform_breeding(
        &mut self,
        parent1_id: &str,
        parent2_id: &str,
        method: BreedingMethod,
    ) -> GeneticsResult<BreedingResult> {
        if parent1_id == parent2_id {
            log::warn!("Breeding rejected: {} crossed with itself", parent1_id);
            return Err(GeneticsError::InvalidSelfBreed(parent1_id.to_string()));
        }
        for id in [parent1_id, parent2_id] {
            if !self.repository.contains(id) {
                log::warn!("Breeding rejected: parent {} not found", id);
                return Err(GeneticsError::ParentNotFound(id.to_string()));
            }
        }

        let outcross = self.repository.lineage().is_outcross(parent1_id, parent2_id);
        let parent1 = self.repository.get(parent1_id)?;
        let parent2 = self.repository.get(parent2_id)?;

        let mut offspring = self.breeder.cross(
            (parent1, parent2),
            method,
            outcross,
            &self.catalog,
            &mut self.mutation,
            &mut self.rng,
        );
        for child in &mut offspring {
            child.phenotype = Some(self.phenotypes.express(child, &self.catalog, None));
        }

        let hybrid_vigor = self.breeder.hybrid_vigor_for(method, outcross);
        let offspring_ids: Vec<_> = offspring.iter().map(|c| c.id.clone()).collect();
        self.repository.insert_all(offspring.clone())?;

        let record = BreedingRecord {
            id: random_id(&mut self.rng),
            parent1: parent1_id.to_string(),
            parent2: parent2_id.to_string(),
            method,
            timestamp: Utc::now(),
            offspring_ids: offspring_ids.clone(),
            success: !offspring.is_empty(),
            notes: format!(
                "{} offspring, outcross: {}, hybrid vigor: {}",
                offspring.len(),
                outcross,
                hybrid_vigor.is_some()
            ),
        };
        let record_id = record.id.clone();
        let success = record.success;
        self.repository.append_record(record);

        log::info!(
            "Breeding completed: {} x {} ({}), {} offspring, outcross: {}",
            parent1_id,
            parent2_id,
            method,
            offspring.len(),
            outcross
        );

        self.events.publish(GeneticsEvent::BreedingCompleted {
            record_id: record_id.clone(),
            parent1: parent1_id.to_string(),
            parent2: parent2_id.to_string(),
            method,
            offspring_ids,
            hybrid_vigor: hybrid_vigor.is_some(),
        });
        for child in &offspring {
            self.discover_traits(child);
        }

        Ok(BreedingResult {
            success,
            record_id,
            method,
            outcross,
            hybrid_vigor,
            offspring,
        })
    }

    pub fn get_genotype(&self, id: &str) -> GeneticsResult<&CannabisGenotype> {
        self.repository.get(id)
    }

    pub fn get_genotypes_by_strain(&self, strain_id: &str) -> Vec<&CannabisGenotype> {
        self.repository.list_by_strain(strain_id)
    }

    pub fn get_breeding_record(&self, id: &str) -> GeneticsResult<&BreedingRecord> {
        self.repository.breeding_record(id)
    }

    /// Breeding records, newest first
    pub fn get_breeding_history(&self) -> Vec<&BreedingRecord> {
        self.repository.breeding_history()
    }

    pub fn get_genetic_lineage(&self, id: &str) -> GeneticsResult<&GeneticLineage> {
        self.repository.get_lineage(id)
    }

    /// Recompute a genotype's phenotype and cache it on the genotype
    pub fn compute_phenotype(
        &mut self,
        id: &str,
        conditions: Option<&EnvironmentalConditions>,
    ) -> GeneticsResult<CannabisPhenotype> {
        let genotype = self.repository.get_mut(id)?;
        let phenotype = self.phenotypes.express(genotype, &self.catalog, conditions);
        genotype.phenotype = Some(phenotype.clone());
        Ok(phenotype)
    }

    pub fn overall_diversity(&self) -> f32 {
        self.repository.diversity().overall_diversity()
    }

    pub fn diversity_metrics(&self) -> &DiversityMetrics {
        self.repository.diversity().metrics()
    }

    /// Consume a research completion, unlocking its genes.
    ///
    /// Every stored genotype is backfilled with default alleles for the new
    /// genes. Returns the newly unlocked gene ids.
    pub fn complete_research(&mut self, research_id: &str) -> GeneticsResult<Vec<GeneId>> {
        let unlocked = self.catalog.complete_research(research_id)?;
        if unlocked.is_empty() {
            log::debug!("Research {} unlocked nothing new", research_id);
            return Ok(unlocked);
        }

        for id in self.repository.genotype_ids() {
            if let Ok(genotype) = self.repository.get_mut(&id) {
                genotype.ensure_diploid(&self.catalog, &mut self.rng);
            }
        }
        self.repository.recompute_diversity();

        for gene_id in &unlocked {
            log::info!("Gene {} unlocked by research {}", gene_id, research_id);
            self.events.publish(GeneticsEvent::GeneUnlocked {
                gene_id: gene_id.clone(),
                research_id: research_id.to_string(),
            });
        }

        Ok(unlocked)
    }

    /// Advance adaptation and epigenetics by one tick of `elapsed_secs`
    pub fn process_adaptation_tick(
        &mut self,
        conditions: &EnvironmentalConditions,
        elapsed_secs: f32,
    ) -> TickReport {
        let report = self
            .adaptation
            .tick(&mut self.repository, &self.catalog, conditions, elapsed_secs);

        if !report.adapted.is_empty() {
            self.repository.recompute_diversity();
        }
        for (genotype_id, stressors) in &report.adapted {
            self.events.publish(GeneticsEvent::AdaptationOccurred {
                genotype_id: genotype_id.clone(),
                stressors: stressors.clone(),
            });
        }

        report
    }

    /// Publish `NewTraitDiscovered` for trait types seen above threshold for
    /// the first time
    fn discover_traits(&mut self, genotype: &CannabisGenotype) {
        let Some(phenotype) = &genotype.phenotype else {
            return;
        };
        let threshold = self.config.breeding.trait_discovery_threshold;

        for (&gene_type, &value) in &phenotype.traits {
            if value >= threshold && self.discovered_traits.insert(gene_type) {
                log::info!(
                    "New trait discovered: {} ({:.2}) in {}",
                    gene_type.name(),
                    value,
                    genotype.id
                );
                self.events.publish(GeneticsEvent::NewTraitDiscovered {
                    gene_type,
                    genotype_id: genotype.id.clone(),
                    value,
                });
            }
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &GeneCatalog {
        &self.catalog
    }

    pub fn repository(&self) -> &GeneticsRepository {
        &self.repository
    }

    pub fn breeder(&self) -> &BreedingSimulator {
        &self.breeder
    }

    pub fn discovered_traits(&self) -> &BTreeSet<GeneType> {
        &self.discovered_traits
    }

    pub fn population(&self) -> usize {
        self.repository.len()
    }

    /// Get seed for reproducibility
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn tick_count(&self) -> u64 {
        self.adaptation.tick_count()
    }

    pub fn stats_string(&self) -> String {
        format!(
            "{} genotypes | {} | {} | adaptations: {} | diversity: {:.4}",
            self.repository.len(),
            self.breeder.stats_string(),
            self.mutation.stats_string(),
            self.adaptation.adaptations_applied,
            self.overall_diversity()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::conditions::Stressor;

    fn create_engine() -> (GeneticsEngine, String, String) {
        let mut engine = GeneticsEngine::new_with_seed(Config::default(), 42);
        engine.init();
        let p1 = engine.create_founder(&StrainProfile::strain_a()).unwrap().id;
        let p2 = engine.create_founder(&StrainProfile::strain_b()).unwrap().id;
        (engine, p1, p2)
    }

    #[test]
    fn test_founders_have_phenotypes_and_lineage() {
        let (engine, p1, _) = create_engine();
        let founder = engine.get_genotype(&p1).unwrap();
        assert!(founder.phenotype.is_some());
        assert!(engine.get_genetic_lineage(&p1).unwrap().is_founder());
        assert_eq!(engine.get_genotypes_by_strain("strain_a").len(), 1);
    }

    #[test]
    fn test_self_breed_rejected_without_state_change() {
        let (mut engine, p1, _) = create_engine();
        assert!(!engine.can_perform_breeding(&p1, &p1));
        assert_eq!(
            engine.perform_breeding(&p1, &p1, BreedingMethod::StandardCross).unwrap_err(),
            GeneticsError::InvalidSelfBreed(p1.clone())
        );
        assert_eq!(engine.population(), 2);
        assert!(engine.get_breeding_history().is_empty());
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let (mut engine, p1, _) = create_engine();
        assert!(!engine.can_perform_breeding(&p1, "ghost"));
        assert_eq!(
            engine.perform_breeding(&p1, "ghost", BreedingMethod::Backcross).unwrap_err(),
            GeneticsError::ParentNotFound("ghost".to_string())
        );
        assert_eq!(engine.population(), 2);
    }

    #[test]
    fn test_breeding_appends_record_and_offspring() {
        let (mut engine, p1, p2) = create_engine();
        let result = engine.perform_breeding(&p1, &p2, BreedingMethod::Outbreeding).unwrap();

        assert!(result.success);
        assert_eq!(result.offspring.len(), 4);
        assert_eq!(engine.population(), 6);

        let record = engine.get_breeding_record(&result.record_id).unwrap();
        assert_eq!(record.offspring_ids.len(), 4);
        assert_eq!(record.method, BreedingMethod::Outbreeding);
        for child in &result.offspring {
            assert!(engine.get_genotype(&child.id).unwrap().phenotype.is_some());
        }
    }

    #[test]
    fn test_variation_of_unknown_id() {
        let (mut engine, _, _) = create_engine();
        let events = engine.subscribe();
        assert_eq!(
            engine.generate_genetic_variation("unknown-id", None).unwrap_err(),
            GeneticsError::NotFound("unknown-id".to_string())
        );
        assert_eq!(engine.population(), 2);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_variation_records_single_parent() {
        let (mut engine, p1, _) = create_engine();
        let base_generation = engine.get_genotype(&p1).unwrap().generation;
        let variant = engine.generate_genetic_variation(&p1, None).unwrap();

        assert_ne!(variant.id, p1);
        assert_eq!(variant.generation, base_generation);
        assert_eq!(variant.strain_id, "strain_a");
        assert_eq!(variant.parent_genotypes, vec![p1.clone()]);
        assert!(!variant.is_founder);
        assert_eq!(engine.get_genetic_lineage(&variant.id).unwrap().direct_parents, vec![p1]);

        let base_ids: Vec<_> = engine.get_genotype(&variant.parent_genotypes[0]).unwrap().all_alleles().map(|a| a.id.clone()).collect();
        assert!(variant.all_alleles().all(|a| !base_ids.contains(&a.id)));
    }

    #[test]
    fn test_variation_under_stress() {
        let (mut engine, p1, _) = create_engine();
        let heat = EnvironmentalConditions::new(38.0, 55.0, 800.0, 400.0);
        let variant = engine.generate_genetic_variation(&p1, Some(&heat)).unwrap();
        assert!(variant.is_valid());
        assert!(variant.phenotype.unwrap().environmental_stress > 0.0);
    }

    #[test]
    fn test_research_backfills_population() {
        let (mut engine, p1, _) = create_engine();
        let events = engine.subscribe();

        let unlocked = engine.complete_research("climate_adaptation").unwrap();
        assert_eq!(unlocked, vec!["cold_tolerance".to_string(), "drought_tolerance".to_string()]);
        for genotype in engine.repository().genotypes() {
            assert!(genotype.validate_diploid(engine.catalog()).is_ok());
        }
        let kinds: Vec<_> = events.try_iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["gene_unlocked", "gene_unlocked"]);

        assert!(engine.complete_research("climate_adaptation").unwrap().is_empty());
        assert_eq!(
            engine.complete_research("alchemy").unwrap_err(),
            GeneticsError::UnknownResearch("alchemy".to_string())
        );
        assert!(engine.get_genotype(&p1).is_ok());
    }

    #[test]
    fn test_adaptation_tick_publishes_event() {
        let (mut engine, _, _) = create_engine();
        let events = engine.subscribe();
        let heat = EnvironmentalConditions::new(35.0, 55.0, 800.0, 400.0);

        let report = engine.process_adaptation_tick(&heat, 10.0);
        assert_eq!(report.adapted.len(), 2);

        let adapted: Vec<_> = events
            .try_iter()
            .filter_map(|e| match e {
                GeneticsEvent::AdaptationOccurred { stressors, .. } => Some(stressors),
                _ => None,
            })
            .collect();
        assert_eq!(adapted, vec![vec![Stressor::Heat], vec![Stressor::Heat]]);
        assert_eq!(engine.tick_count(), 1);
    }

    #[test]
    fn test_seeded_engines_reproduce() {
        let (mut a, a1, a2) = create_engine();
        let (mut b, b1, b2) = create_engine();
        assert_eq!(a1, b1);

        let ra = a.perform_breeding(&a1, &a2, BreedingMethod::StandardCross).unwrap();
        let rb = b.perform_breeding(&b1, &b2, BreedingMethod::StandardCross).unwrap();
        for (x, y) in ra.offspring.iter().zip(&rb.offspring) {
            assert_eq!(x.alleles, y.alleles);
        }
    }

    #[test]
    fn test_restored_engine_resumes_random_stream() {
        let (mut original, _, _) = create_engine();
        let mut restored = GeneticsEngine::from_checkpoint(original.create_checkpoint());

        let next = original.create_founder(&StrainProfile::strain_a()).unwrap();
        let resumed = restored.create_founder(&StrainProfile::strain_a()).unwrap();

        assert_eq!(resumed.id, next.id);
        assert_eq!(resumed.alleles, next.alleles);
        assert_eq!(restored.population(), 3);
    }

    #[test]
    fn test_shutdown_disconnects_subscribers() {
        let (mut engine, _, _) = create_engine();
        let events = engine.subscribe();
        engine.shutdown();
        assert!(!engine.is_running());
        assert!(matches!(
            events.recv(),
            Err(std::sync::mpsc::RecvError)
        ));
    }
}
