//! Engine notifications delivered to subscribers over channels.

use crate::environment::conditions::Stressor;
use crate::genetics::breeding::BreedingMethod;
use crate::genetics::gene::{GeneId, GeneType};
use crate::genetics::genotype::GenotypeId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender};

/// Notifications fired after successful operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GeneticsEvent {
    /// A variant genotype was generated from a base genotype
    NewGenotypeGenerated {
        genotype_id: GenotypeId,
        base_id: GenotypeId,
    },
    /// A breeding call completed and its offspring were stored
    BreedingCompleted {
        record_id: String,
        parent1: GenotypeId,
        parent2: GenotypeId,
        method: BreedingMethod,
        offspring_ids: Vec<GenotypeId>,
        hybrid_vigor: bool,
    },
    /// First time any genotype expressed this trait above the discovery threshold
    NewTraitDiscovered {
        gene_type: GeneType,
        genotype_id: GenotypeId,
        value: f32,
    },
    /// Research unlocked a gene into the catalog
    GeneUnlocked { gene_id: GeneId, research_id: String },
    /// A one-shot adaptive change was applied
    AdaptationOccurred {
        genotype_id: GenotypeId,
        stressors: Vec<Stressor>,
    },
}

impl GeneticsEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            GeneticsEvent::NewGenotypeGenerated { .. } => "new_genotype_generated",
            GeneticsEvent::BreedingCompleted { .. } => "breeding_completed",
            GeneticsEvent::NewTraitDiscovered { .. } => "new_trait_discovered",
            GeneticsEvent::GeneUnlocked { .. } => "gene_unlocked",
            GeneticsEvent::AdaptationOccurred { .. } => "adaptation_occurred",
        }
    }
}

/// Fan-out of events to every live subscriber
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<GeneticsEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber; it receives every event published afterwards
    pub fn subscribe(&self) -> Receiver<GeneticsEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Send to all subscribers, dropping those whose receiver is gone
    pub fn publish(&self, event: GeneticsEvent) {
        log::trace!("Event: {}", event.kind());
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Drop every subscriber; their receivers see a disconnect
    pub fn clear(&self) {
        self.subscribers.lock().clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unlocked(gene: &str) -> GeneticsEvent {
        GeneticsEvent::GeneUnlocked {
            gene_id: gene.to_string(),
            research_id: "plant_pathology".to_string(),
        }
    }

    #[test]
    fn test_all_subscribers_receive() {
        let bus = EventBus::new();
        let rx1 = bus.subscribe();
        let rx2 = bus.subscribe();

        bus.publish(unlocked("pest_resistance"));

        assert_eq!(rx1.try_recv().unwrap(), unlocked("pest_resistance"));
        assert_eq!(rx2.try_recv().unwrap(), unlocked("pest_resistance"));
        assert!(rx1.try_recv().is_err());
    }

    #[test]
    fn test_dropped_subscribers_removed() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        drop(bus.subscribe());

        bus.publish(unlocked("bud_color"));
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(rx.try_recv().unwrap().kind(), "gene_unlocked");
    }

    #[test]
    fn test_late_subscriber_misses_earlier_events() {
        let bus = EventBus::new();
        bus.publish(unlocked("bud_color"));
        let rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
    }
}
