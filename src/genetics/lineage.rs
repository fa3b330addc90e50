//! Lineage tracking: bounded ancestor sets and outcross detection.

use crate::config::{LineageConfig, OutcrossPolicy};
use crate::genetics::genotype::GenotypeId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Ancestry record for one genotype
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneticLineage {
    pub genotype_id: GenotypeId,
    /// Parents in cross order (empty for founders)
    pub direct_parents: Vec<GenotypeId>,
    /// Deduplicated ancestors, most recent first, capped
    pub ancestors: Vec<GenotypeId>,
    pub generation: u32,
}

impl GeneticLineage {
    pub fn is_founder(&self) -> bool {
        self.direct_parents.is_empty()
    }
}

/// Lineage bookkeeping for every stored genotype
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LineageTracker {
    lineages: HashMap<GenotypeId, GeneticLineage>,
    /// Genotypes recorded without parents
    root_ids: Vec<GenotypeId>,
    config: LineageConfig,
}

impl LineageTracker {
    pub fn new(config: LineageConfig) -> Self {
        Self {
            lineages: HashMap::new(),
            root_ids: Vec::new(),
            config,
        }
    }

    /// Record a genotype without parents
    pub fn record_founder(&mut self, genotype_id: &str, generation: u32) {
        self.lineages.insert(
            genotype_id.to_string(),
            GeneticLineage {
                genotype_id: genotype_id.to_string(),
                direct_parents: Vec::new(),
                ancestors: Vec::new(),
                generation,
            },
        );
        self.root_ids.push(genotype_id.to_string());
    }

    /// Record a genotype derived from one or two parents.
    ///
    /// Ancestors are the parent ids followed by the parents' own ancestors,
    /// interleaved so each parent's most recent ancestors come first, then
    /// deduplicated and truncated to the configured cap.
    pub fn record_lineage(
        &mut self,
        genotype_id: &str,
        parents: &[GenotypeId],
        generation: u32,
    ) -> &GeneticLineage {
        let mut seen = HashSet::new();
        let mut ancestors = Vec::new();
        let mut push = |id: &GenotypeId, ancestors: &mut Vec<GenotypeId>| {
            if id != genotype_id && seen.insert(id.clone()) {
                ancestors.push(id.clone());
            }
        };

        for parent in parents {
            push(parent, &mut ancestors);
        }

        let parent_lists: Vec<&[GenotypeId]> = parents
            .iter()
            .map(|p| {
                self.lineages
                    .get(p)
                    .map(|l| l.ancestors.as_slice())
                    .unwrap_or(&[])
            })
            .collect();
        let longest = parent_lists.iter().map(|l| l.len()).max().unwrap_or(0);
        for i in 0..longest {
            for list in &parent_lists {
                if let Some(id) = list.get(i) {
                    push(id, &mut ancestors);
                }
            }
        }

        ancestors.truncate(self.config.max_ancestors);

        let lineage = GeneticLineage {
            genotype_id: genotype_id.to_string(),
            direct_parents: parents.to_vec(),
            ancestors,
            generation,
        };
        self.lineages.insert(genotype_id.to_string(), lineage);
        &self.lineages[genotype_id]
    }

    pub fn get(&self, genotype_id: &str) -> Option<&GeneticLineage> {
        self.lineages.get(genotype_id)
    }

    pub fn len(&self) -> usize {
        self.lineages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lineages.is_empty()
    }

    pub fn root_ids(&self) -> &[GenotypeId] {
        &self.root_ids
    }

    pub fn policy(&self) -> OutcrossPolicy {
        self.config.outcross_policy
    }

    /// Ancestor ids shared by two genotypes' recorded ancestor lists
    pub fn shared_ancestors(&self, a: &str, b: &str) -> HashSet<GenotypeId> {
        let set_a: HashSet<&GenotypeId> = self.ancestors_of(a).iter().collect();
        self.ancestors_of(b)
            .iter()
            .filter(|id| set_a.contains(id))
            .cloned()
            .collect()
    }

    /// Whether crossing `a` with `b` counts as an outcross
    pub fn is_outcross(&self, a: &str, b: &str) -> bool {
        match self.config.outcross_policy {
            OutcrossPolicy::DisjointAncestors => self.shared_ancestors(a, b).is_empty(),
            OutcrossPolicy::GenerationWindow { generations } => {
                let window = generations as usize;
                let near_a = self.ancestors_within(a, window);
                let near_b = self.ancestors_within(b, window);
                near_a.keys().all(|id| !near_b.contains_key(id))
            }
        }
    }

    /// The genotype itself plus every ancestor within `depth` generations,
    /// mapped to its distance. Walks recorded direct parents, so it is not
    /// limited by the ancestor cap.
    pub fn ancestors_within(&self, genotype_id: &str, depth: usize) -> HashMap<GenotypeId, usize> {
        let mut found = HashMap::new();
        let mut queue = VecDeque::new();
        found.insert(genotype_id.to_string(), 0);
        queue.push_back((genotype_id.to_string(), 0usize));

        while let Some((current, distance)) = queue.pop_front() {
            if distance >= depth {
                continue;
            }
            if let Some(lineage) = self.lineages.get(&current) {
                for parent in &lineage.direct_parents {
                    if !found.contains_key(parent) {
                        found.insert(parent.clone(), distance + 1);
                        queue.push_back((parent.clone(), distance + 1));
                    }
                }
            }
        }

        found
    }

    /// Generations from a genotype up to one of its ancestors
    pub fn distance_to_ancestor(&self, genotype_id: &str, ancestor_id: &str) -> Option<usize> {
        self.ancestors_within(genotype_id, usize::MAX)
            .get(ancestor_id)
            .copied()
    }

    /// Generations separating two genotypes through their nearest common ancestor
    pub fn generation_distance(&self, a: &str, b: &str) -> Option<usize> {
        if a == b {
            return Some(0);
        }
        let from_a = self.ancestors_within(a, usize::MAX);
        let from_b = self.ancestors_within(b, usize::MAX);

        from_a
            .iter()
            .filter_map(|(id, da)| from_b.get(id).map(|db| da + db))
            .min()
    }

    /// Genotypes recorded with `genotype_id` as a direct parent
    pub fn get_children(&self, genotype_id: &str) -> Vec<GenotypeId> {
        self.lineages
            .values()
            .filter(|l| l.direct_parents.iter().any(|p| p == genotype_id))
            .map(|l| l.genotype_id.clone())
            .collect()
    }

    /// All genotypes descended from `genotype_id`
    pub fn get_descendants(&self, genotype_id: &str) -> HashSet<GenotypeId> {
        let mut descendants = HashSet::new();
        let mut to_visit = self.get_children(genotype_id);

        while let Some(current) = to_visit.pop() {
            if descendants.insert(current.clone()) {
                to_visit.extend(self.get_children(&current));
            }
        }

        descendants
    }

    fn ancestors_of(&self, genotype_id: &str) -> &[GenotypeId] {
        self.lineages
            .get(genotype_id)
            .map(|l| l.ancestors.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<GenotypeId> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn create_test_tracker(policy: OutcrossPolicy) -> LineageTracker {
        let mut tracker = LineageTracker::new(LineageConfig {
            max_ancestors: 20,
            outcross_policy: policy,
        });

        // a   b   c
        //  \ /    |
        //   ab    |
        //    \   /
        //     abc
        tracker.record_founder("a", 0);
        tracker.record_founder("b", 0);
        tracker.record_founder("c", 0);
        tracker.record_lineage("ab", &ids(&["a", "b"]), 1);
        tracker.record_lineage("abc", &ids(&["ab", "c"]), 2);
        tracker
    }

    #[test]
    fn test_record_lineage() {
        let tracker = create_test_tracker(OutcrossPolicy::DisjointAncestors);

        let lineage = tracker.get("abc").unwrap();
        assert_eq!(lineage.direct_parents, ids(&["ab", "c"]));
        assert_eq!(lineage.ancestors, ids(&["ab", "c", "a", "b"]));
        assert!(tracker.get("a").unwrap().is_founder());
        assert_eq!(tracker.root_ids().len(), 3);
    }

    #[test]
    fn test_ancestor_cap_and_dedup() {
        let mut tracker = LineageTracker::new(LineageConfig::default());
        tracker.record_founder("f0", 0);
        tracker.record_founder("m0", 0);

        let mut prev = ("f0".to_string(), "m0".to_string());
        for generation in 1..40u32 {
            let f = format!("f{}", generation);
            let m = format!("m{}", generation);
            let parents = vec![prev.0.clone(), prev.1.clone()];
            tracker.record_lineage(&f, &parents, generation);
            tracker.record_lineage(&m, &parents, generation);
            prev = (f, m);
        }

        let lineage = tracker.get(&prev.0).unwrap();
        assert_eq!(lineage.ancestors.len(), 20);
        let unique: HashSet<_> = lineage.ancestors.iter().collect();
        assert_eq!(unique.len(), lineage.ancestors.len());
        assert_eq!(&lineage.ancestors[..2], &ids(&["f38", "m38"])[..]);
    }

    #[test]
    fn test_founders_are_outcross() {
        let tracker = create_test_tracker(OutcrossPolicy::DisjointAncestors);
        assert!(tracker.is_outcross("a", "b"));
        assert!(tracker.shared_ancestors("a", "b").is_empty());
    }

    #[test]
    fn test_siblings_are_inbred() {
        let mut tracker = create_test_tracker(OutcrossPolicy::DisjointAncestors);
        tracker.record_lineage("ab2", &ids(&["a", "b"]), 1);
        assert!(!tracker.is_outcross("ab", "ab2"));
    }

    #[test]
    fn test_disjoint_policy_misses_parent_child() {
        let tracker = create_test_tracker(OutcrossPolicy::DisjointAncestors);
        // The child's ancestors contain the parent, but the parent's own
        // ancestor list does not contain itself.
        assert!(tracker.is_outcross("a", "ab"));
    }

    #[test]
    fn test_generation_window_policy() {
        let tracker = create_test_tracker(OutcrossPolicy::GenerationWindow { generations: 3 });
        assert!(tracker.is_outcross("a", "b"));
        assert!(!tracker.is_outcross("a", "ab"));
        assert!(!tracker.is_outcross("abc", "b"));

        let narrow = create_test_tracker(OutcrossPolicy::GenerationWindow { generations: 1 });
        // a is two generations above abc
        assert!(narrow.is_outcross("abc", "a"));
    }

    #[test]
    fn test_generation_distance() {
        let tracker = create_test_tracker(OutcrossPolicy::DisjointAncestors);
        assert_eq!(tracker.generation_distance("a", "a"), Some(0));
        assert_eq!(tracker.generation_distance("ab", "a"), Some(1));
        assert_eq!(tracker.generation_distance("abc", "b"), Some(2));
        assert_eq!(tracker.generation_distance("a", "c"), None);
        assert_eq!(tracker.distance_to_ancestor("abc", "a"), Some(2));
    }

    #[test]
    fn test_descendants() {
        let tracker = create_test_tracker(OutcrossPolicy::DisjointAncestors);
        let descendants = tracker.get_descendants("a");
        assert_eq!(descendants.len(), 2);
        assert!(descendants.contains("ab"));
        assert!(descendants.contains("abc"));
        assert_eq!(tracker.get_children("c"), ids(&["abc"]));
    }
}
