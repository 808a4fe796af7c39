//! Cross-Alternative Aggregator
//!
//! Merges per-alternative entity lists into one scored list. Entities that
//! share `(entity_type, canonical value, body)` are one detection. Scores
//! are computed from the set of alternatives a detection was seen in, not
//! from a running count, so aggregating an aggregated list changes nothing.

use std::collections::{BTreeSet, HashMap};

use entity_types::{Entity, EntityType};

use crate::error::ContextError;

type GroupKey = (EntityType, String, String);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregator {
    threshold: f64,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self { threshold: 0.0 }
    }
}

impl Aggregator {
    pub fn new(threshold: f64) -> Result<Self, ContextError> {
        if threshold.is_nan() || !(0.0..=1.0).contains(&threshold) {
            return Err(ContextError::InvalidThreshold { threshold });
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Stamp each list with its alternative index and aggregate over all of them
    pub fn aggregate_alternatives(&self, alternatives: Vec<Vec<Entity>>) -> Vec<Entity> {
        let total = alternatives.len();
        let entities = alternatives
            .into_iter()
            .enumerate()
            .flat_map(|(index, entities)| {
                entities.into_iter().map(move |entity| entity.with_alternative(index))
            })
            .collect();
        self.aggregate(entities, total)
    }

    /// Merge `entities` drawn from `total` alternatives.
    ///
    /// Entities without provenance count as alternative 0. Output keeps
    /// first-seen order of each key.
    pub fn aggregate(&self, entities: Vec<Entity>, total: usize) -> Vec<Entity> {
        if total == 0 {
            return Vec::new();
        }

        let mut order: Vec<GroupKey> = Vec::new();
        let mut groups: HashMap<GroupKey, Group> = HashMap::new();

        for entity in entities {
            let key = entity.grouping_key();
            match groups.get_mut(&key) {
                Some(group) => group.absorb(entity),
                None => {
                    order.push(key.clone());
                    groups.insert(key, Group::new(entity));
                }
            }
        }

        let merged: Vec<Entity> = order
            .into_iter()
            .filter_map(|key| groups.remove(&key))
            .map(|group| group.finish(total))
            .filter(|entity| entity.score >= self.threshold)
            .collect();

        tracing::debug!(
            alternatives = total,
            kept = merged.len(),
            threshold = self.threshold,
            "Aggregated entities across alternatives"
        );
        merged
    }
}

struct Group {
    first: Entity,
    indices: BTreeSet<usize>,
    parsers: BTreeSet<String>,
    all_latent: bool,
}

impl Group {
    fn new(entity: Entity) -> Self {
        let mut group = Self {
            indices: BTreeSet::new(),
            parsers: BTreeSet::new(),
            all_latent: true,
            first: entity.clone(),
        };
        group.absorb(entity);
        group
    }

    fn absorb(&mut self, entity: Entity) {
        if entity.alternative_indices.is_empty() {
            self.indices.insert(entity.alternative_index.unwrap_or(0));
        } else {
            self.indices.extend(entity.alternative_indices.iter().copied());
        }
        self.parsers.extend(entity.parsers);
        self.all_latent &= entity.latent;
    }

    fn finish(self, total: usize) -> Entity {
        let indices: Vec<usize> = self.indices.into_iter().collect();
        let score = (indices.len() as f64 / total as f64).min(1.0);
        Entity {
            score,
            latent: self.all_latent,
            parsers: self.parsers,
            alternative_index: indices.first().copied(),
            alternative_indices: indices,
            ..self.first
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entity_types::{EntityValue, NumberValue, Span};
    use pretty_assertions::assert_eq;

    fn number(body: &str, value: f64) -> Entity {
        Entity::new(
            body,
            Span::new(0, body.len()),
            "number",
            EntityType::Number,
            EntityValue::Number(NumberValue { value }),
        )
    }

    fn four_alternatives() -> Vec<Vec<Entity>> {
        vec![
            vec![number("five", 5.0)],
            vec![number("five", 5.0), number("two", 2.0)],
            vec![],
            vec![number("five", 5.0)],
        ]
    }

    #[test]
    fn test_score_is_share_of_alternatives() {
        let merged = Aggregator::default().aggregate_alternatives(four_alternatives());
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].body, "five");
        assert_eq!(merged[0].score, 0.75);
        assert_eq!(merged[0].alternative_indices, vec![0, 1, 3]);
        assert_eq!(merged[0].alternative_index, Some(0));
        assert_eq!(merged[1].body, "two");
        assert_eq!(merged[1].score, 0.25);
        assert_eq!(merged[1].alternative_index, Some(1));
    }

    #[test]
    fn test_threshold_drops_and_keeps() {
        let strict = Aggregator::new(1.0).unwrap().aggregate_alternatives(four_alternatives());
        assert!(strict.is_empty());

        let lenient = Aggregator::new(0.5).unwrap().aggregate_alternatives(four_alternatives());
        assert_eq!(lenient.len(), 1);
        assert_eq!(lenient[0].body, "five");
    }

    #[test]
    fn test_duplicates_within_one_alternative_count_once() {
        let merged = Aggregator::default()
            .aggregate_alternatives(vec![vec![number("five", 5.0), number("five", 5.0)], vec![]]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].score, 0.5);
    }

    #[test]
    fn test_idempotent_on_own_output() {
        let aggregator = Aggregator::default();
        let once = aggregator.aggregate_alternatives(four_alternatives());
        let twice = aggregator.aggregate(once.clone(), 4);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_latent_only_when_all_latent() {
        let merged = Aggregator::default().aggregate_alternatives(vec![
            vec![number("five", 5.0).with_latent(true)],
            vec![number("five", 5.0)],
            vec![number("two", 2.0).with_latent(true)],
        ]);
        assert!(!merged[0].latent);
        assert!(merged[1].latent);
    }

    #[test]
    fn test_parsers_are_unioned() {
        let mut a = number("five", 5.0);
        a.add_parser("duckling");
        let mut b = number("five", 5.0);
        b.add_parser("cast");
        let merged = Aggregator::default().aggregate_alternatives(vec![vec![a], vec![b]]);
        assert_eq!(
            merged[0].parsers.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["cast", "duckling"]
        );
    }

    #[test]
    fn test_invalid_threshold() {
        assert!(Aggregator::new(1.5).is_err());
        assert!(Aggregator::new(f64::NAN).is_err());
        assert!(Aggregator::default().aggregate(vec![number("five", 5.0)], 0).is_empty());
    }
}
