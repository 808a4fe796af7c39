//! Ambiguity Resolver
//!
//! Picks the canonical value of a temporal entity among its candidates.
//! Every candidate stays in `values`; only `value` is chosen here. Open
//! intervals are left open.
//!
//! An optional [`TimeWindow`] narrows the choice to candidates whose local
//! time of day lies inside it ("12:00" read as noon rather than midnight).
//! When no candidate falls inside, the policy picks among all of them.

use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use entity_types::{Entity, EntityValue};

use crate::error::ContextError;

/// How the canonical candidate is chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalPolicy {
    /// First candidate in service-reported order
    #[default]
    FirstReported,
    /// Chronologically earliest anchor instant
    Earliest,
    /// Chronologically latest anchor instant
    Latest,
}

// ============================================================================
// TIME WINDOW
// ============================================================================

/// Wall-clock time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClockTime {
    pub hour: u32,
    #[serde(default)]
    pub minute: u32,
}

impl ClockTime {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    fn of(instant: &DateTime<FixedOffset>) -> Self {
        Self::new(instant.hour(), instant.minute())
    }
}

/// Inclusive time-of-day range, read in each candidate's own offset.
///
/// A window whose `gte` lies after its `lte` wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeWindow {
    pub gte: ClockTime,
    pub lte: ClockTime,
}

impl TimeWindow {
    pub fn new(gte: ClockTime, lte: ClockTime) -> Result<Self, ContextError> {
        let window = Self { gte, lte };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<(), ContextError> {
        for bound in [self.gte, self.lte] {
            if bound.hour > 23 || bound.minute > 59 {
                return Err(ContextError::InvalidTimeWindow {
                    reason: format!("{:02}:{:02} is not a time of day", bound.hour, bound.minute),
                });
            }
        }
        Ok(())
    }

    pub fn contains(&self, instant: &DateTime<FixedOffset>) -> bool {
        let clock = ClockTime::of(instant);
        if self.gte <= self.lte {
            self.gte <= clock && clock <= self.lte
        } else {
            clock >= self.gte || clock <= self.lte
        }
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct AmbiguityResolver {
    policy: CanonicalPolicy,
    window: Option<TimeWindow>,
}

impl AmbiguityResolver {
    pub fn new(policy: CanonicalPolicy) -> Self {
        Self { policy, window: None }
    }

    /// Prefer candidates inside `window`
    pub fn with_window(mut self, window: Option<TimeWindow>) -> Self {
        self.window = window;
        self
    }

    pub fn policy(&self) -> CanonicalPolicy {
        self.policy
    }

    /// Set `value` from `values` according to the window and policy.
    /// Non-temporal entities and single-candidate entities are returned
    /// unchanged.
    pub fn resolve(&self, mut entity: Entity) -> Entity {
        if entity.values.len() < 2 || !entity.entity_type.is_temporal() {
            return entity;
        }

        let in_window: Vec<EntityValue> = match &self.window {
            Some(window) => entity
                .values
                .iter()
                .filter(|candidate| {
                    candidate
                        .anchor_instant()
                        .is_some_and(|instant| window.contains(&instant))
                })
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        let candidates = if in_window.is_empty() {
            &entity.values
        } else {
            &in_window
        };

        let chosen = match self.policy {
            CanonicalPolicy::FirstReported => candidates.first(),
            CanonicalPolicy::Earliest => extreme_by(candidates, |candidate, best| candidate < best),
            CanonicalPolicy::Latest => extreme_by(candidates, |candidate, best| candidate > best),
        }
        .cloned();

        if let Some(chosen) = chosen {
            entity.value = chosen;
        }
        entity
    }
}

/// First candidate whose anchor beats every earlier one; ties keep the first
fn extreme_by<F>(values: &[EntityValue], beats: F) -> Option<&EntityValue>
where
    F: Fn(DateTime<FixedOffset>, DateTime<FixedOffset>) -> bool,
{
    let mut best: Option<(&EntityValue, DateTime<FixedOffset>)> = None;
    for candidate in values {
        let Some(instant) = candidate.anchor_instant() else {
            continue;
        };
        match best {
            Some((_, best_instant)) if !beats(instant, best_instant) => {}
            _ => best = Some((candidate, instant)),
        }
    }
    best.map(|(candidate, _)| candidate).or_else(|| values.first())
}

/// The candidate whose anchor lies closest to `reference_ms`.
///
/// Used when a caller already tracks a slot value and must pick the
/// candidate nearest to it rather than the canonical one.
pub fn nearest_candidate(entity: &Entity, reference_ms: i64) -> Option<&EntityValue> {
    entity
        .values
        .iter()
        .filter_map(|candidate| {
            candidate
                .anchor_instant()
                .map(|instant| ((instant.timestamp_millis() - reference_ms).unsigned_abs(), candidate))
        })
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate)
}

/// True when every time-shaped candidate falls on one calendar date
pub fn shares_calendar_date(entity: &Entity) -> bool {
    let mut dates = anchors(entity).map(|instant| instant.date_naive());
    match dates.next() {
        Some(first) => dates.all(|date| date == first),
        None => false,
    }
}

/// True when there are several candidates on distinct dates that all fall
/// on one weekday ("Monday" resolved to successive Mondays)
pub fn repeats_weekly(entity: &Entity) -> bool {
    let dates: Vec<_> = anchors(entity).map(|instant| instant.date_naive()).collect();
    let Some(first) = dates.first() else {
        return false;
    };
    let distinct: BTreeSet<_> = dates.iter().collect();
    dates.len() > 1
        && distinct.len() == dates.len()
        && dates.iter().all(|date| date.weekday() == first.weekday())
}

fn anchors(entity: &Entity) -> impl Iterator<Item = DateTime<FixedOffset>> + '_ {
    entity.values.iter().filter_map(EntityValue::anchor_instant)
}
