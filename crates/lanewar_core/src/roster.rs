//! Unit arena with a per-update pending-damage ledger.
//!
//! Damage dealt during an update is queued against the victim instead of
//! written straight into `health`. A unit counts as alive while
//! `health - pending > 0`, so every attacker later in the same update sees
//! the same outcome regardless of the order kills happen in. The ledger is
//! committed once at the end of the update, which is also when the dead are
//! removed.

use std::collections::BTreeMap;

use crate::components::{Side, Unit, UnitId};
use crate::math::Fixed;

/// Result of queueing damage against a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// The unit survives the damage queued so far.
    Wounded,
    /// This damage took the unit from alive to dead.
    Killed,
    /// The unit is missing or was already dead; nothing was queued.
    Ignored,
}

/// Id-keyed unit storage.
///
/// Iteration is always in ascending id order, which is also spawn order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitRoster {
    units: BTreeMap<UnitId, Unit>,
    pending: BTreeMap<UnitId, Fixed>,
    next_id: u32,
}

impl Default for UnitRoster {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitRoster {
    /// Create an empty roster. Ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            units: BTreeMap::new(),
            pending: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Insert a unit, assigning it the next id.
    pub fn insert(&mut self, mut unit: Unit) -> UnitId {
        let id = UnitId(self.next_id);
        self.next_id += 1;
        unit.id = id;
        self.units.insert(id, unit);
        id
    }

    /// Get a unit by id, dead or alive.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Get a mutable reference to a unit by id.
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Number of units stored, including ones killed this update.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Snapshot of the current ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<UnitId> {
        self.units.keys().copied().collect()
    }

    /// Iterate over all stored units in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Health after pending damage.
    #[must_use]
    pub fn effective_health(&self, id: UnitId) -> Option<Fixed> {
        let unit = self.units.get(&id)?;
        let pending = self.pending.get(&id).copied().unwrap_or(Fixed::ZERO);
        Some(unit.health - pending)
    }

    /// Check whether a unit exists and survives its pending damage.
    #[must_use]
    pub fn is_alive(&self, id: UnitId) -> bool {
        self.effective_health(id).is_some_and(|hp| hp > Fixed::ZERO)
    }

    /// Live units of `side` in id order.
    pub fn live_units(&self, side: Side) -> impl Iterator<Item = &Unit> + '_ {
        self.units
            .values()
            .filter(move |u| u.side == side && self.is_alive(u.id))
    }

    /// Nearest live unit of `side` to lane position `x`.
    ///
    /// Ties go to the lowest id.
    #[must_use]
    pub fn nearest_live(&self, side: Side, x: Fixed) -> Option<(UnitId, Fixed)> {
        let mut best: Option<(UnitId, Fixed)> = None;
        for unit in self.live_units(side) {
            let distance = (unit.position - x).abs();
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((unit.id, distance));
            }
        }
        best
    }

    /// Queue damage against a live unit.
    pub fn queue_damage(&mut self, id: UnitId, amount: Fixed) -> DamageOutcome {
        if !self.is_alive(id) {
            return DamageOutcome::Ignored;
        }

        let pending = self.pending.entry(id).or_insert(Fixed::ZERO);
        *pending = pending.saturating_add(amount);

        if self.is_alive(id) {
            DamageOutcome::Wounded
        } else {
            DamageOutcome::Killed
        }
    }

    /// Apply pending damage and remove the dead.
    ///
    /// Returns the removed units in id order.
    pub fn commit(&mut self) -> Vec<Unit> {
        for (id, damage) in std::mem::take(&mut self.pending) {
            if let Some(unit) = self.units.get_mut(&id) {
                unit.health -= damage;
            }
        }

        let dead: Vec<UnitId> = self
            .units
            .values()
            .filter(|u| u.health <= Fixed::ZERO)
            .map(|u| u.id)
            .collect();

        dead.into_iter()
            .filter_map(|id| self.units.remove(&id))
            .collect()
    }

    /// Drop every unit and reset id assignment.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}
