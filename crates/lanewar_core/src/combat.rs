//! Target acquisition and attack resolution for units.
//!
//! Each live unit, in roster order, looks at the nearest live opposing unit
//! and the distance to the opposing base's front edge, then either attacks
//! one of them or walks. Damage to units goes through the roster's pending
//! ledger so later units in the same update already see the kill.

use std::sync::Arc;

use crate::components::{Side, UnitId, UnitState};
use crate::math::Fixed;
use crate::movement;
use crate::roster::DamageOutcome;
use crate::session::{GameSession, KillSource, TickEvents};

/// What a unit engages this update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Attack this opposing unit.
    Unit(UnitId),
    /// Attack the opposing base.
    Base,
    /// Nothing in range; keep walking.
    Advance,
}

/// Pick a target from the nearest enemy and the distance to the enemy base.
///
/// The unit is preferred whenever it is in range, unless the base is
/// strictly closer. Equal distances go to the unit.
///
/// ```
/// use lanewar_core::combat::{choose_target, Target};
/// use lanewar_core::components::UnitId;
/// use lanewar_core::math::Fixed;
///
/// let range = Fixed::from_num(30);
/// let enemy = Some((UnitId(7), Fixed::from_num(25)));
/// assert_eq!(choose_target(range, enemy, Fixed::from_num(20)), Target::Base);
/// assert_eq!(choose_target(range, enemy, Fixed::from_num(25)), Target::Unit(UnitId(7)));
/// ```
#[must_use]
pub fn choose_target(range: Fixed, nearest: Option<(UnitId, Fixed)>, base_distance: Fixed) -> Target {
    if let Some((id, distance)) = nearest {
        if distance <= range && base_distance >= distance {
            return Target::Unit(id);
        }
    }

    if base_distance <= range {
        Target::Base
    } else {
        Target::Advance
    }
}

/// Resolve combat and movement for every live unit.
pub(crate) fn resolve_units(session: &mut GameSession, now: Fixed, events: &mut TickEvents) {
    let catalog = Arc::clone(&session.catalog);
    let arena = &catalog.arena;

    for id in session.roster.ids() {
        if !session.roster.is_alive(id) {
            continue;
        }
        let Some(unit) = session.roster.get(id) else {
            continue;
        };

        let side = unit.side;
        let position = unit.position;
        let damage = unit.damage;
        let ready = unit.can_attack(now);
        let enemy_side = side.opposing();

        let nearest = session.roster.nearest_live(enemy_side, position);
        let front = arena.base_front_x(enemy_side);
        let target = choose_target(unit.range, nearest, (front - position).abs());

        match target {
            Target::Unit(victim) => {
                set_state(session, id, UnitState::Attacking, ready.then_some(now));
                if ready {
                    strike_unit(session, side, victim, damage, events);
                }
            }
            Target::Base => {
                set_state(session, id, UnitState::Attacking, ready.then_some(now));
                if ready {
                    session.damage_base(enemy_side, id, damage, events);
                }
            }
            Target::Advance => {
                if let Some(unit) = session.roster.get_mut(id) {
                    unit.state = UnitState::Walking;
                    unit.position = movement::advance(unit.position, unit.speed, side, front);
                }
            }
        }
    }
}

fn set_state(session: &mut GameSession, id: UnitId, state: UnitState, attacked_at: Option<Fixed>) {
    if let Some(unit) = session.roster.get_mut(id) {
        unit.state = state;
        if attacked_at.is_some() {
            unit.last_attack_ms = attacked_at;
        }
    }
}

fn strike_unit(
    session: &mut GameSession,
    attacker_side: Side,
    victim: UnitId,
    damage: Fixed,
    events: &mut TickEvents,
) {
    if session.roster.queue_damage(victim, damage) == DamageOutcome::Killed {
        session.record_kill(attacker_side, victim, KillSource::Unit, events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(v: i32) -> Fixed {
        Fixed::from_num(v)
    }

    #[test]
    fn test_base_strictly_closer_wins() {
        let target = choose_target(f(30), Some((UnitId(1), f(25))), f(20));
        assert_eq!(target, Target::Base);
    }

    #[test]
    fn test_tie_goes_to_unit() {
        let target = choose_target(f(30), Some((UnitId(1), f(25))), f(25));
        assert_eq!(target, Target::Unit(UnitId(1)));
    }

    #[test]
    fn test_unit_out_of_range_falls_back_to_base() {
        let target = choose_target(f(30), Some((UnitId(1), f(40))), f(30));
        assert_eq!(target, Target::Base);
    }

    #[test]
    fn test_nothing_in_range_advances() {
        assert_eq!(choose_target(f(30), None, f(500)), Target::Advance);
        assert_eq!(choose_target(f(30), Some((UnitId(2), f(31))), f(500)), Target::Advance);
    }

    #[test]
    fn test_range_is_inclusive() {
        assert_eq!(
            choose_target(f(150), Some((UnitId(3), f(150))), f(900)),
            Target::Unit(UnitId(3))
        );
    }
}
