//! Cannon fire and projectile flight.
//!
//! Cannons fire from their base's emplacement at the nearest opposing live
//! unit within range. A projectile keeps the target it locked at launch and
//! re-aims at that unit's current position every update.

use std::sync::Arc;

use crate::components::{Projectile, Side};
use crate::math::Fixed;
use crate::roster::DamageOutcome;
use crate::session::{GameSession, KillSource, TickEvents};

/// Fire every ready cannon of both sides that has a target in range.
pub(crate) fn fire_cannons(session: &mut GameSession, now: Fixed, events: &mut TickEvents) {
    let catalog = Arc::clone(&session.catalog);

    for side in [Side::Player, Side::Opponent] {
        let origin = catalog.arena.cannon_position(side);

        for index in 0..session.base(side).cannons.len() {
            let cannon = &session.base(side).cannons[index];
            if !cannon.is_ready(now) {
                continue;
            }
            let (range, speed, damage) = (cannon.range, cannon.projectile_speed, cannon.damage);

            let Some((target, distance)) = session.roster.nearest_live(side.opposing(), origin.x)
            else {
                break;
            };
            if distance > range {
                continue;
            }
            let Some(aim_point) = session
                .roster
                .get(target)
                .map(|unit| catalog.arena.ground_point(unit.position))
            else {
                continue;
            };

            let projectile = Projectile {
                id: session.next_projectile_id(),
                side,
                position: origin,
                target,
                aim_point,
                speed,
                damage,
            };

            session.base_mut(side).cannons[index].last_fired_ms = Some(now);
            tracing::trace!(%side, projectile = projectile.id.0, %target, "Cannon fired");
            events.projectiles_fired.push(projectile.id);
            session.projectiles.push(projectile);
        }
    }
}

/// Move every projectile toward its target and resolve impacts.
///
/// Projectiles whose target is gone or already dead are dropped without
/// dealing damage.
pub(crate) fn advance_projectiles(session: &mut GameSession, events: &mut TickEvents) {
    let catalog = Arc::clone(&session.catalog);
    let hit_radius = catalog.arena.projectile_hit_radius;
    let in_flight = std::mem::take(&mut session.projectiles);
    let mut remaining = Vec::with_capacity(in_flight.len());

    for mut projectile in in_flight {
        let target = session
            .roster
            .get(projectile.target)
            .filter(|unit| session.roster.is_alive(unit.id));
        let Some(target) = target else {
            events.projectiles_expired.push(projectile.id);
            continue;
        };

        projectile.aim_point = catalog.arena.ground_point(target.position);
        projectile.position = projectile
            .position
            .move_toward(projectile.aim_point, projectile.speed);

        if projectile.position.distance(projectile.aim_point) > hit_radius {
            remaining.push(projectile);
            continue;
        }

        if session.roster.queue_damage(projectile.target, projectile.damage) == DamageOutcome::Killed {
            session.record_kill(projectile.side, projectile.target, KillSource::Cannon, events);
        }
        events.projectile_hits.push(projectile.id);
    }

    session.projectiles = remaining;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Catalog, DifficultyId};

    fn session() -> GameSession {
        let mut catalog = Catalog::builtin();
        for row in &mut catalog.difficulties {
            row.ai_buy_chance = 0.0;
        }
        GameSession::new(Arc::new(catalog), DifficultyId::Normal, 7).unwrap()
    }

    #[test]
    fn test_cannon_fires_only_within_range() {
        let mut s = session();
        s.base_mut(Side::Player).gold = Fixed::from_num(500);
        s.try_buy_upgrade(Side::Player, "cannon").unwrap();

        // Emplacement sits at x = 90 with range 250.
        let far = s.place_unit("warrior", Side::Opponent, Fixed::from_num(400)).unwrap();
        let mut events = TickEvents::default();
        fire_cannons(&mut s, Fixed::from_num(16), &mut events);
        assert!(events.projectiles_fired.is_empty());

        s.roster.get_mut(far).unwrap().position = Fixed::from_num(300);
        fire_cannons(&mut s, Fixed::from_num(32), &mut events);
        assert_eq!(events.projectiles_fired.len(), 1);
        assert_eq!(s.projectiles()[0].target, far);

        // Cooldown blocks a second shot.
        fire_cannons(&mut s, Fixed::from_num(48), &mut events);
        assert_eq!(events.projectiles_fired.len(), 1);
    }

    #[test]
    fn test_orphaned_projectile_removed_without_damage() {
        let mut s = session();
        let target = s.place_unit("warrior", Side::Opponent, Fixed::from_num(300)).unwrap();
        let bystander = s.place_unit("warrior", Side::Opponent, Fixed::from_num(300)).unwrap();
        let id = s.next_projectile_id();
        let spot = s.catalog().arena.ground_point(Fixed::from_num(300));
        s.projectiles.push(Projectile {
            id,
            side: Side::Player,
            position: spot,
            target,
            aim_point: spot,
            speed: Fixed::from_num(8),
            damage: Fixed::from_num(15),
        });

        // Kill the target through the ledger and commit before the projectile lands.
        s.roster.queue_damage(target, Fixed::from_num(1000));
        s.roster.commit();

        let mut events = TickEvents::default();
        advance_projectiles(&mut s, &mut events);
        assert!(s.projectiles().is_empty());
        assert_eq!(events.projectiles_expired, vec![id]);
        assert!(events.projectile_hits.is_empty());
        let hp = s.roster.get(bystander).unwrap().health;
        assert_eq!(hp, Fixed::from_num(30));
    }

    #[test]
    fn test_projectile_hit_credits_cannon_owner() {
        let mut s = session();
        let target = s.place_unit("warrior", Side::Opponent, Fixed::from_num(200)).unwrap();
        s.roster.get_mut(target).unwrap().health = Fixed::from_num(10);
        let gold_before = s.base(Side::Player).gold;

        let id = s.next_projectile_id();
        let start = s.catalog().arena.ground_point(Fixed::from_num(195));
        s.projectiles.push(Projectile {
            id,
            side: Side::Player,
            position: start,
            target,
            aim_point: start,
            speed: Fixed::from_num(8),
            damage: Fixed::from_num(15),
        });

        let mut events = TickEvents::default();
        advance_projectiles(&mut s, &mut events);
        assert_eq!(events.projectile_hits, vec![id]);
        assert_eq!(events.kills.len(), 1);
        assert_eq!(events.kills[0].source, KillSource::Cannon);
        assert_eq!(s.base(Side::Player).gold, gold_before + Fixed::from_num(10));
        assert_eq!(s.stats().enemies_killed_by_player, 1);
    }
}
