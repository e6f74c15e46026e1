//! Lane movement.

use crate::components::Side;
use crate::math::Fixed;

/// Position after one step of a `side` unit toward the enemy base.
///
/// `limit` is the opposing base's front edge; units never step past it. A
/// unit already at or beyond the limit stays where it is.
#[must_use]
pub fn advance(position: Fixed, speed: Fixed, side: Side, limit: Fixed) -> Fixed {
    match side {
        Side::Player if position >= limit => position,
        Side::Player => (position + speed).min(limit),
        Side::Opponent if position <= limit => position,
        Side::Opponent => (position - speed).max(limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(v: f64) -> Fixed {
        Fixed::from_num(v)
    }

    #[test]
    fn test_player_moves_right() {
        assert_eq!(advance(f(100.0), f(1.5), Side::Player, f(1070.0)), f(101.5));
    }

    #[test]
    fn test_opponent_moves_left() {
        assert_eq!(advance(f(1100.0), f(2.0), Side::Opponent, f(130.0)), f(1098.0));
    }

    #[test]
    fn test_clamped_at_front_edge() {
        assert_eq!(advance(f(1069.0), f(2.0), Side::Player, f(1070.0)), f(1070.0));
        assert_eq!(advance(f(131.0), f(2.0), Side::Opponent, f(130.0)), f(130.0));
        assert_eq!(advance(f(1070.0), f(2.0), Side::Player, f(1070.0)), f(1070.0));
    }
}
