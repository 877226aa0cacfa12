//! Outcome labels for paired games

use crate::{GameId, HoopsError, Result};
use std::cmp::Ordering;

/// 1 if side A outscored side B, 0 if side B won.
///
/// Basketball games cannot end level, so a tie means the input is corrupt.
pub fn derive_label(game: GameId, points_a: f64, points_b: f64) -> Result<u8> {
    match points_a.partial_cmp(&points_b) {
        Some(Ordering::Greater) => Ok(1),
        Some(Ordering::Less) => Ok(0),
        _ => Err(HoopsError::TiedOutcome {
            game,
            points: points_a,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_a_win() {
        assert_eq!(derive_label(GameId(1), 100.0, 95.0).unwrap(), 1);
    }

    #[test]
    fn test_side_b_win() {
        assert_eq!(derive_label(GameId(1), 88.0, 112.0).unwrap(), 0);
    }

    #[test]
    fn test_tie_is_an_error() {
        let err = derive_label(GameId(42), 101.0, 101.0).unwrap_err();
        match err {
            HoopsError::TiedOutcome { game, points } => {
                assert_eq!(game, GameId(42));
                assert_eq!(points, 101.0);
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
