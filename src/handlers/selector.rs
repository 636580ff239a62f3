//! Random draws that pick between demo code paths.

use parking_lot::Mutex;
use rand::Rng;
use std::collections::VecDeque;

/// Source of uniform draws in `[0, 1)`.
pub trait Dice: Send + Sync {
    fn roll(&self) -> f64;
}

/// Thread-local RNG.
pub struct ThreadDice;

impl Dice for ThreadDice {
    fn roll(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Always returns the same draw.
pub struct FixedDice(pub f64);

impl Dice for FixedDice {
    fn roll(&self) -> f64 {
        self.0
    }
}

/// Replays a script of draws, then repeats the last one.
pub struct SequenceDice {
    rolls: Mutex<VecDeque<f64>>,
    last: Mutex<f64>,
}

impl SequenceDice {
    pub fn new(rolls: impl IntoIterator<Item = f64>) -> Self {
        Self {
            rolls: Mutex::new(rolls.into_iter().collect()),
            last: Mutex::new(0.0),
        }
    }
}

impl Dice for SequenceDice {
    fn roll(&self) -> f64 {
        let mut last = self.last.lock();
        if let Some(next) = self.rolls.lock().pop_front() {
            *last = next;
        }
        *last
    }
}

/// `true` when the draw falls strictly below the threshold. A draw equal to
/// the threshold is on the upper side.
pub fn below_threshold(draw: f64, threshold: f64) -> bool {
    draw < threshold
}

/// Round to two significant digits, like `Number.prototype.toPrecision(2)`.
pub fn two_significant(x: f64) -> f64 {
    if x == 0.0 || !x.is_finite() {
        return x;
    }
    let magnitude = x.abs().log10().floor();
    let factor = 10f64.powf(1.0 - magnitude);
    (x * factor).round() / factor
}

/// Whole milliseconds uniformly spread over `min..=max` for a draw in
/// `[0, 1)`.
pub fn uniform_millis(draw: f64, min: u64, max: u64) -> u64 {
    let span = (max - min + 1) as f64;
    let value = (draw.clamp(0.0, 1.0) * span + min as f64).floor();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let millis = value as u64;
    millis.min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_exclusive() {
        assert!(below_threshold(0.499_999, 0.5));
        assert!(!below_threshold(0.5, 0.5));
        assert!(!below_threshold(0.9, 0.5));
    }

    #[test]
    fn two_significant_matches_to_precision() {
        assert_eq!(two_significant(50.4), 50.0);
        assert_eq!(two_significant(50.5), 51.0);
        assert_eq!(two_significant(5.234), 5.2);
        assert_eq!(two_significant(99.7), 100.0);
        assert_eq!(two_significant(0.0), 0.0);
        assert!((two_significant(0.004_37) - 0.0044).abs() < 1e-12);
    }

    #[test]
    fn uniform_millis_covers_inclusive_range() {
        assert_eq!(uniform_millis(0.0, 900, 2001), 900);
        assert_eq!(uniform_millis(0.999_999_9, 900, 2001), 2001);
        assert_eq!(uniform_millis(0.5, 900, 2001), 1451);
        assert_eq!(uniform_millis(1.0, 900, 2001), 2001);
    }

    #[test]
    fn sequence_dice_replays_then_repeats_last() {
        let dice = SequenceDice::new([0.1, 0.9]);
        assert_eq!(dice.roll(), 0.1);
        assert_eq!(dice.roll(), 0.9);
        assert_eq!(dice.roll(), 0.9);
    }

    #[test]
    fn thread_dice_stays_in_unit_interval() {
        let dice = ThreadDice;
        for _ in 0..1_000 {
            let draw = dice.roll();
            assert!((0.0..1.0).contains(&draw));
        }
    }
}
