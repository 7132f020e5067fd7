// Copyright (c) 2025 The Sia Foundation

//! Targets and retargeting.
//!
//! A target is the threshold a block ID must not exceed to count as valid
//! work; a lower target means more work per block. Targets are compared
//! against the leading 16 bytes of the ID, which keeps all of the
//! arithmetic in u128 without losing meaningful precision.
//!
//! Retargeting compares the observed time span of a window of recent
//! blocks against the span the chain frequency calls for, and scales the
//! target proportionally. The per-block adjustment is clamped to a narrow
//! band so that neither a timestamp attack nor a hashrate cliff can swing
//! the target violently.

use serde::{Deserialize, Serialize};
use sia_blockchain_types::{BlockHeight, BlockId, TARGET_SECONDS_PER_BLOCK};
use sia_util_serial::{Reader, Result as SerialResult, SiaDecodable, SiaEncodable};

/// Number of blocks the retarget window looks back over, once the chain
/// is tall enough. Shorter chains use every block since genesis.
pub const DIFFICULTY_WINDOW: BlockHeight = 5_000;

/// Numerator of the largest single-step upward target adjustment.
pub const MAX_ADJUSTMENT_UP_NUM: u128 = 1_001;

/// Numerator of the largest single-step downward target adjustment.
pub const MAX_ADJUSTMENT_DOWN_NUM: u128 = 999;

/// Shared denominator of the adjustment clamps.
pub const MAX_ADJUSTMENT_DENOM: u128 = 1_000;

/// Denominator of the surpass threshold: a competing chain must lead the
/// current chain by more than 1/200th (0.5%) of the tip's block work
/// before a reorganization is triggered.
pub const SURPASS_THRESHOLD_DENOM: u128 = 200;

/// The proof-of-work threshold for one block.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct Target(u128);

impl Target {
    /// The easiest possible target; every block ID satisfies it.
    pub const MAX: Self = Self(u128::MAX);

    /// Construct from a raw threshold value.
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    /// The raw threshold value.
    pub const fn value(&self) -> u128 {
        self.0
    }

    /// The expected number of hash attempts needed to find a block at
    /// this target. This is the unit in which chain depth is accumulated.
    pub fn work(&self) -> u128 {
        u128::MAX / self.0.max(1)
    }
}

impl SiaEncodable for Target {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.0.to_le_bytes());
    }
}

impl SiaDecodable for Target {
    fn decode_from(r: &mut Reader<'_>) -> SerialResult<Self> {
        Ok(Self(u128::from_le_bytes(r.read_array()?)))
    }
}

/// Whether a block ID satisfies a target.
pub fn meets_target(id: &BlockId, target: Target) -> bool {
    let prefix = u128::from_be_bytes(id.0[..16].try_into().expect("16 bytes"));
    prefix <= target.value()
}

/// Compute the target for the child of a block.
///
/// `window_blocks` is the number of blocks spanned by the window,
/// `oldest_timestamp` the timestamp of the block at the far edge, and
/// `newest_timestamp` the timestamp of the block being extended from. The
/// adjustment ratio is observed seconds over expected seconds, clamped to
/// the per-step band.
///
/// The window values must come from one coherent scope: an earlier
/// revision computed the tall-chain window into shadowed locals, so the
/// adjustment silently read zeroed values and the target never moved once
/// the chain passed the window height. `window_regression` below pins the
/// fix.
pub fn next_target(
    current: Target,
    oldest_timestamp: u64,
    newest_timestamp: u64,
    window_blocks: u64,
) -> Target {
    if window_blocks == 0 {
        return current;
    }
    let time_passed = newest_timestamp.saturating_sub(oldest_timestamp) as u128;
    let expected = (TARGET_SECONDS_PER_BLOCK as u128) * window_blocks as u128;

    // adjustment = time_passed / expected, clamped. A larger-than-expected
    // span means blocks are too slow, so the target rises (easier).
    let (num, denom) = clamp_ratio(time_passed, expected);

    // current * num / denom without overflowing u128.
    let value = current.value();
    let adjusted = (value / denom)
        .saturating_mul(num)
        .saturating_add(value % denom * num / denom);
    Target::new(adjusted.max(1))
}

/// Clamp `num/denom` into the per-step adjustment band.
fn clamp_ratio(num: u128, denom: u128) -> (u128, u128) {
    // num/denom > up-clamp  <=>  num * clamp-denom > up-num * denom
    if num.saturating_mul(MAX_ADJUSTMENT_DENOM) > MAX_ADJUSTMENT_UP_NUM.saturating_mul(denom) {
        (MAX_ADJUSTMENT_UP_NUM, MAX_ADJUSTMENT_DENOM)
    } else if num.saturating_mul(MAX_ADJUSTMENT_DENOM) < MAX_ADJUSTMENT_DOWN_NUM.saturating_mul(denom)
    {
        (MAX_ADJUSTMENT_DOWN_NUM, MAX_ADJUSTMENT_DENOM)
    } else {
        (num, denom)
    }
}

/// Whether a competing chain's cumulative work surpasses the current
/// chain's by more than the surpass threshold.
///
/// The threshold is a fraction of the work of one block at the current
/// tip's child target, so extending the tip always surpasses, while an
/// equal-length fork never does.
pub fn surpasses(candidate_depth: u128, current_depth: u128, current_child_target: Target) -> bool {
    let threshold = current_child_target.work() / SURPASS_THRESHOLD_DENOM;
    candidate_depth > current_depth.saturating_add(threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_target_accepts_everything() {
        assert!(meets_target(&BlockId([0xff; 32]), Target::MAX));
        assert!(meets_target(&BlockId([0x00; 32]), Target::MAX));
    }

    #[test]
    fn low_target_rejects_high_ids() {
        let target = Target::new(1u128 << 100);
        assert!(!meets_target(&BlockId([0xff; 32]), target));
        assert!(meets_target(&BlockId([0x00; 32]), target));
    }

    #[test]
    fn work_is_inverse_of_target() {
        assert!(Target::new(1).work() > Target::new(1000).work());
        assert_eq!(Target::MAX.work(), 1);
    }

    #[test]
    fn slow_blocks_raise_target() {
        let current = Target::new(1u128 << 64);
        // Twice the expected span, clamped to the 1001/1000 band.
        let next = next_target(current, 0, 2 * TARGET_SECONDS_PER_BLOCK * 100, 100);
        assert!(next.value() > current.value());
        assert_eq!(next.value(), current.value() / 1000 * 1001 + current.value() % 1000 * 1001 / 1000);
    }

    #[test]
    fn fast_blocks_lower_target() {
        let current = Target::new(1u128 << 64);
        let next = next_target(current, 0, TARGET_SECONDS_PER_BLOCK * 100 / 2, 100);
        assert!(next.value() < current.value());
    }

    #[test]
    fn on_schedule_is_a_fixed_point() {
        let current = Target::new(1u128 << 64);
        let next = next_target(current, 1_000, 1_000 + TARGET_SECONDS_PER_BLOCK * 50, 50);
        assert_eq!(next, current);
    }

    /// The tall-chain window must actually feed the adjustment. An
    /// earlier revision shadowed the windowed values, so chains taller
    /// than the window stopped adjusting entirely.
    #[test]
    fn window_regression() {
        let current = Target::new(1u128 << 64);
        let window = DIFFICULTY_WINDOW;
        // A full window observed at twice the expected pace.
        let next = next_target(current, 0, 2 * TARGET_SECONDS_PER_BLOCK * window, window);
        assert_ne!(
            next, current,
            "windowed retarget must move the target when the chain is off schedule"
        );
        assert!(next.value() > current.value());
    }

    #[test]
    fn zero_window_is_identity() {
        let current = Target::new(12345);
        assert_eq!(next_target(current, 0, 0, 0), current);
    }

    #[test]
    fn backwards_timestamps_clamp_down() {
        let current = Target::new(1u128 << 64);
        let next = next_target(current, 5_000, 1_000, 10);
        assert_eq!(
            next.value(),
            current.value() / 1000 * 999 + current.value() % 1000 * 999 / 1000
        );
    }

    #[test]
    fn surpass_requires_strict_excess() {
        let tip_target = Target::MAX; // work = 1, threshold = 0
        assert!(!surpasses(5, 5, tip_target));
        assert!(surpasses(6, 5, tip_target));
    }

    #[test]
    fn surpass_threshold_scales_with_block_work() {
        let tip_target = Target::new(u128::MAX / 1000); // work ~= 1000
        let threshold = tip_target.work() / SURPASS_THRESHOLD_DENOM;
        assert!(threshold > 0);
        assert!(!surpasses(1_000_000 + threshold, 1_000_000, tip_target));
        assert!(surpasses(1_000_000 + threshold + 1, 1_000_000, tip_target));
    }
}
