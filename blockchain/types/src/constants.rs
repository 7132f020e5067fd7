// Copyright (c) 2025 The Sia Foundation

//! Chain constants.

use crate::{block::BlockHeight, currency::Currency};

/// Number of blocks between a delayed output's creation and the height at
/// which it becomes spendable.
pub const MATURITY_DELAY: BlockHeight = 144;

/// Total number of siafunds in existence. The siafund pool is divided by
/// this count when a siafund output harvests its claim.
pub const SIAFUND_COUNT: u64 = 10_000;

/// Height of the hardfork that changed the tax computation from binary
/// floating point to exact integer arithmetic.
pub const TAX_HARDFORK_HEIGHT: BlockHeight = 21_000;

/// Desired wall-clock seconds between blocks; the retarget algorithm
/// steers toward this rate.
pub const TARGET_SECONDS_PER_BLOCK: u64 = 600;

/// Block subsidy paid to the miner of the first block.
pub const INITIAL_COINBASE: u64 = 300_000;

/// Floor on the block subsidy; the subsidy decays by one per block until
/// it reaches this value and then stays there forever.
pub const MINIMUM_COINBASE: u64 = 30_000;

/// The block subsidy at a given height, before transaction fees.
pub fn calculate_coinbase(height: BlockHeight) -> Currency {
    let subsidy = INITIAL_COINBASE
        .saturating_sub(height)
        .max(MINIMUM_COINBASE);
    Currency::from(subsidy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coinbase_decays_to_floor() {
        assert_eq!(calculate_coinbase(0), Currency::from(INITIAL_COINBASE));
        assert_eq!(calculate_coinbase(1), Currency::from(INITIAL_COINBASE - 1));
        let floor_height = INITIAL_COINBASE - MINIMUM_COINBASE;
        assert_eq!(calculate_coinbase(floor_height), Currency::from(MINIMUM_COINBASE));
        assert_eq!(
            calculate_coinbase(floor_height + 100_000),
            Currency::from(MINIMUM_COINBASE)
        );
    }
}
