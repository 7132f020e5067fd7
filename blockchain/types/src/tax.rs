// Copyright (c) 2025 The Sia Foundation

//! The siafund tax.
//!
//! Every file contract contributes 3.9% of its payout to the siafund
//! pool. The computation changed representation at
//! [`TAX_HARDFORK_HEIGHT`](crate::TAX_HARDFORK_HEIGHT): before the fork
//! the tax was computed in binary floating point (and the historical
//! chain can only be replayed by reproducing that rounding); from the
//! fork onward it is exact integer arithmetic rounded down to a multiple
//! of [`SIAFUND_COUNT`](crate::SIAFUND_COUNT) so the pool always divides
//! evenly among the siafunds.

use crate::{
    block::BlockHeight,
    constants::{SIAFUND_COUNT, TAX_HARDFORK_HEIGHT},
    currency::Currency,
};

/// The portion of a file contract payout owed to the siafund pool, for a
/// contract confirmed at `height`.
pub fn tax(height: BlockHeight, payout: Currency) -> Currency {
    if height < TAX_HARDFORK_HEIGHT {
        // Legacy floating-point computation, truncated toward zero.
        // Deviating from this rounding would fork the historical chain.
        Currency::new((payout.value() as f64 * 0.039) as u128)
    } else {
        let tax = payout.value() * 39 / 1000;
        Currency::new(tax - tax % SIAFUND_COUNT as u128)
    }
}
