// Copyright (c) 2025 The Sia Foundation

//! Proof-of-work arithmetic.
//!
//! This crate owns the target type, the header work check, difficulty
//! retargeting, and the cumulative-work comparisons used to choose
//! between competing chains.

#![deny(missing_docs)]

mod target;

pub use target::{
    meets_target, next_target, surpasses, Target, DIFFICULTY_WINDOW, MAX_ADJUSTMENT_DENOM,
    MAX_ADJUSTMENT_DOWN_NUM, MAX_ADJUSTMENT_UP_NUM, SURPASS_THRESHOLD_DENOM,
};
