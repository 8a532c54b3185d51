//! Farm Constants

/// Fixed-point scale of the per-share reward accumulator
pub const ACC_SCALE: u128 = 1_000_000_000_000;

/// Component name reported by the re-entrancy guard and lock errors
pub const COMPONENT: &str = "farm";
