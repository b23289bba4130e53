//! Timer and interrupt utilities for the DCC link.
//!
//! Two ways of clocking the link: interrupt service routines sharing the
//! link through `critical_section::with` (`timer-isr` feature), or a blocking
//! delay loop for the transmit side (`delay-loop` feature).
//!
//! Contains helpers for both, including:
//! - `compute_compare_value`: runtime output compare calculator
//! - `const_compare_value`: compile-time output compare calculator
//! - `const_bit_timing`: compile-time [`BitTiming`] for a given clock
//! - `run_dcc_tick_loop`: blocking transmit loop for `DelayNs` (feature `delay-loop`)
//! - `global_link_timer_tick` / `tick_dcc_timer!()` and
//!   `global_link_pin_change` / `dcc_pin_change!()`: interrupt body wrappers
//!   (feature `timer-isr`)
//!
//! Half periods at 16 MHz for common prescalers:
//!
//! | PRESCALER | Count period | SHORT (58 µs) | LONG (116 µs) |
//! |-----------|--------------|---------------|---------------|
//! |         1 |      62.5 ns |           928 |          1856 |
//! |         8 |       0.5 µs |           116 |           232 |
//! |        64 |         4 µs |            15 |            29 |

use libm::round;

use crate::consts::{DEFAULT_BIT_THRESHOLD_TICKS, LONG_HALF_PERIOD_US, SHORT_HALF_PERIOD_US};
use crate::timing::BitTiming;

#[cfg(feature = "delay-loop")]
mod delay;
#[cfg_attr(feature = "delay-loop", allow(unused_imports))]
#[cfg(feature = "delay-loop")]
pub use delay::*;

#[cfg(feature = "timer-isr")]
mod isr;
#[cfg_attr(feature = "timer-isr", allow(unused_imports))]
#[cfg(feature = "timer-isr")]
pub use isr::*;

#[cfg(feature = "timer-isr")]
mod macros;

/// 1,000,000 microseconds = 1 second
pub const MICROSECONDS_PER_SECOND: u32 = 1_000_000;

/// Counter frequency the default receive threshold is expressed in.
const REFERENCE_COUNTS_PER_SECOND: u64 = 2_000_000;

/// Computes the output compare value for a timer period
///
/// # Arguments
/// - `f_cpu`: CPU frequency in Hz
/// - `prescaler`: timer prescaler (e.g., 1, 8, 64)
/// - `period_us`: desired period in microseconds (e.g., 58.0)
///
/// # Returns
/// - Compare value in timer counts, rounded to the nearest integer
pub fn compute_compare_value(f_cpu: u32, prescaler: u32, period_us: f32) -> u16 {
    let counts_per_us: f32 = (f_cpu as f32 / prescaler as f32) / MICROSECONDS_PER_SECOND as f32;
    round(period_us as f64 * counts_per_us as f64) as u16
}

/// Compile-time output compare value calculator
///
/// # Arguments
/// - `f_cpu`: CPU frequency in Hz
/// - `prescaler`: timer prescaler (e.g., 1, 8, 64)
/// - `period_us`: desired period in whole microseconds
///
/// # Returns
/// - Compare value in timer counts, truncated
pub const fn const_compare_value(f_cpu: u32, prescaler: u32, period_us: u32) -> u16 {
    ((f_cpu / prescaler) as u64 * period_us as u64 / MICROSECONDS_PER_SECOND as u64) as u16
}

/// Compile-time [`BitTiming`] for a timer clocked at `f_cpu / prescaler`.
///
/// Matches [`BitTiming::from_clock`] wherever the half periods come out as
/// whole counts, which includes every prescaler in the table above except 64.
///
/// # Example
/// ```rust
/// use airdcc::timer::const_bit_timing;
/// use airdcc::timing::{BitTiming, HalfPeriod};
///
/// const TIMING: BitTiming = const_bit_timing(16_000_000, 8);
/// assert_eq!(TIMING.ticks(HalfPeriod::Short), 116);
/// assert_eq!(TIMING.threshold(), 180);
/// ```
pub const fn const_bit_timing(f_cpu: u32, prescaler: u32) -> BitTiming {
    let counts_per_second = (f_cpu / prescaler) as u64;
    let threshold =
        DEFAULT_BIT_THRESHOLD_TICKS as u64 * counts_per_second / REFERENCE_COUNTS_PER_SECOND;
    BitTiming::from_ticks(
        const_compare_value(f_cpu, prescaler, SHORT_HALF_PERIOD_US as u32),
        const_compare_value(f_cpu, prescaler, LONG_HALF_PERIOD_US as u32),
        threshold as u16,
        counts_per_second as f32 / MICROSECONDS_PER_SECOND as f32,
    )
}
