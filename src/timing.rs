//! Bit-cell timing table.
//!
//! DCC encodes a bit purely in the width of its two equal half periods: about
//! 58 µs each for a "1" and about 116 µs each for a "0". Both the encoder and
//! the decoder work in raw timer counts, so this module owns the conversion
//! between the two legal half periods and counts of a timer running at
//! `f_cpu / prescaler`.
//!
//! ## Usage
//!
//! ```rust
//! use airdcc::timing::{BitTiming, HalfPeriod};
//!
//! // 16 MHz CPU, timer prescaler 8: one count every 0.5 µs
//! let timing = BitTiming::from_clock(16_000_000, 8);
//! assert_eq!(timing.ticks(HalfPeriod::Short), 116);
//! assert_eq!(timing.ticks(HalfPeriod::Long), 232);
//! assert!(timing.classify(116));
//! assert!(!timing.classify(232));
//! ```

use libm::round;

use crate::consts::{
    DEFAULT_BIT_THRESHOLD_TICKS, DEFAULT_F_CPU, DEFAULT_PRESCALER, LONG_HALF_PERIOD_US,
    SHORT_HALF_PERIOD_US,
};
use crate::timer::compute_compare_value;

/// One of the two legal half-bit-cell durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalfPeriod {
    /// Half of a "1" bit, ~58 µs.
    Short,
    /// Half of a "0" bit, ~116 µs.
    Long,
}

impl HalfPeriod {
    /// The half period used to send `bit`.
    pub const fn for_bit(bit: bool) -> Self {
        if bit { Self::Short } else { Self::Long }
    }

    /// The bit value this half period encodes.
    pub const fn bit(self) -> bool {
        matches!(self, Self::Short)
    }

    /// Nominal duration in microseconds.
    pub const fn nominal_us(self) -> f32 {
        match self {
            Self::Short => SHORT_HALF_PERIOD_US,
            Self::Long => LONG_HALF_PERIOD_US,
        }
    }
}

/// Half periods and the receive threshold expressed in timer counts.
///
/// The transmit side loads [`ticks`](BitTiming::ticks) into the timer for the
/// next half cell, the receive side compares measured pulse widths against
/// [`threshold`](BitTiming::threshold). Both sides are assumed to count with
/// the same timer resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitTiming {
    short: u16,
    long: u16,
    threshold: u16,
    ticks_per_us: f32,
}

impl BitTiming {
    /// Builds the table for a timer clocked at `f_cpu / prescaler`.
    ///
    /// Counts are rounded to the nearest integer. The threshold is the 90 µs
    /// of the reference 16 MHz / 8 configuration, scaled to this clock.
    pub fn from_clock(f_cpu: u32, prescaler: u32) -> Self {
        let ticks_per_us = (f_cpu as f32 / prescaler as f32) / 1_000_000.0;
        let threshold_us = DEFAULT_BIT_THRESHOLD_TICKS as f32 / Self::reference_ticks_per_us();
        Self {
            short: compute_compare_value(f_cpu, prescaler, SHORT_HALF_PERIOD_US),
            long: compute_compare_value(f_cpu, prescaler, LONG_HALF_PERIOD_US),
            threshold: compute_compare_value(f_cpu, prescaler, threshold_us),
            ticks_per_us,
        }
    }

    /// Builds a table from raw counts, e.g. values tuned on a scope.
    pub const fn from_ticks(short: u16, long: u16, threshold: u16, ticks_per_us: f32) -> Self {
        Self {
            short,
            long,
            threshold,
            ticks_per_us,
        }
    }

    const fn reference_ticks_per_us() -> f32 {
        (DEFAULT_F_CPU / DEFAULT_PRESCALER) as f32 / 1_000_000.0
    }

    /// Timer counts for one half period.
    pub const fn ticks(&self, half: HalfPeriod) -> u16 {
        match half {
            HalfPeriod::Short => self.short,
            HalfPeriod::Long => self.long,
        }
    }

    /// Microseconds for one half period, rounded to the nearest µs.
    pub fn micros(&self, half: HalfPeriod) -> u32 {
        round(self.ticks(half) as f64 / self.ticks_per_us as f64) as u32
    }

    /// Widest pulse, in counts, still read as a "1".
    pub const fn threshold(&self) -> u16 {
        self.threshold
    }

    /// Replaces the receive threshold.
    pub fn set_threshold(&mut self, threshold: u16) {
        self.threshold = threshold;
    }

    /// Classifies a measured high-pulse width. Returns the bit value:
    /// `width <= threshold` is a "1", anything wider a "0".
    pub const fn classify(&self, width: u16) -> bool {
        width <= self.threshold
    }
}

impl Default for BitTiming {
    fn default() -> Self {
        Self::from_clock(DEFAULT_F_CPU, DEFAULT_PRESCALER)
    }
}
