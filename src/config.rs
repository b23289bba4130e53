//! Link configuration.
//!
//! Board-level choices resolved into one value: which end of the radio link
//! this node is, how the encoder pads and fills the line, how pulses are
//! timed, and which radio channel and power the modem starts on.

use crate::consts::{DEFAULT_PREAMBLE_BITS, MIN_PREAMBLE_BITS};
use crate::encoder::IdlePolicy;
use crate::error::{Error, Result};
use crate::radio::{CHANNEL_COUNT, POWER_LEVEL_COUNT};
use crate::scheduler::Task;
use crate::timing::BitTiming;

/// Which end of the radio link this node is.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    /// Takes DCC from the command station and sends it over the air.
    #[default]
    Transmitter,
    /// Takes DCC from the modem and reproduces it for the locomotive decoder.
    Receiver,
}

/// Resolved link settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkConfig {
    /// Transmitter or receiver.
    pub role: Role,
    /// Preamble bits the encoder sends ahead of each packet.
    pub preamble_bits: u8,
    /// What the encoder sends when no message is ready.
    pub idle_policy: IdlePolicy,
    /// Half period counts and the receive threshold.
    pub timing: BitTiming,
    /// Radio channel index, `0..CHANNEL_COUNT`.
    pub channel: u8,
    /// Transmit power index, `0..POWER_LEVEL_COUNT`.
    pub power_level: u8,
    /// Scheduler slot the decoder raises for each received packet.
    pub notify_task: Task,
}

impl LinkConfig {
    /// Checks every field is in range.
    ///
    /// # Errors
    /// - [`Error::PreambleTooShort`] below [`MIN_PREAMBLE_BITS`]
    /// - [`Error::InvalidChannel`] / [`Error::InvalidPowerLevel`] for indices
    ///   past the radio tables
    pub fn validate(&self) -> Result<()> {
        if self.preamble_bits < MIN_PREAMBLE_BITS {
            return Err(Error::PreambleTooShort(self.preamble_bits));
        }
        if self.channel as usize >= CHANNEL_COUNT {
            return Err(Error::InvalidChannel(self.channel));
        }
        if self.power_level as usize >= POWER_LEVEL_COUNT {
            return Err(Error::InvalidPowerLevel(self.power_level));
        }
        Ok(())
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            role: Role::Transmitter,
            preamble_bits: DEFAULT_PREAMBLE_BITS,
            idle_policy: IdlePolicy::StretchPreamble,
            timing: BitTiming::default(),
            channel: 0,
            // conservative until the stored setting is loaded
            power_level: 6,
            notify_task: Task::Task1,
        }
    }
}
