//! Error type shared by the fallible edges of the crate.
//!
//! The encoder and decoder state machines never fail; framing and checksum
//! problems are absorbed by resynchronising. Errors only come from pin and
//! bus access, message construction and configuration.

use embedded_hal::{digital, spi};
use thiserror::Error;

/// Convenient Result wrapper
pub type Result<T> = core::result::Result<T, Error>;

/// Error types returned by this crate
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A GPIO pin reported a fault while being driven or sampled.
    #[error("pin fault: {0:?}")]
    Pin(digital::ErrorKind),
    /// The radio SPI device reported a bus fault.
    #[error("spi fault: {0:?}")]
    Spi(spi::ErrorKind),
    /// Packet length outside of 3..=6 bytes (including the checksum byte).
    #[error("invalid packet length {0}")]
    InvalidLength(usize),
    /// Trailing byte does not match the XOR of the preceding bytes.
    #[error("checksum mismatch: expected {expected:#04x}, found {found:#04x}")]
    BadChecksum {
        /// XOR of the packet body
        expected: u8,
        /// Trailing byte actually present
        found: u8,
    },
    /// Radio channel index outside of the channel table.
    #[error("invalid channel {0}")]
    InvalidChannel(u8),
    /// Transmit power index outside of the PATABLE power table.
    #[error("invalid power level {0}")]
    InvalidPowerLevel(u8),
    /// Preamble too short to be seen by the decoder once its first bit has
    /// served as the previous packet's end bit.
    #[error("preamble of {0} bits is too short")]
    PreambleTooShort(u8),
}

impl Error {
    pub(crate) fn pin<E: digital::Error>(err: E) -> Self {
        Self::Pin(err.kind())
    }

    pub(crate) fn spi<E: spi::Error>(err: E) -> Self {
        Self::Spi(err.kind())
    }
}
