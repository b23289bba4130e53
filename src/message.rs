//! The DCC message buffer shared between the state machines and their
//! producers and consumers.
//!
//! A [`DccMessage`] is a fixed-size, `Copy` value so it can be published by
//! whole-struct assignment: the decoder only ever overwrites its exported
//! message with a complete, checksum-valid packet, and the encoder reads its
//! message slots in place while it walks them bit by bit.
//!
//! ## Layout
//!
//! ```text
//! data:  [address, instruction.., checksum, unused..]   (6 bytes)
//! size:  count of valid bytes in `data`, checksum included (3..=6)
//! preamble_bits: minimum preamble before this packet, 0 = link default
//! ```

use core::fmt;

use crate::checksum::{verify, xor_checksum};
use crate::consts::{BROADCAST_ADDRESS, DCC_MAX_LEN, DCC_MAX_LEN_USIZE, DCC_MIN_LEN, IDLE_ADDRESS};
use crate::error::{Error, Result};

/// One link-layer DCC packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DccMessage {
    data: [u8; DCC_MAX_LEN_USIZE],
    size: u8,
    preamble_bits: u8,
}

impl DccMessage {
    /// Builds a message from its address and instruction bytes, appending the
    /// XOR checksum.
    ///
    /// # Errors
    /// [`Error::InvalidLength`] unless `payload` is 2 to 5 bytes long.
    pub fn new(payload: &[u8]) -> Result<Self> {
        let size = payload.len() + 1;
        if !(DCC_MIN_LEN as usize..=DCC_MAX_LEN_USIZE).contains(&size) {
            return Err(Error::InvalidLength(size));
        }
        let mut data = [0; DCC_MAX_LEN_USIZE];
        data[..payload.len()].copy_from_slice(payload);
        data[payload.len()] = xor_checksum(payload);
        Ok(Self {
            data,
            size: size as u8,
            preamble_bits: 0,
        })
    }

    /// Wraps a complete packet whose last byte is already the checksum.
    ///
    /// # Errors
    /// - [`Error::InvalidLength`] unless `packet` is 3 to 6 bytes long
    /// - [`Error::BadChecksum`] if the trailing byte does not match
    pub fn from_packet(packet: &[u8]) -> Result<Self> {
        if !(DCC_MIN_LEN as usize..=DCC_MAX_LEN_USIZE).contains(&packet.len()) {
            return Err(Error::InvalidLength(packet.len()));
        }
        if !verify(packet) {
            let (found, body) = packet.split_last().ok_or(Error::InvalidLength(0))?;
            return Err(Error::BadChecksum {
                expected: xor_checksum(body),
                found: *found,
            });
        }
        Ok(Self::from_raw(packet))
    }

    /// Copies bytes the caller has already validated.
    pub(crate) fn from_raw(packet: &[u8]) -> Self {
        let mut data = [0; DCC_MAX_LEN_USIZE];
        data[..packet.len()].copy_from_slice(packet);
        Self {
            data,
            size: packet.len() as u8,
            preamble_bits: 0,
        }
    }

    /// The NMRA idle packet `FF 00 FF`, sent to keep the line alive when no
    /// command is pending.
    pub const fn idle() -> Self {
        Self {
            data: [IDLE_ADDRESS, 0x00, IDLE_ADDRESS, 0, 0, 0],
            size: DCC_MIN_LEN,
            preamble_bits: 0,
        }
    }

    /// The broadcast reset packet `00 00 00`.
    pub const fn reset() -> Self {
        Self {
            data: [BROADCAST_ADDRESS, 0x00, 0x00, 0, 0, 0],
            size: DCC_MIN_LEN,
            preamble_bits: 0,
        }
    }

    /// Requests a longer preamble ahead of this message, e.g. 20 bits for
    /// service mode. Values at or below the link default have no effect.
    pub const fn with_preamble_bits(mut self, bits: u8) -> Self {
        self.preamble_bits = bits;
        self
    }

    /// Valid bytes, checksum included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.size as usize]
    }

    /// Count of valid bytes, checksum included.
    pub const fn size(&self) -> u8 {
        self.size
    }

    /// Minimum preamble requested for this message, 0 for the link default.
    pub const fn preamble_bits(&self) -> u8 {
        self.preamble_bits
    }

    /// Byte at `index` of the backing array; unused bytes are zero.
    pub(crate) const fn byte(&self, index: u8) -> u8 {
        self.data[index as usize]
    }

    /// The address byte.
    pub const fn address(&self) -> u8 {
        self.data[0]
    }

    /// The trailing error-detection byte.
    pub const fn checksum(&self) -> u8 {
        self.data[self.size as usize - 1]
    }

    /// Whether the length is legal and the checksum matches.
    pub fn is_valid(&self) -> bool {
        (DCC_MIN_LEN..=DCC_MAX_LEN).contains(&self.size) && verify(self.as_bytes())
    }
}

impl Default for DccMessage {
    fn default() -> Self {
        Self::idle()
    }
}

/// Hex dump of the valid bytes, e.g. `FF 00 FF`.
impl fmt::Display for DccMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.as_bytes().iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}
