//! Constants used across the DCC link implementation.
//!
//! This module defines the protocol-wide constants used for packet sizing,
//! preamble control and pulse timing, plus the command bytes of the
//! CC1101-family transceiver that carries the bitstream over the air.
//!
//! ## Key Concepts
//!
//! - **Packet Limits**: a DCC packet is an address byte, one or more
//!   instruction bytes and a trailing XOR checksum byte, 3 to 6 bytes in all.
//! - **Preamble**: the run of "1" bits ahead of the packet start bit. The NMRA
//!   minimum a decoder must accept is 10; command stations send at least 14.
//! - **Half Periods**: every bit is two equal half periods, 58 µs for a "1"
//!   and 116 µs (nominal, 100 µs minimum) for a "0".

/// Smallest legal packet: address, instruction and checksum.
pub const DCC_MIN_LEN: u8 = 3;

/// Largest packet the link carries, checksum included.
pub const DCC_MAX_LEN: u8 = 6;

/// See [`DCC_MAX_LEN`](crate::consts::DCC_MAX_LEN)
pub const DCC_MAX_LEN_USIZE: usize = DCC_MAX_LEN as usize;

/// Preamble length the encoder emits when a message does not ask for more.
pub const DEFAULT_PREAMBLE_BITS: u8 = 16;

/// Shortest preamble the encoder may be configured for: the 11 ones the
/// decoder needs, plus the first one which doubles as the previous packet's
/// end bit.
pub const MIN_PREAMBLE_BITS: u8 = PREAMBLE_ONES_THRESHOLD + 2;

/// The decoder leaves the preamble state once more than this many
/// consecutive "1" bits have been seen.
pub const PREAMBLE_ONES_THRESHOLD: u8 = 10;

/// Nominal half period of a "1" bit in microseconds.
pub const SHORT_HALF_PERIOD_US: f32 = 58.0;

/// Nominal half period of a "0" bit in microseconds.
pub const LONG_HALF_PERIOD_US: f32 = 116.0;

/// Pulse width threshold in counter ticks of a 2 MHz free-running counter
/// (90 µs). Wider pulses are "0" bits, this value and below are "1" bits.
pub const DEFAULT_BIT_THRESHOLD_TICKS: u16 = 180;

/// Reference CPU clock of the link boards, in Hz.
pub const DEFAULT_F_CPU: u32 = 16_000_000;

/// Reference timer prescaler; 16 MHz / 8 gives 0.5 µs counter ticks.
pub const DEFAULT_PRESCALER: u32 = 8;

/// Idle packet address byte.
pub const IDLE_ADDRESS: u8 = 0xff;

/// Broadcast address, used by the reset packet.
pub const BROADCAST_ADDRESS: u8 = 0x00;

/// Enable and calibrate the receiver.
pub const STROBE_RX: u8 = 0x34;

/// Enable the transmitter.
pub const STROBE_TX: u8 = 0x35;

/// Exit RX/TX and turn off the frequency synthesizer.
pub const STROBE_IDLE: u8 = 0x36;

/// No operation, returns the chip status byte.
pub const STROBE_NOP: u8 = 0x3d;

/// Power amplifier table address.
pub const REG_PATABLE: u8 = 0x3e;

/// Channel number register address.
pub const REG_CHANNR: u8 = 0x0a;

/// Header bit for a burst write starting at register 0.
pub const WRITE_BURST: u8 = 0x40;

/// Header bit for a single register read.
pub const READ_SINGLE: u8 = 0x80;
