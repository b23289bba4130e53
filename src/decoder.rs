//! DCC receive decoder.
//!
//! This module reconstructs DCC packets from the edges of an incoming
//! bi-level signal. It works by timestamping each rising edge, measuring the
//! width of the high pulse on the following falling edge, and classifying
//! that width as a "1" (short) or a "0" (long). The bits then drive a
//! preamble / start bit / data / end bit state machine.
//!
//! Only the high half of each bit is measured; the low half is assumed to be
//! the same width.
//!
//! The decoder owns no pins. [`DccDecoder::on_edge`] returns the level the
//! caller should drive on the filtered passthrough output and whether a new
//! packet was exported.

use crate::checksum::xor_checksum;
use crate::consts::{DCC_MAX_LEN, DCC_MAX_LEN_USIZE, DCC_MIN_LEN, PREAMBLE_ONES_THRESHOLD};
use crate::fmt::{debug, trace};
use crate::message::DccMessage;
use crate::timing::BitTiming;

/// Decoder states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxState {
    /// Counting consecutive "1" bits.
    Preamble,
    /// Preamble seen; waiting for the "0" packet start bit.
    StartBit,
    /// Shifting in the 8 bits of a byte.
    Data,
    /// After a byte: "0" means another byte follows, "1" ends the packet.
    EndBit,
}

/// What the caller should do after an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EdgeAction {
    /// Level for the passthrough output.
    pub level: bool,
    /// A new packet was copied into the exported buffer.
    pub packet_ready: bool,
}

/// The receive state machine.
#[derive(Debug)]
pub struct DccDecoder {
    timing: BitTiming,
    state: RxState,

    /// Counter value captured on the last rising edge.
    pulse_start: u16,

    /// Consecutive preamble "1"s, then bits of the current byte.
    bit_count: u8,

    /// Byte being shifted in, MSB first.
    data_byte: u8,

    /// Bytes stored in `scratch`.
    byte_count: u8,

    /// Packet being assembled, never visible to the consumer.
    scratch: [u8; DCC_MAX_LEN_USIZE],

    /// Last complete, checksum-valid packet.
    exported: DccMessage,

    /// Edges seen since the last state change or export.
    transitions: u16,

    /// Passthrough follows the input when `true`, else holds `dc_level`.
    use_modem_data: bool,
    dc_level: bool,

    /// Packets exported.
    pub packets_ok: u16,

    /// Structurally complete packets dropped for a bad checksum or length.
    pub packets_bad: u16,
}

impl DccDecoder {
    /// Creates a decoder in the preamble state, passing modem data through.
    pub fn new(timing: BitTiming) -> Self {
        Self {
            timing,
            state: RxState::Preamble,
            pulse_start: 0,
            bit_count: 0,
            data_byte: 0,
            byte_count: 0,
            scratch: [0; DCC_MAX_LEN_USIZE],
            exported: DccMessage::idle(),
            transitions: 0,
            use_modem_data: true,
            dc_level: true,
            packets_ok: 0,
            packets_bad: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> RxState {
        self.state
    }

    /// Timing table used to classify pulses.
    pub fn timing(&self) -> &BitTiming {
        &self.timing
    }

    /// The last complete, checksum-valid packet. Holds the idle packet until
    /// the first one is received.
    pub fn exported(&self) -> &DccMessage {
        &self.exported
    }

    /// Edges seen since the last state change.
    pub fn transition_count(&self) -> u16 {
        self.transitions
    }

    /// Overwrites the transition counter.
    pub fn reset_transition_count(&mut self, count: u16) {
        self.transitions = count;
    }

    /// Chooses between passing the input through (`true`) and holding the
    /// passthrough output at `dc_level`. Decoding continues either way.
    pub fn use_modem_data(&mut self, use_modem_data: bool, dc_level: bool) {
        self.use_modem_data = use_modem_data;
        self.dc_level = dc_level;
    }

    /// Level the passthrough output should rest at before any edge.
    pub fn idle_level(&self) -> bool {
        self.dc_level
    }

    fn passthrough(&self, input: bool) -> bool {
        if self.use_modem_data {
            input
        } else {
            self.dc_level
        }
    }

    fn enter(&mut self, state: RxState) {
        self.state = state;
        self.transitions = 0;
    }

    /// Handles one edge of the input signal.
    ///
    /// # Arguments
    /// - `rising`: the input is now high
    /// - `now`: free-running counter value at the edge; wraps
    pub fn on_edge(&mut self, rising: bool, now: u16) -> EdgeAction {
        self.transitions = self.transitions.wrapping_add(1);
        let level = self.passthrough(rising);
        if rising {
            self.pulse_start = now;
            return EdgeAction {
                level,
                packet_ready: false,
            };
        }
        let width = now.wrapping_sub(self.pulse_start);
        let bit = self.timing.classify(width);
        EdgeAction {
            level,
            packet_ready: self.on_bit(bit),
        }
    }

    /// Advances the state machine by one received bit. Returns `true` when a
    /// packet was exported.
    pub fn on_bit(&mut self, bit: bool) -> bool {
        self.bit_count = self.bit_count.wrapping_add(1);
        match self.state {
            RxState::Preamble => {
                if !bit {
                    self.bit_count = 0;
                } else if self.bit_count > PREAMBLE_ONES_THRESHOLD {
                    self.bit_count = 0;
                    self.scratch = [0; DCC_MAX_LEN_USIZE];
                    self.enter(RxState::StartBit);
                }
                false
            }
            RxState::StartBit => {
                if !bit {
                    self.bit_count = 0;
                    self.byte_count = 0;
                    self.data_byte = 0;
                    self.enter(RxState::Data);
                }
                false
            }
            RxState::Data => {
                self.data_byte = (self.data_byte << 1) | bit as u8;
                if self.bit_count == 8 {
                    if self.byte_count >= DCC_MAX_LEN {
                        // longer than any packet we carry
                        self.packets_bad = self.packets_bad.wrapping_add(1);
                        self.resync();
                        return false;
                    }
                    self.scratch[self.byte_count as usize] = self.data_byte;
                    self.byte_count += 1;
                    self.data_byte = 0;
                    self.enter(RxState::EndBit);
                }
                false
            }
            RxState::EndBit => {
                self.bit_count = 0;
                if bit {
                    let exported = self.finish_packet();
                    self.enter(RxState::Preamble);
                    exported
                } else {
                    self.enter(RxState::Data);
                    false
                }
            }
        }
    }

    /// Validates the scratch packet and, if good, publishes it.
    fn finish_packet(&mut self) -> bool {
        let len = self.byte_count;
        if !(DCC_MIN_LEN..=DCC_MAX_LEN).contains(&len) {
            self.packets_bad = self.packets_bad.wrapping_add(1);
            trace!("dcc rx: dropped {} byte packet", len);
            return false;
        }
        let packet = &self.scratch[..len as usize];
        let (check, body) = (packet[packet.len() - 1], &packet[..packet.len() - 1]);
        if xor_checksum(body) != check {
            self.packets_bad = self.packets_bad.wrapping_add(1);
            trace!("dcc rx: checksum mismatch");
            return false;
        }
        self.exported = DccMessage::from_raw(packet);
        self.packets_ok = self.packets_ok.wrapping_add(1);
        debug!("dcc rx: {}", self.exported);
        true
    }

    fn resync(&mut self) {
        self.bit_count = 0;
        self.byte_count = 0;
        self.data_byte = 0;
        self.enter(RxState::Preamble);
    }
}

impl Default for DccDecoder {
    fn default() -> Self {
        Self::new(BitTiming::default())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::timing::HalfPeriod;

    /// Feeds whole bits as (rising, falling) edge pairs at nominal timing.
    pub(crate) fn feed_bits(decoder: &mut DccDecoder, clock: &mut u16, bits: &[bool]) -> usize {
        let timing = *decoder.timing();
        let mut exported = 0;
        for &bit in bits {
            let half = timing.ticks(HalfPeriod::for_bit(bit));
            // low half
            *clock = clock.wrapping_add(half);
            assert!(!decoder.on_edge(true, *clock).packet_ready);
            // high half
            *clock = clock.wrapping_add(half);
            if decoder.on_edge(false, *clock).packet_ready {
                exported += 1;
            }
        }
        exported
    }

    pub(crate) fn frame(preamble: usize, bytes: &[u8]) -> Vec<bool> {
        let mut bits = vec![true; preamble];
        for &byte in bytes {
            bits.push(false);
            bits.extend((0..8).rev().map(|i| byte & (1 << i) != 0));
        }
        bits.push(true);
        bits
    }

    #[test]
    fn test_decoder_initialization_defaults() {
        let decoder = DccDecoder::default();
        assert_eq!(decoder.state(), RxState::Preamble);
        assert_eq!(decoder.transition_count(), 0);
        assert_eq!(decoder.exported(), &DccMessage::idle());
        assert_eq!(decoder.packets_ok, 0);
    }

    #[test]
    fn test_receives_speed_packet() {
        let mut decoder = DccDecoder::default();
        let mut clock = 0;
        let n = feed_bits(&mut decoder, &mut clock, &frame(14, &[0x23, 0x6e, 0x4d]));
        assert_eq!(n, 1);
        assert_eq!(decoder.exported().as_bytes(), &[0x23, 0x6e, 0x4d]);
        assert_eq!(decoder.state(), RxState::Preamble);
        assert_eq!(decoder.packets_ok, 1);
    }

    #[test]
    fn test_counter_wraparound() {
        let mut decoder = DccDecoder::default();
        let mut clock = u16::MAX - 1000;
        let n = feed_bits(&mut decoder, &mut clock, &frame(12, &[0xff, 0x00, 0xff]));
        assert_eq!(n, 1);
        assert!(clock < u16::MAX - 1000);
    }

    #[test]
    fn test_checksum_rejected_then_resync() {
        let mut decoder = DccDecoder::default();
        let mut clock = 0;
        assert_eq!(
            feed_bits(&mut decoder, &mut clock, &frame(14, &[0x03, 0x74, 0x00])),
            0
        );
        assert_eq!(decoder.state(), RxState::Preamble);
        assert_eq!(decoder.exported(), &DccMessage::idle());
        assert_eq!(decoder.packets_bad, 1);

        assert_eq!(
            feed_bits(&mut decoder, &mut clock, &frame(14, &[0x03, 0x74, 0x77])),
            1
        );
        assert_eq!(decoder.exported().as_bytes(), &[0x03, 0x74, 0x77]);
    }

    #[test]
    fn test_short_packet_rejected() {
        let mut decoder = DccDecoder::default();
        let mut clock = 0;
        assert_eq!(
            feed_bits(&mut decoder, &mut clock, &frame(14, &[0x00, 0x00])),
            0
        );
        assert_eq!(decoder.packets_bad, 1);
        assert_eq!(decoder.state(), RxState::Preamble);
    }

    #[test]
    fn test_overlong_packet_rejected() {
        let mut decoder = DccDecoder::default();
        let mut clock = 0;
        assert_eq!(
            feed_bits(&mut decoder, &mut clock, &frame(14, &[0; 7])),
            0
        );
        assert_eq!(decoder.packets_bad, 1);
        assert_eq!(decoder.exported(), &DccMessage::idle());
    }

    #[test]
    fn test_preamble_broken_by_zero() {
        let mut decoder = DccDecoder::default();
        for _ in 0..10 {
            assert!(!decoder.on_bit(true));
        }
        assert_eq!(decoder.state(), RxState::Preamble);
        assert!(!decoder.on_bit(false));
        assert_eq!(decoder.state(), RxState::Preamble);
        // the count starts again: ten more ones are still not enough
        for _ in 0..10 {
            assert!(!decoder.on_bit(true));
        }
        assert_eq!(decoder.state(), RxState::Preamble);
        assert!(!decoder.on_bit(true));
        assert_eq!(decoder.state(), RxState::StartBit);
    }

    #[test]
    fn test_start_bit_waits_through_ones() {
        let mut decoder = DccDecoder::default();
        for _ in 0..20 {
            assert!(!decoder.on_bit(true));
        }
        assert_eq!(decoder.state(), RxState::StartBit);
        assert!(!decoder.on_bit(false));
        assert_eq!(decoder.state(), RxState::Data);
    }

    #[test]
    fn test_transition_count_resets_on_state_change() {
        let mut decoder = DccDecoder::default();
        let mut clock = 0;
        let _ = feed_bits(&mut decoder, &mut clock, &[true; 5]);
        assert_eq!(decoder.transition_count(), 10);
        let _ = feed_bits(&mut decoder, &mut clock, &[true; 6]);
        assert_eq!(decoder.state(), RxState::StartBit);
        assert_eq!(decoder.transition_count(), 0);
        decoder.reset_transition_count(7);
        assert_eq!(decoder.transition_count(), 7);
    }

    #[test]
    fn test_passthrough_levels() {
        let mut decoder = DccDecoder::default();
        assert!(decoder.on_edge(true, 0).level);
        assert!(!decoder.on_edge(false, 116).level);

        decoder.use_modem_data(false, false);
        assert!(!decoder.idle_level());
        assert!(!decoder.on_edge(true, 200).level);
        assert!(!decoder.on_edge(false, 316).level);

        decoder.use_modem_data(false, true);
        assert!(decoder.on_edge(true, 400).level);
        assert!(decoder.on_edge(false, 516).level);
    }

    #[test]
    fn test_pulse_boundary() {
        let mut decoder = DccDecoder::default();
        // eleven pulses of exactly the threshold are read as ones
        for i in 0..11u16 {
            let _ = decoder.on_edge(true, i * 1000);
            let _ = decoder.on_edge(false, i * 1000 + 180);
        }
        assert_eq!(decoder.state(), RxState::StartBit);
        // one tick wider is a zero
        let _ = decoder.on_edge(true, 20_000);
        let _ = decoder.on_edge(false, 20_181);
        assert_eq!(decoder.state(), RxState::Data);
    }
}
