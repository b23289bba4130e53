//! DCC transmit encoder.
//!
//! [`DccEncoder`] turns messages into the DCC waveform one half bit cell at a
//! time. It owns no pins and no timer: each call to
//! [`next_half`](DccEncoder::next_half) says which level to drive and how
//! long to hold it, and the caller (normally
//! [`DccLink::on_timer`](crate::link::DccLink::on_timer)) applies both.
//!
//! ## Waveform
//!
//! Every bit is two equal half periods, LOW then HIGH. The state machine
//! advances on the LOW half and the HIGH half repeats the latched duration:
//!
//! ```text
//!          "1"             "0"
//!       ___     ___         ______
//!  |___|   |___|   |______|      |
//!   58  58  58  58   116    116
//! ```
//!
//! A packet is the preamble (default 16 "1" bits), then for each byte a "0"
//! separator followed by its 8 bits MSB first. The first preamble bit of the
//! next packet doubles as the end bit of the previous one.
//!
//! ## Message slots
//!
//! Slot 0 holds the message most recently handed over by the
//! [`MessageSource`]; slot 1 holds the fallback sent under
//! [`IdlePolicy::SendIdle`]. Slots are read in place for every byte, never
//! validated: the source is responsible for handing over well-formed messages.

use crate::consts::DEFAULT_PREAMBLE_BITS;
use crate::fmt::trace;
use crate::message::DccMessage;
use crate::source::MessageSource;
use crate::timing::HalfPeriod;

/// Encoder states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxState {
    /// Sending the default preamble.
    Preamble,
    /// Sending extra preamble bits requested by the message.
    ExtendPreamble,
    /// Sending the "0" bit ahead of a byte.
    Separator,
    /// Sending the bits of the current byte.
    SendByte,
}

/// What the encoder does when its preamble is done and the source has
/// nothing new.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IdlePolicy {
    /// Keep sending preamble bits, asking the source again after each one.
    #[default]
    StretchPreamble,
    /// Send the fallback message (slot 1) straight away.
    SendIdle,
}

/// Which message slot the encoder is walking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Slot {
    /// Message handed over by the source.
    Ready = 0,
    /// Idle/keep-alive fallback.
    Fallback = 1,
}

/// One half bit cell of output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HalfCell {
    /// Level to drive for this half.
    pub level: bool,
    /// How long to hold it.
    pub period: HalfPeriod,
}

/// The transmit state machine.
#[derive(Debug, Clone)]
pub struct DccEncoder {
    state: TxState,
    policy: IdlePolicy,
    preamble_bits: u8,
    preamble_count: u8,
    extra_preamble_count: u8,
    /// `true` when the next call is the HIGH half of the current bit.
    second_half: bool,
    /// Duration latched by the LOW half, repeated by the HIGH half.
    latched: HalfPeriod,
    slots: [DccMessage; 2],
    slot: Slot,
    byte_index: u8,
    out_byte: u8,
    cursor: u8,
    /// Count of packets handed over by the source.
    pub tx_good: u16,
    /// Count of fallback packets sent for lack of a ready message.
    pub tx_idle: u16,
}

impl DccEncoder {
    /// Creates an encoder sending `preamble_bits` preamble bits ahead of each
    /// packet, with the idle packet as fallback.
    pub fn new(preamble_bits: u8, policy: IdlePolicy) -> Self {
        Self {
            state: TxState::Preamble,
            policy,
            preamble_bits,
            preamble_count: preamble_bits,
            extra_preamble_count: 0,
            second_half: false,
            latched: HalfPeriod::Short,
            slots: [DccMessage::idle(), DccMessage::idle()],
            slot: Slot::Ready,
            byte_index: 0,
            out_byte: 0,
            cursor: 0x80,
            tx_good: 0,
            tx_idle: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> TxState {
        self.state
    }

    /// Policy applied when the source has nothing ready.
    pub fn policy(&self) -> IdlePolicy {
        self.policy
    }

    /// Changes the idle policy; takes effect at the end of the next preamble.
    pub fn set_policy(&mut self, policy: IdlePolicy) {
        self.policy = policy;
    }

    /// Replaces the fallback message (slot 1), e.g. with
    /// [`DccMessage::reset`]. Must be a valid packet.
    pub fn set_fallback(&mut self, message: DccMessage) {
        self.slots[Slot::Fallback as usize] = message;
    }

    /// The message in `slot`.
    pub fn message(&self, slot: Slot) -> &DccMessage {
        &self.slots[slot as usize]
    }

    /// Slot being sent or most recently sent.
    pub fn active_slot(&self) -> Slot {
        self.slot
    }

    /// Whether the next call starts a new bit (drives the LOW half).
    pub fn at_bit_boundary(&self) -> bool {
        !self.second_half
    }

    /// Produces the next half bit cell.
    ///
    /// Called once per timer interrupt. On the HIGH half this only repeats
    /// the latched duration; on the LOW half it advances the state machine
    /// by one bit and may query `source`.
    pub fn next_half<S: MessageSource + ?Sized>(&mut self, source: &mut S) -> HalfCell {
        if self.second_half {
            self.second_half = false;
            return HalfCell {
                level: true,
                period: self.latched,
            };
        }
        self.second_half = true;
        self.latched = self.step(source);
        HalfCell {
            level: false,
            period: self.latched,
        }
    }

    /// Advances one bit and returns its half period.
    fn step<S: MessageSource + ?Sized>(&mut self, source: &mut S) -> HalfPeriod {
        match self.state {
            TxState::Preamble => {
                self.preamble_count = self.preamble_count.saturating_sub(1);
                if self.preamble_count == 0 {
                    self.end_of_preamble(source);
                }
                HalfPeriod::Short
            }
            TxState::ExtendPreamble => {
                self.extra_preamble_count = self.extra_preamble_count.saturating_sub(1);
                if self.extra_preamble_count == 0 {
                    self.state = TxState::Separator;
                }
                HalfPeriod::Short
            }
            TxState::Separator => {
                self.state = TxState::SendByte;
                self.cursor = 0x80;
                self.out_byte = self.slots[self.slot as usize].byte(self.byte_index);
                HalfPeriod::Long
            }
            TxState::SendByte => {
                let half = HalfPeriod::for_bit(self.out_byte & self.cursor != 0);
                self.cursor >>= 1;
                if self.cursor == 0 {
                    self.byte_index += 1;
                    if self.byte_index >= self.slots[self.slot as usize].size() {
                        // that was the checksum byte
                        self.state = TxState::Preamble;
                        self.preamble_count = self.preamble_bits;
                    } else {
                        self.state = TxState::Separator;
                    }
                }
                half
            }
        }
    }

    fn end_of_preamble<S: MessageSource + ?Sized>(&mut self, source: &mut S) {
        if source.next_message(&mut self.slots[Slot::Ready as usize]) {
            self.tx_good = self.tx_good.wrapping_add(1);
            self.begin(Slot::Ready);
            return;
        }
        match self.policy {
            IdlePolicy::StretchPreamble => {
                // one more preamble bit, then ask again
                self.preamble_count += 1;
            }
            IdlePolicy::SendIdle => {
                self.tx_idle = self.tx_idle.wrapping_add(1);
                self.begin(Slot::Fallback);
            }
        }
    }

    fn begin(&mut self, slot: Slot) {
        self.slot = slot;
        self.byte_index = 0;
        let wanted = self.slots[slot as usize].preamble_bits();
        if wanted > self.preamble_bits {
            self.extra_preamble_count = wanted - self.preamble_bits;
            self.state = TxState::ExtendPreamble;
        } else {
            self.state = TxState::Separator;
        }
        trace!("dcc tx: slot {}", slot as u8);
    }
}

impl Default for DccEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_PREAMBLE_BITS, IdlePolicy::default())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::source::{NoMessage, QueueSource};

    /// Runs the encoder for `bits` whole bits, returning the bit values.
    pub(crate) fn collect_bits<S: MessageSource>(
        encoder: &mut DccEncoder,
        source: &mut S,
        bits: usize,
    ) -> Vec<bool> {
        let mut out = Vec::with_capacity(bits);
        for _ in 0..bits {
            let low = encoder.next_half(source);
            let high = encoder.next_half(source);
            assert!(!low.level);
            assert!(high.level);
            assert_eq!(low.period, high.period);
            out.push(low.period.bit());
        }
        out
    }

    fn byte_bits(byte: u8) -> impl Iterator<Item = bool> {
        (0..8).rev().map(move |i| byte & (1 << i) != 0)
    }

    /// Expected bit stream for one packet after the preamble.
    pub(crate) fn packet_bits(bytes: &[u8]) -> Vec<bool> {
        let mut bits = Vec::new();
        for &byte in bytes {
            bits.push(false);
            bits.extend(byte_bits(byte));
        }
        bits
    }

    #[test]
    fn test_initial_state() {
        let encoder = DccEncoder::default();
        assert_eq!(encoder.state(), TxState::Preamble);
        assert_eq!(encoder.policy(), IdlePolicy::StretchPreamble);
        assert!(encoder.at_bit_boundary());
    }

    #[test]
    fn test_halves_alternate_low_high() {
        let mut encoder = DccEncoder::default();
        let first = encoder.next_half(&mut NoMessage);
        assert_eq!(
            first,
            HalfCell {
                level: false,
                period: HalfPeriod::Short
            }
        );
        assert!(!encoder.at_bit_boundary());
        let second = encoder.next_half(&mut NoMessage);
        assert_eq!(
            second,
            HalfCell {
                level: true,
                period: HalfPeriod::Short
            }
        );
    }

    #[test]
    fn test_idle_packet_layout() {
        let mut encoder = DccEncoder::default();
        let mut queue: QueueSource<1> = QueueSource::new();
        queue
            .enqueue(DccMessage::from_packet(&[0xff, 0x00, 0xff]).unwrap())
            .unwrap();

        // 16 preamble + 3 * 9 packet bits + end bit
        let bits = collect_bits(&mut encoder, &mut queue, 16 + 27 + 1);
        assert!(bits[..16].iter().all(|&b| b));
        assert_eq!(&bits[16..43], packet_bits(&[0xff, 0x00, 0xff]).as_slice());
        assert!(bits[43]);
        assert_eq!(encoder.state(), TxState::Preamble);
        assert_eq!(encoder.tx_good, 1);
    }

    #[test]
    fn test_stretch_policy_waits_for_message() {
        let mut encoder = DccEncoder::new(16, IdlePolicy::StretchPreamble);
        let bits = collect_bits(&mut encoder, &mut NoMessage, 100);
        assert!(bits.iter().all(|&b| b));
        assert_eq!(encoder.state(), TxState::Preamble);
        assert_eq!(encoder.tx_idle, 0);

        // a message turning up is sent after the very next preamble bit
        let mut queue: QueueSource<1> = QueueSource::new();
        queue.enqueue(DccMessage::reset()).unwrap();
        let bits = collect_bits(&mut encoder, &mut queue, 1 + 27);
        assert!(bits[0]);
        assert_eq!(&bits[1..], packet_bits(&[0, 0, 0]).as_slice());
    }

    #[test]
    fn test_send_idle_policy_uses_fallback() {
        let mut encoder = DccEncoder::new(14, IdlePolicy::SendIdle);
        let bits = collect_bits(&mut encoder, &mut NoMessage, 14 + 27 + 14 + 27);
        assert!(bits[..14].iter().all(|&b| b));
        assert_eq!(&bits[14..41], packet_bits(&[0xff, 0x00, 0xff]).as_slice());
        assert!(bits[41..55].iter().all(|&b| b));
        assert_eq!(&bits[55..], packet_bits(&[0xff, 0x00, 0xff]).as_slice());
        assert_eq!(encoder.active_slot(), Slot::Fallback);
        assert_eq!(encoder.tx_idle, 2);
    }

    #[test]
    fn test_custom_fallback() {
        let mut encoder = DccEncoder::new(14, IdlePolicy::SendIdle);
        encoder.set_fallback(DccMessage::reset());
        let bits = collect_bits(&mut encoder, &mut NoMessage, 14 + 27);
        assert_eq!(&bits[14..], packet_bits(&[0, 0, 0]).as_slice());
        assert_eq!(encoder.message(Slot::Fallback), &DccMessage::reset());
    }

    #[test]
    fn test_extended_preamble() {
        let mut encoder = DccEncoder::new(16, IdlePolicy::StretchPreamble);
        let mut queue: QueueSource<1> = QueueSource::new();
        queue
            .enqueue(DccMessage::reset().with_preamble_bits(20))
            .unwrap();
        let bits = collect_bits(&mut encoder, &mut queue, 20 + 27);
        assert!(bits[..20].iter().all(|&b| b));
        assert_eq!(&bits[20..], packet_bits(&[0, 0, 0]).as_slice());
    }

    #[test]
    fn test_six_byte_packet() {
        let msg = DccMessage::new(&[0xc0, 0x12, 0xee, 0x03, 0x55]).unwrap();
        let mut encoder = DccEncoder::default();
        let mut queue: QueueSource<1> = QueueSource::new();
        queue.enqueue(msg).unwrap();
        let bits = collect_bits(&mut encoder, &mut queue, 16 + 6 * 9 + 1);
        assert_eq!(&bits[16..70], packet_bits(msg.as_bytes()).as_slice());
        assert!(bits[70]);
        assert_eq!(encoder.message(Slot::Ready), &msg);
    }
}
