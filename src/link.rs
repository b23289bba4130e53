//! The link context: encoder, decoder, scheduler, pins and message source in
//! one owned value.
//!
//! [`DccLink`] is what the interrupt handlers operate on. Its two hot methods
//! are the bodies of those handlers:
//!
//! - [`on_timer`](DccLink::on_timer) for the output compare interrupt, once
//!   per half bit cell
//! - [`on_pin_change`](DccLink::on_pin_change) for the pin change interrupt
//!   on the incoming DCC signal
//!
//! Everything else is for the main loop. Share the link between the two
//! through the `critical-section` helpers in [`crate::timer`].
//!
//! ## Example
//!
//! ```rust
//! # use embedded_hal_mock::eh1::digital::{Mock as Pin, State as PinState, Transaction as PinTransaction};
//! use airdcc::config::LinkConfig;
//! use airdcc::link::DccLink;
//! use airdcc::source::NoMessage;
//!
//! # let tx = Pin::new(&[PinTransaction::set(PinState::Low), PinTransaction::set(PinState::Low)]);
//! # let rx = Pin::new(&[]);
//! # let out = Pin::new(&[PinTransaction::set(PinState::High)]);
//! let mut link = DccLink::new(tx, rx, out, NoMessage, LinkConfig::default()).unwrap();
//!
//! // first half of the first preamble bit
//! let ticks = link.on_timer().unwrap();
//! assert_eq!(ticks, 116);
//! # link.tx.done();
//! # link.rx.done();
//! # link.out.done();
//! ```

use embedded_hal::digital::{InputPin, OutputPin, PinState};

use crate::config::{LinkConfig, Role};
use crate::decoder::DccDecoder;
use crate::encoder::{DccEncoder, HalfCell};
use crate::error::{Error, Result};
use crate::message::DccMessage;
use crate::scheduler::{Scheduler, Task};
use crate::source::MessageSource;
use crate::timing::BitTiming;

/// One end of a DCC radio link.
///
/// ## Type Parameters
///
/// - `TX`: output carrying the encoded DCC waveform (to the modem data input)
/// - `RX`: input carrying the incoming DCC waveform (from the modem data output)
/// - `OUT`: passthrough output reproducing `RX`, or a fixed level
/// - `S`: where the encoder gets its next message
#[derive(Debug)]
pub struct DccLink<TX, RX, OUT, S>
where
    TX: OutputPin,
    RX: InputPin,
    OUT: OutputPin,
    S: MessageSource,
{
    /// Encoded output pin
    pub tx: TX,
    /// DCC input pin
    pub rx: RX,
    /// Passthrough output pin
    pub out: OUT,
    /// Message source polled by the encoder
    pub source: S,
    /// Transmit state machine
    pub encoder: DccEncoder,
    /// Receive state machine
    pub decoder: DccDecoder,
    /// Main loop task flags
    pub scheduler: Scheduler,
    timing: BitTiming,
    role: Role,
    notify_task: Task,
}

impl<TX, RX, OUT, S> DccLink<TX, RX, OUT, S>
where
    TX: OutputPin,
    RX: InputPin,
    OUT: OutputPin,
    S: MessageSource,
{
    /// Builds a link from its pins, a message source and a configuration.
    ///
    /// Drives `tx` low (the level of the first half cell) and `out` to the
    /// decoder's resting level.
    ///
    /// # Errors
    /// - any error from [`LinkConfig::validate`]
    /// - [`Error::Pin`] if either output cannot be driven
    pub fn new(tx: TX, rx: RX, out: OUT, source: S, config: LinkConfig) -> Result<Self> {
        config.validate()?;
        let mut link = Self {
            tx,
            rx,
            out,
            source,
            encoder: DccEncoder::new(config.preamble_bits, config.idle_policy),
            decoder: DccDecoder::new(config.timing),
            scheduler: Scheduler::new(),
            timing: config.timing,
            role: config.role,
            notify_task: config.notify_task,
        };
        link.tx.set_low().map_err(Error::pin)?;
        link.out
            .set_state(PinState::from(link.decoder.idle_level()))
            .map_err(Error::pin)?;
        Ok(link)
    }

    /// Which end of the link this is.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Timing shared by the encoder and decoder.
    pub fn timing(&self) -> &BitTiming {
        &self.timing
    }

    /// Output compare interrupt body.
    ///
    /// Drives the next half cell onto `tx` and returns the compare value for
    /// the following interrupt, in timer counts.
    pub fn on_timer(&mut self) -> Result<u16> {
        let cell = self.next_half()?;
        Ok(self.timing.ticks(cell.period))
    }

    /// Like [`on_timer`](Self::on_timer) but returns the half cell itself,
    /// for callers timing it some other way.
    pub fn next_half(&mut self) -> Result<HalfCell> {
        let cell = self.encoder.next_half(&mut self.source);
        self.tx
            .set_state(PinState::from(cell.level))
            .map_err(Error::pin)?;
        Ok(cell)
    }

    /// Pin change interrupt body.
    ///
    /// Samples `rx` to tell the edge direction, then handles it as
    /// [`on_edge`](Self::on_edge).
    ///
    /// # Arguments
    /// - `now`: free-running counter value captured at the interrupt
    pub fn on_pin_change(&mut self, now: u16) -> Result<bool> {
        let rising = self.rx.is_high().map_err(Error::pin)?;
        self.on_edge(rising, now)
    }

    /// Feeds one edge to the decoder, drives the passthrough output and
    /// raises the notify task when a packet comes out. Returns whether one
    /// did.
    pub fn on_edge(&mut self, rising: bool, now: u16) -> Result<bool> {
        let action = self.decoder.on_edge(rising, now);
        self.out
            .set_state(PinState::from(action.level))
            .map_err(Error::pin)?;
        if action.packet_ready {
            self.scheduler.request(self.notify_task);
        }
        Ok(action.packet_ready)
    }

    /// The last complete, checksum-valid received packet.
    pub fn exported(&self) -> &DccMessage {
        self.decoder.exported()
    }

    /// Returns the exported packet if one arrived since the last call,
    /// clearing the notify task.
    pub fn take_packet(&mut self) -> Option<DccMessage> {
        if !self.scheduler.is_pending(self.notify_task) {
            return None;
        }
        self.scheduler.clear(self.notify_task);
        Some(*self.decoder.exported())
    }

    /// Highest priority pending task, or [`Task::Idle`].
    pub fn select_highest_pending(&self) -> Task {
        self.scheduler.select_highest_pending()
    }

    /// Raises `task`.
    pub fn request_task(&mut self, task: Task) {
        self.scheduler.request(task);
    }

    /// Lowers `task`.
    pub fn clear_task(&mut self, task: Task) {
        self.scheduler.clear(task);
    }

    /// See [`DccDecoder::use_modem_data`]. The new level applies from the
    /// next edge.
    pub fn use_modem_data(&mut self, use_modem_data: bool, dc_level: bool) {
        self.decoder.use_modem_data(use_modem_data, dc_level);
    }

    /// Edges seen by the decoder since its last state change.
    pub fn transition_count(&self) -> u16 {
        self.decoder.transition_count()
    }

    /// Overwrites the decoder's transition counter.
    pub fn reset_transition_count(&mut self, count: u16) {
        self.decoder.reset_transition_count(count);
    }

    /// The message source, e.g. to enqueue.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Gives the pins and source back.
    pub fn release(self) -> (TX, RX, OUT, S) {
        (self.tx, self.rx, self.out, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::MIN_PREAMBLE_BITS;
    use crate::decoder::RxState;
    use crate::encoder::IdlePolicy;
    use crate::source::{NoMessage, QueueSource};
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    /// Output pin remembering every level driven onto it.
    #[derive(Debug, Default)]
    struct Recorder {
        levels: Vec<bool>,
    }

    impl ErrorType for Recorder {
        type Error = Infallible;
    }

    impl OutputPin for Recorder {
        fn set_low(&mut self) -> core::result::Result<(), Infallible> {
            self.levels.push(false);
            Ok(())
        }

        fn set_high(&mut self) -> core::result::Result<(), Infallible> {
            self.levels.push(true);
            Ok(())
        }
    }

    /// Input pin held at a fixed level.
    #[derive(Debug, Default)]
    struct Level(bool);

    impl ErrorType for Level {
        type Error = Infallible;
    }

    impl InputPin for Level {
        fn is_high(&mut self) -> core::result::Result<bool, Infallible> {
            Ok(self.0)
        }

        fn is_low(&mut self) -> core::result::Result<bool, Infallible> {
            Ok(!self.0)
        }
    }

    type TestLink<S> = DccLink<Recorder, Level, Recorder, S>;

    fn transmitter<const N: usize>(policy: IdlePolicy) -> TestLink<QueueSource<N>> {
        let config = LinkConfig {
            idle_policy: policy,
            ..Default::default()
        };
        DccLink::new(
            Recorder::default(),
            Level::default(),
            Recorder::default(),
            QueueSource::new(),
            config,
        )
        .unwrap()
    }

    fn receiver() -> TestLink<NoMessage> {
        let config = LinkConfig {
            role: Role::Receiver,
            ..Default::default()
        };
        DccLink::new(
            Recorder::default(),
            Level::default(),
            Recorder::default(),
            NoMessage,
            config,
        )
        .unwrap()
    }

    /// Runs `halves` timer interrupts on `tx`, replaying every level change
    /// as an edge on `rx` with the timestamps a counter would show. Returns
    /// the packets `rx` produced.
    fn pump<S: MessageSource>(
        tx: &mut TestLink<S>,
        rx: &mut TestLink<NoMessage>,
        clock: &mut u16,
        halves: usize,
    ) -> Vec<DccMessage> {
        let mut received = Vec::new();
        for _ in 0..halves {
            let cell = tx.next_half().unwrap();
            if rx.on_edge(cell.level, *clock).unwrap() {
                received.push(rx.take_packet().unwrap());
            }
            *clock = clock.wrapping_add(tx.timing().ticks(cell.period));
        }
        received
    }

    #[test]
    fn test_new_drives_initial_levels() {
        let tx = PinMock::new(&[PinTransaction::set(PinState::Low)]);
        let rx = PinMock::new(&[]);
        let out = PinMock::new(&[PinTransaction::set(PinState::High)]);
        let link = DccLink::new(tx, rx, out, NoMessage, LinkConfig::default()).unwrap();
        assert_eq!(link.role(), Role::Transmitter);
        let (mut tx, mut rx, mut out, _) = link.release();
        tx.done();
        rx.done();
        out.done();
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = LinkConfig {
            channel: 40,
            ..Default::default()
        };
        let result = DccLink::new(
            Recorder::default(),
            Level::default(),
            Recorder::default(),
            NoMessage,
            config,
        );
        assert_eq!(result.err(), Some(Error::InvalidChannel(40)));
    }

    #[test]
    fn test_on_timer_drives_halves() {
        let tx = PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);
        let rx = PinMock::new(&[]);
        let out = PinMock::new(&[PinTransaction::set(PinState::High)]);
        let mut link = DccLink::new(tx, rx, out, NoMessage, LinkConfig::default()).unwrap();
        assert_eq!(link.on_timer(), Ok(116));
        assert_eq!(link.on_timer(), Ok(116));
        link.tx.done();
        link.rx.done();
        link.out.done();
    }

    #[test]
    fn test_on_pin_change_samples_rx() {
        let tx = PinMock::new(&[PinTransaction::set(PinState::Low)]);
        let rx = PinMock::new(&[
            PinTransaction::get(PinState::High),
            PinTransaction::get(PinState::Low),
        ]);
        let out = PinMock::new(&[
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
        ]);
        let mut link = DccLink::new(tx, rx, out, NoMessage, LinkConfig::default()).unwrap();
        assert_eq!(link.on_pin_change(1000), Ok(false));
        assert_eq!(link.on_pin_change(1116), Ok(false));
        assert_eq!(link.transition_count(), 2);
        link.tx.done();
        link.rx.done();
        link.out.done();
    }

    #[test]
    fn test_round_trip_all_sizes() {
        let mut tx = transmitter::<4>(IdlePolicy::StretchPreamble);
        let mut rx = receiver();
        let sent = [
            DccMessage::new(&[0x03, 0x3f]).unwrap(),
            DccMessage::new(&[0xc0, 0x12, 0x3f]).unwrap(),
            DccMessage::new(&[0xc0, 0x12, 0xde, 0x05]).unwrap(),
            DccMessage::new(&[0xfe, 0x01, 0x02, 0x03, 0x04]).unwrap(),
        ];
        for msg in sent {
            tx.source_mut().enqueue(msg).unwrap();
        }

        let mut clock = 0;
        // 4 packets of at most 16 + 54 + 1 bits, two halves each
        let received = pump(&mut tx, &mut rx, &mut clock, 4 * 2 * 72);
        assert_eq!(received, sent);
        assert_eq!(rx.decoder.packets_bad, 0);
        assert_eq!(rx.select_highest_pending(), Task::Idle);
    }

    #[test]
    fn test_idle_packets_end_to_end() {
        let mut tx = transmitter::<1>(IdlePolicy::SendIdle);
        let mut rx = receiver();
        let mut clock = 40_000;
        let received = pump(&mut tx, &mut rx, &mut clock, 2 * 3 * 44);
        assert!(received.len() >= 2);
        assert!(received.iter().all(|m| *m == DccMessage::idle()));
        assert!(tx.encoder.tx_idle >= 2);
        // passthrough followed the input
        assert_eq!(rx.out.levels.len(), 1 + 2 * 3 * 44);
    }

    #[test]
    fn test_back_to_back_packets_at_minimum_preamble() {
        let config = LinkConfig {
            preamble_bits: MIN_PREAMBLE_BITS,
            idle_policy: IdlePolicy::SendIdle,
            ..Default::default()
        };
        let mut tx = DccLink::new(
            Recorder::default(),
            Level::default(),
            Recorder::default(),
            NoMessage,
            config,
        )
        .unwrap();
        let mut rx = receiver();
        let mut clock = 0;

        // each idle packet is 12 preamble bits plus 27 data bits; run ten of
        // them and the end bit of the last, stopping before an eleventh loads
        let received = pump(&mut tx, &mut rx, &mut clock, 2 * (10 * 39 + 2));
        assert_eq!(tx.encoder.tx_idle, 10);
        assert_eq!(received.len(), 10);
        assert!(received.iter().all(|m| *m == DccMessage::idle()));
        assert_eq!(rx.decoder.packets_bad, 0);
    }

    #[test]
    fn test_notify_task_and_scheduler() {
        let mut rx = receiver();
        rx.request_task(Task::Task6);
        assert_eq!(rx.select_highest_pending(), Task::Task6);

        // fake a packet arriving
        let mut tx = transmitter::<1>(IdlePolicy::StretchPreamble);
        tx.source_mut().enqueue(DccMessage::reset()).unwrap();
        let mut clock = 0;
        for _ in 0..2 * 45 {
            let cell = tx.next_half().unwrap();
            let _ = rx.on_edge(cell.level, clock).unwrap();
            clock = clock.wrapping_add(tx.timing().ticks(cell.period));
        }
        assert_eq!(rx.select_highest_pending(), Task::Task1);
        assert_eq!(rx.take_packet(), Some(DccMessage::reset()));
        assert_eq!(rx.take_packet(), None);
        assert_eq!(rx.select_highest_pending(), Task::Task6);
        rx.clear_task(Task::Task6);
        assert_eq!(rx.select_highest_pending(), Task::Idle);
    }

    #[test]
    fn test_modem_data_off_holds_output() {
        let mut rx = receiver();
        rx.use_modem_data(false, false);
        assert_eq!(rx.on_edge(true, 0), Ok(false));
        assert_eq!(rx.on_edge(false, 116), Ok(false));
        // initial level, then held low
        assert_eq!(rx.out.levels, [true, false, false]);
        rx.reset_transition_count(0);
        assert_eq!(rx.transition_count(), 0);
        assert_eq!(rx.decoder.state(), RxState::Preamble);
    }
}
