//! Message sources for the transmit encoder.
//!
//! Each time the encoder finishes its preamble it asks its [`MessageSource`]
//! whether a new message is ready. The query runs inside the timer interrupt,
//! so implementations must return immediately.
//!
//! Three sources are provided:
//! - [`NoMessage`]: never has anything; the encoder falls back on its
//!   [`IdlePolicy`](crate::encoder::IdlePolicy).
//! - [`QueueSource`]: a bounded FIFO owned by the link, filled by the main
//!   loop through the link's critical section.
//! - [`Mailbox`]: a single slot in a `static`, for a producer that does not
//!   own the link (feature `timer-isr`).

#[cfg(feature = "timer-isr")]
use core::cell::Cell;

#[cfg(feature = "timer-isr")]
use critical_section::Mutex;
use heapless::Deque;

use crate::error::Error;
use crate::message::DccMessage;

/// The encoder's "is a new message ready" query.
pub trait MessageSource {
    /// Returns `true` after writing the next message to send into `ready`.
    /// Returns `false`, leaving `ready` untouched, when nothing is pending.
    ///
    /// Called from interrupt context; must not block.
    fn next_message(&mut self, ready: &mut DccMessage) -> bool;
}

impl<S: MessageSource + ?Sized> MessageSource for &mut S {
    fn next_message(&mut self, ready: &mut DccMessage) -> bool {
        (**self).next_message(ready)
    }
}

/// A source that never has a message.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NoMessage;

impl MessageSource for NoMessage {
    fn next_message(&mut self, _ready: &mut DccMessage) -> bool {
        false
    }
}

/// A bounded FIFO of messages waiting to be sent.
#[derive(Debug, Default)]
pub struct QueueSource<const N: usize> {
    queue: Deque<DccMessage, N>,
}

impl<const N: usize> QueueSource<N> {
    /// An empty queue.
    pub const fn new() -> Self {
        Self {
            queue: Deque::new(),
        }
    }

    /// Appends `message` to the back of the queue.
    ///
    /// # Errors
    /// `nb::Error::WouldBlock` while the queue is full; retry once the
    /// encoder has drained a message.
    pub fn enqueue(&mut self, message: DccMessage) -> nb::Result<(), Error> {
        self.queue
            .push_back(message)
            .map_err(|_| nb::Error::WouldBlock)
    }

    /// Messages waiting.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drops every waiting message.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl<const N: usize> MessageSource for QueueSource<N> {
    fn next_message(&mut self, ready: &mut DccMessage) -> bool {
        match self.queue.pop_front() {
            Some(message) => {
                *ready = message;
                true
            }
            None => false,
        }
    }
}

/// A single message slot that a producer outside the link can post into.
///
/// Posting replaces a message the encoder has not picked up yet; the
/// encoder takes the slot empty.
///
/// # Example
/// ```rust
/// use airdcc::message::DccMessage;
/// use airdcc::source::{Mailbox, MessageSource};
///
/// static OUTBOX: Mailbox = Mailbox::new();
///
/// OUTBOX.post(DccMessage::reset());
///
/// let mut ready = DccMessage::idle();
/// assert!((&OUTBOX).next_message(&mut ready));
/// assert_eq!(ready, DccMessage::reset());
/// ```
#[cfg(feature = "timer-isr")]
#[derive(Debug)]
pub struct Mailbox {
    slot: Mutex<Cell<Option<DccMessage>>>,
}

#[cfg(feature = "timer-isr")]
impl Mailbox {
    /// An empty mailbox.
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(Cell::new(None)),
        }
    }

    /// Posts `message`, replacing any message not yet taken. Returns `true`
    /// when a pending message was overwritten.
    pub fn post(&self, message: DccMessage) -> bool {
        critical_section::with(|cs| self.slot.borrow(cs).replace(Some(message)).is_some())
    }

    /// Whether a message is waiting.
    pub fn is_pending(&self) -> bool {
        critical_section::with(|cs| self.slot.borrow(cs).get().is_some())
    }

    /// Takes the waiting message, if any.
    pub fn take(&self) -> Option<DccMessage> {
        critical_section::with(|cs| self.slot.borrow(cs).take())
    }
}

#[cfg(feature = "timer-isr")]
impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "timer-isr")]
impl MessageSource for &Mailbox {
    fn next_message(&mut self, ready: &mut DccMessage) -> bool {
        match self.take() {
            Some(message) => {
                *ready = message;
                true
            }
            None => false,
        }
    }
}
