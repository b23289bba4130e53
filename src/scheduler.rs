//! Priority background scheduler.
//!
//! Interrupt handlers hand work to the main loop by setting a flag; the main
//! loop asks for the highest-priority pending flag, does the work, then clears
//! it. There is no queue behind a flag: requesting a task that is already
//! pending is absorbed.
//!
//! ```text
//! x x x x  x x x x
//! | | | |  | | | +--- Idle   (lowest priority)
//! | | | |  | | +----- Task6
//! | | | |  | +------- Task5
//! | | | |  +--------- Task4
//! | | | +------------ Task3
//! | | +-------------- Task2
//! | +---------------- Task1
//! +------------------ Task0  (highest priority)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use airdcc::scheduler::{Scheduler, Task};
//!
//! let mut scheduler = Scheduler::new();
//! scheduler.request(Task::Task6);
//! scheduler.request(Task::Task1);
//! assert_eq!(scheduler.select_highest_pending(), Task::Task1);
//! scheduler.clear(Task::Task1);
//! assert_eq!(scheduler.select_highest_pending(), Task::Task6);
//! ```

#[cfg(feature = "timer-isr")]
use core::cell::Cell;
#[cfg(feature = "timer-isr")]
use critical_section::Mutex;

/// A schedulable task slot. Discriminants are the slot's bit in the flag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Task {
    /// Highest priority.
    Task0 = 0x80,
    /// Slot used by the decoder to announce a received packet by default.
    Task1 = 0x40,
    #[allow(missing_docs)]
    Task2 = 0x20,
    #[allow(missing_docs)]
    Task3 = 0x10,
    #[allow(missing_docs)]
    Task4 = 0x08,
    #[allow(missing_docs)]
    Task5 = 0x04,
    #[allow(missing_docs)]
    Task6 = 0x02,
    /// Lowest priority; also what the selector returns when nothing is pending.
    Idle = 0x01,
}

impl Task {
    /// Every slot, highest priority first.
    pub const BY_PRIORITY: [Task; 8] = [
        Task::Task0,
        Task::Task1,
        Task::Task2,
        Task::Task3,
        Task::Task4,
        Task::Task5,
        Task::Task6,
        Task::Idle,
    ];

    /// The slot's bit in the flag byte.
    pub const fn mask(self) -> u8 {
        self as u8
    }

    /// The slot whose bit is `mask`, if `mask` has exactly one bit set.
    pub fn from_mask(mask: u8) -> Option<Self> {
        Self::BY_PRIORITY.into_iter().find(|t| t.mask() == mask)
    }
}

/// Highest-priority task set in `flags`, or [`Task::Idle`].
const fn highest(flags: u8) -> Task {
    match flags.leading_zeros() {
        0 => Task::Task0,
        1 => Task::Task1,
        2 => Task::Task2,
        3 => Task::Task3,
        4 => Task::Task4,
        5 => Task::Task5,
        6 => Task::Task6,
        _ => Task::Idle,
    }
}

/// The task flag byte.
///
/// Owned variant, for use inside a context that is already shared safely
/// (such as [`DccLink`](crate::link::DccLink) behind a critical section).
/// For a flag byte living in a `static`, see [`SharedScheduler`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Scheduler {
    flags: u8,
}

impl Scheduler {
    /// No task pending.
    pub const fn new() -> Self {
        Self { flags: 0 }
    }

    /// Marks `task` pending. Idempotent.
    pub fn request(&mut self, task: Task) {
        self.flags |= task.mask();
    }

    /// Marks `task` handled.
    pub fn clear(&mut self, task: Task) {
        self.flags &= !task.mask();
    }

    /// Whether `task` is pending.
    pub const fn is_pending(&self, task: Task) -> bool {
        self.flags & task.mask() != 0
    }

    /// The highest-priority pending task, or [`Task::Idle`] when nothing is.
    /// Does not clear anything.
    pub const fn select_highest_pending(&self) -> Task {
        highest(self.flags)
    }

    /// Raw flag byte.
    pub const fn bits(&self) -> u8 {
        self.flags
    }
}

/// A flag byte that can be shared between interrupt handlers and the main
/// loop from a `static`.
///
/// # Example
/// ```rust
/// use airdcc::scheduler::{SharedScheduler, Task};
///
/// static SCHEDULE: SharedScheduler = SharedScheduler::new();
///
/// // in an interrupt handler
/// SCHEDULE.request(Task::Task2);
///
/// // in the main loop
/// match SCHEDULE.select_highest_pending() {
///     Task::Task2 => SCHEDULE.clear(Task::Task2),
///     _ => {}
/// }
/// ```
#[cfg(feature = "timer-isr")]
#[derive(Debug)]
pub struct SharedScheduler {
    flags: Mutex<Cell<u8>>,
}

#[cfg(feature = "timer-isr")]
impl SharedScheduler {
    /// No task pending.
    pub const fn new() -> Self {
        Self {
            flags: Mutex::new(Cell::new(0)),
        }
    }

    /// Marks `task` pending. Idempotent, callable from interrupt context.
    pub fn request(&self, task: Task) {
        critical_section::with(|cs| {
            let flags = self.flags.borrow(cs);
            flags.set(flags.get() | task.mask());
        });
    }

    /// Marks `task` handled.
    pub fn clear(&self, task: Task) {
        critical_section::with(|cs| {
            let flags = self.flags.borrow(cs);
            flags.set(flags.get() & !task.mask());
        });
    }

    /// Whether `task` is pending.
    pub fn is_pending(&self, task: Task) -> bool {
        self.bits() & task.mask() != 0
    }

    /// The highest-priority pending task, or [`Task::Idle`].
    pub fn select_highest_pending(&self) -> Task {
        highest(self.bits())
    }

    /// Snapshot of the raw flag byte.
    pub fn bits(&self) -> u8 {
        critical_section::with(|cs| self.flags.borrow(cs).get())
    }
}

#[cfg(feature = "timer-isr")]
impl Default for SharedScheduler {
    fn default() -> Self {
        Self::new()
    }
}
