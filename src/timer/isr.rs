use crate::config::LinkConfig;
use crate::error::Result;
use crate::link::DccLink;
use crate::message::DccMessage;
use crate::scheduler::Task;
use crate::source::MessageSource;
use core::cell::RefCell;
use critical_section::Mutex;
use embedded_hal::digital::{InputPin, OutputPin};

/// A [`DccLink`] shared between interrupt handlers and the main loop.
pub type GlobalLink<TX, RX, OUT, S> = Mutex<RefCell<Option<DccLink<TX, RX, OUT, S>>>>;

/// Used to initialize the global static `DccLink` for use with
/// `critical_section`.
///
/// # Returns
/// * An empty mutable ref-cell
///
/// # Example
/// ```rust,ignore
/// use airdcc::source::Mailbox;
/// use airdcc::timer::{GlobalLink, global_link_init};
/// use some_hal::{PB1, PD2, PD3};
///
/// static MAILBOX: Mailbox = Mailbox::new();
/// static DCC_LINK: GlobalLink<PB1, PD2, PD3, &'static Mailbox> =
///     global_link_init::<PB1, PD2, PD3, &'static Mailbox>();
/// ```
pub const fn global_link_init<TX, RX, OUT, S>() -> GlobalLink<TX, RX, OUT, S>
where
    TX: OutputPin,
    RX: InputPin,
    OUT: OutputPin,
    S: MessageSource,
{
    Mutex::new(RefCell::new(None))
}

/// Builds the link and stores it in the global.
///
/// # Arguments
/// * The global static `DccLink`
/// * The encoded output, DCC input and passthrough output pins
/// * The encoder's message source
/// * The link configuration
///
/// # Errors
/// Whatever [`DccLink::new`] returns; the global is left untouched.
///
/// # Example
/// ```rust,ignore
/// fn main() {
///     global_link_setup(&DCC_LINK, tx, rx, out, &MAILBOX, LinkConfig::default()).unwrap();
/// }
/// ```
pub fn global_link_setup<TX, RX, OUT, S>(
    global_link: &'static GlobalLink<TX, RX, OUT, S>,
    tx: TX,
    rx: RX,
    out: OUT,
    source: S,
    config: LinkConfig,
) -> Result<()>
where
    TX: OutputPin,
    RX: InputPin,
    OUT: OutputPin,
    S: MessageSource,
{
    let link = DccLink::new(tx, rx, out, source, config)?;
    critical_section::with(|cs| {
        let _ = global_link.borrow(cs).replace(Some(link));
    });
    Ok(())
}

/// Runs the encoder at each output compare interrupt
///
/// # Returns
/// * The compare value for the next interrupt, or `None` before setup
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn TIMER1_COMPA() {
///     if let Ok(Some(ticks)) = global_link_timer_tick(&DCC_LINK) {
///         timer.set_compare(ticks);
///     }
/// }
/// ```
pub fn global_link_timer_tick<TX, RX, OUT, S>(
    global_link: &'static GlobalLink<TX, RX, OUT, S>,
) -> Result<Option<u16>>
where
    TX: OutputPin,
    RX: InputPin,
    OUT: OutputPin,
    S: MessageSource,
{
    critical_section::with(|cs| {
        global_link
            .borrow(cs)
            .borrow_mut()
            .as_mut()
            .map(|link| link.on_timer())
            .transpose()
    })
}

/// Runs the decoder at each pin change interrupt
///
/// # Arguments
/// * The global static `DccLink`
/// * The free-running counter value at the interrupt
///
/// # Returns
/// * Whether a packet was exported; `false` before setup
pub fn global_link_pin_change<TX, RX, OUT, S>(
    global_link: &'static GlobalLink<TX, RX, OUT, S>,
    now: u16,
) -> Result<bool>
where
    TX: OutputPin,
    RX: InputPin,
    OUT: OutputPin,
    S: MessageSource,
{
    critical_section::with(|cs| match global_link.borrow(cs).borrow_mut().as_mut() {
        Some(link) => link.on_pin_change(now),
        None => Ok(false),
    })
}

/// Main loop side: the received packet, if a new one arrived.
pub fn global_link_take_packet<TX, RX, OUT, S>(
    global_link: &'static GlobalLink<TX, RX, OUT, S>,
) -> Option<DccMessage>
where
    TX: OutputPin,
    RX: InputPin,
    OUT: OutputPin,
    S: MessageSource,
{
    critical_section::with(|cs| {
        global_link
            .borrow(cs)
            .borrow_mut()
            .as_mut()
            .and_then(|link| link.take_packet())
    })
}

/// Main loop side: the highest priority pending task, [`Task::Idle`] before
/// setup.
pub fn global_link_select_task<TX, RX, OUT, S>(
    global_link: &'static GlobalLink<TX, RX, OUT, S>,
) -> Task
where
    TX: OutputPin,
    RX: InputPin,
    OUT: OutputPin,
    S: MessageSource,
{
    critical_section::with(|cs| {
        global_link
            .borrow(cs)
            .borrow()
            .as_ref()
            .map_or(Task::Idle, |link| link.select_highest_pending())
    })
}
