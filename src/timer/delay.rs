use crate::error::{Error, Result};
use crate::link::DccLink;
use crate::source::MessageSource;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

/// Drives `halves` half bit cells onto the link's output, timing each one
/// with `delay`.
///
/// # Arguments
/// - `link`: A mutable reference to a `DccLink` instance.
/// - `delay`: A delay provider implementing `DelayNs`, typically from the HAL.
/// - `halves`: How many half cells to send; two per bit.
pub fn run_dcc_halves<D: DelayNs, TX, RX, OUT, S>(
    link: &mut DccLink<TX, RX, OUT, S>,
    delay: &mut D,
    halves: usize,
) -> Result<()>
where
    TX: OutputPin,
    RX: InputPin,
    OUT: OutputPin,
    S: MessageSource,
{
    for _ in 0..halves {
        let cell = link.next_half()?;
        delay.delay_us(link.timing().micros(cell.period));
    }
    Ok(())
}

/// Runs a blocking loop that sends the link's DCC waveform forever.
///
/// This is a simple timing loop for use in environments where interrupts are
/// unavailable or undesired. Pin level changes land after the time spent in
/// the encoder on top of the delay, so the half periods come out slightly
/// long.
///
/// # Arguments
/// - `link`: A mutable reference to a `DccLink` instance.
/// - `delay`: A delay provider implementing `DelayNs`, typically from the HAL.
///
/// # Example
/// ```rust,ignore
/// use airdcc::timer::run_dcc_tick_loop;
/// let mut link = DccLink::new(tx, rx, out, queue, LinkConfig::default())?;
/// let err = run_dcc_tick_loop(&mut link, &mut delay);
/// ```
///
/// # Notes
/// - Only returns if the output pin fails.
/// - The receive side needs edge timestamps and is not served by this loop.
pub fn run_dcc_tick_loop<D: DelayNs, TX, RX, OUT, S>(
    link: &mut DccLink<TX, RX, OUT, S>,
    delay: &mut D,
) -> Error
where
    TX: OutputPin,
    RX: InputPin,
    OUT: OutputPin,
    S: MessageSource,
{
    loop {
        if let Err(err) = run_dcc_halves(link, delay, 2) {
            return err;
        }
    }
}
