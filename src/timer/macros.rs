/// Declares a static global `DCC_LINK` instance protected by a `critical_section` mutex.
///
/// This macro creates a `static` singleton `DCC_LINK` suitable for use in
/// interrupt-based environments, where the timer ISR, the pin change ISR and
/// the main loop all need the shared link state.
///
/// # Arguments
/// - `$tx`: The concrete type of the encoded output pin (must implement `OutputPin`)
/// - `$rx`: The concrete type of the DCC input pin (must implement `InputPin`)
/// - `$out`: The concrete type of the passthrough output pin (must implement `OutputPin`)
/// - `$source`: The concrete message source type (must implement `MessageSource`)
///
/// # Example
/// ```rust,ignore
/// init_dcc_link!(MyTxPin, MyRxPin, MyOutPin, &'static Mailbox);
/// ```
#[macro_export]
macro_rules! init_dcc_link {
    ( $tx:ty, $rx:ty, $out:ty, $source:ty ) => {
        pub static DCC_LINK: $crate::timer::GlobalLink<$tx, $rx, $out, $source> =
            $crate::timer::global_link_init::<$tx, $rx, $out, $source>();
    };
}

/// Initializes the global `DCC_LINK` singleton with a new link.
///
/// Expands to [`global_link_setup`](crate::timer::global_link_setup) on the
/// `DCC_LINK` declared by `init_dcc_link!`, and so evaluates to a
/// `Result<()>`.
///
/// # Arguments
/// - `$tx`, `$rx`, `$out`: The pins
/// - `$source`: The message source
/// - `$config`: A `LinkConfig`; defaults to `LinkConfig::default()` when omitted
///
/// # Example
/// ```rust,ignore
/// fn main() {
///     setup_dcc_link!(tx, rx, out, &MAILBOX).unwrap();
/// }
/// ```
///
/// # Notes
/// - Must be called inside a critical section-aware context (safe in `main()`).
/// - Requires `init_dcc_link!` to have been used earlier.
#[macro_export]
macro_rules! setup_dcc_link {
    ( $tx:expr, $rx:expr, $out:expr, $source:expr ) => {
        $crate::setup_dcc_link!(
            $tx,
            $rx,
            $out,
            $source,
            $crate::config::LinkConfig::default()
        )
    };
    ( $tx:expr, $rx:expr, $out:expr, $source:expr, $config:expr ) => {
        $crate::timer::global_link_setup(&DCC_LINK, $tx, $rx, $out, $source, $config)
    };
}

/// Runs the encoder on the global `DCC_LINK` if it has been initialized.
///
/// This macro is intended to be invoked from the output compare ISR, once per
/// half bit cell. It evaluates to the `Result<Option<u16>>` of
/// [`global_link_timer_tick`](crate::timer::global_link_timer_tick): the
/// compare value to load for the next interrupt.
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn TIMER1_COMPA() {
///     if let Ok(Some(ticks)) = tick_dcc_timer!() {
///         set_compare(ticks);
///     }
/// }
/// ```
///
/// # Notes
/// - Safe to call before `setup_dcc_link!`; evaluates to `Ok(None)`.
#[macro_export]
macro_rules! tick_dcc_timer {
    () => {
        $crate::timer::global_link_timer_tick(&DCC_LINK)
    };
}

/// Runs the decoder on the global `DCC_LINK` from the pin change ISR.
///
/// # Arguments
/// - `$now`: The free-running counter value captured at the interrupt
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn INT0() {
///     let _ = dcc_pin_change!(timer1.count());
/// }
/// ```
#[macro_export]
macro_rules! dcc_pin_change {
    ( $now:expr ) => {
        $crate::timer::global_link_pin_change(&DCC_LINK, $now)
    };
}

#[cfg(test)]
mod tests {
    use crate::config::LinkConfig;
    use crate::scheduler::Task;
    use crate::source::NoMessage;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    init_dcc_link!(PinMock, PinMock, PinMock, NoMessage);

    #[test]
    fn test_macros_drive_global_link() {
        assert_eq!(tick_dcc_timer!(), Ok(None));

        let tx = PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::Low),
        ]);
        let rx = PinMock::new(&[PinTransaction::get(PinState::High)]);
        let out = PinMock::new(&[
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::High),
        ]);
        setup_dcc_link!(tx, rx, out, NoMessage, LinkConfig::default()).unwrap();

        assert_eq!(tick_dcc_timer!(), Ok(Some(116)));
        assert_eq!(dcc_pin_change!(500), Ok(false));
        assert_eq!(
            crate::timer::global_link_select_task(&DCC_LINK),
            Task::Idle
        );

        let link = critical_section::with(|cs| DCC_LINK.borrow(cs).take());
        let (mut tx, mut rx, mut out, _) = link.unwrap().release();
        tx.done();
        rx.done();
        out.done();
    }
}
