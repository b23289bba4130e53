//! # airdcc
//!
//! A portable, no_std Rust core for a DCC radio link: NMRA DCC in on one side
//! of a sub-GHz radio, the same DCC out on the other.
//!
//! The crate provides:
//! - an interrupt-driven DCC **encoder** producing the waveform one half bit
//!   cell per timer interrupt
//! - a pin-change-driven DCC **decoder** that timestamps edges, classifies
//!   pulse widths and exports checksum-valid packets
//! - a **priority flag scheduler** the decoder uses to wake the main loop
//! - a **radio command driver** for CC1101-family transceivers over `SpiDevice`
//! - interrupt-safe sharing with `critical-section`, or a blocking delay loop
//!
//! ## Crate features
//! | Feature               | Description |
//! |-----------------------|-------------|
//! | `std`                 | Disables `#![no_std]` and forwards `std` to `thiserror`, `critical-section` and `log` |
//! | `delay-loop`          | Uses `embedded_hal::delay::DelayNs` to time the transmit side |
//! | `timer-isr` (default) | Uses `critical_section::with` to share the link with interrupt handlers |
//! | `defmt`               | Uses `defmt` logging |
//! | `log`                 | Uses `log` logging |
//!
//! ## Protocol
//!
//! - A "1" bit is two 58 µs half periods, a "0" bit two 116 µs half periods
//! - Packets are a preamble of "1"s, then for each byte a "0" followed by the
//!   byte MSB first, then a "1"
//! - The last byte is the XOR of the others; packets are 3 to 6 bytes
//!
//! ## Usage
//!
//! ```rust
//! # use embedded_hal_mock::eh1::digital::{Mock as Pin, State as PinState, Transaction as PinTransaction};
//! use airdcc::config::LinkConfig;
//! use airdcc::link::DccLink;
//! use airdcc::message::DccMessage;
//! use airdcc::source::QueueSource;
//!
//! # let tx_pin = Pin::new(&[PinTransaction::set(PinState::Low)]);
//! # let rx_pin = Pin::new(&[]);
//! # let out_pin = Pin::new(&[PinTransaction::set(PinState::High)]);
//! let mut link = DccLink::new(tx_pin, rx_pin, out_pin, QueueSource::<4>::new(), LinkConfig::default())?;
//!
//! // loco 3, forward speed
//! let msg = DccMessage::new(&[0x03, 0x7c])?;
//! link.source_mut().enqueue(msg).ok();
//!
//! // then, from the timer interrupt:
//! //     let ticks = link.on_timer()?;
//! // and from the pin change interrupt:
//! //     link.on_pin_change(counter_now)?;
//! # link.tx.done();
//! # link.rx.done();
//! # link.out.done();
//! # Ok::<(), airdcc::Error>(())
//! ```
//!
//! For interrupt handlers, declare a global link with `init_dcc_link!()`,
//! fill it with `setup_dcc_link!()` and call `tick_dcc_timer!()` and
//! `dcc_pin_change!()` from the ISRs. See [`timer`].
//!
//! ## Integration Notes
//!
//! - Both state machines work in raw timer counts; [`timing::BitTiming`]
//!   converts for a given CPU clock and prescaler
//! - The decoder only measures the high half of each bit
//! - Only one link instance should be active at a time in interrupt-driven mode
//!
//! --
//! Designed for `#![no_std]` use in resource-constrained embedded environments.

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(feature = "timer-isr")]
pub use critical_section;

pub use heapless;

mod fmt;

pub mod checksum;
pub mod config;
pub mod consts;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod link;
pub mod message;
pub mod radio;
pub mod scheduler;
pub mod source;
pub mod timer;
pub mod timing;

pub use error::{Error, Result};
