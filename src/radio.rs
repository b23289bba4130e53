//! CC1101-family transceiver command driver.
//!
//! The link only needs the radio to be configured once and then left in
//! asynchronous serial mode, where its GDO pins carry the raw DCC bitstream
//! to and from the encoder and decoder. This driver issues exactly that
//! bring-up: the command strobes, single register access, and the
//! [`start_modem`](Radio::start_modem) sequence, or [`start`](Radio::start)
//! straight from a [`LinkConfig`].
//!
//! ## Start sequence
//!
//! 1. `SIDLE` strobe
//! 2. burst write of the 47 configuration registers (RX or TX preset)
//! 3. `PATABLE` power code
//! 4. `CHANNR` channel code
//! 5. `SRX` or `STX` strobe
//!
//! Register presets are opaque tuning tables; their values come from the
//! vendor's RF design tool and are not interpreted here.

use embedded_hal::spi::SpiDevice;

use crate::config::{LinkConfig, Role};
use crate::consts::{
    READ_SINGLE, REG_CHANNR, REG_PATABLE, STROBE_IDLE, STROBE_NOP, STROBE_RX, STROBE_TX,
    WRITE_BURST,
};
use crate::error::{Error, Result};
use crate::fmt::{debug, warning};

/// Number of selectable channels.
pub const CHANNEL_COUNT: usize = 17;

/// Number of selectable transmit power levels.
pub const POWER_LEVEL_COUNT: usize = 11;

/// `CHANNR` values for channel indices 0 to 16.
pub const CHANNELS: [u8; CHANNEL_COUNT] = [
    0x4b, 0x45, 0x33, 0x27, 0x1b, 0x15, 0x0f, 0x03, 0x5e, 0x58, 0x52, 0x3e, 0x39, 0x2c, 0x21, 0x89,
    0x37,
];

/// `PATABLE` codes for power levels 0 (lowest) to 10 (highest).
pub const POWER_LEVELS: [u8; POWER_LEVEL_COUNT] = [
    0x03, 0x15, 0x1c, 0x27, 0x66, 0x8e, 0x89, 0xcd, 0xc4, 0xc1, 0xc0,
];

/// Length of a configuration burst: header byte plus 47 registers.
pub const PRESET_LEN: usize = 48;

/// Receive preset, burst header first.
pub const RX_PRESET: [u8; PRESET_LEN] = [
    WRITE_BURST, 0x2e, 0x2e, 0x0d, 0x07, 0xd3, 0x91, 0xff, 0x04, 0x32, 0x00, 0x4b, 0x06, 0x00,
    0x22, 0xb7, 0x55, 0x8a, 0x93, 0x00, 0x23, 0x3b, 0x50, 0x07, 0x30, 0x18, 0x16, 0x6c, 0x03,
    0x40, 0x91, 0x87, 0x6b, 0xf8, 0x56, 0x10, 0xe9, 0x2a, 0x00, 0x1f, 0x40, 0x00, 0x59, 0x7f,
    0x3f, 0x81, 0x35, 0x09,
];

/// Transmit preset, burst header first.
pub const TX_PRESET: [u8; PRESET_LEN] = [
    WRITE_BURST, 0x2e, 0x2e, 0x0d, 0x07, 0xd3, 0x91, 0xff, 0x04, 0x32, 0x00, 0x4b, 0x0c, 0x00,
    0x22, 0xb7, 0x55, 0x8c, 0x22, 0x93, 0x23, 0x3c, 0x47, 0x07, 0x30, 0x18, 0x16, 0x6c, 0x03,
    0x40, 0x91, 0x87, 0x6b, 0xf8, 0x56, 0x10, 0xe9, 0x2a, 0x00, 0x1f, 0x40, 0x00, 0x59, 0x7f,
    0x3f, 0x81, 0x35, 0x09,
];

/// Direction the modem is started in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModemMode {
    /// Receive; raw data out on a GDO pin.
    Rx,
    /// Transmit; raw data in on a GDO pin.
    Tx,
}

impl ModemMode {
    /// Command strobe that enters this mode.
    pub const fn strobe(self) -> u8 {
        match self {
            Self::Rx => STROBE_RX,
            Self::Tx => STROBE_TX,
        }
    }

    /// Configuration burst for this mode.
    pub const fn preset(self) -> &'static [u8; PRESET_LEN] {
        match self {
            Self::Rx => &RX_PRESET,
            Self::Tx => &TX_PRESET,
        }
    }
}

impl From<Role> for ModemMode {
    fn from(role: Role) -> Self {
        match role {
            Role::Transmitter => Self::Tx,
            Role::Receiver => Self::Rx,
        }
    }
}

/// The transceiver behind an `embedded-hal` [`SpiDevice`], which handles
/// chip select around each transaction.
#[derive(Debug)]
pub struct Radio<SPI> {
    spi: SPI,
}

impl<SPI: SpiDevice> Radio<SPI> {
    /// Wraps the SPI device. Does not touch the chip.
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Gives the SPI device back.
    pub fn release(self) -> SPI {
        self.spi
    }

    /// Sends a one-byte command strobe, returning the chip status byte.
    pub fn strobe(&mut self, command: u8) -> Result<u8> {
        let mut buf = [command];
        self.spi
            .transfer_in_place(&mut buf)
            .map_err(Error::spi)?;
        Ok(buf[0])
    }

    /// Chip status byte, via a no-op strobe.
    pub fn status(&mut self) -> Result<u8> {
        self.strobe(STROBE_NOP)
    }

    /// Reads one configuration register.
    pub fn read_register(&mut self, address: u8) -> Result<u8> {
        let mut buf = [READ_SINGLE | address, 0];
        self.spi
            .transfer_in_place(&mut buf)
            .map_err(Error::spi)?;
        Ok(buf[1])
    }

    /// Writes one configuration register.
    pub fn write_register(&mut self, address: u8, value: u8) -> Result<()> {
        self.spi.write(&[address, value]).map_err(Error::spi)
    }

    /// Loads a full configuration burst in one transaction.
    pub fn write_preset(&mut self, preset: &[u8; PRESET_LEN]) -> Result<()> {
        self.spi.write(preset).map_err(Error::spi)
    }

    /// Brings the modem up on `channel` at `power_level` in `mode`.
    ///
    /// # Errors
    /// - [`Error::InvalidChannel`] / [`Error::InvalidPowerLevel`] before any
    ///   bus traffic, for indices past the tables
    /// - [`Error::Spi`] if the bus fails part way; the chip is then left in
    ///   an unknown state and the sequence should be repeated
    pub fn start_modem(&mut self, channel: u8, mode: ModemMode, power_level: u8) -> Result<()> {
        let channel_code = *CHANNELS
            .get(channel as usize)
            .ok_or(Error::InvalidChannel(channel))?;
        let power_code = *POWER_LEVELS
            .get(power_level as usize)
            .ok_or(Error::InvalidPowerLevel(power_level))?;

        let _ = self.strobe(STROBE_IDLE)?;
        self.write_preset(mode.preset())?;
        self.write_register(REG_PATABLE, power_code)?;
        self.write_register(REG_CHANNR, channel_code)?;
        let status = self.strobe(mode.strobe())?;
        if status & 0x80 != 0 {
            // CHIP_RDYn still high: oscillator not yet stable
            warning!("radio: chip not ready after start, status {}", status);
        }
        debug!("radio: started on channel {} at power {}", channel, power_level);
        Ok(())
    }

    /// Brings the modem up with the channel, power level and direction of
    /// `config`. See [`start_modem`](Self::start_modem) for errors.
    pub fn start(&mut self, config: &LinkConfig) -> Result<()> {
        self.start_modem(config.channel, ModemMode::from(config.role), config.power_level)
    }
}
