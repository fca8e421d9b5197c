//! FT6336 capacitive touch controller driver
//!
//! Polled I²C driver for the FT6336 behind the panel glass. Implements
//! [`platform::TouchSensor`]; orientation mapping happens in the runtime's
//! touch pipeline, this driver reports raw controller coordinates.
//!
//! # Wiring (STM32H743ZI reference board)
//!
//! | Signal | MCU pin | Direction |
//! |--------|---------|-----------|
//! | SCL    | PB8 (I2C1_SCL) | Host ↔ Controller |
//! | SDA    | PB9 (I2C1_SDA) | Host ↔ Controller |
//! | RST    | PD2 (GPIO)     | Host → Controller |
//! | INT    | PD3 (EXTI)     | Controller → Host |
//!
//! INT is not read here — it is the light-sleep wake line, armed by the power
//! path. While awake the controller is polled, one 5-byte register read per
//! poll. Run the bus at 100 kHz; the controller is flaky at 400 kHz on long
//! flex cables.

use embedded_hal::digital::OutputPin;
use embedded_hal_async::{delay::DelayNs, i2c::I2c};

use platform::{TouchError, TouchSample, TouchSensor};

/// FT6336 7-bit I²C address.
const I2C_ADDR: u8 = 0x38;

/// TD_STATUS register: contact count, then two 6-byte touch blocks (this
/// driver reads only through the first point's Y low byte).
const REG_TD_STATUS: u8 = 0x02;

/// Reset pulse width.
const RESET_PULSE_MS: u32 = 20;

/// Post-reset boot time before the controller answers on the bus.
const RESET_SETTLE_MS: u32 = 200;

/// FT6336 touch driver.
///
/// Generic over:
/// - `I2C` — an async [`embedded_hal_async::i2c::I2c`] bus or device.
/// - `RST` — Reset [`embedded_hal::digital::OutputPin`] (active low).
/// - `DELAY` — [`embedded_hal_async::delay::DelayNs`] for reset timing.
///
/// On the STM32H743 target supply `embassy_time::Delay` for `DELAY`; host
/// tests use `embedded_hal_mock::eh1::delay::NoopDelay`.
pub struct Ft6336<I2C, RST, DELAY> {
    i2c: I2C,
    rst: RST,
    delay: DELAY,
}

impl<I2C, RST, DELAY> Ft6336<I2C, RST, DELAY>
where
    I2C: I2c,
    RST: OutputPin,
    DELAY: DelayNs,
{
    /// Create a new driver instance. No bus traffic until
    /// [`init`](TouchSensor::init).
    pub fn new(i2c: I2C, rst: RST, delay: DELAY) -> Self {
        Self { i2c, rst, delay }
    }

    /// Pulse RST low and give the controller its boot time.
    async fn hardware_reset(&mut self) -> Result<(), TouchError> {
        self.rst.set_low().map_err(|_| TouchError::Gpio)?;
        self.delay.delay_ms(RESET_PULSE_MS).await;
        self.rst.set_high().map_err(|_| TouchError::Gpio)?;
        self.delay.delay_ms(RESET_SETTLE_MS).await;
        Ok(())
    }

    /// One 5-byte register read starting at TD_STATUS.
    async fn status_block(&mut self) -> Result<[u8; 5], TouchError> {
        let mut block = [0u8; 5];
        self.i2c
            .write_read(I2C_ADDR, &[REG_TD_STATUS], &mut block)
            .await
            .map_err(|_| TouchError::Bus)?;
        Ok(block)
    }

    /// Decode one TD_STATUS block.
    ///
    /// Byte 0 low nibble is the contact count; the chip reports at most two
    /// real contacts, so 0 or anything above 2 is treated as no contact.
    /// Coordinates are 12-bit, high nibble in the event byte, low byte whole.
    fn decode(block: [u8; 5]) -> TouchSample {
        let [status, x_hi, x_lo, y_hi, y_lo] = block;
        let count = status & 0x0F;
        if count == 0 || count > 2 {
            return TouchSample::RELEASED;
        }
        // High nibbles are masked to 4 bits; shifted by 8 they fit u16.
        #[allow(clippy::arithmetic_side_effects)]
        let x = (u16::from(x_hi & 0x0F) << 8) | u16::from(x_lo);
        #[allow(clippy::arithmetic_side_effects)]
        let y = (u16::from(y_hi & 0x0F) << 8) | u16::from(y_lo);
        TouchSample {
            pressed: true,
            x,
            y,
        }
    }
}

impl<I2C, RST, DELAY> TouchSensor for Ft6336<I2C, RST, DELAY>
where
    I2C: I2c,
    RST: OutputPin,
    DELAY: DelayNs,
{
    /// Reset pulse (low 20 ms, high, 200 ms settle) followed by a probe read.
    ///
    /// The probe confirms the controller came out of reset and answers at its
    /// address; its payload is discarded. Re-run after every light-sleep wake.
    async fn init(&mut self) -> Result<(), TouchError> {
        self.hardware_reset().await?;
        self.status_block().await?;
        #[cfg(feature = "defmt")]
        defmt::info!("FT6336 touch controller ready");
        Ok(())
    }

    /// Read and decode one status block.
    async fn read(&mut self) -> Result<TouchSample, TouchError> {
        let block = self.status_block().await?;
        Ok(Self::decode(block))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
