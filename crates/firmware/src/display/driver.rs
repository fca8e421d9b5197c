//! SSD1680 hardware driver
//!
//! Async protocol driver for the SSD1680-class controller behind the 2.7"
//! 176×264 monochrome e-paper module. Implements [`platform::PanelDriver`].
//!
//! # Wiring (STM32H743ZI reference board)
//!
//! | Signal | MCU pin | Direction |
//! |--------|---------|-----------|
//! | SCK    | PA5 (SPI1_SCK)  | Host → Panel |
//! | MOSI   | PA7 (SPI1_MOSI) | Host → Panel |
//! | CS     | managed by `SpiDevice` | Host → Panel |
//! | DC     | PB0 (GPIO)      | Host → Panel |
//! | RST    | PB2 (GPIO)      | Host → Panel |
//! | BUSY   | PE3 (GPIO)      | Panel → Host |
//!
//! # Protocol
//!
//! Every transaction is one command byte (DC low) optionally followed by data
//! bytes (DC high); `SpiDevice` frames each write with CS. The controller
//! [`init`](Ssd1680::init)s on its power-on defaults — reset pulse, software
//! reset, busy settle, nothing else. A full-frame update streams all
//! [`FRAME_BYTES`] into RAM, arms the update sequence and activates it.
//!
//! BUSY is active high. Waits on it are bounded at [`BUSY_TIMEOUT_MS`]; a
//! panel that holds BUSY past the bound free-runs its internal sequence
//! anyway, so public operations log the timeout and proceed.

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal_async::{delay::DelayNs, spi::SpiDevice};

use platform::{PanelDriver, PanelError, FRAME_BYTES};

// ---------------------------------------------------------------------------
// Timing constants
// ---------------------------------------------------------------------------

/// BUSY poll interval in milliseconds.
pub const BUSY_POLL_MS: u32 = 1;

/// Upper bound on one BUSY wait. A full refresh on this panel takes well
/// under 2 s; 5 s covers cold-temperature worst cases.
pub const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Reset pulse width per edge.
const RESET_PULSE_MS: u32 = 20;

// ---------------------------------------------------------------------------
// Command enum
// ---------------------------------------------------------------------------

/// SSD1680 command codes used by this driver.
///
/// The controller accepts a much larger vocabulary; everything beyond this
/// set is left at its power-on default.
#[repr(u8)]
#[derive(Debug, Clone, Copy)]
pub enum Command {
    /// Deep sleep — 1 data byte (0x01 = retain RAM).
    DeepSleep = 0x10,
    /// Software reset — 0 data bytes; poll BUSY afterwards.
    SoftReset = 0x12,
    /// Master activation — 0 data bytes; runs the armed update sequence.
    MasterActivation = 0x20,
    /// Display update control 2 — 1 data byte (sequence flags).
    DisplayUpdateControl2 = 0x22,
    /// Write RAM (B/W) — pixel data, 1bpp MSB-first, 1 = white.
    WriteRam = 0x24,
}

/// Display-update sequence byte: clock, analog, temperature, LUT, display.
pub const UPDATE_FULL: u8 = 0xF7;

/// Deep-sleep parameter: mode 1, RAM retained.
pub const SLEEP_RETAIN_RAM: u8 = 0x01;

// ---------------------------------------------------------------------------
// Driver struct
// ---------------------------------------------------------------------------

/// SSD1680 panel driver.
///
/// Generic over:
/// - `SPI` — an async [`embedded_hal_async::spi::SpiDevice`] (manages CS).
/// - `DC`  — Data/Command [`embedded_hal::digital::OutputPin`].
/// - `RST` — Reset [`embedded_hal::digital::OutputPin`] (active low).
/// - `BUSY` — Busy [`embedded_hal::digital::InputPin`] (high while busy).
/// - `DELAY` — [`embedded_hal_async::delay::DelayNs`] for timing.
///
/// On the STM32H743 target supply `embassy_time::Delay` for `DELAY`; host
/// tests use `embedded_hal_mock::eh1::delay::NoopDelay`.
///
/// The driver carries no frame state — callers stream a packed frame through
/// [`display_full`](PanelDriver::display_full); the panel's RAM is the only
/// image store.
pub struct Ssd1680<SPI, DC, RST, BUSY, DELAY> {
    spi: SPI,
    dc: DC,
    rst: RST,
    busy: BUSY,
    delay: DELAY,
}

impl<SPI, DC, RST, BUSY, DELAY> Ssd1680<SPI, DC, RST, BUSY, DELAY>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    DELAY: DelayNs,
{
    /// Create a new driver instance. No bus traffic until
    /// [`init`](PanelDriver::init).
    pub fn new(spi: SPI, dc: DC, rst: RST, busy: BUSY, delay: DELAY) -> Self {
        Self {
            spi,
            dc,
            rst,
            busy,
            delay,
        }
    }

    // -----------------------------------------------------------------------
    // Low-level SPI helpers
    // -----------------------------------------------------------------------

    /// Assert DC low (command mode) and send one command byte.
    async fn send_command(&mut self, cmd: Command) -> Result<(), PanelError> {
        self.dc.set_low().map_err(|_| PanelError::Gpio)?;
        self.spi
            .write(&[cmd as u8])
            .await
            .map_err(|_| PanelError::Communication)
    }

    /// Assert DC high (data mode) and send bytes.
    async fn send_data(&mut self, data: &[u8]) -> Result<(), PanelError> {
        if data.is_empty() {
            return Ok(());
        }
        self.dc.set_high().map_err(|_| PanelError::Gpio)?;
        self.spi
            .write(data)
            .await
            .map_err(|_| PanelError::Communication)
    }

    /// Send one command followed immediately by its data bytes.
    async fn cmd_data(&mut self, cmd: Command, data: &[u8]) -> Result<(), PanelError> {
        self.send_command(cmd).await?;
        self.send_data(data).await
    }

    // -----------------------------------------------------------------------
    // BUSY polling
    // -----------------------------------------------------------------------

    /// Poll BUSY every [`BUSY_POLL_MS`] until it goes low.
    ///
    /// Returns [`PanelError::Timeout`] once [`BUSY_TIMEOUT_MS`] worth of
    /// polls are exhausted.
    async fn wait_busy(&mut self) -> Result<(), PanelError> {
        // BUSY_TIMEOUT_MS is a whole multiple of BUSY_POLL_MS.
        for _ in 0..(BUSY_TIMEOUT_MS / BUSY_POLL_MS) {
            let is_busy = self.busy.is_high().map_err(|_| PanelError::Gpio)?;
            if !is_busy {
                return Ok(());
            }
            self.delay.delay_ms(BUSY_POLL_MS).await;
        }
        Err(PanelError::Timeout)
    }

    /// [`wait_busy`](Self::wait_busy) with the timeout absorbed.
    ///
    /// The controller sequences its update from an internal clock whether or
    /// not the host keeps waiting, so a held BUSY line is logged and
    /// tolerated. Pin read failures still propagate.
    async fn settle(&mut self) -> Result<(), PanelError> {
        match self.wait_busy().await {
            Err(PanelError::Timeout) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("panel BUSY held past {} ms, proceeding", BUSY_TIMEOUT_MS);
                Ok(())
            }
            other => other,
        }
    }

    // -----------------------------------------------------------------------
    // Reset / update sequencing
    // -----------------------------------------------------------------------

    /// Hardware reset pulse: RST low 20 ms, high 20 ms.
    async fn hardware_reset(&mut self) -> Result<(), PanelError> {
        self.rst.set_low().map_err(|_| PanelError::Gpio)?;
        self.delay.delay_ms(RESET_PULSE_MS).await;
        self.rst.set_high().map_err(|_| PanelError::Gpio)?;
        self.delay.delay_ms(RESET_PULSE_MS).await;
        Ok(())
    }

    /// Arm the full-update sequence, activate it and wait for completion.
    async fn activate_update(&mut self) -> Result<(), PanelError> {
        self.cmd_data(Command::DisplayUpdateControl2, &[UPDATE_FULL])
            .await?;
        self.send_command(Command::MasterActivation).await?;
        self.settle().await
    }
}

// ---------------------------------------------------------------------------
// platform::PanelDriver implementation
// ---------------------------------------------------------------------------

impl<SPI, DC, RST, BUSY, DELAY> PanelDriver for Ssd1680<SPI, DC, RST, BUSY, DELAY>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    DELAY: DelayNs,
{
    /// Reset pulse → busy settle → software reset → busy settle.
    ///
    /// The controller then runs on its power-on register defaults. This is
    /// also the wake path: deep sleep is only left through a reset pulse.
    async fn init(&mut self) -> Result<(), PanelError> {
        self.hardware_reset().await?;
        self.settle().await?;
        self.send_command(Command::SoftReset).await?;
        self.settle().await
    }

    /// Stream a packed frame into RAM and run a full refresh.
    async fn display_full(&mut self, frame: &[u8]) -> Result<(), PanelError> {
        if frame.len() != FRAME_BYTES {
            return Err(PanelError::InvalidBuffer);
        }
        self.send_command(Command::WriteRam).await?;
        self.send_data(frame).await?;
        self.activate_update().await
    }

    /// Fill RAM with `fill` (0xFF = white) and run a full refresh.
    async fn clear(&mut self, fill: u8) -> Result<(), PanelError> {
        self.send_command(Command::WriteRam).await?;

        // Stream the fill pattern in bounded chunks; the controller only
        // counts bytes, so chunk boundaries are invisible to it.
        const CHUNK: usize = 256;
        let pattern = [fill; CHUNK];
        let mut remaining = FRAME_BYTES;
        while remaining > 0 {
            let take = remaining.min(CHUNK);
            if let Some(chunk) = pattern.get(..take) {
                self.send_data(chunk).await?;
            }
            remaining = remaining.saturating_sub(take);
        }

        self.activate_update().await
    }

    /// Enter deep sleep with RAM retained (~1 µA).
    async fn sleep(&mut self) -> Result<(), PanelError> {
        self.cmd_data(Command::DeepSleep, &[SLEEP_RETAIN_RAM]).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::arithmetic_side_effects,
    clippy::large_stack_arrays
)]
mod tests {
    use super::*;

    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Build the three SPI expectations that correspond to one
    /// `spi.write(&data)` call via the `SpiDevice` trait:
    /// TransactionStart + Write(data) + TransactionEnd.
    fn spi_device_write(data: &[u8]) -> [SpiTransaction<u8>; 3] {
        [
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(data.to_vec()),
            SpiTransaction::transaction_end(),
        ]
    }

    /// A BUSY pin that reads HIGH `busy_count` times then LOW once.
    fn busy_pin_sequence(busy_count: usize) -> PinMock {
        let mut txns = vec![];
        for _ in 0..busy_count {
            txns.push(PinTransaction::get(PinState::High));
        }
        txns.push(PinTransaction::get(PinState::Low));
        PinMock::new(&txns)
    }

    /// A pin mock with no expectations, for pins an operation never touches.
    fn idle_pin() -> PinMock {
        PinMock::new(&[])
    }

    /// `wait_busy` polls once per `settle`: HIGH then LOW.
    fn one_settle() -> [PinTransaction; 2] {
        [
            PinTransaction::get(PinState::High),
            PinTransaction::get(PinState::Low),
        ]
    }

    // -----------------------------------------------------------------------
    // Test: init sequence (byte-level SPI verification)
    // -----------------------------------------------------------------------

    /// `init()` must emit exactly: reset pulse (RST low → high), busy
    /// settle, SoftReset (0x12), busy settle — and nothing else.
    #[tokio::test]
    async fn init_emits_reset_then_soft_reset_only() {
        let spi_expectations: Vec<SpiTransaction<u8>> =
            spi_device_write(&[Command::SoftReset as u8]).to_vec();

        // One DC-low for the lone command byte.
        let dc_expectations = [PinTransaction::set(PinState::Low)];

        // RST: low then high (the 20 ms pulse).
        let rst_expectations = [
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ];

        // Two settles: after the reset pulse and after SoftReset.
        let busy_expectations: Vec<PinTransaction> =
            one_settle().into_iter().chain(one_settle()).collect();

        let mut spi = SpiMock::new(&spi_expectations);
        let mut dc = PinMock::new(&dc_expectations);
        let mut rst = PinMock::new(&rst_expectations);
        let mut busy = PinMock::new(&busy_expectations);

        let mut drv = Ssd1680::new(spi.clone(), dc.clone(), rst.clone(), busy.clone(), NoopDelay);
        drv.init().await.expect("init() must succeed");

        spi.done();
        dc.done();
        rst.done();
        busy.done();
    }

    // -----------------------------------------------------------------------
    // Test: display_full byte sequence
    // -----------------------------------------------------------------------

    /// `display_full` must emit 0x24, all 5808 frame bytes, 0x22 + 0xF7,
    /// 0x20, then wait for BUSY.
    #[tokio::test]
    async fn display_full_streams_frame_then_activates() {
        let frame = [0xA5u8; FRAME_BYTES];

        let spi_expectations: Vec<SpiTransaction<u8>> = [
            &spi_device_write(&[Command::WriteRam as u8]) as &[_],
            &spi_device_write(&frame),
            &spi_device_write(&[Command::DisplayUpdateControl2 as u8]),
            &spi_device_write(&[UPDATE_FULL]),
            &spi_device_write(&[Command::MasterActivation as u8]),
        ]
        .iter()
        .flat_map(|slice| slice.iter().cloned())
        .collect();

        // DC: cmd, data, cmd, data, cmd.
        let dc_expectations = [
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
        ];

        let mut spi = SpiMock::new(&spi_expectations);
        let mut dc = PinMock::new(&dc_expectations);
        let mut rst = idle_pin();
        let mut busy = busy_pin_sequence(1);

        let mut drv = Ssd1680::new(spi.clone(), dc.clone(), rst.clone(), busy.clone(), NoopDelay);
        drv.display_full(&frame).await.expect("display_full");

        spi.done();
        dc.done();
        rst.done();
        busy.done();
    }

    /// A frame slice of any other length is rejected before bus traffic.
    #[tokio::test]
    async fn display_full_rejects_wrong_length() {
        let mut spi = SpiMock::new(&[]);
        let mut dc = idle_pin();
        let mut rst = idle_pin();
        let mut busy = idle_pin();

        let mut drv = Ssd1680::new(spi.clone(), dc.clone(), rst.clone(), busy.clone(), NoopDelay);

        let short = [0u8; 100];
        assert_eq!(
            drv.display_full(&short).await,
            Err(PanelError::InvalidBuffer)
        );
        let long = [0u8; FRAME_BYTES + 1];
        assert_eq!(
            drv.display_full(&long).await,
            Err(PanelError::InvalidBuffer)
        );

        spi.done();
        dc.done();
        rst.done();
        busy.done();
    }

    // -----------------------------------------------------------------------
    // Test: clear streams the fill byte for the whole frame
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn clear_streams_full_frame_of_fill_bytes() {
        let fill = 0xFFu8;

        let mut spi_expectations: Vec<SpiTransaction<u8>> =
            spi_device_write(&[Command::WriteRam as u8]).to_vec();
        // 22 chunks of 256 + one tail of 176 = 5808 bytes.
        let mut remaining = FRAME_BYTES;
        let mut data_writes = 0;
        while remaining > 0 {
            let take = remaining.min(256);
            spi_expectations.extend(spi_device_write(&vec![fill; take]));
            remaining -= take;
            data_writes += 1;
        }
        spi_expectations.extend(spi_device_write(&[Command::DisplayUpdateControl2 as u8]));
        spi_expectations.extend(spi_device_write(&[UPDATE_FULL]));
        spi_expectations.extend(spi_device_write(&[Command::MasterActivation as u8]));

        let dc_expectations: Vec<PinTransaction> = {
            let mut v = vec![PinTransaction::set(PinState::Low)]; // WriteRam
            for _ in 0..data_writes {
                v.push(PinTransaction::set(PinState::High));
            }
            v.push(PinTransaction::set(PinState::Low)); // DisplayUpdateControl2
            v.push(PinTransaction::set(PinState::High)); // 0xF7
            v.push(PinTransaction::set(PinState::Low)); // MasterActivation
            v
        };

        let mut spi = SpiMock::new(&spi_expectations);
        let mut dc = PinMock::new(&dc_expectations);
        let mut rst = idle_pin();
        let mut busy = busy_pin_sequence(2);

        let mut drv = Ssd1680::new(spi.clone(), dc.clone(), rst.clone(), busy.clone(), NoopDelay);
        drv.clear(fill).await.expect("clear");

        assert_eq!(data_writes, 23, "5808 bytes = 22 full chunks + 176 tail");

        spi.done();
        dc.done();
        rst.done();
        busy.done();
    }

    // -----------------------------------------------------------------------
    // Test: deep sleep command
    // -----------------------------------------------------------------------

    /// `sleep()` must emit exactly DeepSleep (0x10) + 0x01 (retain RAM) and
    /// never touch the BUSY line.
    #[tokio::test]
    async fn sleep_emits_deep_sleep_with_ram_retained() {
        let spi_expectations: Vec<SpiTransaction<u8>> = [
            &spi_device_write(&[Command::DeepSleep as u8]) as &[_],
            &spi_device_write(&[SLEEP_RETAIN_RAM]),
        ]
        .iter()
        .flat_map(|slice| slice.iter().cloned())
        .collect();

        let dc_expectations = [
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ];

        let mut spi = SpiMock::new(&spi_expectations);
        let mut dc = PinMock::new(&dc_expectations);
        let mut rst = idle_pin();
        let mut busy = idle_pin();

        let mut drv = Ssd1680::new(spi.clone(), dc.clone(), rst.clone(), busy.clone(), NoopDelay);
        drv.sleep().await.expect("sleep");

        spi.done();
        dc.done();
        rst.done();
        busy.done();
    }

    // -----------------------------------------------------------------------
    // Test: BUSY timeout is bounded and tolerated
    // -----------------------------------------------------------------------

    /// `wait_busy` must give up with `Timeout` after exactly
    /// `BUSY_TIMEOUT_MS / BUSY_POLL_MS` polls, never panicking on an
    /// exhausted expectation list.
    #[tokio::test]
    async fn wait_busy_times_out_after_budget() {
        let polls = (BUSY_TIMEOUT_MS / BUSY_POLL_MS) as usize;
        let busy_txns: Vec<PinTransaction> = (0..polls)
            .map(|_| PinTransaction::get(PinState::High))
            .collect();

        let mut spi = SpiMock::new(&[]);
        let mut dc = idle_pin();
        let mut rst = idle_pin();
        let mut busy = PinMock::new(&busy_txns);

        let mut drv = Ssd1680::new(spi.clone(), dc.clone(), rst.clone(), busy.clone(), NoopDelay);
        assert_eq!(drv.wait_busy().await, Err(PanelError::Timeout));

        spi.done();
        dc.done();
        rst.done();
        busy.done();
    }

    /// A held BUSY line must not fail a refresh: `display_full` completes
    /// with `Ok` even when the controller never deasserts BUSY.
    #[tokio::test]
    async fn held_busy_line_does_not_fail_the_refresh() {
        let frame = [0x00u8; FRAME_BYTES];

        let spi_expectations: Vec<SpiTransaction<u8>> = [
            &spi_device_write(&[Command::WriteRam as u8]) as &[_],
            &spi_device_write(&frame),
            &spi_device_write(&[Command::DisplayUpdateControl2 as u8]),
            &spi_device_write(&[UPDATE_FULL]),
            &spi_device_write(&[Command::MasterActivation as u8]),
        ]
        .iter()
        .flat_map(|slice| slice.iter().cloned())
        .collect();

        let dc_expectations = [
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
        ];

        // BUSY never goes low: the full poll budget is consumed.
        let polls = (BUSY_TIMEOUT_MS / BUSY_POLL_MS) as usize;
        let busy_txns: Vec<PinTransaction> = (0..polls)
            .map(|_| PinTransaction::get(PinState::High))
            .collect();

        let mut spi = SpiMock::new(&spi_expectations);
        let mut dc = PinMock::new(&dc_expectations);
        let mut rst = idle_pin();
        let mut busy = PinMock::new(&busy_txns);

        let mut drv = Ssd1680::new(spi.clone(), dc.clone(), rst.clone(), busy.clone(), NoopDelay);
        assert_eq!(drv.display_full(&frame).await, Ok(()));

        spi.done();
        dc.done();
        rst.done();
        busy.done();
    }

    // -----------------------------------------------------------------------
    // Test: pin errors propagate
    // -----------------------------------------------------------------------

    /// A BUSY read failure must surface as `PanelError::Gpio` immediately,
    /// not be mistaken for a timeout.
    #[tokio::test]
    async fn busy_read_error_propagates_as_gpio() {
        use embedded_hal_mock::eh1::MockError;
        use std::io::ErrorKind;

        let busy_txns = [PinTransaction::get(PinState::High)
            .with_error(MockError::Io(ErrorKind::NotConnected))];

        let mut spi = SpiMock::new(&[]);
        let mut dc = idle_pin();
        let mut rst = idle_pin();
        let mut busy = PinMock::new(&busy_txns);

        let mut drv = Ssd1680::new(spi.clone(), dc.clone(), rst.clone(), busy.clone(), NoopDelay);
        assert_eq!(drv.wait_busy().await, Err(PanelError::Gpio));

        spi.done();
        dc.done();
        rst.done();
        busy.done();
    }

    // -----------------------------------------------------------------------
    // Test: command byte values
    // -----------------------------------------------------------------------

    #[test]
    fn command_codes_match_the_datasheet() {
        assert_eq!(Command::DeepSleep as u8, 0x10);
        assert_eq!(Command::SoftReset as u8, 0x12);
        assert_eq!(Command::MasterActivation as u8, 0x20);
        assert_eq!(Command::DisplayUpdateControl2 as u8, 0x22);
        assert_eq!(Command::WriteRam as u8, 0x24);
        assert_eq!(UPDATE_FULL, 0xF7);
    }
}
