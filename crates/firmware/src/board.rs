//! Board wiring for the STM32H743ZI reference hardware.
//!
//! # Pin assignments
//!
//! These constants document the target PCB assignment; change them to match
//! your board before flashing.
//!
//! | Signal        | MCU pin | Notes                            |
//! |---------------|---------|----------------------------------|
//! | Panel SCK     | PA5     | SPI1_SCK, 4 MHz                  |
//! | Panel MOSI    | PA7     | SPI1_MOSI                        |
//! | Panel MISO    | PA6     | SPI1_MISO (unused, HAL requires) |
//! | Panel CS      | PB1     | Active low, driven by SpiDevice  |
//! | Panel DC      | PB0     | Low = command, high = data       |
//! | Panel RST     | PB2     | Active low                       |
//! | Panel BUSY    | PE3     | Input, busy = high               |
//! | Touch SCL     | PB8     | I2C1_SCL, 100 kHz                |
//! | Touch SDA     | PB9     | I2C1_SDA                         |
//! | Touch RST     | PD2     | Active low                       |
//! | Touch INT     | PD3     | EXTI3, active low — wake line    |
//!
//! SPI1 streams frames through DMA1_CH0/CH1; I2C1 moves touch reads through
//! DMA1_CH2/CH3. Both land in AXI SRAM, which boot marks non-cacheable.
//!
//! # Architecture
//!
//! Two executors. An `InterruptExecutor` on a donated vector runs the render
//! loop, the touch poller and the panel transmit task at high priority; the
//! thread-mode executor runs the background worker (`main` ends inside
//! `worker_loop` and never returns). The runtime's shared statics live in
//! this module so the tasks and `main` reach the same instances.

use embassy_stm32::bind_interrupts;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{AnyPin, Input, Output};
use embassy_stm32::i2c::{self, I2c};
use embassy_stm32::peripherals::{DMA1_CH0, DMA1_CH1, DMA1_CH2, DMA1_CH3, I2C1, SPI1};
use embassy_stm32::spi::Spi;
use embassy_time::Delay;
use embedded_hal_bus::spi::ExclusiveDevice;

use platform::{ResetControl, SleepError, Sleeper, WakeReason, WakeSource};
use runtime::bus;
use runtime::{
    poller_loop, render_loop, transmit_loop, ActivityClock, AppHost, CurrentTouch, FrameHandoff,
    PanelFrame, PanelPort, PollerGate,
};

use crate::display::Ssd1680;
use crate::touch::Ft6336;

bind_interrupts!(
    /// I2C1 event + error vectors, consumed by the touch bus constructor.
    pub struct Irqs {
        I2C1_EV => i2c::EventInterruptHandler<I2C1>;
        I2C1_ER => i2c::ErrorInterruptHandler<I2C1>;
    }
);

// ---------------------------------------------------------------------------
// Concrete driver types
// ---------------------------------------------------------------------------

/// SPI1 bus plus the CS pin, framed per transaction by `ExclusiveDevice`.
pub type PanelSpi =
    ExclusiveDevice<Spi<'static, SPI1, DMA1_CH0, DMA1_CH1>, Output<'static, AnyPin>, Delay>;

/// The panel driver as wired on this board.
pub type BoardPanel = Ssd1680<
    PanelSpi,
    Output<'static, AnyPin>,
    Output<'static, AnyPin>,
    Input<'static, AnyPin>,
    Delay,
>;

/// The touch driver as wired on this board.
pub type BoardTouch =
    Ft6336<I2c<'static, I2C1, DMA1_CH2, DMA1_CH3>, Output<'static, AnyPin>, Delay>;

// ---------------------------------------------------------------------------
// Shared runtime state
// ---------------------------------------------------------------------------

/// Shadow-frame slot between the render loop and the transmit task.
pub static FRAME_HANDOFF: FrameHandoff = FrameHandoff::new();

/// Sleep/wake mailbox between the power controller and the transmit task.
pub static PANEL_PORT: PanelPort = PanelPort::new();

/// Latest touch sample; written by the poller, read by the render loop.
pub static CURRENT_TOUCH: CurrentTouch = CurrentTouch::new();

/// Park/resume gate for the touch poller across the sleep cycle.
pub static POLLER_GATE: PollerGate = PollerGate::new();

/// Process-wide idle clock feeding the power controller.
pub static ACTIVITY: ActivityClock = ActivityClock::new();

// ---------------------------------------------------------------------------
// Power trait impls
// ---------------------------------------------------------------------------

/// [`Sleeper`] backed by the touch INT line (PD3, EXTI3).
///
/// Light sleep on this board is the executor's WFI idle with the runtime
/// quiesced around it: the caller has already parked the poller and put the
/// panel into deep sleep, so nothing but the time driver ticks until the
/// touch controller pulls INT low. Entering Stop mode instead would stop
/// TIM2 and needs the time driver's cooperation; this firmware stays with
/// WFI.
pub struct ExtiSleeper {
    wake: ExtiInput<'static, AnyPin>,
}

impl ExtiSleeper {
    /// Wrap the armed wake line.
    pub fn new(wake: ExtiInput<'static, AnyPin>) -> Self {
        Self { wake }
    }
}

impl Sleeper for ExtiSleeper {
    async fn light_sleep(&mut self, wake: WakeSource) -> Result<WakeReason, SleepError> {
        // Single wake source on this board; the match keeps additions honest.
        match wake {
            WakeSource::TouchInterrupt => {}
        }
        if self.wake.is_low() {
            // A finger is already down. Return without arming the edge wait
            // so the press that raced the sleep entry is not swallowed.
            return Ok(WakeReason::Gpio);
        }
        self.wake.wait_for_low().await;
        Ok(WakeReason::Gpio)
    }
}

/// [`ResetControl`] through the ARM SCB system reset request.
pub struct ScbReset;

impl ResetControl for ScbReset {
    fn reboot(&mut self) -> ! {
        cortex_m::peripheral::SCB::sys_reset()
    }
}

// ---------------------------------------------------------------------------
// Executor tasks
// ---------------------------------------------------------------------------

/// Render context: UI ticks, notification delivery, frame publishes.
///
/// The host arrives with the boot application already activated; its first
/// `on_tick` runs in the first loop iteration.
#[embassy_executor::task]
pub async fn render_task(host: &'static mut AppHost<'static>) {
    render_loop(
        host,
        &CURRENT_TOUCH,
        &bus::RENDER_WAKE,
        &FRAME_HANDOFF,
        bus::NOTIFICATIONS.receiver(),
        bus::COMMANDS.sender(),
        &ACTIVITY,
    )
    .await
}

/// Touch poller: fixed-cadence FT6336 reads, parked across the sleep cycle.
#[embassy_executor::task]
pub async fn touch_task(mut sensor: BoardTouch) {
    // First bring-up. Later re-inits happen inside the loop whenever the
    // gate releases the poller after a sleep cycle.
    if let Err(e) = sensor.init().await {
        defmt::warn!("touch controller init failed: {}", e);
    }
    poller_loop(
        &mut sensor,
        &POLLER_GATE,
        &CURRENT_TOUCH,
        &bus::RENDER_WAKE,
        &ACTIVITY,
    )
    .await;
}

/// Panel transmit: owns the panel driver, services published frames and
/// sleep/wake requests.
#[embassy_executor::task]
pub async fn transmit_task(mut panel: BoardPanel) {
    // The working copy the transmit path streams from. Lives in the task
    // arena, not on any stack.
    let mut scratch = PanelFrame::new();
    transmit_loop(&mut panel, &FRAME_HANDOFF, &PANEL_PORT, &mut scratch).await;
}
