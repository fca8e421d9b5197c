//! InkDesk firmware - main entry point
//!
//! Hardware-only entry point for STM32H743ZI.

#![no_std]
#![no_main]

use embassy_executor::{InterruptExecutor, Spawner};
use embassy_stm32::exti::{Channel, ExtiInput};
use embassy_stm32::gpio::{AnyPin, Input, Level, Output, Pull, Speed};
use embassy_stm32::i2c::{Config as I2cConfig, I2c};
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_stm32::spi::{Config as SpiConfig, Spi};
use embassy_stm32::time::Hertz;
use embassy_time::{Delay, Duration, Timer};
use embedded_hal_bus::spi::ExclusiveDevice;
use static_cell::StaticCell;

use platform::{PanelDriver, PANEL_HEIGHT, PANEL_WIDTH};
use runtime::{bus, worker_loop, AppHost, PowerController, WorkerTiming, IDLE_TIMEOUT};

use firmware::board::{self, BoardPanel, BoardTouch, ExtiSleeper, Irqs, ScbReset};
use firmware::ui::HomeApp;
use firmware::{Ft6336, Ssd1680};

// Panic handler
use panic_probe as _;

/// High-priority executor for the render, touch and transmit tasks.
///
/// UART5 is unused on this board; its vector is donated to the executor.
static UI_EXECUTOR: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn UART5() {
    // SAFETY: this is the vector `UI_EXECUTOR.start()` was handed below;
    // `on_interrupt` is only called from it.
    unsafe { UI_EXECUTOR.on_interrupt() }
}

static APP: StaticCell<HomeApp> = StaticCell::new();
static HOST: StaticCell<AppHost<'static>> = StaticCell::new();

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    // The thread-mode executor hosts only this function; the UI tasks run on
    // UI_EXECUTOR. The background worker takes over at the end of main.

    // Step 0: Configure MPU BEFORE embassy_stm32::init() enables D-cache.
    //
    // embassy_stm32::init() enables the Cortex-M7 D-cache on STM32H7. Without
    // MPU configuration first, the cache will serve DMA buffer addresses as
    // cacheable, causing silent data corruption in panel and touch I/O.
    //
    // This call marks AXI SRAM (0x2400_0000, 512 KB) as non-cacheable before
    // any DMA peripheral is initialised. The linker places all statics there,
    // including the task arenas whose futures hold the DMA buffers.
    //
    // References: ST AN4838/AN4839, ARM DDI0489F B3.5.
    // See: firmware::boot::BOOT_SEQUENCE_STEPS for the full ordered sequence.
    firmware::boot::hardware::apply_mpu_config_from_peripherals();

    defmt::info!("InkDesk firmware v{=str}", "0.1.0");
    defmt::info!("Initializing STM32H743ZI, Cortex-M7 @ 400 MHz");

    let p = embassy_stm32::init(firmware::boot::build_embassy_config());

    // -----------------------------------------------------------------------
    // Panel: SSD1680 on SPI1
    //   PA5 = SCK, PA7 = MOSI, PA6 = MISO (unused, HAL requires it)
    //   PB0 = DC, PB1 = CS, PB2 = RST, PE3 = BUSY
    // -----------------------------------------------------------------------
    let mut spi_config = SpiConfig::default();
    spi_config.frequency = Hertz(4_000_000); // 4 MHz, panel limit

    let spi = Spi::new(
        p.SPI1, p.PA5,      // SCK
        p.PA7,      // MOSI
        p.PA6,      // MISO (not used but required by HAL)
        p.DMA1_CH0, // TX DMA
        p.DMA1_CH1, // RX DMA
        spi_config,
    );

    let dc = Output::new(p.PB0, Level::Low, Speed::VeryHigh).degrade();
    let cs = Output::new(p.PB1, Level::High, Speed::VeryHigh).degrade();
    let rst = Output::new(p.PB2, Level::High, Speed::VeryHigh).degrade();
    let busy = Input::new(p.PE3, Pull::None).degrade();

    // Wrap raw SPI bus + CS pin into an SpiDevice (manages CS assertion).
    // The CS pin error type is Infallible on this HAL, hence the empty match.
    let spi_device = match ExclusiveDevice::new(spi, cs, Delay) {
        Ok(dev) => dev,
        Err(never) => match never {},
    };

    defmt::info!("Creating SSD1680 panel driver, SPI1 @ 4 MHz");
    let mut panel: BoardPanel = Ssd1680::new(spi_device, dc, rst, busy, Delay);

    defmt::info!(
        "Initializing panel ({=u16}x{=u16}, 1bpp)...",
        PANEL_WIDTH,
        PANEL_HEIGHT
    );
    match panel.init().await {
        Ok(()) => defmt::info!("Panel ready: {=u16}x{=u16}", PANEL_WIDTH, PANEL_HEIGHT),
        Err(e) => {
            defmt::error!("Panel initialization failed: {}", e);
            loop {
                Timer::after(Duration::from_secs(1)).await;
            }
        }
    }

    // Wipe whatever the retained image holds before the first real frame.
    if let Err(e) = panel.clear(0xFF).await {
        defmt::warn!("Boot clear failed: {}", e);
    }

    // -----------------------------------------------------------------------
    // Touch: FT6336 on I2C1
    //   PB8 = SCL, PB9 = SDA, PD2 = RST, PD3 = INT (EXTI3, wake line)
    // -----------------------------------------------------------------------
    let i2c = I2c::new(
        p.I2C1,
        p.PB8, // SCL
        p.PB9, // SDA
        Irqs,
        p.DMA1_CH2,
        p.DMA1_CH3,
        Hertz(100_000),
        I2cConfig::default(),
    );
    let touch_rst = Output::new(p.PD2, Level::High, Speed::Low).degrade();
    let touch: BoardTouch = Ft6336::new(i2c, touch_rst, Delay);

    // The INT line doubles as the light-sleep wake source.
    let touch_int: ExtiInput<'static, AnyPin> =
        ExtiInput::new(Input::new(p.PD3, Pull::Up).degrade(), p.EXTI3.degrade());

    // -----------------------------------------------------------------------
    // Runtime bring-up
    // -----------------------------------------------------------------------
    let host = HOST.init(AppHost::new());
    host.activate(APP.init(HomeApp::new()));

    interrupt::UART5.set_priority(Priority::P6);
    let ui = UI_EXECUTOR.start(interrupt::UART5);

    if let Err(_e) = ui.spawn(board::transmit_task(panel)) {
        defmt::error!("transmit task spawn failed");
    }
    if let Err(_e) = ui.spawn(board::touch_task(touch)) {
        defmt::error!("touch task spawn failed");
    }
    if let Err(_e) = ui.spawn(board::render_task(host)) {
        defmt::error!("render task spawn failed");
    }
    defmt::info!(
        "UI tasks spawned on UART5 executor, channel depth={=usize}",
        runtime::CHANNEL_DEPTH
    );

    let mut power = PowerController::new(
        ExtiSleeper::new(touch_int),
        &board::ACTIVITY,
        &board::POLLER_GATE,
        &board::PANEL_PORT,
        IDLE_TIMEOUT,
    );
    let mut reset = ScbReset;

    defmt::info!("Entering background worker loop");
    worker_loop(
        &mut power,
        &mut reset,
        bus::COMMANDS.receiver(),
        bus::NOTIFICATIONS.sender(),
        &bus::RENDER_WAKE,
        &board::ACTIVITY,
        WorkerTiming::default(),
    )
    .await
}
