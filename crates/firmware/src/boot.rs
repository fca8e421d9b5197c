//! Hardware boot sequence.
//!
//! Initialization order (MUST be respected — order matters for correctness):
//!   1. Configure MPU (mark the DMA-reachable AXI SRAM non-cacheable)
//!   2. `embassy_stm32::init()` — enables D-cache (safe now) and the clock tree
//!   3. Wire peripherals: SPI1 + DMA for the panel, I2C1 + DMA for touch, EXTI
//!   4. Start the executors and spawn the runtime tasks
//!
//! # Safety
//! Step 1 must run from privileged mode before any task or interrupt handler
//! starts.

use platform::mpu::MpuApplier;

/// Ordered list of boot sequence steps for documentation and testing.
///
/// The ordering of these strings encodes the required hardware initialization
/// sequence; tests assert that the MPU step precedes the cache step.
///
/// # Correctness Invariants
///
/// - MPU must be configured BEFORE enabling D-cache (ST AN4838/AN4839).
///   Enabling D-cache first allows it to serve stale data for the SPI frame
///   stream and the I2C touch reads — silent corruption, no fault.
/// - The clock tree must be up before any peripheral constructor runs; SPI1
///   takes its kernel clock from PLL1_Q, which `Config::default()` leaves off.
pub const BOOT_SEQUENCE_STEPS: &[&str] = &[
    "1. MPU: make AXI SRAM DMA-coherent before any DMA use",
    "2. D-cache: enable after MPU is configured (embassy_stm32::init)",
    "3. Clock tree: HSI -> PLL1 -> 400 MHz core, 200 MHz PLL1_Q for SPI1",
    "4. Peripherals: SPI1 + I2C1 + EXTI wiring",
    "5. Executors: interrupt-mode render/touch/transmit, thread-mode worker",
];

/// Returns the `(RBAR, RASR)` register pairs for this board's MPU setup.
///
/// Pure math — computes register values without touching hardware. The single
/// region marks AXI SRAM (0x2400_0000, 512 KB) non-cacheable; the linker keeps
/// every static there, so it covers all DMA buffers this firmware owns.
///
/// | Index | Region   | Base        | Size   | RBAR        | RASR        |
/// |-------|----------|-------------|--------|-------------|-------------|
/// | 0     | AXI SRAM | 0x2400_0000 | 512 KB | 0x2400_0010 | 0x1308_0025 |
#[must_use]
pub fn mpu_register_pairs() -> [(u32, u32); 1] {
    MpuApplier::board_register_pairs()
}

// ── RCC clock configuration ───────────────────────────────────────────────────

/// Build the `embassy_stm32::Config` with the RCC settings for this board.
///
/// # Clock Tree (HSI → 400 MHz core)
///
/// HSI (64 MHz) → PLL1 (prediv=4, mul=50) → VCO 800 MHz
/// PLL1_P: DIV2 → 400 MHz  (system clock)
/// PLL1_Q: DIV4 → 200 MHz  (SPI1/2/3 kernel clock via SPI123SEL default mux)
/// AHB prescaler: DIV2 → 200 MHz
/// APB1/2/3/4:    DIV2 → 100 MHz (TIM2 time driver runs at 2× APB1 = 200 MHz;
///                I2C1 kernel clock is APB1 via the I2C123SEL default mux)
///
/// # DO NOT call `embassy_stm32::init(Default::default())`
///
/// `Config::default()` runs the core at HSI speed and leaves PLL1_Q off, so
/// the SPI1 constructor has no kernel clock. Always init with this config.
#[cfg(feature = "hardware")]
pub fn build_embassy_config() -> embassy_stm32::Config {
    use embassy_stm32::rcc::*;

    let mut config = embassy_stm32::Config::default();

    // HSI: 64 MHz internal oscillator, no prescaler. No crystal on the board.
    config.rcc.hsi = Some(HSIPrescaler::DIV1);

    // PLL1: HSI (64 MHz) / prediv(4) = 16 MHz → × mul(50) = 800 MHz VCO
    config.rcc.pll1 = Some(Pll {
        source: PllSource::HSI,
        prediv: PllPreDiv::DIV4,
        mul: PllMul::MUL50,
        divp: Some(PllDiv::DIV2), // 400 MHz — system clock
        divq: Some(PllDiv::DIV4), // 200 MHz — SPI123 kernel clock
        divr: None,
    });

    config.rcc.sys = Sysclk::PLL1_P; // 400 MHz
    config.rcc.ahb_pre = AHBPrescaler::DIV2; // 200 MHz
    config.rcc.apb1_pre = APBPrescaler::DIV2; // 100 MHz
    config.rcc.apb2_pre = APBPrescaler::DIV2; // 100 MHz
    config.rcc.apb3_pre = APBPrescaler::DIV2; // 100 MHz
    config.rcc.apb4_pre = APBPrescaler::DIV2; // 100 MHz
    config.rcc.voltage_scale = VoltageScale::Scale1;

    config
}

// ── Hardware-only init ────────────────────────────────────────────────────────
//
// This module is only compiled when targeting real hardware. It contains
// actual register writes using `cortex_m` peripheral types.
//
// Host tests (cargo test -p firmware) never compile or link this module,
// keeping all non-hardware tests safe to run on the development machine.

#[cfg(feature = "hardware")]
pub mod hardware {
    //! Actual hardware register write implementations.
    //! Only compiled when targeting real hardware (`--features hardware`).

    /// Apply the board MPU configuration to the Cortex-M7 MPU.
    ///
    /// Writes the `(RBAR, RASR)` pairs computed by
    /// [`super::mpu_register_pairs`] into the physical MPU registers, then
    /// re-enables the MPU with `PRIVDEFENA` set so unmapped regions use the
    /// default memory map for privileged access.
    ///
    /// # Safety
    ///
    /// - Must be called before enabling D-cache (`SCB::enable_dcache()`).
    /// - Must be called before any DMA peripheral is initialized.
    /// - Must be called from privileged mode (Cortex-M7 boot context).
    /// - Must run to completion before any interrupt handler runs.
    ///
    /// After this function returns, AXI SRAM (0x2400_0000, 512 KB) is
    /// non-cacheable — safe for DMA1/DMA2 — and all other memory uses the
    /// processor default map (the subsequent SCB cache enable covers DTCM,
    /// flash, and the D2 SRAM banks).
    #[allow(unsafe_code)]
    pub unsafe fn apply_mpu_config(mpu: &mut cortex_m::peripheral::MPU) {
        use super::mpu_register_pairs;

        // Disable MPU before reconfiguring — required by ARM DDI0489F §B3.5.1.
        // Writing 0 to MPU_CTRL disables the MPU; all subsequent accesses use
        // the default memory map until the MPU is re-enabled below.
        unsafe {
            mpu.ctrl.write(0);
        }

        // Apply each region pair. Because RBAR has VALID=1, writing RBAR
        // implicitly selects the region slot (the 4-bit REGION field in RBAR
        // takes effect immediately, overriding MPU_RNR).
        for (rbar, rasr) in mpu_register_pairs() {
            unsafe {
                mpu.rbar.write(rbar);
                mpu.rasr.write(rasr);
            }
        }

        // Re-enable MPU with PRIVDEFENA:
        //   bit 0: ENABLE     — MPU is active.
        //   bit 2: PRIVDEFENA — privileged accesses to unmapped regions use
        //                       the default memory map (stack and code need no
        //                       explicit MPU entries).
        //
        // Reference: ARM DDI0489F §B3.5.2, Table B3-12 (MPU_CTRL bit fields).
        unsafe {
            mpu.ctrl.write(0b101); // ENABLE | PRIVDEFENA
        }

        // Instruction Synchronization Barrier — flushes the CPU pipeline so
        // the MPU configuration takes effect before the next instruction.
        cortex_m::asm::isb();
        // Data Synchronization Barrier — ensures all MPU register writes are
        // visible to the memory system before the cache is enabled.
        cortex_m::asm::dsb();
    }

    /// Apply the board MPU configuration — zero-argument entry point for
    /// `main.rs`.
    ///
    /// Steals the Cortex-M peripherals singleton, applies the MPU
    /// configuration via [`apply_mpu_config`], then drops them. The stolen
    /// reference is released before `embassy_stm32::init()` acquires Cortex-M
    /// peripherals through its own `take()`/`steal()` path.
    ///
    /// # When to call
    ///
    /// As the **very first statement** in `main`, before
    /// `embassy_stm32::init()`. Embassy's `init()` enables D-cache on STM32H7;
    /// if the MPU has not been configured first, DMA transfers to AXI SRAM
    /// silently corrupt data (ST AN4838/AN4839, ARM DDI0489F §B3.5).
    ///
    /// ```rust,ignore
    /// #[embassy_executor::main]
    /// async fn main(spawner: Spawner) {
    ///     // Step 0: MPU MUST be configured before embassy_stm32::init()
    ///     firmware::boot::hardware::apply_mpu_config_from_peripherals();
    ///     let p = embassy_stm32::init(firmware::boot::build_embassy_config());
    ///     // ...
    /// }
    /// ```
    #[allow(unsafe_code)]
    pub fn apply_mpu_config_from_peripherals() {
        // SAFETY: called once at boot before any RTOS tasks or interrupt
        // handlers have started. No other code holds Cortex-M peripherals yet.
        let mut cp = unsafe { cortex_m::Peripherals::steal() };
        // SAFETY: boot context — D-cache not yet enabled, no DMA initialised.
        unsafe { apply_mpu_config(&mut cp.MPU) };
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
