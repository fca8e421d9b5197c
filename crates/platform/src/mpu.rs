//! Cortex-M7 MPU region math for the STM32H743 boot path.
//!
//! Embassy enables the 16 KB D-cache during `embassy_stm32::init()`. From
//! that point on, any DMA buffer in a cacheable region suffers silent data
//! corruption: the cache serves stale lines to the CPU after a DMA write, or
//! holds dirty lines the DMA never sees. The standard fix (ST AN4838/AN4839)
//! is to mark the DMA-reachable SRAM non-cacheable in the MPU **before** the
//! cache comes on.
//!
//! Everything in this module is pure register arithmetic, host-testable with
//! no `cortex_m` types; the firmware crate owns the actual RBAR/RASR writes.
//!
//! # STM32H743 memory map, DMA view
//!
//! | Region        | Address     | Size   | DMA1/DMA2 | Notes                      |
//! |---------------|-------------|--------|-----------|----------------------------|
//! | DTCM          | 0x2000_0000 | 128 KB | no        | CPU-only, dedicated port   |
//! | AXI SRAM (D1) | 0x2400_0000 | 512 KB | yes       | statics + task arenas      |
//! | SRAM1/2 (D2)  | 0x3000_0000 | 256 KB | yes       | unused by this firmware    |
//! | SRAM4 (D3)    | 0x3800_0000 | 64 KB  | BDMA only | unused by this firmware    |
//!
//! The linker script places every static in AXI SRAM, and with them every
//! Embassy task arena, so every future-local buffer the SPI frame stream and
//! the I²C touch reads hand to DMA1 lives there too. One non-cacheable region
//! over AXI SRAM therefore covers all DMA traffic this firmware generates.
//! DTCM is reachable by no DMA controller at all; a buffer placed there fails
//! silently, with the CPU and the DMA seeing different bytes.
//!
//! # Region encoding (ARM Cortex-M7 TRM DDI0489F §B3.5)
//!
//! - Minimum region size 32 bytes; size a power of two; base aligned to size.
//! - RASR `SIZE` field = `log2(size_bytes) − 1` (512 KB = 2^19 → SIZE = 18).
//! - Non-cacheable normal memory: TEX=001, S=0, C=0, B=0.
//!
//! References: ST AN4838 (MPU management), ST AN4839 (L1 cache on H7),
//! ARM DDI0489F §B3.5 (MPU register layout).

/// MPU configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpuError {
    /// Region size is not a power of two (ARM MPU requirement, §B3.5 DDI0489F).
    SizeNotPowerOfTwo,
    /// Region size is zero.
    SizeZero,
    /// Base address is not aligned to the region size.
    ///
    /// ARM requires `base_addr % size == 0`.
    AddressMisaligned,
    /// Region size is below the 32-byte floor imposed by the Cortex-M7 MPU.
    SizeTooSmall,
}

/// MPU memory attributes for a region.
///
/// These map to the TEX, S, C, B bit fields of the ARM MPU Region Attribute
/// and Size Register (RASR). See ARM DDI0489F §B3.5.4 for the full table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpuAttributes {
    /// Strongly ordered: no buffering, no caching, program-order completion.
    /// For peripheral MMIO windows. TEX=000, S=1, C=0, B=0.
    StronglyOrdered,

    /// Non-cacheable normal memory, the correct attribute for CPU↔DMA shared
    /// buffers. TEX=001, S=0, C=0, B=0.
    ///
    /// A write-back or write-through attribute here reintroduces exactly the
    /// corruption this module exists to prevent: the D-cache keeps lines the
    /// DMA engine never observes.
    NonCacheable,

    /// Write-back, no write-allocate: normal cached RAM with no DMA sharing.
    /// TEX=000, S=0, C=1, B=1.
    WriteBackNoWriteAllocate,

    /// Write-through, no write-allocate: reads cached, writes go to memory.
    /// TEX=000, S=0, C=1, B=0.
    WriteThrough,
}

/// A validated MPU region descriptor.
///
/// Construction via [`MpuRegion::new`] enforces the Cortex-M7 alignment and
/// size rules, so callers cannot produce a configuration the hardware would
/// silently mis-apply.
#[derive(Debug, Clone, Copy)]
pub struct MpuRegion {
    base: u32,
    size: u32,
    attrs: MpuAttributes,
}

impl MpuRegion {
    /// Create a new MPU region, validating size and alignment.
    ///
    /// # Errors
    ///
    /// - [`MpuError::SizeZero`] if `size == 0`
    /// - [`MpuError::SizeTooSmall`] if `size < 32` (Cortex-M7 minimum)
    /// - [`MpuError::SizeNotPowerOfTwo`] if `size` is not a power of two
    /// - [`MpuError::AddressMisaligned`] if `base % size != 0`
    pub fn new(base: u32, size: u32, attrs: MpuAttributes) -> Result<Self, MpuError> {
        if size == 0 {
            return Err(MpuError::SizeZero);
        }
        if size < 32 {
            return Err(MpuError::SizeTooSmall);
        }
        if !size.is_power_of_two() {
            return Err(MpuError::SizeNotPowerOfTwo);
        }
        if !base.is_multiple_of(size) {
            return Err(MpuError::AddressMisaligned);
        }
        Ok(Self { base, size, attrs })
    }

    /// Encode the size as the ARM MPU `SIZE` field value (`log2(size) − 1`).
    ///
    /// Because `size` must be a power of two, `log2(size)` is the number of
    /// trailing zero bits. 32 B → 4, 64 KB → 15, 512 KB → 18.
    ///
    /// # Errors
    ///
    /// - [`MpuError::SizeZero`] if `size == 0`
    /// - [`MpuError::SizeNotPowerOfTwo`] if `size` is not a power of two
    // trailing_zeros() returns u32; the value fits u8 for all 32-bit sizes.
    #[allow(clippy::cast_possible_truncation)]
    pub fn encode_size(size: u32) -> Result<u8, MpuError> {
        if size == 0 {
            return Err(MpuError::SizeZero);
        }
        if !size.is_power_of_two() {
            return Err(MpuError::SizeNotPowerOfTwo);
        }
        // size = 2^n → trailing_zeros = n → SIZE field = n - 1. Sizes below
        // 32 are rejected by `new`, but `encode_size` is callable directly,
        // so saturate rather than underflow on size == 1.
        let n = size.trailing_zeros();
        Ok((n as u8).saturating_sub(1))
    }

    /// Base address of this region.
    #[must_use]
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Size of this region in bytes.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Exclusive end address of this region (`base + size`).
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)] // base + size fits u32 for valid regions
    pub fn end(&self) -> u32 {
        self.base + self.size
    }

    /// Memory attributes assigned to this region.
    #[must_use]
    pub fn attrs(&self) -> MpuAttributes {
        self.attrs
    }

    /// Whether this region's address range intersects `other`'s.
    ///
    /// Regions that only share a boundary point do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.base < other.end() && other.base < self.end()
    }
}

/// The MPU region set for this board.
///
/// Apply during hardware init, **before** `embassy_stm32::init()` enables the
/// D-cache and before any DMA peripheral starts. The set is deliberately
/// minimal: the linker keeps all statics in AXI SRAM, so a single region
/// covers the SPI panel stream and the I²C touch transfers.
pub struct BoardMpuConfig;

impl BoardMpuConfig {
    /// AXI SRAM non-cacheable DMA region, 512 KB at 0x2400_0000.
    ///
    /// Covers the panel frame bytes DMA1 streams out over SPI1 and the
    /// FT6336 status blocks DMA1 moves for I2C1.
    ///
    /// Attributes: `NonCacheable` (TEX=001, S=0, C=0, B=0).
    #[must_use]
    pub fn axi_sram_dma_region() -> MpuRegion {
        // 0x2400_0000 is 512 KB-aligned (0x2400_0000 % 0x8_0000 == 0), so
        // these parameters are statically valid.
        #[allow(clippy::expect_used)]
        MpuRegion::new(0x2400_0000, 512 * 1024, MpuAttributes::NonCacheable)
            .expect("AXI SRAM MPU region parameters are statically valid")
    }
}

/// Pure register-value computation for the Cortex-M7 MPU.
///
/// Computes the RBAR and RASR u32 values needed to program the ARMv7-M MPU.
/// No `cortex_m` peripheral types appear here, so every value is testable on
/// the host.
///
/// # ARMv7-M register layout (ARM DDI0489F §B3.5)
///
/// RBAR: `[31:5]` base address, `[4]` VALID (use the REGION field), `[3:0]`
/// region slot number.
///
/// RASR: `[28]` XN, `[26:24]` AP, `[21:19]` TEX, `[18]` S, `[17]` C, `[16]`
/// B, `[15:8]` SRD, `[5:1]` SIZE, `[0]` ENABLE.
///
/// For the non-cacheable DMA attribute set (XN=1, AP=0b011 full access,
/// TEX=001, S=C=B=0, SRD=0) the attribute bits collapse to `0x1308_0000`;
/// OR in the SIZE field and the ENABLE bit to finish the value. The 512 KB
/// AXI SRAM region encodes as RASR `0x1308_0025`.
pub struct MpuApplier;

impl MpuApplier {
    /// Attribute mask for non-cacheable DMA regions.
    ///
    /// XN=1, AP=0b011, TEX=001, S=0, C=0, B=0 per ARM DDI0489F §B3.5.4.
    /// Does **not** include the SIZE or ENABLE bits.
    pub const NON_CACHEABLE_ATTR_MASK: u32 = 0x1308_0000;

    /// RASR value for a non-cacheable DMA region.
    ///
    /// `size_field` is the ARM SIZE encoding, `log2(size_bytes) - 1`; use
    /// [`MpuRegion::encode_size`] to compute it from a byte count.
    #[must_use]
    pub fn non_cacheable_rasr(size_field: u8) -> u32 {
        Self::NON_CACHEABLE_ATTR_MASK
            | (u32::from(size_field) << 1) // SIZE occupies RASR bits [5:1]
            | 1 // ENABLE bit [0]
    }

    /// RBAR value for a region.
    ///
    /// Sets VALID=1 so the 4-bit REGION field selects the hardware slot,
    /// overriding the MPU_RNR register for this write. `base` must be
    /// SIZE-aligned (enforced upstream by [`MpuRegion::new`]).
    #[must_use]
    pub fn rbar(base: u32, region_number: u8) -> u32 {
        base | (1 << 4) | (u32::from(region_number) & 0xF)
    }

    /// `(RBAR, RASR)` pairs for [`BoardMpuConfig`], in application order.
    ///
    /// | Index | Region   | Base        | Size   | Slot | RBAR        | RASR        |
    /// |-------|----------|-------------|--------|------|-------------|-------------|
    /// | 0     | AXI SRAM | 0x2400_0000 | 512 KB | 0    | 0x2400_0010 | 0x1308_0025 |
    ///
    /// This function is pure math; the firmware boot code writes the pairs to
    /// the live MPU registers before enabling the D-cache and before any DMA
    /// peripheral is initialised.
    #[must_use]
    pub fn board_register_pairs() -> [(u32, u32); 1] {
        let axi_region = BoardMpuConfig::axi_sram_dma_region();

        #[allow(clippy::expect_used)]
        let axi_size =
            MpuRegion::encode_size(axi_region.size()).expect("AXI SRAM size is statically valid");

        [(
            Self::rbar(axi_region.base(), 0),
            Self::non_cacheable_rasr(axi_size),
        )]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn region_size_must_be_power_of_two() {
        assert!(MpuRegion::new(0x2400_0000, 512 * 1024, MpuAttributes::NonCacheable).is_ok());
        assert!(MpuRegion::new(0x3000_0000, 256 * 1024, MpuAttributes::NonCacheable).is_ok());
        assert!(MpuRegion::new(0x2400_0000, 100_000, MpuAttributes::NonCacheable).is_err());
        assert!(MpuRegion::new(0x2400_0000, 0, MpuAttributes::NonCacheable).is_err());
        assert!(MpuRegion::new(0x2400_0000, 3 * 1024, MpuAttributes::NonCacheable).is_err());
    }

    #[test]
    fn region_address_must_be_aligned_to_size() {
        let size = 128 * 1024;
        // 0x2400_0000 % (128*1024) == 0, 0x2400_1000 is off by a page.
        assert!(MpuRegion::new(0x2400_0000, size, MpuAttributes::NonCacheable).is_ok());
        assert_eq!(
            MpuRegion::new(0x2400_1000, size, MpuAttributes::NonCacheable).unwrap_err(),
            MpuError::AddressMisaligned
        );
    }

    #[test]
    fn region_size_floor_is_32_bytes() {
        assert_eq!(
            MpuRegion::new(0x2400_0000, 16, MpuAttributes::NonCacheable).unwrap_err(),
            MpuError::SizeTooSmall
        );
        assert!(MpuRegion::new(0x2400_0000, 32, MpuAttributes::NonCacheable).is_ok());
    }

    #[test]
    fn size_field_encoding_matches_arm_table() {
        // SIZE = log2(size) - 1 per DDI0489F §B3.5.4.
        assert_eq!(MpuRegion::encode_size(32), Ok(4u8));
        assert_eq!(MpuRegion::encode_size(64 * 1024), Ok(15u8));
        assert_eq!(MpuRegion::encode_size(512 * 1024), Ok(18u8));
        assert_eq!(MpuRegion::encode_size(1024 * 1024), Ok(19u8));
        assert_eq!(
            MpuRegion::encode_size(100_000),
            Err(MpuError::SizeNotPowerOfTwo)
        );
        assert_eq!(MpuRegion::encode_size(0), Err(MpuError::SizeZero));
    }

    #[test]
    fn overlap_detection_ignores_shared_boundaries() {
        let r1 = MpuRegion::new(0x2400_0000, 256 * 1024, MpuAttributes::NonCacheable).unwrap();
        let r2 = MpuRegion::new(0x2404_0000, 256 * 1024, MpuAttributes::NonCacheable).unwrap();
        assert!(!r1.overlaps(&r2));

        // r4 sits wholly inside r3.
        let r3 = MpuRegion::new(0x2400_0000, 512 * 1024, MpuAttributes::NonCacheable).unwrap();
        let r4 = MpuRegion::new(0x2404_0000, 256 * 1024, MpuAttributes::NonCacheable).unwrap();
        assert!(r3.overlaps(&r4));
    }

    #[test]
    fn board_config_covers_axi_sram() {
        let axi = BoardMpuConfig::axi_sram_dma_region();
        assert_eq!(axi.base(), 0x2400_0000);
        assert_eq!(axi.size(), 512 * 1024);
        assert_eq!(axi.attrs(), MpuAttributes::NonCacheable);
    }

    #[test]
    fn board_register_pairs_encode_the_documented_values() {
        let pairs = MpuApplier::board_register_pairs();
        // Boot code iterates this slice; the slot numbers inside RBAR assume
        // this exact order.
        assert_eq!(pairs.len(), 1);

        let (rbar, rasr) = pairs[0];
        assert_eq!(rbar, 0x2400_0010, "AXI SRAM base | VALID | slot 0");
        assert_eq!(rasr, 0x1308_0025, "non-cacheable | SIZE=18 | ENABLE");
    }

    #[test]
    fn rasr_math_assembles_the_attribute_mask() {
        // 512 KB: SIZE = 18 → bits [5:1] = 0x24, ENABLE = 1.
        assert_eq!(MpuApplier::non_cacheable_rasr(18), 0x1308_0025);
        // 64 KB: SIZE = 15 → bits [5:1] = 0x1E, ENABLE = 1.
        assert_eq!(MpuApplier::non_cacheable_rasr(15), 0x1308_001F);
    }

    #[test]
    fn rbar_masks_the_slot_to_four_bits() {
        assert_eq!(MpuApplier::rbar(0x2400_0000, 0), 0x2400_0010);
        assert_eq!(MpuApplier::rbar(0x2400_0000, 3), 0x2400_0013);
        // Slot numbers above 15 cannot spill into the VALID/address bits.
        assert_eq!(MpuApplier::rbar(0x2400_0000, 0x13), 0x2400_0013);
    }
}
