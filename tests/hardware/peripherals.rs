//! HIL peripheral presence tests.
//!
//! Validates that the touch controller responds on I2C1 and the panel
//! answers over SPI1.

#[cfg(test)]
mod hil_peripheral_tests {
    /// Expected I2C addresses for hardware peripherals.
    const TOUCH_I2C_ADDR: u8 = 0x38; // FT6336 (fixed address)

    #[test]
    fn peripheral_i2c_addresses_are_documented() {
        // Validate address constants match the driver's value
        // (Compile-time check — no hardware needed)
        assert_eq!(
            TOUCH_I2C_ADDR, 0x38,
            "FT6336 I2C address must be 0x38 (fixed, not configurable)"
        );
    }

    #[test]
    fn hil_peripheral_presence_placeholder() {
        // TODO(HIL): Replace with an actual probe on hardware:
        //   defmt::assert!(i2c.write(TOUCH_I2C_ADDR, &[]).await.is_ok(),
        //                  "FT6336 not found at 0x38");
        // The panel has no presence register; drive RST, send SW_RESET and
        // wait for BUSY to fall within 10 ms.
        let _ = "HIL peripheral test placeholder";
    }
}
