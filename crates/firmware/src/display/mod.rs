//! Panel protocol driver.
//!
//! The driver module is always compiled (no hardware gate) so `cargo test`
//! can exercise the SSD1680 command sequences on the host through
//! `embedded-hal-mock`.

pub mod driver;

pub use driver::{Command, Ssd1680, BUSY_POLL_MS, BUSY_TIMEOUT_MS, SLEEP_RETAIN_RAM, UPDATE_FULL};
