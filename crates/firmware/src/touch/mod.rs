//! Touch controller driver.
//!
//! Always compiled (no hardware gate) so `cargo test` can exercise the
//! FT6336 reset and decode sequences on the host through `embedded-hal-mock`.

pub mod ft6336;

pub use ft6336::Ft6336;
