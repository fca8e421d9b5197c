//! Hardware Abstraction Layer (HAL) for the InkDesk appliance
//!
//! This crate provides trait-based abstractions for the hardware the runtime
//! depends on, enabling development and testing without physical hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (firmware crate: home app, bring-up)
//!         ↓
//! Runtime Layer (runtime crate: loops, channels, power policy)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Hardware Layer (Embassy HAL + PAC)
//! ```
//!
//! # Abstractions
//!
//! - [`PanelDriver`] - E-paper panel protocol control
//! - [`TouchSensor`] - Capacitive touch controller access
//! - [`Sleeper`] / [`ResetControl`] - CPU light sleep and system reset
//!
//! The [`mpu`] module is not a trait: it is the host-testable register math
//! the firmware boot path programs into the Cortex-M7 MPU.
//!
//! # Features
//!
//! - `std`: Enable standard library support (for testing)
//! - `hardware`: Physical hardware implementations
//! - `defmt`: Enable defmt logging
//!
//! # Example
//!
//! ```no_run
//! use platform::{PanelDriver, FRAME_BYTES};
//!
//! async fn repaint<P: PanelDriver>(panel: &mut P, frame: &[u8; FRAME_BYTES]) {
//!     let _ = panel.display_full(frame).await;
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors — callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(async_fn_in_trait)] // Embassy no_std: single-threaded, Send bounds not needed

// The `std` feature gates std::error::Error impls on the error types; link
// std for them while the crate itself stays no_std.
#[cfg(feature = "std")]
extern crate std;

pub mod display;
pub mod mocks;
pub mod mpu;
pub mod power;
pub mod touch;

// Re-export main traits and their error types
pub use display::{
    PanelDriver, PanelError, FRAME_BYTES, PANEL_HEIGHT, PANEL_WIDTH, PANEL_WIDTH_BYTES,
};
pub use power::{ResetControl, SleepError, Sleeper, WakeReason, WakeSource};
pub use touch::{TouchError, TouchSample, TouchSensor};
