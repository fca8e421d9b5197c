//! Appliance runtime — events, frame store, touch pipeline, power policy and
//! the two cooperative loops that tie them together.
//!
//! Everything in this crate is policy over [`platform`] traits: the loop
//! bodies are plain `async fn`s, generic over the hardware they drive, so the
//! entire runtime runs under the host test suite with mock hardware. The
//! firmware crate wraps these bodies in Embassy tasks and feeds them real
//! drivers.
//!
//! # Execution contexts
//!
//! Two contexts, two bounded channels, strict discipline:
//!
//! ```text
//! render context                     background context
//!   app tick + draw                    power idle check
//!   ≤1 notification per pass   ←───    command dispatch (≤1 per pass)
//!   bounded wait / wake signal  ───→   housekeeping (minute tick)
//! ```
//!
//! Data always moves on the channels; wakeups always move on dedicated
//! signals. The two are never conflated.

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]
#![allow(async_fn_in_trait)] // Embassy no_std: single-threaded, Send bounds not needed

pub mod app;
pub mod bus;
pub mod event;
pub mod frame;
pub mod panel;
pub mod power;
pub mod render;
pub mod touch;
pub mod worker;

pub use app::{App, AppHost, RenderCx};
pub use bus::{CHANNEL_DEPTH, RENDER_WAKE};
pub use event::{Command, Notification};
pub use frame::{FrameHandoff, Landscape, PanelFrame};
pub use panel::{transmit_loop, PanelPort, PanelRequest};
pub use power::{ActivityClock, PowerController, PowerState, IDLE_TIMEOUT};
pub use render::{render_loop, RENDER_TICK};
pub use touch::{poller_loop, CurrentTouch, PollerGate, TouchPoint, TOUCH_POLL};
pub use worker::{worker_loop, WorkerTiming};
