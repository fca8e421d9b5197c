//! E-paper panel abstraction layer
//!
//! The panel is a 2.7" monochrome e-paper module on an SSD1680-class
//! controller. Geometry is fixed; the runtime's frame store and the concrete
//! protocol driver both build on the constants here.

/// Panel width in pixels (portrait, the controller's native orientation).
pub const PANEL_WIDTH: u16 = 176;

/// Panel height in pixels.
pub const PANEL_HEIGHT: u16 = 264;

/// Bytes per framebuffer row: 8 pixels per byte, MSB is the leftmost pixel.
pub const PANEL_WIDTH_BYTES: usize = 22; // 176 / 8

/// Full-frame transfer size in bytes: 22 * 264.
pub const FRAME_BYTES: usize = 5808;

/// Panel protocol driver trait.
///
/// One full-frame operation at a time; callers serialize access. All
/// operations are complete command sequences — after any of them returns the
/// controller is idle (or the busy wait timed out, which the driver logs and
/// tolerates).
pub trait PanelDriver {
    /// Full hardware init: reset pulse, software reset, busy settle.
    ///
    /// Also the wake path after [`sleep`](Self::sleep) — the controller
    /// requires a reset pulse to leave deep sleep.
    fn init(&mut self) -> impl core::future::Future<Output = Result<(), PanelError>>;

    /// Transmit a full frame and trigger a full refresh.
    ///
    /// `frame` must be exactly [`FRAME_BYTES`] long; anything else is
    /// rejected with [`PanelError::InvalidBuffer`] before any bus traffic.
    fn display_full(
        &mut self,
        frame: &[u8],
    ) -> impl core::future::Future<Output = Result<(), PanelError>>;

    /// Fill the whole panel with one byte pattern (0xFF = white) and refresh.
    fn clear(&mut self, fill: u8) -> impl core::future::Future<Output = Result<(), PanelError>>;

    /// Enter deep sleep with RAM retained. Wake requires [`init`](Self::init).
    fn sleep(&mut self) -> impl core::future::Future<Output = Result<(), PanelError>>;
}

/// Panel failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PanelError {
    /// SPI transfer failed
    Communication,
    /// Control pin (DC/RST) failed
    Gpio,
    /// BUSY did not deassert within the bounded wait
    Timeout,
    /// Frame slice is not exactly `FRAME_BYTES` long
    InvalidBuffer,
}

#[cfg(feature = "std")]
impl std::error::Error for PanelError {}

impl core::fmt::Display for PanelError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Communication => write!(f, "Panel communication error"),
            Self::Gpio => write!(f, "Panel control pin error"),
            Self::Timeout => write!(f, "Panel busy-wait timeout"),
            Self::InvalidBuffer => write!(f, "Frame buffer has wrong length"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_is_consistent() {
        assert_eq!(PANEL_WIDTH_BYTES, usize::from(PANEL_WIDTH) / 8);
        assert_eq!(FRAME_BYTES, PANEL_WIDTH_BYTES * usize::from(PANEL_HEIGHT));
    }

    #[test]
    fn errors_format() {
        let all = [
            PanelError::Communication,
            PanelError::Gpio,
            PanelError::Timeout,
            PanelError::InvalidBuffer,
        ];
        for e in all {
            assert!(!format!("{e}").is_empty());
        }
    }
}
