//! Frame store — the working frame the UI draws into, and the shadow-frame
//! handoff that feeds the panel transmission task.
//!
//! # Double buffering
//!
//! The render context owns a [`PanelFrame`] (the working frame) and mutates
//! it freely between refreshes. Publishing a finished frame copies it into
//! the [`FrameHandoff`] shadow slot and kicks the transmit task; the working
//! frame is immediately writable again. At most one transmission is in
//! flight; a publish that arrives mid-transmission is dropped (the caller
//! keeps drawing and republished content gets out on the next flush).

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::signal::Signal;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;

use platform::display::{FRAME_BYTES, PANEL_HEIGHT, PANEL_WIDTH, PANEL_WIDTH_BYTES};

// ---------------------------------------------------------------------------
// PanelFrame
// ---------------------------------------------------------------------------

/// One full panel image, 1bpp packed, MSB-first.
///
/// Format matches the controller's B/W RAM: byte index `x/8 + y*22`, bit
/// mask `0x80 >> (x % 8)`. Bit set = white, bit clear = black; a fresh frame
/// is all white (`0xFF`), the panel's post-clear state.
pub struct PanelFrame {
    bytes: [u8; FRAME_BYTES],
}

impl PanelFrame {
    /// A new all-white frame.
    pub const fn new() -> Self {
        // 5.7 KB; lives in a static or a dedicated task stack, never an ISR
        // stack.
        #[allow(clippy::large_stack_arrays)]
        Self {
            bytes: [0xFF; FRAME_BYTES],
        }
    }

    /// Set one pixel. Out-of-bounds coordinates are a silent no-op.
    pub fn set_pixel(&mut self, x: u16, y: u16, color: BinaryColor) {
        if x >= PANEL_WIDTH || y >= PANEL_HEIGHT {
            return;
        }
        // Bounds guard above: x < 176, y < 264.
        //   byte index max = 175/8 + 263*22 = 21 + 5786 = 5807 < FRAME_BYTES.
        #[allow(clippy::arithmetic_side_effects)]
        let index = usize::from(x) / 8 + usize::from(y) * PANEL_WIDTH_BYTES;
        // x % 8 is in [0, 7], so the shift cannot overflow.
        #[allow(clippy::arithmetic_side_effects)]
        let mask = 0x80_u8 >> (x % 8);
        if let Some(byte) = self.bytes.get_mut(index) {
            match color {
                // white → set bit
                BinaryColor::Off => *byte |= mask,
                // black → clear bit
                BinaryColor::On => *byte &= !mask,
            }
        }
    }

    /// Read one pixel back; `None` outside the panel.
    pub fn pixel(&self, x: u16, y: u16) -> Option<BinaryColor> {
        if x >= PANEL_WIDTH || y >= PANEL_HEIGHT {
            return None;
        }
        // Same bound argument as set_pixel.
        #[allow(clippy::arithmetic_side_effects)]
        let index = usize::from(x) / 8 + usize::from(y) * PANEL_WIDTH_BYTES;
        #[allow(clippy::arithmetic_side_effects)]
        let mask = 0x80_u8 >> (x % 8);
        self.bytes.get(index).map(|byte| {
            if byte & mask != 0 {
                BinaryColor::Off
            } else {
                BinaryColor::On
            }
        })
    }

    /// Fill the whole frame with one byte pattern (`0xFF` = white).
    pub fn fill(&mut self, byte: u8) {
        self.bytes.fill(byte);
    }

    /// The packed image, ready for `PanelDriver::display_full`.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Overwrite this frame with `other`'s content.
    pub fn copy_from(&mut self, other: &PanelFrame) {
        self.bytes.copy_from_slice(&other.bytes);
    }
}

impl Default for PanelFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawTarget for PanelFrame {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    /// Accumulate pixels into the packed buffer.
    ///
    /// Out-of-bounds pixels are skipped, matching `set_pixel`.
    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x < 0
                || point.y < 0
                || point.x >= i32::from(PANEL_WIDTH)
                || point.y >= i32::from(PANEL_HEIGHT)
            {
                continue;
            }
            // Bounds guard above keeps both coordinates in u16 range.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            self.set_pixel(point.x as u16, point.y as u16, color);
        }
        Ok(())
    }
}

impl OriginDimensions for PanelFrame {
    fn size(&self) -> Size {
        Size::new(u32::from(PANEL_WIDTH), u32::from(PANEL_HEIGHT))
    }
}

// ---------------------------------------------------------------------------
// Landscape
// ---------------------------------------------------------------------------

/// Landscape view over a [`PanelFrame`].
///
/// The panel scans portrait (176 wide, 264 tall) but the appliance is mounted
/// rotated, so apps draw in 264×176. Pixels are transposed on the way in:
/// landscape `(x, y)` lands on panel `(y, x)`.
pub struct Landscape<'a> {
    frame: &'a mut PanelFrame,
}

impl<'a> Landscape<'a> {
    /// Landscape view over `frame`.
    pub fn new(frame: &'a mut PanelFrame) -> Self {
        Self { frame }
    }
}

impl DrawTarget for Landscape<'_> {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x < 0
                || point.y < 0
                || point.x >= i32::from(PANEL_HEIGHT)
                || point.y >= i32::from(PANEL_WIDTH)
            {
                continue;
            }
            // Landscape x runs down the panel's long axis.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            self.frame.set_pixel(point.y as u16, point.x as u16, color);
        }
        Ok(())
    }
}

impl OriginDimensions for Landscape<'_> {
    fn size(&self) -> Size {
        Size::new(u32::from(PANEL_HEIGHT), u32::from(PANEL_WIDTH))
    }
}

// ---------------------------------------------------------------------------
// FrameHandoff
// ---------------------------------------------------------------------------

/// Shadow-frame slot between the render context and the panel transmit task.
///
/// `const`-constructible so it can live in a `static`. The shadow buffer is
/// only ever touched inside the blocking mutex, so a publish can never tear
/// a frame that the transmit task is picking up; the `in_flight` flag keeps
/// the render side from overwriting an image that is already going out on
/// the wire.
pub struct FrameHandoff {
    in_flight: AtomicBool,
    shadow: BlockingMutex<CriticalSectionRawMutex, RefCell<PanelFrame>>,
    kick: Signal<CriticalSectionRawMutex, ()>,
}

impl FrameHandoff {
    /// New handoff with a white shadow frame and no transmission pending.
    pub const fn new() -> Self {
        Self {
            in_flight: AtomicBool::new(false),
            shadow: BlockingMutex::new(RefCell::new(PanelFrame::new())),
            kick: Signal::new(),
        }
    }

    /// Publish a finished working frame.
    ///
    /// Returns `false` (and leaves the shadow slot untouched) while a
    /// transmission is in flight — the frame is dropped, not queued. Publishes
    /// that land before the transmit task picks the shadow up coalesce: the
    /// newest image wins and a single transmission covers them all.
    pub fn try_publish(&self, frame: &PanelFrame) -> bool {
        if self.in_flight.load(Ordering::Acquire) {
            return false;
        }
        self.shadow.lock(|s| s.borrow_mut().copy_from(frame));
        self.kick.signal(());
        true
    }

    /// Transmit side: wait for a kick, mark the transmission in flight and
    /// copy the shadow image into `out`.
    pub async fn wait_take(&self, out: &mut PanelFrame) {
        self.kick.wait().await;
        self.in_flight.store(true, Ordering::Release);
        self.shadow.lock(|s| out.copy_from(&s.borrow()));
    }

    /// Transmit side: the frame taken by [`wait_take`](Self::wait_take) has
    /// left the wire (or failed); publishing is allowed again.
    pub fn complete(&self) {
        self.in_flight.store(false, Ordering::Release);
    }

    /// A transmission is currently in flight.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl Default for FrameHandoff {
    fn default() -> Self {
        Self::new()
    }
}
