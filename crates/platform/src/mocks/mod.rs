//! Mock implementations for testing
//!
//! This module provides mock implementations of the platform traits for use
//! in unit and integration tests.

#![cfg(any(test, feature = "std"))]

use crate::display::{PanelDriver, PanelError, FRAME_BYTES};
use crate::power::{SleepError, Sleeper, WakeReason, WakeSource};
use crate::touch::{TouchError, TouchSample, TouchSensor};

/// One recorded panel operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelOp {
    /// `init` was called
    Init,
    /// `display_full` was called with a frame of this length
    DisplayFull(usize),
    /// `clear` was called with this fill byte
    Clear(u8),
    /// `sleep` was called
    Sleep,
}

/// Mock panel driver: records every operation, optionally fails the next one.
pub struct MockPanel {
    ops: heapless::Vec<PanelOp, 32>,
    next_error: Option<PanelError>,
    /// First byte of the most recent frame, for content spot-checks.
    pub last_first_byte: Option<u8>,
}

impl MockPanel {
    /// Create a new mock panel.
    pub fn new() -> Self {
        Self {
            ops: heapless::Vec::new(),
            next_error: None,
            last_first_byte: None,
        }
    }

    /// Fail the next operation with `error`, then go back to succeeding.
    pub fn fail_next(&mut self, error: PanelError) {
        self.next_error = Some(error);
    }

    /// All operations recorded so far, in call order.
    pub fn ops(&self) -> &[PanelOp] {
        &self.ops
    }

    fn record(&mut self, op: PanelOp) -> Result<(), PanelError> {
        let _ = self.ops.push(op);
        match self.next_error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Default for MockPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl PanelDriver for MockPanel {
    async fn init(&mut self) -> Result<(), PanelError> {
        self.record(PanelOp::Init)
    }

    async fn display_full(&mut self, frame: &[u8]) -> Result<(), PanelError> {
        if frame.len() != FRAME_BYTES {
            let _ = self.ops.push(PanelOp::DisplayFull(frame.len()));
            return Err(PanelError::InvalidBuffer);
        }
        self.last_first_byte = frame.first().copied();
        self.record(PanelOp::DisplayFull(frame.len()))
    }

    async fn clear(&mut self, fill: u8) -> Result<(), PanelError> {
        self.record(PanelOp::Clear(fill))
    }

    async fn sleep(&mut self) -> Result<(), PanelError> {
        self.record(PanelOp::Sleep)
    }
}

/// Mock touch sensor fed from a scripted sample queue.
///
/// An empty script reads as released; a scripted `Err` is returned once and
/// consumed like any other entry.
pub struct MockTouchSensor {
    script: heapless::Deque<Result<TouchSample, TouchError>, 32>,
    init_count: usize,
}

impl MockTouchSensor {
    /// Create a new mock sensor with an empty script.
    pub fn new() -> Self {
        Self {
            script: heapless::Deque::new(),
            init_count: 0,
        }
    }

    /// Queue a pressed sample at raw `(x, y)`.
    pub fn press(&mut self, x: u16, y: u16) {
        let _ = self.script.push_back(Ok(TouchSample { pressed: true, x, y }));
    }

    /// Queue a released sample.
    pub fn release(&mut self) {
        let _ = self.script.push_back(Ok(TouchSample::RELEASED));
    }

    /// Queue a read failure.
    pub fn fail(&mut self, error: TouchError) {
        let _ = self.script.push_back(Err(error));
    }

    /// Number of `init` calls observed (boot + one per wake).
    pub fn init_count(&self) -> usize {
        self.init_count
    }
}

impl Default for MockTouchSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl TouchSensor for MockTouchSensor {
    async fn init(&mut self) -> Result<(), TouchError> {
        self.init_count = self.init_count.saturating_add(1);
        Ok(())
    }

    async fn read(&mut self) -> Result<TouchSample, TouchError> {
        self.script.pop_front().unwrap_or(Ok(TouchSample::RELEASED))
    }
}

/// Mock sleeper: records armed wake sources and returns immediately.
pub struct MockSleeper {
    wakes: heapless::Vec<WakeSource, 8>,
    next_error: Option<SleepError>,
}

impl MockSleeper {
    /// Create a new mock sleeper.
    pub fn new() -> Self {
        Self {
            wakes: heapless::Vec::new(),
            next_error: None,
        }
    }

    /// Fail the next sleep attempt with `error`.
    pub fn fail_next(&mut self, error: SleepError) {
        self.next_error = Some(error);
    }

    /// Wake sources armed so far, one per completed sleep attempt.
    pub fn wakes(&self) -> &[WakeSource] {
        &self.wakes
    }
}

impl Default for MockSleeper {
    fn default() -> Self {
        Self::new()
    }
}

impl Sleeper for MockSleeper {
    async fn light_sleep(&mut self, wake: WakeSource) -> Result<WakeReason, SleepError> {
        let _ = self.wakes.push(wake);
        match self.next_error.take() {
            Some(e) => Err(e),
            None => {
                // Model the instant-wake case: the level-triggered line is
                // already low, so the hardware returns straight away.
                embassy_time::Timer::after_micros(1).await;
                Ok(WakeReason::Gpio)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::display::FRAME_BYTES;

    #[tokio::test]
    async fn mock_panel_records_in_order() {
        let mut panel = MockPanel::new();

        panel.init().await.unwrap();
        let frame = vec![0xFF_u8; FRAME_BYTES];
        panel.display_full(&frame).await.unwrap();
        panel.sleep().await.unwrap();

        assert_eq!(
            panel.ops(),
            &[PanelOp::Init, PanelOp::DisplayFull(FRAME_BYTES), PanelOp::Sleep]
        );
        assert_eq!(panel.last_first_byte, Some(0xFF));
    }

    #[tokio::test]
    async fn mock_panel_rejects_short_frames() {
        let mut panel = MockPanel::new();
        let short = [0u8; 16];
        assert_eq!(
            panel.display_full(&short).await,
            Err(PanelError::InvalidBuffer)
        );
    }

    #[tokio::test]
    async fn mock_touch_plays_script_then_releases() {
        let mut touch = MockTouchSensor::new();
        touch.press(800, 336);
        touch.fail(TouchError::Bus);

        let s = touch.read().await.unwrap();
        assert!(s.pressed);
        assert_eq!((s.x, s.y), (800, 336));
        assert_eq!(touch.read().await, Err(TouchError::Bus));
        assert_eq!(touch.read().await, Ok(TouchSample::RELEASED));
    }

    #[tokio::test]
    async fn mock_sleeper_records_wake_source() {
        let mut sleeper = MockSleeper::new();
        let reason = sleeper
            .light_sleep(WakeSource::TouchInterrupt)
            .await
            .unwrap();
        assert_eq!(reason, WakeReason::Gpio);
        assert_eq!(sleeper.wakes(), &[WakeSource::TouchInterrupt]);
    }
}
