//! Panel transmission task — the single owner of the panel driver.
//!
//! The render context never touches the panel; it publishes frames into the
//! [`FrameHandoff`] and this loop pushes them out. The power controller
//! never touches the panel either; it sends sleep/wake requests through a
//! [`PanelPort`] and waits for the acknowledgement. Single ownership keeps
//! the driver free of locking, and the loop structure guarantees an
//! in-flight transmission always runs to completion before a sleep request
//! is even looked at.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use platform::display::PanelDriver;

use crate::frame::{FrameHandoff, PanelFrame};

/// Request from the power controller to the transmit task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PanelRequest {
    /// Put the panel into deep sleep (RAM retained)
    Sleep,
    /// Re-initialize the panel after a wake
    Wake,
}

/// Request/acknowledge rendezvous between the power controller and the
/// transmit task.
///
/// At most one request is outstanding: the requester awaits the ack before
/// it can issue another, so plain latched signals are sufficient — nothing
/// ever queues.
pub struct PanelPort {
    req: Signal<CriticalSectionRawMutex, PanelRequest>,
    ack: Signal<CriticalSectionRawMutex, ()>,
}

impl PanelPort {
    /// A new port with nothing outstanding.
    pub const fn new() -> Self {
        Self {
            req: Signal::new(),
            ack: Signal::new(),
        }
    }

    /// Controller side: issue `request` and wait for the transmit task to
    /// acknowledge it.
    pub async fn request(&self, request: PanelRequest) {
        self.ack.reset();
        self.req.signal(request);
        self.ack.wait().await;
    }

    /// Transmit side: wait for the next request.
    pub async fn next_request(&self) -> PanelRequest {
        self.req.wait().await
    }

    /// Transmit side: the request has been carried out.
    pub fn acknowledge(&self) {
        self.ack.signal(());
    }
}

impl Default for PanelPort {
    fn default() -> Self {
        Self::new()
    }
}

/// Panel transmit loop.
///
/// Waits for either a published frame or a power request. Frames are copied
/// out of the handoff into `scratch` (so the render side can publish again
/// the moment the in-flight flag clears) and pushed with `display_full`.
/// While the panel is asleep, published frames are dropped with a log line —
/// the working frame survives in the render context and the first post-wake
/// publish repaints the glass.
///
/// Driver errors are logged and the loop carries on; a dead bus must not
/// take the runtime down with it.
pub async fn transmit_loop<P: PanelDriver>(
    panel: &mut P,
    handoff: &FrameHandoff,
    port: &PanelPort,
    scratch: &mut PanelFrame,
) {
    let mut asleep = false;
    loop {
        match select(handoff.wait_take(scratch), port.next_request()).await {
            Either::First(()) => {
                if asleep {
                    #[cfg(feature = "defmt")]
                    defmt::debug!("panel asleep, dropping published frame");
                    handoff.complete();
                    continue;
                }
                if let Err(_e) = panel.display_full(scratch.as_bytes()).await {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("frame transmission failed: {}", _e);
                }
                handoff.complete();
            }
            Either::Second(PanelRequest::Sleep) => {
                if let Err(_e) = panel.sleep().await {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("panel sleep failed: {}", _e);
                }
                asleep = true;
                port.acknowledge();
            }
            Either::Second(PanelRequest::Wake) => {
                if let Err(_e) = panel.init().await {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("panel re-init failed: {}", _e);
                }
                asleep = false;
                port.acknowledge();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::join::join;
    use embassy_time::{with_timeout, Duration, Timer};
    use platform::mocks::{MockPanel, PanelOp};
    use platform::display::FRAME_BYTES;

    async fn run_loop_for<P: PanelDriver>(
        ms: u64,
        panel: &mut P,
        handoff: &FrameHandoff,
        port: &PanelPort,
    ) {
        let mut scratch = PanelFrame::new();
        let _ = with_timeout(
            Duration::from_millis(ms),
            transmit_loop(panel, handoff, port, &mut scratch),
        )
        .await;
    }

    #[tokio::test]
    async fn published_frame_reaches_the_panel() {
        let mut panel = MockPanel::new();
        let handoff = FrameHandoff::new();
        let port = PanelPort::new();

        let mut frame = PanelFrame::new();
        frame.fill(0x5A);
        assert!(handoff.try_publish(&frame));

        run_loop_for(20, &mut panel, &handoff, &port).await;

        assert_eq!(panel.ops(), &[PanelOp::DisplayFull(FRAME_BYTES)]);
        assert_eq!(panel.last_first_byte, Some(0x5A));
        // Transmission completed: the handoff is free again.
        assert!(!handoff.is_in_flight());
    }

    #[tokio::test]
    async fn sleep_request_is_acknowledged_and_frames_drop() {
        let mut panel = MockPanel::new();
        let handoff = FrameHandoff::new();
        let port = PanelPort::new();

        let controller = async {
            port.request(PanelRequest::Sleep).await;
            // Publish while asleep: consumed and dropped, no SPI traffic.
            let frame = PanelFrame::new();
            assert!(handoff.try_publish(&frame));
            Timer::after_millis(10).await;
            port.request(PanelRequest::Wake).await;
        };
        let mut scratch = PanelFrame::new();
        let looped = transmit_loop(&mut panel, &handoff, &port, &mut scratch);

        let _ = with_timeout(Duration::from_millis(100), join(looped, controller)).await;

        // Sleep, then re-init on wake. No DisplayFull in between.
        assert_eq!(panel.ops(), &[PanelOp::Sleep, PanelOp::Init]);
    }

    #[tokio::test]
    async fn transmit_errors_do_not_stop_the_loop() {
        let mut panel = MockPanel::new();
        panel.fail_next(platform::display::PanelError::Communication);
        let handoff = FrameHandoff::new();
        let port = PanelPort::new();

        let frame = PanelFrame::new();
        assert!(handoff.try_publish(&frame));
        run_loop_for(20, &mut panel, &handoff, &port).await;

        // The failed frame cleared the in-flight flag; a second publish
        // goes through and succeeds.
        assert!(!handoff.is_in_flight());
        assert!(handoff.try_publish(&frame));
        run_loop_for(20, &mut panel, &handoff, &port).await;
        assert_eq!(
            panel.ops(),
            &[
                PanelOp::DisplayFull(FRAME_BYTES),
                PanelOp::DisplayFull(FRAME_BYTES)
            ]
        );
    }
}
