//! Render-context loop.
//!
//! Owns the working frame and the active application. Each iteration ticks
//! the application, forwards at most one notification, publishes the frame
//! when asked, then waits out the tick interval — or less, when the touch
//! poller wakes it early.

use embassy_futures::select::select;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Receiver, Sender};
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};

use crate::app::{AppHost, RenderCx};
use crate::bus::{self, CHANNEL_DEPTH};
use crate::event::{Command, Notification};
use crate::frame::{FrameHandoff, PanelFrame};
use crate::power::ActivityClock;
use crate::touch::CurrentTouch;

/// Idle wait per render iteration when nothing wakes the loop early.
pub const RENDER_TICK: Duration = Duration::from_millis(10);

/// The render loop.
///
/// Per iteration:
/// 1. snapshot the current touch state,
/// 2. run the active application's tick,
/// 3. deliver at most one pending notification (non-blocking poll) — a
///    burst of notifications spreads across iterations so a slow sender can
///    never monopolize the UI,
/// 4. publish the frame if a callback requested a flush (dropped with a log
///    line while a transmission is in flight),
/// 5. wait [`RENDER_TICK`] or until `wake` fires, whichever comes first.
///
/// Receiving a notification and flushing the frame both count as activity.
pub async fn render_loop(
    host: &mut AppHost<'_>,
    touch: &CurrentTouch,
    wake: &Signal<CriticalSectionRawMutex, ()>,
    handoff: &FrameHandoff,
    notifications: Receiver<'_, CriticalSectionRawMutex, Notification, CHANNEL_DEPTH>,
    commands: Sender<'_, CriticalSectionRawMutex, Command, CHANNEL_DEPTH>,
    activity: &ActivityClock,
) -> ! {
    let mut frame = PanelFrame::new();
    loop {
        let (point, pressed) = touch.read();
        let flush = {
            let mut cx = RenderCx::new(point, pressed, &mut frame, commands, activity);
            host.tick(&mut cx);
            if let Some(note) = bus::dequeue(&notifications, Duration::from_ticks(0)).await {
                activity.touch();
                host.deliver(note, &mut cx);
            }
            cx.flush_requested()
        };
        if flush {
            if handoff.try_publish(&frame) {
                activity.touch();
            } else {
                #[cfg(feature = "defmt")]
                defmt::debug!("flush requested while a transmission is in flight, dropped");
            }
        }
        let _ = select(Timer::after(RENDER_TICK), wake.wait()).await;
    }
}
