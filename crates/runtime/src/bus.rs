//! System event bus — two bounded channels plus the render wake signal.
//!
//! # Architecture
//!
//! Two static [`Channel`]s carry [`Notification`]s (background → render) and
//! [`Command`]s (render → background). Capacity is [`CHANNEL_DEPTH`] each.
//!
//! # Overflow handling
//!
//! Producers never block. [`send_to_render`] / [`send_to_worker`] use
//! `try_send`; when the consumer stalls and a channel fills, the message is
//! dropped and the failure is reported to the caller (and logged). A stalled
//! render loop must never be able to wedge the background loop, or the other
//! way round.
//!
//! # Wakeups are not data
//!
//! [`RENDER_WAKE`] is a binary [`Signal`], separate from both channels. The
//! touch poller fires it to cut the render loop's idle wait short; it carries
//! no payload and never queues. Routing wakeups through a data channel (or
//! data through a wake signal) is the historic failure mode this split
//! exists to prevent.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embassy_sync::signal::Signal;
use embassy_time::{with_timeout, Duration};

use crate::event::{Command, Notification};

/// Depth of each event channel.
pub const CHANNEL_DEPTH: usize = 20;

// Justification for CriticalSectionRawMutex:
// Notifications are written from the background (thread-mode) loop and read
// from the render loop on the high-priority executor; commands go the other
// way. The two executors preempt each other, so the queue ops need the
// ISR-safe mutex. Each push/pop is a bounded handful of instructions; the
// PRIMASK window is well under a microsecond at 480 MHz.
/// Notifications: background → render.
pub static NOTIFICATIONS: Channel<CriticalSectionRawMutex, Notification, CHANNEL_DEPTH> =
    Channel::new();

/// Commands: render → background.
pub static COMMANDS: Channel<CriticalSectionRawMutex, Command, CHANNEL_DEPTH> = Channel::new();

/// Render-loop wake signal.
///
/// Fired by the touch poller on press activity and press/release edges so a
/// touch is reflected on the next tick instead of after the full idle wait.
pub static RENDER_WAKE: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Wake the render loop out of its bounded idle wait.
pub fn wake_render() {
    RENDER_WAKE.signal(());
}

/// Queue a notification for the render context.
///
/// Never blocks. Returns `false` if the channel was full and the
/// notification was dropped.
pub fn send_to_render(note: Notification) -> bool {
    post_notification(&NOTIFICATIONS.sender(), note)
}

/// Queue a command for the background context.
///
/// Never blocks. Returns `false` if the channel was full and the command was
/// dropped.
pub fn send_to_worker(cmd: Command) -> bool {
    post_command(&COMMANDS.sender(), cmd)
}

/// Dequeue the next notification, waiting at most `timeout`.
pub async fn next_notification(timeout: Duration) -> Option<Notification> {
    dequeue(&NOTIFICATIONS.receiver(), timeout).await
}

/// Dequeue the next command, waiting at most `timeout`.
pub async fn next_command(timeout: Duration) -> Option<Command> {
    dequeue(&COMMANDS.receiver(), timeout).await
}

/// [`send_to_render`] against an explicit endpoint, for loops running on an
/// injected channel.
pub(crate) fn post_notification(
    tx: &Sender<'_, CriticalSectionRawMutex, Notification, CHANNEL_DEPTH>,
    note: Notification,
) -> bool {
    if tx.try_send(note).is_ok() {
        true
    } else {
        #[cfg(feature = "defmt")]
        defmt::warn!("notification channel full, dropped {}", note);
        false
    }
}

/// [`send_to_worker`] against an explicit endpoint.
pub(crate) fn post_command(
    tx: &Sender<'_, CriticalSectionRawMutex, Command, CHANNEL_DEPTH>,
    cmd: Command,
) -> bool {
    if tx.try_send(cmd).is_ok() {
        true
    } else {
        #[cfg(feature = "defmt")]
        defmt::warn!("command channel full, dropped {}", cmd);
        false
    }
}

/// Dequeue with a caller-supplied bound. A zero timeout is a pure poll; it
/// never touches the timer queue.
pub(crate) async fn dequeue<T>(
    rx: &Receiver<'_, CriticalSectionRawMutex, T, CHANNEL_DEPTH>,
    timeout: Duration,
) -> Option<T> {
    if timeout == Duration::from_ticks(0) {
        return rx.try_receive().ok();
    }
    with_timeout(timeout, rx.receive()).await.ok()
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    /// Overflow policy on a test-local channel with the production depth:
    /// the 21st send fails without blocking and the first 20 drain intact.
    #[tokio::test]
    async fn full_channel_drops_without_blocking() {
        static CH: Channel<CriticalSectionRawMutex, Notification, CHANNEL_DEPTH> = Channel::new();

        for _ in 0..CHANNEL_DEPTH {
            assert!(post_notification(&CH.sender(), Notification::TimeUpdated));
        }
        // Channel full: the send returns immediately with false.
        assert!(!post_notification(&CH.sender(), Notification::WifiConnected));

        let mut drained = 0;
        while dequeue(&CH.receiver(), Duration::from_ticks(0)).await.is_some() {
            drained += 1;
        }
        assert_eq!(drained, CHANNEL_DEPTH);
    }

    #[tokio::test]
    async fn zero_timeout_is_a_poll() {
        static CH: Channel<CriticalSectionRawMutex, Command, CHANNEL_DEPTH> = Channel::new();

        assert_eq!(dequeue(&CH.receiver(), Duration::from_ticks(0)).await, None);
        assert!(post_command(&CH.sender(), Command::FetchWeather));
        assert_eq!(
            dequeue(&CH.receiver(), Duration::from_ticks(0)).await,
            Some(Command::FetchWeather)
        );
    }

    #[tokio::test]
    async fn bounded_timeout_elapses_empty() {
        static CH: Channel<CriticalSectionRawMutex, Command, CHANNEL_DEPTH> = Channel::new();

        let got = dequeue(&CH.receiver(), Duration::from_millis(5)).await;
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn fifo_order_is_preserved() {
        static CH: Channel<CriticalSectionRawMutex, Notification, CHANNEL_DEPTH> = Channel::new();

        assert!(post_notification(&CH.sender(), Notification::WifiConnected));
        assert!(post_notification(
            &CH.sender(),
            Notification::Weather { temp_c: 25 }
        ));
        assert_eq!(
            dequeue(&CH.receiver(), Duration::from_ticks(0)).await,
            Some(Notification::WifiConnected)
        );
        assert_eq!(
            dequeue(&CH.receiver(), Duration::from_ticks(0)).await,
            Some(Notification::Weather { temp_c: 25 })
        );
    }

    /// The public send helpers must stay synchronous — enforced structurally:
    /// both are plain `fn`s returning `bool`, not futures.
    #[test]
    fn send_helpers_never_await() {
        assert_eq!(CHANNEL_DEPTH, 20);
        let _: fn(Notification) -> bool = send_to_render;
        let _: fn(Command) -> bool = send_to_worker;
    }
}
