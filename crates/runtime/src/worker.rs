//! Background-context loop.
//!
//! Runs the power controller's idle check, broadcasts the minute tick, and
//! dispatches commands from the render context. Everything long-running
//! lives here so the render loop never waits on a network-shaped delay.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Receiver, Sender};
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};

use platform::power::{ResetControl, Sleeper};

use crate::bus::{self, CHANNEL_DEPTH};
use crate::event::{Command, Notification};
use crate::power::{ActivityClock, PowerController};

/// Bounded wait on the command queue per iteration.
pub const WORKER_POLL: Duration = Duration::from_millis(5);

/// Interval between time-of-day broadcasts to the render context.
pub const TIME_BROADCAST: Duration = Duration::from_secs(60);

/// Simulated weather fetch latency. Stands in for the HTTP round trip the
/// connectivity layer will eventually provide.
pub const FETCH_DELAY: Duration = Duration::from_millis(1500);

/// Simulated wifi association latency.
pub const CONNECT_DELAY: Duration = Duration::from_millis(500);

/// Grace period before a requested reboot, letting the log sink drain.
pub const REBOOT_GRACE: Duration = Duration::from_millis(100);

/// Background-loop timing. [`Default`] is the production tuning; the host
/// test suite shrinks the delays so scenarios run in milliseconds.
#[derive(Clone, Copy)]
pub struct WorkerTiming {
    /// Bounded wait on the command queue per iteration.
    pub command_poll: Duration,
    /// Interval between `TimeUpdated` broadcasts.
    pub time_broadcast: Duration,
    /// Simulated weather fetch latency.
    pub fetch_delay: Duration,
    /// Simulated wifi association latency.
    pub connect_delay: Duration,
    /// Delay between a reboot command and the reset itself.
    pub reboot_grace: Duration,
}

impl Default for WorkerTiming {
    fn default() -> Self {
        Self {
            command_poll: WORKER_POLL,
            time_broadcast: TIME_BROADCAST,
            fetch_delay: FETCH_DELAY,
            connect_delay: CONNECT_DELAY,
            reboot_grace: REBOOT_GRACE,
        }
    }
}

/// The background loop.
///
/// Per iteration:
/// 1. `PowerController::service` — may run a whole sleep/wake cycle,
/// 2. broadcast [`Notification::TimeUpdated`] once per `time_broadcast`,
/// 3. dequeue at most one command, bounded by `command_poll`, and dispatch
///    it. Receiving a command and completing its work both count as
///    activity.
///
/// [`Command::Reboot`] is the one dispatch that never returns.
pub async fn worker_loop<SL: Sleeper, R: ResetControl>(
    power: &mut PowerController<'_, SL>,
    reset: &mut R,
    commands: Receiver<'_, CriticalSectionRawMutex, Command, CHANNEL_DEPTH>,
    notifications: Sender<'_, CriticalSectionRawMutex, Notification, CHANNEL_DEPTH>,
    render_wake: &Signal<CriticalSectionRawMutex, ()>,
    activity: &ActivityClock,
    timing: WorkerTiming,
) -> ! {
    let mut last_broadcast = Instant::now();
    loop {
        power.service().await;

        if last_broadcast.elapsed() >= timing.time_broadcast {
            last_broadcast = Instant::now();
            notify_render(&notifications, render_wake, Notification::TimeUpdated);
        }

        if let Some(cmd) = bus::dequeue(&commands, timing.command_poll).await {
            activity.touch();
            dispatch(cmd, reset, &notifications, render_wake, activity, timing).await;
        }
    }
}

/// Run one command to completion.
async fn dispatch<R: ResetControl>(
    cmd: Command,
    reset: &mut R,
    notifications: &Sender<'_, CriticalSectionRawMutex, Notification, CHANNEL_DEPTH>,
    render_wake: &Signal<CriticalSectionRawMutex, ()>,
    activity: &ActivityClock,
    timing: WorkerTiming,
) {
    match cmd {
        Command::ConnectWifi => {
            #[cfg(feature = "defmt")]
            defmt::info!("associating with access point");
            Timer::after(timing.connect_delay).await;
            notify_render(notifications, render_wake, Notification::WifiConnected);
            activity.touch();
        }
        Command::FetchWeather => {
            #[cfg(feature = "defmt")]
            defmt::info!("fetching weather");
            Timer::after(timing.fetch_delay).await;
            notify_render(
                notifications,
                render_wake,
                Notification::Weather { temp_c: 25 },
            );
            activity.touch();
        }
        Command::Reboot => {
            #[cfg(feature = "defmt")]
            defmt::info!("reboot requested");
            #[cfg(feature = "defmt")]
            defmt::flush();
            Timer::after(timing.reboot_grace).await;
            reset.reboot();
        }
    }
}

/// Post a notification and cut the render loop's idle wait short so it is
/// seen on the next tick rather than one interval later.
fn notify_render(
    tx: &Sender<'_, CriticalSectionRawMutex, Notification, CHANNEL_DEPTH>,
    wake: &Signal<CriticalSectionRawMutex, ()>,
    note: Notification,
) {
    if bus::post_notification(tx, note) {
        wake.signal(());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::panel::PanelPort;
    use crate::touch::PollerGate;
    use embassy_sync::channel::Channel;
    use embassy_time::with_timeout;
    use platform::mocks::MockSleeper;

    /// Timing that keeps every scenario inside a few milliseconds.
    fn test_timing() -> WorkerTiming {
        WorkerTiming {
            command_poll: Duration::from_millis(1),
            time_broadcast: Duration::from_millis(15),
            fetch_delay: Duration::from_millis(1),
            connect_delay: Duration::from_millis(1),
            reboot_grace: Duration::from_millis(1),
        }
    }

    /// Records the reboot instead of resetting the host test process.
    struct PanicReset;

    impl ResetControl for PanicReset {
        fn reboot(&mut self) -> ! {
            panic!("reboot");
        }
    }

    #[tokio::test]
    async fn fetch_weather_answers_with_a_notification() {
        static CMDS: Channel<CriticalSectionRawMutex, Command, CHANNEL_DEPTH> = Channel::new();
        static NOTES: Channel<CriticalSectionRawMutex, Notification, CHANNEL_DEPTH> =
            Channel::new();
        let wake = Signal::new();
        let activity = ActivityClock::new();
        let gate = PollerGate::new();
        let port = PanelPort::new();
        let mut power = PowerController::new(
            MockSleeper::new(),
            &activity,
            &gate,
            &port,
            Duration::from_secs(3600), // never idle during the test
        );
        let mut reset = PanicReset;

        CMDS.try_send(Command::FetchWeather).unwrap();
        let _ = with_timeout(
            Duration::from_millis(40),
            worker_loop(
                &mut power,
                &mut reset,
                CMDS.receiver(),
                NOTES.sender(),
                &wake,
                &activity,
                test_timing(),
            ),
        )
        .await;

        assert_eq!(
            NOTES.try_receive(),
            Ok(Notification::Weather { temp_c: 25 })
        );
        // The completed fetch woke the render context.
        assert!(wake.signaled());
    }

    #[tokio::test]
    async fn connect_wifi_reports_association() {
        static CMDS: Channel<CriticalSectionRawMutex, Command, CHANNEL_DEPTH> = Channel::new();
        static NOTES: Channel<CriticalSectionRawMutex, Notification, CHANNEL_DEPTH> =
            Channel::new();
        let wake = Signal::new();
        let activity = ActivityClock::new();
        let gate = PollerGate::new();
        let port = PanelPort::new();
        let mut power = PowerController::new(
            MockSleeper::new(),
            &activity,
            &gate,
            &port,
            Duration::from_secs(3600),
        );
        let mut reset = PanicReset;

        CMDS.try_send(Command::ConnectWifi).unwrap();
        let _ = with_timeout(
            Duration::from_millis(40),
            worker_loop(
                &mut power,
                &mut reset,
                CMDS.receiver(),
                NOTES.sender(),
                &wake,
                &activity,
                test_timing(),
            ),
        )
        .await;

        assert_eq!(NOTES.try_receive(), Ok(Notification::WifiConnected));
    }

    #[tokio::test]
    async fn minute_tick_is_broadcast() {
        static CMDS: Channel<CriticalSectionRawMutex, Command, CHANNEL_DEPTH> = Channel::new();
        static NOTES: Channel<CriticalSectionRawMutex, Notification, CHANNEL_DEPTH> =
            Channel::new();
        let wake = Signal::new();
        let activity = ActivityClock::new();
        let gate = PollerGate::new();
        let port = PanelPort::new();
        let mut power = PowerController::new(
            MockSleeper::new(),
            &activity,
            &gate,
            &port,
            Duration::from_secs(3600),
        );
        let mut reset = PanicReset;

        // time_broadcast is 15 ms in the test tuning; 40 ms covers at
        // least one broadcast with slack.
        let _ = with_timeout(
            Duration::from_millis(40),
            worker_loop(
                &mut power,
                &mut reset,
                CMDS.receiver(),
                NOTES.sender(),
                &wake,
                &activity,
                test_timing(),
            ),
        )
        .await;

        assert_eq!(NOTES.try_receive(), Ok(Notification::TimeUpdated));
    }

    #[tokio::test]
    async fn reboot_reaches_the_reset_line() {
        static CMDS: Channel<CriticalSectionRawMutex, Command, CHANNEL_DEPTH> = Channel::new();
        static NOTES: Channel<CriticalSectionRawMutex, Notification, CHANNEL_DEPTH> =
            Channel::new();

        CMDS.try_send(Command::Reboot).unwrap();
        let looped = async {
            let wake = Signal::new();
            let activity = ActivityClock::new();
            let gate = PollerGate::new();
            let port = PanelPort::new();
            let mut power = PowerController::new(
                MockSleeper::new(),
                &activity,
                &gate,
                &port,
                Duration::from_secs(3600),
            );
            let mut reset = PanicReset;
            worker_loop(
                &mut power,
                &mut reset,
                CMDS.receiver(),
                NOTES.sender(),
                &wake,
                &activity,
                test_timing(),
            )
            .await
        };

        let hit_reset = tokio::spawn(async move {
            let _ = with_timeout(Duration::from_millis(40), looped).await;
        })
        .await
        .is_err();
        assert!(hit_reset, "reboot dispatch must reach ResetControl::reboot");
    }
}
