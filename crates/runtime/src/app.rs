//! Application layer boundary.
//!
//! Applications live outside this crate; the runtime only knows the [`App`]
//! trait and the lifecycle discipline: exactly one instance is active, the
//! old one is stopped before the new one starts, and both hooks that run
//! inside the render loop get a [`RenderCx`] with the working frame and the
//! command path to the background context.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Sender;

use crate::bus::{self, CHANNEL_DEPTH};
use crate::event::{Command, Notification};
use crate::frame::PanelFrame;
use crate::power::ActivityClock;
use crate::touch::TouchPoint;

/// Per-callback services handed to the active application.
///
/// Built fresh by the render loop each iteration; the flush request and the
/// touch sample are only valid for the callback they were passed to.
pub struct RenderCx<'a> {
    /// Latest touch point, display-logical (landscape) coordinates.
    pub touch: TouchPoint,
    /// Whether the panel is pressed right now.
    pub pressed: bool,
    /// The working frame. Drawing lands here; nothing reaches the glass
    /// until [`request_flush`](Self::request_flush).
    pub frame: &'a mut PanelFrame,
    commands: Sender<'a, CriticalSectionRawMutex, Command, CHANNEL_DEPTH>,
    activity: &'a ActivityClock,
    flush: bool,
}

impl<'a> RenderCx<'a> {
    /// Assemble a context for one callback.
    pub fn new(
        touch: TouchPoint,
        pressed: bool,
        frame: &'a mut PanelFrame,
        commands: Sender<'a, CriticalSectionRawMutex, Command, CHANNEL_DEPTH>,
        activity: &'a ActivityClock,
    ) -> Self {
        Self {
            touch,
            pressed,
            frame,
            commands,
            activity,
            flush: false,
        }
    }

    /// Ask the runtime to push the working frame to the panel once this
    /// callback returns.
    pub fn request_flush(&mut self) {
        self.flush = true;
    }

    /// Queue a command for the background context.
    ///
    /// Counts as user activity (commands originate from interaction), so the
    /// idle clock restarts. Returns `false` if the channel was full and the
    /// command was dropped.
    pub fn send_command(&mut self, command: Command) -> bool {
        self.activity.touch();
        bus::post_command(&self.commands, command)
    }

    /// Whether a flush was requested. Read by the render loop after the
    /// callback returns; visible for application tests.
    pub fn flush_requested(&self) -> bool {
        self.flush
    }
}

/// A swappable application.
///
/// `on_event` and `on_tick` run in the render context and may draw and send
/// commands through the [`RenderCx`]; the default implementations do
/// nothing. `on_start` and `on_stop` bracket the instance's active life.
/// `Send` because the render loop may be hosted on an interrupt-mode
/// executor, whose spawner only accepts sendable futures.
pub trait App: Send {
    /// The instance becomes the active application. Set up state here;
    /// the first `on_tick` follows within one render iteration.
    fn on_start(&mut self);

    /// The instance stops being the active application. Release whatever
    /// `on_start` claimed.
    fn on_stop(&mut self);

    /// A notification from the background context.
    fn on_event(&mut self, note: Notification, cx: &mut RenderCx<'_>) {
        let _ = (note, cx);
    }

    /// One render tick.
    fn on_tick(&mut self, cx: &mut RenderCx<'_>) {
        let _ = cx;
    }
}

/// Holder of the single active application.
///
/// `activate` enforces the lifecycle order: the outgoing instance is stopped
/// before the incoming one starts, so no two applications are ever live at
/// once. Re-activating the instance that is already active cannot be
/// expressed — the host holds it exclusively for as long as it is active.
pub struct AppHost<'a> {
    active: Option<&'a mut dyn App>,
}

impl<'a> AppHost<'a> {
    /// An empty host; ticks and events are dropped until `activate`.
    pub const fn new() -> Self {
        Self { active: None }
    }

    /// Make `app` the active application.
    pub fn activate(&mut self, app: &'a mut dyn App) {
        if let Some(old) = self.active.take() {
            old.on_stop();
        }
        app.on_start();
        self.active = Some(app);
    }

    /// Stop and release the active application, if any.
    pub fn shutdown(&mut self) {
        if let Some(old) = self.active.take() {
            old.on_stop();
        }
    }

    /// Whether an application is active.
    pub fn has_active(&self) -> bool {
        self.active.is_some()
    }

    /// Run the active application's tick hook.
    pub fn tick(&mut self, cx: &mut RenderCx<'_>) {
        if let Some(app) = self.active.as_deref_mut() {
            app.on_tick(cx);
        }
    }

    /// Forward a notification to the active application.
    pub fn deliver(&mut self, note: Notification, cx: &mut RenderCx<'_>) {
        if let Some(app) = self.active.as_deref_mut() {
            app.on_event(note, cx);
        }
    }
}

impl Default for AppHost<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use embassy_sync::channel::Channel;

    #[derive(Default)]
    struct ProbeApp {
        started: usize,
        stopped: usize,
        ticks: usize,
        events: usize,
        last_weather: Option<i32>,
    }

    impl App for ProbeApp {
        fn on_start(&mut self) {
            self.started += 1;
        }

        fn on_stop(&mut self) {
            self.stopped += 1;
        }

        fn on_event(&mut self, note: Notification, _cx: &mut RenderCx<'_>) {
            self.events += 1;
            if let Notification::Weather { temp_c } = note {
                self.last_weather = Some(temp_c);
            }
        }

        fn on_tick(&mut self, cx: &mut RenderCx<'_>) {
            self.ticks += 1;
            if cx.pressed {
                cx.send_command(Command::FetchWeather);
                cx.request_flush();
            }
        }
    }

    #[test]
    fn activate_stops_old_before_starting_new() {
        let mut first = ProbeApp::default();
        let mut second = ProbeApp::default();

        {
            let mut host = AppHost::new();
            assert!(!host.has_active());
            host.activate(&mut first);
            host.activate(&mut second);
            host.shutdown();
        }

        assert_eq!((first.started, first.stopped), (1, 1));
        assert_eq!((second.started, second.stopped), (1, 1));
    }

    #[test]
    fn hooks_reach_the_active_app_only() {
        static COMMANDS: Channel<CriticalSectionRawMutex, Command, CHANNEL_DEPTH> = Channel::new();
        let activity = ActivityClock::new();
        let mut frame = PanelFrame::new();
        let mut app = ProbeApp::default();

        {
            let mut host = AppHost::new();

            // Nothing active: hooks are dropped on the floor.
            let mut cx = RenderCx::new(
                TouchPoint { x: 0, y: 0 },
                false,
                &mut frame,
                COMMANDS.sender(),
                &activity,
            );
            host.tick(&mut cx);
            host.deliver(Notification::TimeUpdated, &mut cx);

            host.activate(&mut app);
            let mut cx = RenderCx::new(
                TouchPoint { x: 0, y: 0 },
                false,
                &mut frame,
                COMMANDS.sender(),
                &activity,
            );
            host.tick(&mut cx);
            host.deliver(Notification::Weather { temp_c: 25 }, &mut cx);
        }

        assert_eq!(app.ticks, 1);
        assert_eq!(app.events, 1);
        assert_eq!(app.last_weather, Some(25));
    }

    #[test]
    fn context_routes_commands_and_flush_requests() {
        static COMMANDS: Channel<CriticalSectionRawMutex, Command, CHANNEL_DEPTH> = Channel::new();
        let activity = ActivityClock::new();
        let mut frame = PanelFrame::new();
        let mut app = ProbeApp::default();

        {
            let mut host = AppHost::new();
            host.activate(&mut app);

            let mut cx = RenderCx::new(
                TouchPoint { x: 100, y: 50 },
                true,
                &mut frame,
                COMMANDS.sender(),
                &activity,
            );
            host.tick(&mut cx);
            assert!(cx.flush_requested());
        }

        assert_eq!(COMMANDS.try_receive(), Ok(Command::FetchWeather));
    }
}
