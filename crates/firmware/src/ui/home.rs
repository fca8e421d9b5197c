//! Home screen.
//!
//! The appliance's single built-in application: a status screen with the
//! Wi-Fi link state, clock sync state and the last weather readout. A tap
//! anywhere re-queues a weather fetch.
//!
//! Drawing goes through [`Landscape`], so all coordinates here are landscape
//! (264 wide, 176 tall) regardless of the panel's portrait memory layout.

use core::fmt::Write as _;

use embedded_graphics::mono_font::ascii::{FONT_10X20, FONT_9X18};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle};
use embedded_graphics::text::Text;

use runtime::{App, Command, Landscape, Notification, RenderCx};

/// Wi-Fi link state as last reported by the background context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    /// No report yet since activation.
    Unknown,
    Online,
    Offline,
}

/// The home screen application.
pub struct HomeApp {
    link: LinkState,
    clock_synced: bool,
    temp_c: Option<i32>,
    boot_paint: bool,
    was_pressed: bool,
}

impl HomeApp {
    /// A home screen with nothing reported yet.
    pub const fn new() -> Self {
        Self {
            link: LinkState::Unknown,
            clock_synced: false,
            temp_c: None,
            boot_paint: false,
            was_pressed: false,
        }
    }

    /// Redraw the whole screen into the working frame and request a flush.
    fn repaint(&self, cx: &mut RenderCx<'_>) {
        cx.frame.fill(0xFF);
        // Drawing into the frame store cannot fail.
        let _ = self.draw(&mut Landscape::new(cx.frame));
        cx.request_flush();
    }

    /// Paint the status screen onto any binary draw target.
    fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let status = MonoTextStyle::new(&FONT_9X18, BinaryColor::On);
        let readout = MonoTextStyle::new(&FONT_10X20, BinaryColor::On);

        let link = match self.link {
            LinkState::Unknown => "WiFi  --",
            LinkState::Online => "WiFi  up",
            LinkState::Offline => "WiFi down",
        };
        Text::new(link, Point::new(8, 20), status).draw(target)?;

        let clock = if self.clock_synced {
            "time  ok"
        } else {
            "time  --"
        };
        Text::new(clock, Point::new(184, 20), status).draw(target)?;

        Line::new(Point::new(0, 30), Point::new(263, 30))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(target)?;

        // 16 bytes hold any i32 plus the unit.
        let mut temp: heapless::String<16> = heapless::String::new();
        match self.temp_c {
            Some(c) => {
                let _ = write!(temp, "{} C", c);
            }
            None => {
                let _ = temp.push_str("-- C");
            }
        }
        Text::new(&temp, Point::new(104, 100), readout).draw(target)?;

        Text::new("tap to refresh", Point::new(69, 164), status).draw(target)?;

        Ok(())
    }
}

impl App for HomeApp {
    fn on_start(&mut self) {
        // The first paint and the boot-time weather fetch happen on the
        // first tick; commands travel through the render context's sender.
        self.boot_paint = true;
        self.was_pressed = false;
    }

    fn on_stop(&mut self) {}

    fn on_event(&mut self, note: Notification, cx: &mut RenderCx<'_>) {
        let before = (self.link, self.clock_synced, self.temp_c);
        match note {
            Notification::WifiConnected => self.link = LinkState::Online,
            Notification::WifiDisconnected => self.link = LinkState::Offline,
            Notification::TimeUpdated => self.clock_synced = true,
            Notification::Weather { temp_c } => self.temp_c = Some(temp_c),
        }
        // A full e-paper refresh flashes the glass; skip it when the screen
        // would come out identical.
        if (self.link, self.clock_synced, self.temp_c) != before {
            self.repaint(cx);
        }
    }

    fn on_tick(&mut self, cx: &mut RenderCx<'_>) {
        if core::mem::take(&mut self.boot_paint) {
            cx.send_command(Command::FetchWeather);
            self.repaint(cx);
        }

        let fresh = cx.pressed && !self.was_pressed;
        self.was_pressed = cx.pressed;
        if fresh {
            // A tap re-queues the fetch; the repaint follows with the data.
            cx.send_command(Command::FetchWeather);
        }
    }
}

impl Default for HomeApp {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation
)]
mod tests {
    use super::*;

    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use embassy_sync::channel::Channel;
    use runtime::{ActivityClock, PanelFrame, TouchPoint, CHANNEL_DEPTH};

    /// Count the black pixels in a frame (cleared bits are ink).
    fn ink(frame: &PanelFrame) -> usize {
        frame
            .as_bytes()
            .iter()
            .map(|b| b.count_zeros() as usize)
            .sum()
    }

    fn point() -> TouchPoint {
        TouchPoint { x: 0, y: 0 }
    }

    #[test]
    fn first_tick_paints_and_queues_the_boot_fetch() {
        static CMDS: Channel<CriticalSectionRawMutex, Command, CHANNEL_DEPTH> = Channel::new();
        let activity = ActivityClock::new();
        let mut frame = PanelFrame::new();
        let mut app = HomeApp::new();
        app.on_start();

        let mut cx = RenderCx::new(point(), false, &mut frame, CMDS.sender(), &activity);
        app.on_tick(&mut cx);
        assert!(cx.flush_requested());

        assert_eq!(CMDS.try_receive(), Ok(Command::FetchWeather));
        assert!(CMDS.try_receive().is_err(), "exactly one boot fetch");
        assert!(ink(&frame) > 0, "status screen must put ink on the frame");
    }

    #[test]
    fn tap_requeues_the_weather_fetch_once_per_press() {
        static CMDS: Channel<CriticalSectionRawMutex, Command, CHANNEL_DEPTH> = Channel::new();
        let activity = ActivityClock::new();
        let mut frame = PanelFrame::new();
        let mut app = HomeApp::new();
        app.on_start();

        // Boot tick; drain the boot fetch.
        let mut cx = RenderCx::new(point(), false, &mut frame, CMDS.sender(), &activity);
        app.on_tick(&mut cx);
        assert_eq!(CMDS.try_receive(), Ok(Command::FetchWeather));

        // Press: one fetch.
        let mut cx = RenderCx::new(point(), true, &mut frame, CMDS.sender(), &activity);
        app.on_tick(&mut cx);
        assert_eq!(CMDS.try_receive(), Ok(Command::FetchWeather));

        // Held: no more.
        let mut cx = RenderCx::new(point(), true, &mut frame, CMDS.sender(), &activity);
        app.on_tick(&mut cx);
        assert!(CMDS.try_receive().is_err());

        // Release, press again: one more.
        let mut cx = RenderCx::new(point(), false, &mut frame, CMDS.sender(), &activity);
        app.on_tick(&mut cx);
        let mut cx = RenderCx::new(point(), true, &mut frame, CMDS.sender(), &activity);
        app.on_tick(&mut cx);
        assert_eq!(CMDS.try_receive(), Ok(Command::FetchWeather));
    }

    #[test]
    fn weather_repaints_only_when_the_readout_changes() {
        static CMDS: Channel<CriticalSectionRawMutex, Command, CHANNEL_DEPTH> = Channel::new();
        let activity = ActivityClock::new();
        let mut frame = PanelFrame::new();
        let mut app = HomeApp::new();
        app.on_start();

        let mut cx = RenderCx::new(point(), false, &mut frame, CMDS.sender(), &activity);
        app.on_tick(&mut cx);
        drop(cx);
        let boot_screen = frame.as_bytes().to_vec();

        let mut cx = RenderCx::new(point(), false, &mut frame, CMDS.sender(), &activity);
        app.on_event(Notification::Weather { temp_c: 23 }, &mut cx);
        assert!(cx.flush_requested());
        drop(cx);
        assert_ne!(frame.as_bytes().to_vec(), boot_screen);

        // The same readout again: no repaint, no flash.
        let mut cx = RenderCx::new(point(), false, &mut frame, CMDS.sender(), &activity);
        app.on_event(Notification::Weather { temp_c: 23 }, &mut cx);
        assert!(!cx.flush_requested());
    }

    #[test]
    fn status_line_tracks_link_and_clock_changes() {
        static CMDS: Channel<CriticalSectionRawMutex, Command, CHANNEL_DEPTH> = Channel::new();
        let activity = ActivityClock::new();
        let mut frame = PanelFrame::new();
        let mut app = HomeApp::new();
        app.on_start();

        let mut cx = RenderCx::new(point(), false, &mut frame, CMDS.sender(), &activity);
        app.on_event(Notification::WifiConnected, &mut cx);
        assert!(cx.flush_requested());

        let mut cx = RenderCx::new(point(), false, &mut frame, CMDS.sender(), &activity);
        app.on_event(Notification::WifiDisconnected, &mut cx);
        assert!(cx.flush_requested());

        let mut cx = RenderCx::new(point(), false, &mut frame, CMDS.sender(), &activity);
        app.on_event(Notification::TimeUpdated, &mut cx);
        assert!(cx.flush_requested());

        let mut cx = RenderCx::new(point(), false, &mut frame, CMDS.sender(), &activity);
        app.on_event(Notification::TimeUpdated, &mut cx);
        assert!(!cx.flush_requested(), "clock state did not change");
    }
}
