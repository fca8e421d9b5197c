//! Touch pipeline — 10 ms poll loop, orientation mapping, shared
//! last-write-wins touch state and the suspend gate used around light sleep.
//!
//! # Coordinate spaces
//!
//! The controller reports raw portrait coordinates (x along the panel's
//! short edge, y along the long edge, y running against the display's
//! landscape x). [`map_to_display`] swaps the axes and mirrors y so the
//! result lines up with the landscape UI: x in `0..264`, y in `0..176`.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Ticker};

use platform::touch::TouchSensor;

use crate::power::ActivityClock;

/// Poll cadence of the touch task.
pub const TOUCH_POLL: Duration = Duration::from_millis(10);

/// Landscape x maximum: the panel's long edge, mirrored. 264 - 1.
const LOGICAL_MAX_X: u16 = 263;

/// Landscape y maximum: the panel's short edge. 176 - 1.
const LOGICAL_MAX_Y: u16 = 175;

/// One point in display-logical (landscape) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchPoint {
    /// 0..=263, left to right in landscape orientation
    pub x: u16,
    /// 0..=175, top to bottom in landscape orientation
    pub y: u16,
}

/// Map a raw controller coordinate pair into display-logical space.
///
/// Axis swap plus y-mirror, then clamp — a sample that decodes outside the
/// panel (controller glitch) lands on the nearest edge instead of wrapping.
pub fn map_to_display(raw_x: u16, raw_y: u16) -> TouchPoint {
    let clamped_y = raw_y.min(LOGICAL_MAX_X);
    // clamped_y <= LOGICAL_MAX_X, so the subtraction cannot underflow.
    #[allow(clippy::arithmetic_side_effects)]
    let x = LOGICAL_MAX_X - clamped_y;
    let y = raw_x.min(LOGICAL_MAX_Y);
    TouchPoint { x, y }
}

// ---------------------------------------------------------------------------
// CurrentTouch — shared last-write-wins state
// ---------------------------------------------------------------------------

/// The most recent touch state, shared between the poller and the render
/// context without a lock.
///
/// The point is packed into one `AtomicU32` (x high half, y low half), so a
/// reader can never observe a torn coordinate pair. `pressed` is a separate
/// atomic: a reader may pair a fresh `pressed` with a point that is one poll
/// old (or the reverse). That skew is accepted — the consumer re-reads every
/// UI tick and only the latest state matters.
pub struct CurrentTouch {
    xy: AtomicU32,
    pressed: AtomicBool,
}

impl CurrentTouch {
    /// Released at the origin.
    pub const fn new() -> Self {
        Self {
            xy: AtomicU32::new(0),
            pressed: AtomicBool::new(false),
        }
    }

    /// Record a pressed sample at `point`.
    pub fn store_pressed(&self, point: TouchPoint) {
        // Both halves are u16; a 16-bit shift on u32 cannot overflow.
        #[allow(clippy::arithmetic_side_effects)]
        let packed = (u32::from(point.x) << 16) | u32::from(point.y);
        self.xy.store(packed, Ordering::Relaxed);
        self.pressed.store(true, Ordering::Relaxed);
    }

    /// Record a release. The last position is retained for tap handling.
    pub fn store_released(&self) {
        self.pressed.store(false, Ordering::Relaxed);
    }

    /// Latest state: `(point, pressed)`.
    pub fn read(&self) -> (TouchPoint, bool) {
        let packed = self.xy.load(Ordering::Relaxed);
        // Packed by store_pressed: both halves fit u16 by construction.
        #[allow(clippy::cast_possible_truncation, clippy::arithmetic_side_effects)]
        let x = (packed >> 16) as u16;
        #[allow(clippy::cast_possible_truncation)]
        let y = (packed & 0xFFFF) as u16;
        (TouchPoint { x, y }, self.pressed.load(Ordering::Relaxed))
    }
}

impl Default for CurrentTouch {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// PollerGate — cooperative suspend around light sleep
// ---------------------------------------------------------------------------

/// Pause/resume handshake between the power controller and the poll loop.
///
/// `pause` does not return until the poller has actually parked, so the
/// caller knows the sensor bus is quiet before shutting peripherals down.
/// Exactly one controller drives the gate; pause and resume strictly
/// alternate.
pub struct PollerGate {
    paused: AtomicBool,
    parked: Signal<CriticalSectionRawMutex, ()>,
    resume: Signal<CriticalSectionRawMutex, ()>,
}

impl PollerGate {
    /// A new gate in the running state.
    pub const fn new() -> Self {
        Self {
            paused: AtomicBool::new(false),
            parked: Signal::new(),
            resume: Signal::new(),
        }
    }

    /// Ask the poller to park and wait until it has.
    pub async fn pause(&self) {
        self.parked.reset();
        self.paused.store(true, Ordering::Release);
        self.parked.wait().await;
    }

    /// Release a parked poller.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.resume.signal(());
    }

    /// Poller side: park if asked. Returns `true` if the loop was parked and
    /// has just been released (the sensor needs a re-init before reuse).
    pub async fn check(&self) -> bool {
        if !self.paused.load(Ordering::Acquire) {
            return false;
        }
        self.parked.signal(());
        self.resume.wait().await;
        true
    }
}

impl Default for PollerGate {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Poll loop
// ---------------------------------------------------------------------------

/// Touch poll loop: read, map, publish, wake.
///
/// Every [`TOUCH_POLL`]:
/// 1. park on the gate if the power controller asked (re-initializing the
///    sensor on release — the wake path re-powers the bus),
/// 2. read and decode one sample,
/// 3. store it into `touch`, stamping `activity` while pressed,
/// 4. fire `wake` when pressed or when the pressed state just changed, so
///    the render loop reacts to presses and releases without waiting out its
///    idle period.
///
/// A failed read publishes as no-touch for that tick and is logged; a lost
/// press self-corrects one poll later. The loop never stops.
pub async fn poller_loop<S: TouchSensor>(
    sensor: &mut S,
    gate: &PollerGate,
    touch: &CurrentTouch,
    wake: &Signal<CriticalSectionRawMutex, ()>,
    activity: &ActivityClock,
) {
    let mut ticker = Ticker::every(TOUCH_POLL);
    let mut last_pressed = false;
    loop {
        if gate.check().await {
            if let Err(_e) = sensor.init().await {
                #[cfg(feature = "defmt")]
                defmt::warn!("touch re-init after wake failed: {}", _e);
            }
            // The pause may have lasted a while; restart the cadence.
            ticker.reset();
        }
        let pressed = match sensor.read().await {
            Ok(sample) if sample.pressed => {
                touch.store_pressed(map_to_display(sample.x, sample.y));
                activity.touch();
                true
            }
            Ok(_) => {
                touch.store_released();
                false
            }
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::debug!("touch read failed: {}", _e);
                touch.store_released();
                false
            }
        };
        if pressed || pressed != last_pressed {
            wake.signal(());
        }
        last_pressed = pressed;
        ticker.next().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use embassy_time::with_timeout;
    use platform::mocks::MockTouchSensor;
    use platform::touch::TouchError;

    #[test]
    fn mapping_swaps_and_mirrors() {
        // Raw origin lands at the far end of the landscape x axis.
        assert_eq!(map_to_display(0, 0), TouchPoint { x: 263, y: 0 });
        // Raw far corner lands at the landscape origin row.
        assert_eq!(map_to_display(175, 263), TouchPoint { x: 0, y: 175 });
        assert_eq!(map_to_display(10, 100), TouchPoint { x: 163, y: 10 });
    }

    #[test]
    fn mapping_clamps_out_of_range_samples() {
        assert_eq!(map_to_display(999, 999), TouchPoint { x: 0, y: 175 });
        assert_eq!(map_to_display(0, 500), TouchPoint { x: 0, y: 0 });
    }

    #[test]
    fn current_touch_roundtrip() {
        let touch = CurrentTouch::new();
        assert_eq!(touch.read(), (TouchPoint { x: 0, y: 0 }, false));

        touch.store_pressed(TouchPoint { x: 263, y: 175 });
        assert_eq!(touch.read(), (TouchPoint { x: 263, y: 175 }, true));

        // Release keeps the last position.
        touch.store_released();
        assert_eq!(touch.read(), (TouchPoint { x: 263, y: 175 }, false));
    }

    async fn run_poller_for(
        ms: u64,
        sensor: &mut MockTouchSensor,
        gate: &PollerGate,
        touch: &CurrentTouch,
        wake: &Signal<CriticalSectionRawMutex, ()>,
        activity: &ActivityClock,
    ) {
        let _ = with_timeout(
            Duration::from_millis(ms),
            poller_loop(sensor, gate, touch, wake, activity),
        )
        .await;
    }

    #[tokio::test]
    async fn press_is_published_and_wakes_render() {
        let mut sensor = MockTouchSensor::new();
        sensor.press(0, 0); // raw origin → logical (263, 0)

        let gate = PollerGate::new();
        let touch = CurrentTouch::new();
        let wake = Signal::new();
        let activity = ActivityClock::new();

        run_poller_for(15, &mut sensor, &gate, &touch, &wake, &activity).await;

        assert_eq!(touch.read(), (TouchPoint { x: 263, y: 0 }, true));
        assert!(wake.signaled());
    }

    #[tokio::test]
    async fn release_edge_wakes_once_then_goes_quiet() {
        let mut sensor = MockTouchSensor::new();
        sensor.press(10, 10);
        sensor.release();
        // Script exhausted → steady released samples follow.

        let gate = PollerGate::new();
        let touch = CurrentTouch::new();
        let wake = Signal::new();
        let activity = ActivityClock::new();

        run_poller_for(25, &mut sensor, &gate, &touch, &wake, &activity).await;
        assert!(!touch.read().1);
        // Press tick and the release edge both signalled.
        assert!(wake.signaled());

        // Drain, then run further steady released ticks: no new wake.
        wake.reset();
        run_poller_for(25, &mut sensor, &gate, &touch, &wake, &activity).await;
        assert!(!wake.signaled());
    }

    #[tokio::test]
    async fn read_errors_publish_as_released() {
        let mut sensor = MockTouchSensor::new();
        sensor.press(5, 5);
        sensor.fail(TouchError::Bus);

        let gate = PollerGate::new();
        let touch = CurrentTouch::new();
        let wake = Signal::new();
        let activity = ActivityClock::new();

        run_poller_for(25, &mut sensor, &gate, &touch, &wake, &activity).await;
        // The failed read counts as no touch, ending the press. The last
        // position survives for tap handling.
        let (point, pressed) = touch.read();
        assert!(!pressed);
        assert_eq!(point, map_to_display(5, 5));
    }

    #[tokio::test]
    async fn gate_parks_and_reinits_on_resume() {
        let mut sensor = MockTouchSensor::new();
        let gate = PollerGate::new();
        let touch = CurrentTouch::new();
        let wake = Signal::new();
        let activity = ActivityClock::new();

        // Boot init, as the firmware does before spawning the loop.
        sensor.init().await.unwrap();
        assert_eq!(sensor.init_count(), 1);

        let poller = poller_loop(&mut sensor, &gate, &touch, &wake, &activity);
        let controller = async {
            embassy_time::Timer::after_millis(15).await;
            gate.pause().await; // returns only once the poller is parked
            embassy_time::Timer::after_millis(15).await;
            gate.resume();
            embassy_time::Timer::after_millis(15).await;
        };
        let _ = with_timeout(
            Duration::from_millis(120),
            embassy_futures::join::join(poller, controller),
        )
        .await;

        // Resume re-ran TouchSensor::init.
        assert_eq!(sensor.init_count(), 2);
    }
}
