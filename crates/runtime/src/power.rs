//! Power controller — idle tracking and the light-sleep transition.
//!
//! The appliance spends most of its life asleep: after [`IDLE_TIMEOUT`]
//! without user input or finished background work, the background loop walks
//! the device down (touch poller parked, panel in deep sleep, logs flushed),
//! stops the CPU with the touch interrupt armed as the only wake source, and
//! walks everything back up when a finger lands on the glass.
//!
//! Nothing in the transition is retried: a peripheral that fails to suspend
//! or resume is logged and the sequence carries on. Staying up draws more
//! battery; wedging the device draws complaints.

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_time::{Duration, Instant, Timer};

use platform::power::{Sleeper, WakeSource};

use crate::panel::{PanelPort, PanelRequest};
use crate::touch::PollerGate;

/// Idle time before the sleep transition starts.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Settle delay after wake before peripherals are re-initialized.
pub const WAKE_SETTLE: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// ActivityClock
// ---------------------------------------------------------------------------

/// Wrapping-millisecond stamp of the last user activity.
///
/// Any context may stamp it: the touch poller on presses, the background
/// loop when a job finishes, the power controller after a wake. The stamp is
/// a truncated millisecond counter that wraps every ~49.7 days; the idle
/// computation detects the wrap and resets rather than reporting a bogus
/// multi-week idle span.
pub struct ActivityClock {
    last: AtomicU32,
}

impl ActivityClock {
    /// A fresh clock: "activity just happened at time zero".
    pub const fn new() -> Self {
        Self {
            last: AtomicU32::new(0),
        }
    }

    /// Record activity now.
    pub fn touch(&self) {
        self.touch_at(Self::now_millis());
    }

    /// Idle time elapsed since the last recorded activity.
    pub fn idle_for(&self) -> Duration {
        self.idle_at(Self::now_millis())
    }

    /// Record activity at an explicit millisecond stamp.
    pub fn touch_at(&self, now_ms: u32) {
        self.last.store(now_ms, Ordering::Relaxed);
    }

    /// Idle time at an explicit millisecond stamp.
    ///
    /// If `now_ms` is behind the stored stamp the counter has wrapped (or
    /// the stamp came from a torn epoch); the stamp is reset to `now_ms` and
    /// the idle span reads as zero. The next real interval measures cleanly
    /// from there.
    pub fn idle_at(&self, now_ms: u32) -> Duration {
        let last = self.last.load(Ordering::Relaxed);
        if now_ms < last {
            self.last.store(now_ms, Ordering::Relaxed);
            return Duration::from_millis(0);
        }
        // now_ms >= last, so the subtraction cannot underflow.
        #[allow(clippy::arithmetic_side_effects)]
        Duration::from_millis(u64::from(now_ms - last))
    }

    /// Millisecond tick truncated to u32 — wraps like a classic `millis()`.
    #[allow(clippy::cast_possible_truncation)]
    fn now_millis() -> u32 {
        Instant::now().as_millis() as u32
    }
}

impl Default for ActivityClock {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// PowerController
// ---------------------------------------------------------------------------

/// Power state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    /// Normal operation
    Active,
    /// Peripherals are being suspended
    EnteringSleep,
    /// CPU stopped, waiting on the touch interrupt
    Asleep,
    /// Peripherals are being brought back up
    Waking,
}

/// Drives `Active → EnteringSleep → Asleep → Waking → Active`.
///
/// Owned and serviced by the background loop; one [`service`] call per loop
/// iteration is the whole scheduling contract.
///
/// [`service`]: PowerController::service
pub struct PowerController<'a, SL: Sleeper> {
    sleeper: SL,
    activity: &'a ActivityClock,
    gate: &'a PollerGate,
    panel: &'a PanelPort,
    idle_timeout: Duration,
    state: PowerState,
}

impl<'a, SL: Sleeper> PowerController<'a, SL> {
    /// New controller in the [`PowerState::Active`] state.
    pub fn new(
        sleeper: SL,
        activity: &'a ActivityClock,
        gate: &'a PollerGate,
        panel: &'a PanelPort,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            sleeper,
            activity,
            gate,
            panel,
            idle_timeout,
            state: PowerState::Active,
        }
    }

    /// Current state. Outside a [`service`](Self::service) call this is
    /// always [`PowerState::Active`].
    pub fn state(&self) -> PowerState {
        self.state
    }

    /// Idle check; runs the full sleep/wake cycle when the threshold is met.
    ///
    /// Returns `true` if a sleep cycle ran (the device slept and woke again).
    pub async fn service(&mut self) -> bool {
        if self.activity.idle_for() < self.idle_timeout {
            return false;
        }
        self.run_sleep_cycle().await;
        true
    }

    /// The walk-down / sleep / walk-up sequence, in strict order:
    ///
    /// 1. park the touch poller (returns once the sensor bus is quiet),
    /// 2. put the panel into deep sleep via the transmit task — an in-flight
    ///    frame finishes first, it is never cancelled,
    /// 3. flush logs,
    /// 4. light sleep, touch interrupt armed as the only wake source,
    /// 5. wake: settle delay, panel re-init, poller release (the poller
    ///    re-inits the sensor bus before its first poll), activity stamp so
    ///    the next idle evaluation starts from zero.
    async fn run_sleep_cycle(&mut self) {
        self.state = PowerState::EnteringSleep;
        #[cfg(feature = "defmt")]
        defmt::info!("idle {} ms, entering light sleep", self.idle_timeout.as_millis());

        self.gate.pause().await;
        self.panel.request(PanelRequest::Sleep).await;

        #[cfg(feature = "defmt")]
        defmt::flush();

        self.state = PowerState::Asleep;
        match self.sleeper.light_sleep(WakeSource::TouchInterrupt).await {
            Ok(_reason) => {
                #[cfg(feature = "defmt")]
                defmt::debug!("woke from light sleep: {}", _reason);
            }
            Err(_e) => {
                // Stay-awake is the failure mode, not a wedge: log and walk
                // the peripherals back up as if we had slept.
                #[cfg(feature = "defmt")]
                defmt::warn!("light sleep entry failed: {}", _e);
            }
        }

        self.state = PowerState::Waking;
        Timer::after(WAKE_SETTLE).await;
        self.panel.request(PanelRequest::Wake).await;
        self.gate.resume();
        self.activity.touch();
        self.state = PowerState::Active;

        #[cfg(feature = "defmt")]
        defmt::info!("wake transition complete");
    }
}
