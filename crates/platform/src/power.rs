//! Power management abstraction
//!
//! Light sleep stops the CPU with RAM and peripheral state retained; a level
//! wake on the touch interrupt line resumes execution in place. The runtime's
//! power controller owns when to sleep; this trait owns how.

/// Wake-up source armed before light sleep.
///
/// Exactly one source is armed per sleep. The touch interrupt line is
/// level-triggered and active-low: if a finger is already down when the CPU
/// tries to sleep, the sleep call returns immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeSource {
    /// Touch controller INT line (active-low, level-triggered)
    TouchInterrupt,
}

/// Why a light sleep ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeReason {
    /// The armed GPIO wake line asserted
    Gpio,
}

/// CPU light-sleep control.
pub trait Sleeper {
    /// Arm `wake`, stop the CPU, return once the wake line asserts.
    ///
    /// RAM, peripheral registers and the panel's retained image survive the
    /// sleep. Failure to enter sleep is reported, not retried; the caller
    /// logs it and carries on awake.
    fn light_sleep(
        &mut self,
        wake: WakeSource,
    ) -> impl core::future::Future<Output = Result<WakeReason, SleepError>>;
}

/// System reset control.
pub trait ResetControl {
    /// Reboot the system. Does not return.
    fn reboot(&mut self) -> !;
}

/// Sleep failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SleepError {
    /// The wake source could not be armed
    WakeArm,
    /// The sleep request was rejected by the hardware
    Rejected,
}

#[cfg(feature = "std")]
impl std::error::Error for SleepError {}

impl core::fmt::Display for SleepError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::WakeArm => write!(f, "Wake source arm failed"),
            Self::Rejected => write!(f, "Sleep request rejected"),
        }
    }
}
