//! Touch controller abstraction
//!
//! The sensor is an FT6336-class capacitive controller polled over I2C. The
//! trait deals in raw controller coordinates; orientation mapping is runtime
//! policy and lives with the touch pipeline, not here.

/// One decoded touch status read, in raw controller coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchSample {
    /// A valid contact is present (controller reported 1 or 2 points).
    pub pressed: bool,
    /// Raw X of the first contact; 0 when not pressed.
    pub x: u16,
    /// Raw Y of the first contact; 0 when not pressed.
    pub y: u16,
}

impl TouchSample {
    /// The released state.
    pub const RELEASED: Self = Self {
        pressed: false,
        x: 0,
        y: 0,
    };
}

/// Touch controller access.
pub trait TouchSensor {
    /// Reset the controller and probe the bus.
    ///
    /// Called at boot and again after every light-sleep wake, before the
    /// poll loop resumes.
    fn init(&mut self) -> impl core::future::Future<Output = Result<(), TouchError>>;

    /// Read and decode one status block.
    fn read(&mut self) -> impl core::future::Future<Output = Result<TouchSample, TouchError>>;
}

/// Touch failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TouchError {
    /// I2C transaction failed
    Bus,
    /// Reset line failed
    Gpio,
}

#[cfg(feature = "std")]
impl std::error::Error for TouchError {}

impl core::fmt::Display for TouchError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bus => write!(f, "Touch bus error"),
            Self::Gpio => write!(f, "Touch reset pin error"),
        }
    }
}
