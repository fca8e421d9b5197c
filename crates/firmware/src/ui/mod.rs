//! Built-in screens.
//!
//! The home screen is the only application shipped in the image; `main`
//! activates it right after the runtime tasks come up.

pub mod home;

pub use home::HomeApp;
