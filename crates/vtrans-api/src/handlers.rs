//! Request handlers.

pub mod health;
pub mod transcoding;
pub mod uploads;

pub use health::*;
pub use transcoding::*;
pub use uploads::*;
