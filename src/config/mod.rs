//! Configuration: environment-driven settings.

mod settings;

pub use settings::*;
