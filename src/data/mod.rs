//! External data collaborators: live weather and the demo dataset.

pub mod synthetic;
pub mod weather;

pub use synthetic::{DemoConfig, DemoData, generate_demo};
pub use weather::{LiveWeatherSource, OpenWeatherClient, StaticReading};
