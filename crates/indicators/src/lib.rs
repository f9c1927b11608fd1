pub mod engine;
pub mod window;

pub use engine::{IndicatorEngine, IndicatorParams};
pub use window::RollingWindow;
