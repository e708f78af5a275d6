pub mod timer;

pub use timer::{unix_millis, HighPrecisionTimer, ManualTimer, Timer};
