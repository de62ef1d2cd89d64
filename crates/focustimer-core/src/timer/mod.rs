mod clock;
mod driver;
mod engine;
mod format;

pub use clock::{Clock, ManualClock, SystemClock};
pub use driver::TimerDriver;
pub use engine::{TimerEngine, TimerSnapshot, TimerState};
pub use format::format_time;
