mod clock;
mod engine;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{RetentionEngine, RetentionOutcome, RetentionPolicy};
