mod interval;
mod quote;
mod symbol;
mod timestamp;

pub use interval::Interval;
pub use quote::{round2, OhlcvRow, Quote};
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;
