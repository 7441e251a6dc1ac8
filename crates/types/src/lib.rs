pub mod batch;
pub mod fixed;
pub mod matching;
pub mod settlement;
pub mod task;

pub use batch::*;
pub use fixed::*;
pub use matching::*;
pub use settlement::*;
pub use task::*;

/// Fixed-point price scale used by the pool: sqrt prices carry 96 fractional bits
pub const Q96_BITS: usize = 96;
