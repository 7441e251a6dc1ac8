pub mod combinations;
pub mod engine;
pub mod error;
pub mod feasibility;
pub mod price;
pub mod selector;

pub use combinations::*;
pub use engine::*;
pub use error::*;
pub use feasibility::*;
pub use price::*;
pub use selector::*;

/// Hard cap on tasks enumerated together; Bell(12) is already 4,213,597 partitions
pub const MAX_PARTITION_TASKS: usize = 12;
