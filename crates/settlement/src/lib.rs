pub mod balances;
pub mod error;

pub use balances::*;
pub use error::*;
