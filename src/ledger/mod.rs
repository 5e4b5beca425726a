// Ledger module - Ledger Gateway
// Typed access to the election ledger and membership-group contracts,
// revert classification, and the in-memory development ledger.

mod memory;
mod revert;
mod traits;
mod types;

pub use memory::*;
pub use revert::*;
pub use traits::*;
pub use types::*;
