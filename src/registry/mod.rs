// Registry module - Identity Registry
// One real-world identifier, one commitment, forever. Hashed keys,
// atomic mapping writes, idempotent recovery.

mod hash;
mod registry;
mod store;

pub use hash::*;
pub use registry::*;
pub use store::*;
