// Vote module - Vote Admission Protocol
// Anonymous vote relay plus the exact proof-input contract shared with
// the external prover.

mod admission;
mod proof;

pub use admission::*;
pub use proof::*;
