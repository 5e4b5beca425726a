// Submitter module - Nonce-Serializing Transaction Submitter
// Every ledger write from the single operator identity goes through
// here; ordering conflicts are retried with bounded linear backoff.

mod submitter;

pub use submitter::*;
