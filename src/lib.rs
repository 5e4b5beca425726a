// civicpoll - Anonymous civic voting core
//
// Residents cast anonymous, non-repeatable votes on civic proposals,
// verified against an immutable ledger. The crate implements the
// ledger-facing protocol core:
//
// - ledger: typed gateway to the election and membership-group
//   contracts, revert classification, in-memory dev ledger
// - submitter: nonce-serialized writes with bounded retry
// - registry: one identifier, one commitment, forever
// - election: data model, lifecycle guards, monitor, admin surface
// - vote: anonymous vote admission and the proof-input contract
//
// The ledger itself, the proof math, and the rendering layer are
// external collaborators behind trait seams.

pub mod clock;
pub mod election;
pub mod error;
pub mod ledger;
pub mod registry;
pub mod submitter;
pub mod vote;

pub use error::ProtocolError;
