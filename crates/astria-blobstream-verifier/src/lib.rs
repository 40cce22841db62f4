//! Verifies that a blob posted to Celestia is covered by a Blobstream attestation.
//!
//! Given the hash of the transaction that paid for a blob, the index of the blob
//! among those the transaction paid for, and the data commitment (a range of
//! Celestia blocks and the nonce it was stored under), the [`Verifier`] establishes
//! the chain
//!
//! ```text
//! blob shares -> data root of the block -> data commitment -> Blobstream contract
//! ```
//!
//! by fetching proofs from a celestia-core node and checking the last link with a
//! read-only call to the Blobstream contract. See [`verifier`] for the stages.
pub mod attestation;
pub mod batch;
pub mod config;
pub mod locate;
pub mod merkle_proof;
pub mod share_proof;
pub mod square;
pub mod telemetry;
pub mod verifier;

pub use config::Config;
pub use verifier::Verifier;
