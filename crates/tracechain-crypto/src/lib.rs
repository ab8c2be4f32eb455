//! Cryptographic primitives for Tracechain.
//!
//! Provides the SHA-256 hash primitive, the Merkle accumulator that commits a
//! block's events (with inclusion proofs), the canonical event serialization
//! fed into Merkle leaves, and the block hash linkage rule.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.
//! Every digest is a 64-character lowercase hex string, and every composite
//! digest is computed over the *string* concatenation of its parts so that
//! stored records can be re-derived from their textual fields alone.

pub mod canonical;
pub mod chain;
pub mod hasher;
pub mod merkle;

pub use canonical::{canonical_event, event_leaves, events_merkle_root, HashError};
pub use chain::{block_hash, expected_prev_hash, recompute_block_hash};
pub use hasher::{digest, digest_concat};
pub use merkle::{merkle_root, MerkleProof, MerkleTree, Side, EMPTY_ROOT_INPUT};
