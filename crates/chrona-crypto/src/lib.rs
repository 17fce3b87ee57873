//! Cryptographic primitives for Chrona.
//!
//! Provides domain-separated BLAKE3 hashing, Ed25519 signing/verification,
//! and hash chain verification for the vault's transaction journal.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod chain;
pub mod hasher;
pub mod signer;

pub use chain::{ChainError, Chained, HashChainVerifier};
pub use hasher::{ContentHasher, HasherError};
pub use signer::{Signature, SignatureError, SigningKey, VerifyingKey};
