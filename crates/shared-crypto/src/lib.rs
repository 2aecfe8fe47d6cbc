//! # Shared Crypto
//!
//! Cryptographic primitives for the session pipeline and PoOT consensus.
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `symmetric` | XChaCha20-Poly1305, AES-256-GCM | Chunk encryption, key wrapping |
//! | `hashing` | BLAKE3 | Chunk content hashes, signing digests |
//! | `merkle` | BLAKE3 binary tree | Session roots, storage inclusion proofs |
//! | `signatures` | Ed25519 | Node proof and beacon signatures |
//!
//! ## Security Properties
//!
//! - **AEAD nonces**: caller-supplied, built from a per-key prefix and a
//!   monotonic counter
//! - **Ed25519**: strict verification, deterministic signing
//! - **Merkle**: duplicate-last reduction, index-bound inclusion proofs

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
#[allow(missing_docs)]
pub mod merkle;
pub mod signatures;
pub mod symmetric;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{blake3_hash, blake3_hash_many, Blake3Hasher, Hash};
pub use merkle::{merkle_root, MerkleProof, MerkleTree, ProofNode, SiblingPosition};
pub use signatures::{verify_ed25519, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use symmetric::{open, seal, Cipher, SecretKey};
