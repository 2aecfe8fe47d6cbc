//! # Lucid Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # criterion benchmarks (hashing, Merkle, AEAD)
//! └── src/integration/  # scenarios spanning more than one subsystem
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p lucid-tests
//! cargo test -p lucid-tests integration::proofs
//! cargo bench -p lucid-tests
//! ```

pub mod integration;
