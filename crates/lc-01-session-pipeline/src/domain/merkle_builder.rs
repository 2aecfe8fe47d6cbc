//! # Session Merkle Builder
//!
//! Turns a session's ordered chunk hashes into its root and serves
//! inclusion proofs for storage attestations.
//!
//! Before building, the chunk list is checked against what the chunker
//! produced. Any disagreement is a desync that needs manual audit; a root
//! over a wrong leaf set must never be anchored.

use super::errors::MerkleBuildError;
use shared_crypto::{merkle_root, MerkleProof, MerkleTree};
use shared_types::{ChunkRecord, Hash, SessionRecord};

/// Indices must run 0, 1, 2, ... without gaps.
pub fn check_sequence(chunks: &[ChunkRecord]) -> Result<(), MerkleBuildError> {
    for (expected, chunk) in chunks.iter().enumerate() {
        if chunk.index != expected as u64 {
            return Err(MerkleBuildError::IndexGap {
                expected: expected as u64,
                found: chunk.index,
            });
        }
    }
    Ok(())
}

/// Root over `chunks`, `None` for a session without chunks.
///
/// `produced` is the number of chunks the chunker emitted for the session.
pub fn build_session_root(
    produced: u64,
    chunks: &[ChunkRecord],
) -> Result<Option<Hash>, MerkleBuildError> {
    let recorded = chunks.len() as u64;
    if produced != recorded {
        return Err(MerkleBuildError::LeafCountMismatch { produced, recorded });
    }
    check_sequence(chunks)?;
    let leaves: Vec<Hash> = chunks.iter().map(|c| c.hash).collect();
    Ok(merkle_root(&leaves))
}

/// Inclusion proof for one chunk of a completed session.
pub fn chunk_inclusion_proof(
    session: &SessionRecord,
    index: u64,
) -> Result<MerkleProof, MerkleBuildError> {
    let root = session.merkle_root.ok_or(MerkleBuildError::NoRoot)?;
    if index >= session.chunks.len() as u64 {
        return Err(MerkleBuildError::UnknownChunk(index));
    }
    check_sequence(&session.chunks)?;
    let tree = MerkleTree::build(session.chunk_hashes()).ok_or(MerkleBuildError::NoRoot)?;
    if tree.root() != root {
        return Err(MerkleBuildError::LeafCountMismatch {
            produced: session.chunks.len() as u64,
            recorded: tree.leaf_count() as u64,
        });
    }
    Ok(tree.proof(index as usize)?)
}
