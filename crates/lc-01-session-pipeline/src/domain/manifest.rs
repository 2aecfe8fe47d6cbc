//! Signed session manifest.
//!
//! A completed session's chunk list, Merkle root and total checksum under
//! an Ed25519 signature, so a holder of the manifest can check a session's
//! integrity without the session store.

use serde::{Deserialize, Serialize};
use shared_crypto::{blake3_hash_many, merkle_root, verify_ed25519, Blake3Hasher, Ed25519KeyPair};
use shared_types::{Hash, OwnerAddress, SessionId, SessionRecord, SessionStatus};

pub const MANIFEST_VERSION: u32 = 1;

const MANIFEST_DOMAIN: &str = "lucid session manifest v1";

/// Manifest could not be generated or failed verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManifestError {
    #[error("Manifest needs a completed session, session is {0}")]
    NotCompleted(SessionStatus),

    #[error("Manifest version {0} is not supported")]
    UnsupportedVersion(u32),

    #[error("Manifest signed by an unexpected key")]
    UnknownSigner,

    #[error("Manifest signature is invalid")]
    InvalidSignature,

    #[error("Manifest Merkle root does not match its chunks")]
    RootMismatch,

    #[error("Manifest total checksum does not match its chunks")]
    ChecksumMismatch,
}

/// One chunk as listed in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestChunk {
    pub chunk_id: String,
    pub index: u64,
    pub size_bytes: u64,
    pub compressed_size_bytes: u64,
    pub hash: Hash,
    pub encryption_key_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionManifest {
    pub manifest_id: String,
    pub version: u32,
    pub session_id: SessionId,
    pub owner_address: OwnerAddress,
    pub started_at: u64,
    pub completed_at: u64,
    pub chunks: Vec<ManifestChunk>,
    pub merkle_root: Hash,
    pub total_checksum: Hash,
    /// Not covered by the signature; the anchor may land after signing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_txid: Option<String>,
    pub generated_at: u64,
    pub signer: [u8; 32],
    pub signature: Vec<u8>,
}

/// BLAKE3 over the ordered chunk hashes.
pub fn total_checksum(hashes: &[Hash]) -> Hash {
    let parts: Vec<&[u8]> = hashes.iter().map(|h| h.as_slice()).collect();
    blake3_hash_many(&parts)
}

impl SessionManifest {
    /// Build and sign the manifest of a completed session.
    pub fn generate(
        record: &SessionRecord,
        signer: &Ed25519KeyPair,
        manifest_id: String,
        generated_at: u64,
    ) -> Result<Self, ManifestError> {
        let (Some(root), Some(completed_at)) = (record.merkle_root, record.completed_at) else {
            return Err(ManifestError::NotCompleted(record.status));
        };
        if record.status != SessionStatus::Completed {
            return Err(ManifestError::NotCompleted(record.status));
        }

        let chunks: Vec<ManifestChunk> = record
            .chunks
            .iter()
            .map(|c| ManifestChunk {
                chunk_id: c.chunk_id.clone(),
                index: c.index,
                size_bytes: c.size_bytes,
                compressed_size_bytes: c.compressed_size_bytes,
                hash: c.hash,
                encryption_key_id: c.encryption_key_id.clone(),
            })
            .collect();

        let mut manifest = Self {
            manifest_id,
            version: MANIFEST_VERSION,
            session_id: record.id,
            owner_address: record.owner_address.clone(),
            started_at: record.started_at,
            completed_at,
            total_checksum: total_checksum(&record.chunk_hashes()),
            chunks,
            merkle_root: root,
            anchor_txid: record.anchor_txid.clone(),
            generated_at,
            signer: *signer.public_key().as_bytes(),
            signature: Vec::new(),
        };
        manifest.signature = signer.sign(&manifest.signing_message()).as_bytes().to_vec();
        Ok(manifest)
    }

    fn chunk_hashes(&self) -> Vec<Hash> {
        self.chunks.iter().map(|c| c.hash).collect()
    }

    /// Digest the signature covers.
    pub fn signing_message(&self) -> Hash {
        let mut hasher = Blake3Hasher::with_domain(MANIFEST_DOMAIN);
        hasher
            .update_framed(self.manifest_id.as_bytes())
            .update(&self.version.to_be_bytes())
            .update(self.session_id.0.as_bytes())
            .update_framed(self.owner_address.as_str().as_bytes())
            .update(&self.started_at.to_be_bytes())
            .update(&self.completed_at.to_be_bytes())
            .update(&(self.chunks.len() as u64).to_be_bytes())
            .update(&self.merkle_root)
            .update(&self.total_checksum)
            .update(&self.generated_at.to_be_bytes())
            .update(&self.signer);
        hasher.finalize()
    }

    /// Check the signature against `expected_signer`, then the root and
    /// checksum against the listed chunks.
    pub fn verify(&self, expected_signer: &[u8; 32]) -> Result<(), ManifestError> {
        if self.version != MANIFEST_VERSION {
            return Err(ManifestError::UnsupportedVersion(self.version));
        }
        if &self.signer != expected_signer {
            return Err(ManifestError::UnknownSigner);
        }
        verify_ed25519(&self.signer, &self.signing_message(), &self.signature)
            .map_err(|_| ManifestError::InvalidSignature)?;

        let hashes = self.chunk_hashes();
        if merkle_root(&hashes) != Some(self.merkle_root) {
            return Err(ManifestError::RootMismatch);
        }
        if total_checksum(&hashes) != self.total_checksum {
            return Err(ManifestError::ChecksumMismatch);
        }
        Ok(())
    }
}
