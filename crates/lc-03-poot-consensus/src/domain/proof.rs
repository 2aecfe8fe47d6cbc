//! # Work Proofs
//!
//! Typed proof payloads and the digests nodes sign over them.
//!
//! ## Signing Messages
//!
//! All digests are domain-separated BLAKE3:
//!
//! | Digest | Domain | Fields |
//! |--------|--------|--------|
//! | proof | `PROOF_DOMAIN` | node_id (framed), slot (BE), type tag, bincode(proof_data) (framed) |
//! | session root | `ROOT_DOMAIN` | session_id bytes, merkle_root |
//! | uptime beacon | `BEACON_DOMAIN` | node_id (framed), nonce, issued_at (BE), expires_at (BE) |

use serde::{Deserialize, Serialize};
use shared_crypto::{Blake3Hasher, Ed25519KeyPair, Hash, ProofNode};
use shared_types::{NodeId, ProofKey, ProofType, SessionId, Slot};

pub const PROOF_DOMAIN: &str = "lucid poot work proof v1";
pub const ROOT_DOMAIN: &str = "lucid poot session root v1";
pub const BEACON_DOMAIN: &str = "lucid poot uptime beacon v1";

/// Proof payload, one shape per proof type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProofData {
    RelayBandwidth {
        bytes_relayed: u64,
        sessions_relayed: u64,
    },
    StorageAvailability {
        session_id: SessionId,
        chunk_id: String,
        chunk_index: u64,
        chunk_hash: Hash,
        bytes_stored: u64,
        /// Inclusion path of `chunk_hash` under the session root.
        path: Vec<ProofNode>,
    },
    ValidationSignature {
        session_id: SessionId,
        merkle_root: Hash,
        /// Ed25519 over [`root_message`].
        root_signature: Vec<u8>,
        sessions_validated: u64,
    },
    UptimeBeacon {
        nonce: Hash,
        issued_at: u64,
        expires_at: u64,
        uptime_seconds: u64,
        /// Ed25519 over [`beacon_message`].
        beacon_signature: Vec<u8>,
    },
}

impl ProofData {
    #[must_use]
    pub fn proof_type(&self) -> ProofType {
        match self {
            Self::RelayBandwidth { .. } => ProofType::RelayBandwidth,
            Self::StorageAvailability { .. } => ProofType::StorageAvailability,
            Self::ValidationSignature { .. } => ProofType::ValidationSignature,
            Self::UptimeBeacon { .. } => ProofType::UptimeBeacon,
        }
    }
}

/// A proof as submitted by a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofSubmission {
    pub node_id: NodeId,
    pub slot: Slot,
    pub proof_data: ProofData,
    /// Ed25519 over [`proof_message`].
    pub signature: Vec<u8>,
    pub timestamp: u64,
}

impl ProofSubmission {
    /// Build and sign a submission with the node's identity key.
    pub fn signed(
        keypair: &Ed25519KeyPair,
        node_id: NodeId,
        slot: Slot,
        proof_data: ProofData,
        timestamp: u64,
    ) -> Result<Self, bincode::Error> {
        let digest = proof_message(&node_id, slot, &proof_data)?;
        let signature = keypair.sign(&digest).as_bytes().to_vec();
        Ok(Self {
            node_id,
            slot,
            proof_data,
            signature,
            timestamp,
        })
    }

    #[must_use]
    pub fn proof_type(&self) -> ProofType {
        self.proof_data.proof_type()
    }

    #[must_use]
    pub fn key(&self) -> ProofKey {
        ProofKey::new(self.node_id.clone(), self.slot, self.proof_type())
    }
}

/// Stored work proof document.
///
/// Append-only: `reward_amount` is written once, at settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkProof {
    #[serde(rename = "_id")]
    pub id: String,
    pub node_id: NodeId,
    pub slot: Slot,
    pub proof_type: ProofType,
    pub proof_data: ProofData,
    pub signature: Vec<u8>,
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_amount: Option<u64>,
    pub verified: bool,
}

impl WorkProof {
    /// Record for a submission that passed validation.
    #[must_use]
    pub fn verified(submission: ProofSubmission) -> Self {
        let key = submission.key();
        Self {
            id: key.document_id(),
            node_id: submission.node_id,
            slot: submission.slot,
            proof_type: key.proof_type,
            proof_data: submission.proof_data,
            signature: submission.signature,
            timestamp: submission.timestamp,
            reward_amount: None,
            verified: true,
        }
    }

    #[must_use]
    pub fn key(&self) -> ProofKey {
        ProofKey::new(self.node_id.clone(), self.slot, self.proof_type)
    }
}

/// Digest a node signs to submit a proof.
pub fn proof_message(node_id: &NodeId, slot: Slot, data: &ProofData) -> Result<Hash, bincode::Error> {
    let encoded = bincode::serialize(data)?;
    Ok(Blake3Hasher::with_domain(PROOF_DOMAIN)
        .update_framed(node_id.as_str().as_bytes())
        .update(&slot.to_be_bytes())
        .update(&[data.proof_type().tag()])
        .update_framed(&encoded)
        .finalize())
}

/// Digest signed by a validator vouching for a session root.
#[must_use]
pub fn root_message(session_id: &SessionId, merkle_root: &Hash) -> Hash {
    Blake3Hasher::with_domain(ROOT_DOMAIN)
        .update(session_id.as_bytes())
        .update(merkle_root)
        .finalize()
}

/// Digest of an uptime beacon.
#[must_use]
pub fn beacon_message(node_id: &NodeId, nonce: &Hash, issued_at: u64, expires_at: u64) -> Hash {
    Blake3Hasher::with_domain(BEACON_DOMAIN)
        .update_framed(node_id.as_str().as_bytes())
        .update(nonce)
        .update(&issued_at.to_be_bytes())
        .update(&expires_at.to_be_bytes())
        .finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> NodeId {
        NodeId::new("node-a").unwrap()
    }

    fn relay(bytes: u64) -> ProofData {
        ProofData::RelayBandwidth {
            bytes_relayed: bytes,
            sessions_relayed: 1,
        }
    }

    #[test]
    fn test_message_binds_every_field() {
        let base = proof_message(&node(), 100, &relay(10)).unwrap();
        assert_eq!(base, proof_message(&node(), 100, &relay(10)).unwrap());
        assert_ne!(base, proof_message(&node(), 101, &relay(10)).unwrap());
        assert_ne!(base, proof_message(&node(), 100, &relay(11)).unwrap());
        assert_ne!(
            base,
            proof_message(&NodeId::new("node-b").unwrap(), 100, &relay(10)).unwrap()
        );
    }

    #[test]
    fn test_signed_submission_verifies() {
        let keypair = Ed25519KeyPair::from_seed([3; 32]);
        let submission = ProofSubmission::signed(&keypair, node(), 7, relay(1), 1_000).unwrap();
        let digest = proof_message(&submission.node_id, 7, &submission.proof_data).unwrap();
        assert!(shared_crypto::verify_ed25519(
            keypair.public_key().as_bytes(),
            &digest,
            &submission.signature
        )
        .is_ok());
        assert_eq!(submission.key().proof_type, ProofType::RelayBandwidth);
    }

    #[test]
    fn test_domains_are_separate() {
        let nonce = [1u8; 32];
        let session = SessionId::new();
        assert_ne!(root_message(&session, &nonce), beacon_message(&node(), &nonce, 0, 0));
    }

    #[test]
    fn test_document_shape() {
        let keypair = Ed25519KeyPair::from_seed([4; 32]);
        let submission = ProofSubmission::signed(&keypair, node(), 100, relay(5), 9).unwrap();
        let proof = WorkProof::verified(submission);

        let doc = serde_json::to_value(&proof).unwrap();
        assert_eq!(doc["_id"], "node-a:100:relay_bandwidth");
        assert_eq!(doc["proof_data"]["type"], "relay_bandwidth");
        assert_eq!(doc["verified"], true);
        assert!(doc.get("reward_amount").is_none());
    }
}
