//! # Core Domain Entities
//!
//! Identifiers and persisted record shapes shared by the session pipeline,
//! the anchor client and the PoOT consensus.
//!
//! ## Clusters
//!
//! - **Identity**: `SessionId`, `NodeId`, `OwnerAddress`, `Slot`
//! - **Sessions**: `SessionRecord`, `ChunkRecord`, `SessionMetadata`, `SessionStatus`
//! - **Consensus**: `ProofType`, `ProofKey`, `SettlementEntry`

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::IdentityError;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// A 32-byte BLAKE3 digest.
pub type Hash = [u8; 32];

/// A 64-byte Ed25519 signature.
pub type Signature = [u8; 64];

/// A 32-byte Ed25519 public key.
pub type PublicKey = [u8; 32];

/// Index of a fixed-duration consensus round.
pub type Slot = u64;

/// Unique identifier of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a fresh random session id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from the hyphenated string form.
    pub fn parse(s: &str) -> Result<Self, IdentityError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| IdentityError::InvalidSessionId(s.to_string()))
    }

    /// Raw bytes, used when the id takes part in a signed or hashed message.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Identifier of a participating node, as registered with the identity registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Maximum accepted identifier length.
    pub const MAX_LEN: usize = 128;

    /// Build a node id, rejecting empty or oversized identifiers.
    pub fn new(id: impl Into<String>) -> Result<Self, IdentityError> {
        let id = id.into();
        if id.is_empty() || id.len() > Self::MAX_LEN {
            return Err(IdentityError::InvalidNodeId(id));
        }
        Ok(Self(id))
    }

    /// Borrow the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Owner of a session in chain-address format (base58, e.g. `T...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerAddress(String);

impl OwnerAddress {
    const MIN_LEN: usize = 26;
    const MAX_LEN: usize = 64;
    const BASE58_ALPHABET: &'static str =
        "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

    /// Parse an address, checking length and base58 alphabet.
    pub fn parse(address: &str) -> Result<Self, IdentityError> {
        let len_ok = (Self::MIN_LEN..=Self::MAX_LEN).contains(&address.len());
        let alphabet_ok = address
            .chars()
            .all(|c| Self::BASE58_ALPHABET.contains(c));
        if !len_ok || !alphabet_ok {
            return Err(IdentityError::InvalidOwnerAddress(address.to_string()));
        }
        Ok(Self(address.to_string()))
    }

    /// Borrow the address string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// CLUSTER B: SESSIONS
// =============================================================================

/// Session lifecycle state.
///
/// `Completed`, `Failed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Processing,
    Active,
    Completed,
    Failed,
    Cancelled,
}

impl SessionStatus {
    /// Whether no further transition is allowed.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Lowercase name used in documents and log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// AEAD algorithm used for a chunk or key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CipherAlgorithm {
    #[default]
    #[serde(rename = "xchacha20-poly1305")]
    XChaCha20Poly1305,
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
}

impl CipherAlgorithm {
    /// Nonce length in bytes.
    #[must_use]
    pub fn nonce_len(self) -> usize {
        match self {
            Self::XChaCha20Poly1305 => 24,
            Self::Aes256Gcm => 12,
        }
    }
}

/// One encrypted chunk of a session. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// `"{session_id}-{index:06}"`.
    pub chunk_id: String,
    pub index: u64,
    /// Plaintext size.
    pub size_bytes: u64,
    /// Size after compression (equal to `size_bytes` when stored raw).
    pub compressed_size_bytes: u64,
    /// Whether the plaintext was compressed before encryption.
    pub compressed: bool,
    /// BLAKE3 over the ciphertext.
    pub hash: Hash,
    pub encryption_nonce: Vec<u8>,
    pub encryption_key_id: String,
}

impl ChunkRecord {
    /// Canonical chunk id for a session and index.
    #[must_use]
    pub fn make_id(session_id: &SessionId, index: u64) -> String {
        format!("{}-{:06}", session_id, index)
    }
}

/// Aggregate statistics captured while a session is processed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub original_size: u64,
    pub compressed_size: u64,
    pub compression_ratio: f64,
    pub encryption_time_ms: u64,
    pub merkle_build_time_ms: u64,
}

impl SessionMetadata {
    /// Fold one chunk into the running totals.
    pub fn record_chunk(&mut self, size: u64, compressed_size: u64, encryption_ms: u64) {
        self.original_size += size;
        self.compressed_size += compressed_size;
        self.encryption_time_ms += encryption_ms;
        self.compression_ratio = if self.original_size == 0 {
            0.0
        } else {
            self.compressed_size as f64 / self.original_size as f64
        };
    }
}

/// Persisted session document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(rename = "_id")]
    pub id: SessionId,
    pub owner_address: OwnerAddress,
    pub started_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<u64>,
    pub status: SessionStatus,
    pub chunks: Vec<ChunkRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merkle_root: Option<Hash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_txid: Option<String>,
    pub metadata: SessionMetadata,
    /// Anchoring gave up after its retry budget; the session stays completed.
    #[serde(default)]
    pub anchor_pending: bool,
    #[serde(default)]
    pub anchor_confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SessionRecord {
    /// Fresh pending session.
    #[must_use]
    pub fn new(id: SessionId, owner_address: OwnerAddress, started_at: u64) -> Self {
        Self {
            id,
            owner_address,
            started_at,
            completed_at: None,
            status: SessionStatus::Pending,
            chunks: Vec::new(),
            merkle_root: None,
            anchor_txid: None,
            metadata: SessionMetadata::default(),
            anchor_pending: false,
            anchor_confirmed: false,
            failure_reason: None,
        }
    }

    /// Ordered chunk hashes, the Merkle leaves of this session.
    #[must_use]
    pub fn chunk_hashes(&self) -> Vec<Hash> {
        self.chunks.iter().map(|c| c.hash).collect()
    }

    /// Index the next appended chunk must carry.
    #[must_use]
    pub fn next_chunk_index(&self) -> u64 {
        self.chunks.len() as u64
    }

    /// Look up a chunk by id.
    #[must_use]
    pub fn chunk(&self, chunk_id: &str) -> Option<&ChunkRecord> {
        self.chunks.iter().find(|c| c.chunk_id == chunk_id)
    }
}

// =============================================================================
// CLUSTER C: CONSENSUS
// =============================================================================

/// Kind of work a PoOT proof attests to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofType {
    RelayBandwidth,
    StorageAvailability,
    ValidationSignature,
    UptimeBeacon,
}

impl ProofType {
    /// All proof types, in settlement order.
    pub const ALL: [ProofType; 4] = [
        ProofType::RelayBandwidth,
        ProofType::StorageAvailability,
        ProofType::ValidationSignature,
        ProofType::UptimeBeacon,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RelayBandwidth => "relay_bandwidth",
            Self::StorageAvailability => "storage_availability",
            Self::ValidationSignature => "validation_signature",
            Self::UptimeBeacon => "uptime_beacon",
        }
    }

    /// Single-byte tag used in signing messages.
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Self::RelayBandwidth => 1,
            Self::StorageAvailability => 2,
            Self::ValidationSignature => 3,
            Self::UptimeBeacon => 4,
        }
    }
}

impl fmt::Display for ProofType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniqueness key of a work proof: `(node_id, slot, proof_type)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProofKey {
    pub node_id: NodeId,
    pub slot: Slot,
    pub proof_type: ProofType,
}

impl ProofKey {
    #[must_use]
    pub fn new(node_id: NodeId, slot: Slot, proof_type: ProofType) -> Self {
        Self {
            node_id,
            slot,
            proof_type,
        }
    }

    /// Document `_id`: node id, slot and proof type joined.
    #[must_use]
    pub fn document_id(&self) -> String {
        format!("{}:{}:{}", self.node_id, self.slot, self.proof_type)
    }
}

/// One node's settled reward for a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementEntry {
    pub node_id: NodeId,
    pub slot: Slot,
    pub reward_amount: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Failed.is_terminal());
        assert!(SessionStatus::Cancelled.is_terminal());
        assert!(!SessionStatus::Active.is_terminal());
        assert!(!SessionStatus::Pending.is_terminal());
    }

    #[test]
    fn test_chunk_id_format() {
        let id = SessionId::parse("6f1c2a9e-0d7b-4b8e-9a43-1f2e3d4c5b6a").unwrap();
        assert_eq!(
            ChunkRecord::make_id(&id, 7),
            "6f1c2a9e-0d7b-4b8e-9a43-1f2e3d4c5b6a-000007"
        );
    }

    #[test]
    fn test_owner_address_validation() {
        assert!(OwnerAddress::parse("TLa2f6VPqDgRE67v1736s7bJ8Ray5wYjU7").is_ok());
        assert!(OwnerAddress::parse("short").is_err());
        // '0' and 'O' are outside the base58 alphabet
        assert!(OwnerAddress::parse("T0a2f6VPqDgRE67v1736s7bJ8Ray5wYjUO").is_err());
    }

    #[test]
    fn test_node_id_rejects_empty() {
        assert!(NodeId::new("").is_err());
        assert_eq!(NodeId::new("node-1").unwrap().as_str(), "node-1");
    }

    #[test]
    fn test_proof_key_document_id() {
        let key = ProofKey::new(NodeId::new("node-7").unwrap(), 100, ProofType::RelayBandwidth);
        assert_eq!(key.document_id(), "node-7:100:relay_bandwidth");
    }

    #[test]
    fn test_session_document_field_names() {
        let record = SessionRecord::new(
            SessionId::new(),
            OwnerAddress::parse("TLa2f6VPqDgRE67v1736s7bJ8Ray5wYjU7").unwrap(),
            1_700_000_000,
        );
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("_id").is_some());
        assert_eq!(json["status"], "pending");
        // Unset optionals are omitted rather than written as null
        assert!(json.get("merkle_root").is_none());
        assert!(json.get("anchor_txid").is_none());
    }

    #[test]
    fn test_metadata_ratio() {
        let mut meta = SessionMetadata::default();
        meta.record_chunk(1000, 250, 3);
        meta.record_chunk(1000, 750, 2);
        assert_eq!(meta.original_size, 2000);
        assert_eq!(meta.compressed_size, 1000);
        assert!((meta.compression_ratio - 0.5).abs() < f64::EPSILON);
        assert_eq!(meta.encryption_time_ms, 5);
    }
}
