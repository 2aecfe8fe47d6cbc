//! # Session Roots → PoOT
//!
//! Storage and validation proofs are checked against the Merkle roots of
//! sessions the pipeline actually produced; settlement then pays out over
//! the reward ledger.

use super::fixtures::{fast_config, payload, poot_over, run_session, PootHarness};
use lc_01_session_pipeline::SessionPipelineApi;
use lc_03_poot_consensus::domain::root_message;
use lc_03_poot_consensus::{
    DuplicateProofError, PootApi, ProofData, ProofSubmissionError, ProofValidationError,
};
use node_runtime::SubsystemContainer;
use shared_types::{ChunkRecord, SessionRecord, SessionStatus};

struct Setup {
    container: SubsystemContainer,
    poot: PootHarness,
}

fn setup(slot: u64) -> Setup {
    let container = SubsystemContainer::new(fast_config()).unwrap();
    let poot = poot_over(container.pipeline.clone(), slot);
    Setup { container, poot }
}

async fn storage_proof(setup: &Setup, record: &SessionRecord, index: u64) -> ProofData {
    let proof = setup
        .container
        .pipeline
        .chunk_proof(record.id, index)
        .await
        .unwrap();
    let chunk = &record.chunks[index as usize];
    ProofData::StorageAvailability {
        session_id: record.id,
        chunk_id: chunk.chunk_id.clone(),
        chunk_index: index,
        chunk_hash: chunk.hash,
        bytes_stored: chunk.compressed_size_bytes,
        path: proof.path,
    }
}

fn relay(sessions: u64) -> ProofData {
    ProofData::RelayBandwidth {
        bytes_relayed: 0,
        sessions_relayed: sessions,
    }
}

#[tokio::test]
async fn test_storage_proof_for_stored_chunk_accepted() {
    let setup = setup(7);
    let node = setup.poot.node("storage-1", 1);
    let record = run_session(&setup.container.pipeline, payload(3000)).await;
    assert_eq!(record.chunks.len(), 3);

    let data = storage_proof(&setup, &record, 1).await;
    let key = setup
        .poot
        .service
        .submit_proof(setup.poot.signed(&node, 7, data))
        .await
        .unwrap();

    let stored = setup.poot.service.get_proof(&key).await.unwrap().unwrap();
    assert!(stored.verified);
    assert_eq!(stored.reward_amount, None);
}

#[tokio::test]
async fn test_storage_proof_with_foreign_chunk_hash_rejected() {
    let setup = setup(7);
    let node = setup.poot.node("storage-1", 1);
    let record = run_session(&setup.container.pipeline, payload(3000)).await;

    // Path of chunk 1, hash of chunk 2
    let mut data = storage_proof(&setup, &record, 1).await;
    if let ProofData::StorageAvailability { chunk_hash, .. } = &mut data {
        *chunk_hash = record.chunks[2].hash;
    }

    let result = setup
        .poot
        .service
        .submit_proof(setup.poot.signed(&node, 7, data))
        .await;
    assert_eq!(
        result,
        Err(ProofSubmissionError::Validation(
            ProofValidationError::InclusionProofFailed {
                session_id: record.id,
                chunk_index: 1,
            }
        ))
    );
}

#[tokio::test]
async fn test_storage_proof_for_unfinished_session_rejected() {
    let setup = setup(7);
    let node = setup.poot.node("storage-1", 1);
    let session = setup
        .container
        .pipeline
        .start_session(super::fixtures::owner())
        .await
        .unwrap();
    assert_eq!(session.status, SessionStatus::Pending);

    let data = ProofData::StorageAvailability {
        session_id: session.id,
        chunk_id: ChunkRecord::make_id(&session.id, 0),
        chunk_index: 0,
        chunk_hash: [1u8; 32],
        bytes_stored: 10,
        path: Vec::new(),
    };
    let result = setup
        .poot
        .service
        .submit_proof(setup.poot.signed(&node, 7, data))
        .await;
    assert_eq!(
        result,
        Err(ProofSubmissionError::Validation(
            ProofValidationError::UnknownSession(session.id)
        ))
    );
}

#[tokio::test]
async fn test_validation_signature_over_session_root() {
    let setup = setup(7);
    let node = setup.poot.node("validator-1", 2);
    let record = run_session(&setup.container.pipeline, payload(5000)).await;
    let root = record.merkle_root.unwrap();

    let root_signature = node
        .keypair
        .sign(&root_message(&record.id, &root))
        .as_bytes()
        .to_vec();
    let data = ProofData::ValidationSignature {
        session_id: record.id,
        merkle_root: root,
        root_signature: root_signature.clone(),
        sessions_validated: 1,
    };
    assert!(setup
        .poot
        .service
        .submit_proof(setup.poot.signed(&node, 7, data))
        .await
        .is_ok());

    // Same signature, different claimed root
    let other = run_session(&setup.container.pipeline, payload(100)).await;
    let data = ProofData::ValidationSignature {
        session_id: other.id,
        merkle_root: root,
        root_signature,
        sessions_validated: 1,
    };
    let result = setup
        .poot
        .service
        .submit_proof(setup.poot.signed(&node, 7, data))
        .await;
    assert_eq!(
        result,
        Err(ProofSubmissionError::Validation(
            ProofValidationError::RootMismatch(other.id)
        ))
    );
}

#[tokio::test]
async fn test_duplicate_relay_proof_for_slot_100_leaves_ledger_alone() {
    let setup = setup(100);
    let node = setup.poot.node("relay-1", 3);

    let key = setup
        .poot
        .service
        .submit_proof(setup.poot.signed(&node, 100, relay(2)))
        .await
        .unwrap();
    let second = setup
        .poot
        .service
        .submit_proof(setup.poot.signed(&node, 100, relay(2)))
        .await;
    assert_eq!(
        second,
        Err(ProofSubmissionError::Duplicate(DuplicateProofError(key)))
    );

    setup.poot.clock.set_slot(101);
    setup.poot.service.settle_slot(100).await.unwrap();
    assert_eq!(setup.poot.ledger.amount(&node.id, 100), Some(1_000));
    assert_eq!(setup.poot.ledger.write_count(), 1);
}

#[tokio::test]
async fn test_settling_slot_50_twice_gives_identical_rewards() {
    let setup = setup(50);
    let heavy = setup.poot.node("relay-heavy", 4);
    let light = setup.poot.node("relay-light", 5);
    let storage = setup.poot.node("storage-1", 6);

    let record = run_session(&setup.container.pipeline, payload(2048)).await;
    let heavy_key = setup
        .poot
        .service
        .submit_proof(setup.poot.signed(&heavy, 50, relay(6)))
        .await
        .unwrap();
    setup
        .poot
        .service
        .submit_proof(setup.poot.signed(&light, 50, relay(2)))
        .await
        .unwrap();
    let data = storage_proof(&setup, &record, 0).await;
    setup
        .poot
        .service
        .submit_proof(setup.poot.signed(&storage, 50, data))
        .await
        .unwrap();

    setup.poot.clock.set_slot(51);
    let first = setup.poot.service.settle_slot(50).await.unwrap();
    let writes = setup.poot.ledger.write_count();
    let balances: Vec<u64> = [&heavy, &light, &storage]
        .iter()
        .map(|n| setup.poot.ledger.balance(&n.id))
        .collect();

    let second = setup.poot.service.settle_slot(50).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(setup.poot.ledger.write_count(), writes);
    let again: Vec<u64> = [&heavy, &light, &storage]
        .iter()
        .map(|n| setup.poot.ledger.balance(&n.id))
        .collect();
    assert_eq!(balances, again);

    // relay 6 + relay 2 + one chunk (2) = 10 credits
    assert_eq!(first.total_credits, 10);
    assert_eq!(balances, vec![600, 200, 200]);
    let stored = setup
        .poot
        .service
        .get_proof(&heavy_key)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.reward_amount, Some(600));
}
