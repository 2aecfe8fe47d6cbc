//! # Event Flow
//!
//! What an audit consumer on the shared bus sees while a session runs to
//! an anchored root and a node's proof is accepted.

use super::fixtures::{payload, run_session, started_runtime};
use lc_02_chain_anchor::ScriptedChain;
use lc_03_poot_consensus::{PootApi, ProofData, ProofSubmission};
use shared_bus::{EventFilter, EventSubscriber, EventTopic, LucidEvent, Subscription};
use shared_crypto::Ed25519KeyPair;
use shared_types::{unix_now, NodeId, ProofType, SessionId};
use std::sync::Arc;
use std::time::Duration;

async fn next_for(subscription: &mut Subscription, session_id: SessionId) -> LucidEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match subscription.recv().await {
                Some(event) if event.session_id() == Some(session_id) => return event,
                Some(_) => continue,
                None => panic!("bus closed"),
            }
        }
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_session_lifecycle_then_anchor_in_order() {
    let chain = Arc::new(ScriptedChain::new(2));
    let runtime = started_runtime(chain).await;
    let mut events = runtime.container().event_bus.subscribe(EventFilter::topics(vec![
        EventTopic::Sessions,
        EventTopic::Anchoring,
    ]));

    let record = run_session(&runtime.container().pipeline, payload(4096)).await;

    let mut names = Vec::new();
    loop {
        let event = next_for(&mut events, record.id).await;
        let done = matches!(event, LucidEvent::AnchorConfirmed { .. });
        names.push(match event {
            LucidEvent::SessionCreated { .. } => "created",
            LucidEvent::SessionActive { .. } => "active",
            LucidEvent::SessionCompleted { chunk_count, merkle_root, .. } => {
                assert_eq!(chunk_count, 4);
                assert_eq!(Some(merkle_root), record.merkle_root);
                "completed"
            }
            LucidEvent::AnchorSubmitted { .. } => "anchor_submitted",
            LucidEvent::AnchorConfirmed { .. } => "anchor_confirmed",
            other => panic!("unexpected event {other:?}"),
        });
        if done {
            break;
        }
    }

    assert_eq!(
        names,
        vec![
            "created",
            "active",
            "completed",
            "anchor_submitted",
            "anchor_confirmed"
        ]
    );
    runtime.shutdown().await;
}

#[tokio::test]
async fn test_container_poot_publishes_to_shared_bus() {
    let runtime = started_runtime(Arc::new(ScriptedChain::new(2))).await;
    let container = runtime.container();
    let mut proofs = container
        .event_bus
        .subscribe(EventFilter::topics(vec![EventTopic::Proofs]));

    let keypair = Ed25519KeyPair::from_seed([11; 32]);
    let node_id = NodeId::new("relay-1").unwrap();
    container
        .identities
        .register(node_id.clone(), *keypair.public_key().as_bytes());

    let slot = container.poot.current_slot();
    let data = ProofData::RelayBandwidth {
        bytes_relayed: 10 * 1024 * 1024,
        sessions_relayed: 1,
    };
    let submission =
        ProofSubmission::signed(&keypair, node_id.clone(), slot, data, unix_now()).unwrap();
    let key = container.poot.submit_proof(submission).await.unwrap();
    assert_eq!(key.proof_type, ProofType::RelayBandwidth);

    let event = tokio::time::timeout(Duration::from_secs(5), proofs.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, LucidEvent::ProofAccepted(k) if k == key));

    runtime.shutdown().await;
}
