//! # Session → Anchor
//!
//! A completed session's root travels through the anchor queue to the
//! anchor worker, and the outcome is written back onto the session
//! document through the pipeline's anchor status API.

use super::fixtures::{eventually, payload, run_session, started_runtime};
use lc_01_session_pipeline::SessionPipelineApi;
use lc_02_chain_anchor::{AnchorSubmissionError, ChainStep, ScriptedChain};
use shared_types::{SessionRecord, SessionStatus};
use std::sync::Arc;
use std::time::Duration;

async fn wait_for(
    runtime: &node_runtime::NodeRuntime,
    record: &SessionRecord,
    done: impl Fn(&SessionRecord) -> bool,
) -> SessionRecord {
    let pipeline = runtime.container().pipeline.clone();
    let id = record.id;
    eventually(|| {
        let pipeline = pipeline.clone();
        let done = &done;
        async move { done(&pipeline.get_session(id).await.unwrap()) }
    })
    .await;
    pipeline.get_session(id).await.unwrap()
}

#[tokio::test]
async fn test_three_submission_timeouts_leave_session_completed_and_pending() {
    let chain = Arc::new(ScriptedChain::new(2));
    for _ in 0..3 {
        chain.push_submission(ChainStep::Hang);
    }
    let runtime = started_runtime(chain.clone()).await;

    let record = run_session(&runtime.container().pipeline, payload(2500)).await;
    assert_eq!(record.status, SessionStatus::Completed);

    let record = wait_for(&runtime, &record, |r| r.anchor_pending).await;
    assert_eq!(record.status, SessionStatus::Completed);
    assert!(record.merkle_root.is_some());
    assert!(record.anchor_txid.is_none());
    assert!(!record.anchor_confirmed);
    assert!(record.failure_reason.is_none());
    assert_eq!(chain.submit_calls(), 3);

    runtime.shutdown().await;
}

#[tokio::test]
async fn test_single_chunk_session_anchors_its_chunk_hash() {
    let chain = Arc::new(ScriptedChain::new(2));
    let runtime = started_runtime(chain.clone()).await;

    let record = run_session(&runtime.container().pipeline, payload(500)).await;
    assert_eq!(record.chunks.len(), 1);
    assert_eq!(record.merkle_root, Some(record.chunks[0].hash));

    let record = wait_for(&runtime, &record, |r| r.anchor_confirmed).await;
    assert!(record.anchor_txid.is_some());
    assert_eq!(chain.accepted().len(), 1);
    assert_eq!(chain.accepted()[0].merkle_root, record.chunks[0].hash);
    assert_eq!(chain.accepted()[0].owner, record.owner_address);

    runtime.shutdown().await;
}

#[tokio::test]
async fn test_empty_session_is_cancelled_and_never_anchored() {
    let chain = Arc::new(ScriptedChain::new(2));
    let runtime = started_runtime(chain.clone()).await;

    let record = run_session(&runtime.container().pipeline, Vec::new()).await;
    assert_eq!(record.status, SessionStatus::Cancelled);
    assert!(record.merkle_root.is_none());

    // Give a misrouted anchor request time to show up
    tokio::time::sleep(Duration::from_millis(100)).await;
    let stored = runtime
        .container()
        .pipeline
        .get_session(record.id)
        .await
        .unwrap();
    assert!(stored.merkle_root.is_none());
    assert!(stored.anchor_txid.is_none());
    assert_eq!(chain.submit_calls(), 0);

    runtime.shutdown().await;
}

#[tokio::test]
async fn test_failed_poll_does_not_resubmit() {
    let chain = Arc::new(ScriptedChain::new(2));
    chain.push_confirmations(ChainStep::Fail(AnchorSubmissionError::Rpc(
        "gateway timeout".into(),
    )));
    chain.push_confirmations(ChainStep::Reply(1));
    let runtime = started_runtime(chain.clone()).await;

    let record = run_session(&runtime.container().pipeline, payload(1500)).await;
    wait_for(&runtime, &record, |r| r.anchor_confirmed).await;

    assert_eq!(chain.submit_calls(), 1);
    assert_eq!(chain.poll_calls(), 3);

    runtime.shutdown().await;
}

#[tokio::test]
async fn test_reverted_anchor_keeps_txid_and_flags_pending() {
    let chain = Arc::new(ScriptedChain::new(2));
    chain.push_confirmations(ChainStep::Fail(AnchorSubmissionError::Rejected(
        "execution reverted".into(),
    )));
    let runtime = started_runtime(chain.clone()).await;

    let record = run_session(&runtime.container().pipeline, payload(700)).await;
    let record = wait_for(&runtime, &record, |r| r.anchor_pending).await;

    assert_eq!(record.status, SessionStatus::Completed);
    assert!(record.anchor_txid.is_some());
    assert!(!record.anchor_confirmed);

    runtime.shutdown().await;
}
