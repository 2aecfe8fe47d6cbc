use super::*;
use crate::adapters::{ChainStep, RecordingAnchorSink, RecordingEventBus, ScriptedChain, SinkCall};
use shared_types::OwnerAddress;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

type TestService = AnchorService<ScriptedChain, RecordingAnchorSink, RecordingEventBus>;

struct Harness {
    chain: Arc<ScriptedChain>,
    sink: Arc<RecordingAnchorSink>,
    bus: Arc<RecordingEventBus>,
    service: Arc<TestService>,
}

fn harness_with(config: AnchorConfig, default_depth: u64) -> Harness {
    let chain = Arc::new(ScriptedChain::new(default_depth));
    let sink = Arc::new(RecordingAnchorSink::new());
    let bus = Arc::new(RecordingEventBus::new());
    let service = AnchorService::new(AnchorDependencies {
        chain: chain.clone(),
        sink: sink.clone(),
        event_bus: bus.clone(),
        config,
    })
    .unwrap();
    Harness {
        chain,
        sink,
        bus,
        service: Arc::new(service),
    }
}

fn harness() -> Harness {
    harness_with(AnchorConfig::default(), 12)
}

fn request() -> AnchorRequest {
    AnchorRequest {
        session_id: SessionId::new(),
        merkle_root: [0x5a; 32],
        owner: OwnerAddress::parse("TQn9Y2khEsLJW1ChVWFMSMeRDow5KcbLSE").unwrap(),
        requested_at: 1_700_000_000,
    }
}

fn pending_events(bus: &RecordingEventBus) -> usize {
    bus.get_events()
        .iter()
        .filter(|e| matches!(e, LucidEvent::AnchorPending { .. }))
        .count()
}

#[tokio::test(start_paused = true)]
async fn test_anchor_confirms() {
    let h = harness();
    h.chain.push_submission(ChainStep::Reply("0xaa".into()));
    let req = request();
    let id = req.session_id;

    let outcome = h.service.anchor(req.clone()).await;

    assert_eq!(
        outcome,
        AnchorOutcome::Confirmed {
            txid: "0xaa".into(),
            confirmations: 12
        }
    );
    assert_eq!(h.chain.accepted(), vec![req]);
    assert_eq!(
        h.sink.calls_for(id),
        vec![
            SinkCall::Submitted {
                session_id: id,
                txid: "0xaa".into()
            },
            SinkCall::Confirmed { session_id: id },
        ]
    );
    let events = h.bus.get_events();
    assert!(matches!(&events[0], LucidEvent::AnchorSubmitted { txid, .. } if txid == "0xaa"));
    assert!(matches!(
        &events[1],
        LucidEvent::AnchorConfirmed {
            confirmations: 12,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_three_timeouts_leave_anchor_pending() {
    let h = harness();
    for _ in 0..3 {
        h.chain.push_submission(ChainStep::Hang);
    }
    let req = request();
    let id = req.session_id;
    let start = Instant::now();

    let outcome = h.service.anchor(req).await;

    assert_eq!(
        outcome,
        AnchorOutcome::Pending {
            attempts: 3,
            last_error: AnchorSubmissionError::Timeout(10_000)
        }
    );
    assert_eq!(h.chain.submit_calls(), 3);
    // Three 10s deadlines plus 1s and 2s of backoff
    assert_eq!(start.elapsed(), Duration::from_secs(33));
    assert_eq!(h.sink.calls_for(id), vec![SinkCall::Pending { session_id: id }]);
    assert_eq!(pending_events(&h.bus), 1);
    assert_eq!(h.chain.poll_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_transient_error_is_retried() {
    let h = harness();
    h.chain
        .push_submission(ChainStep::Fail(AnchorSubmissionError::Rpc("connection reset".into())));
    h.chain.push_submission(ChainStep::Reply("0xbb".into()));

    let outcome = h.service.anchor(request()).await;

    assert_eq!(outcome.txid(), Some("0xbb"));
    assert_eq!(h.chain.submit_calls(), 2);
    assert_eq!(pending_events(&h.bus), 0);
}

#[tokio::test(start_paused = true)]
async fn test_rejection_is_not_retried() {
    let h = harness();
    h.chain
        .push_submission(ChainStep::Fail(AnchorSubmissionError::Rejected("session exists".into())));

    let outcome = h.service.anchor(request()).await;

    assert!(matches!(outcome, AnchorOutcome::Pending { attempts: 1, .. }));
    assert_eq!(h.chain.submit_calls(), 1);
    assert_eq!(pending_events(&h.bus), 1);
}

#[tokio::test(start_paused = true)]
async fn test_polls_until_threshold() {
    let h = harness();
    for depth in [0, 5, 12] {
        h.chain.push_confirmations(ChainStep::Reply(depth));
    }
    let start = Instant::now();

    let outcome = h.service.anchor(request()).await;

    assert!(matches!(
        outcome,
        AnchorOutcome::Confirmed {
            confirmations: 12,
            ..
        }
    ));
    assert_eq!(h.chain.poll_calls(), 3);
    assert_eq!(start.elapsed(), Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_failed_polls_do_not_lose_txid() {
    let h = harness();
    h.chain
        .push_confirmations(ChainStep::Fail(AnchorSubmissionError::Rpc("unavailable".into())));
    h.chain.push_confirmations(ChainStep::Hang);

    let outcome = h.service.anchor(request()).await;

    assert!(matches!(outcome, AnchorOutcome::Confirmed { .. }));
    assert_eq!(h.chain.poll_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_poll_budget_exhausted() {
    let config = AnchorConfig {
        max_polls: 3,
        ..AnchorConfig::default()
    };
    let h = harness_with(config, 4);
    let req = request();
    let id = req.session_id;

    let outcome = h.service.anchor(req).await;

    assert!(matches!(
        outcome,
        AnchorOutcome::Unconfirmed {
            confirmations: 4,
            ..
        }
    ));
    assert_eq!(h.chain.poll_calls(), 3);
    // Txid recorded, nothing else
    assert_eq!(h.sink.calls_for(id).len(), 1);
    assert_eq!(pending_events(&h.bus), 0);
}

#[tokio::test(start_paused = true)]
async fn test_revert_while_polling_marks_pending() {
    let h = harness();
    h.chain.push_confirmations(ChainStep::Reply(1));
    h.chain
        .push_confirmations(ChainStep::Fail(AnchorSubmissionError::Rejected("reverted".into())));
    let req = request();
    let id = req.session_id;

    let outcome = h.service.anchor(req).await;

    assert!(matches!(outcome, AnchorOutcome::Pending { .. }));
    let calls = h.sink.calls_for(id);
    assert!(matches!(calls[0], SinkCall::Submitted { .. }));
    assert_eq!(calls[1], SinkCall::Pending { session_id: id });
}

#[tokio::test(start_paused = true)]
async fn test_await_confirmations_for_known_txid() {
    let h = harness();
    let id = SessionId::new();

    let outcome = h.service.await_confirmations(id, "0xcc".into()).await;

    assert_eq!(outcome.txid(), Some("0xcc"));
    assert_eq!(h.chain.submit_calls(), 0);
    assert_eq!(h.sink.calls_for(id), vec![SinkCall::Confirmed { session_id: id }]);
}

#[test]
fn test_invalid_config_rejected() {
    let chain = Arc::new(ScriptedChain::new(12));
    let result = AnchorService::new(AnchorDependencies {
        chain,
        sink: Arc::new(RecordingAnchorSink::new()),
        event_bus: Arc::new(RecordingEventBus::new()),
        config: AnchorConfig {
            confirmation_threshold: 0,
            ..AnchorConfig::default()
        },
    });
    assert!(matches!(
        result,
        Err(AnchorConfigError::Zero("confirmation_threshold"))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_worker_drains_queue() {
    let h = harness();
    let (tx, rx) = mpsc::channel(8);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = AnchorWorker::new(h.service.clone());
    let handle = tokio::spawn(worker.run(rx, shutdown_rx));

    let requests: Vec<_> = (0..3).map(|_| request()).collect();
    for req in &requests {
        tx.send(req.clone()).await.unwrap();
    }
    drop(tx);

    let stats = handle.await.unwrap();
    assert_eq!(stats.received, 3);
    assert_eq!(stats.confirmed, 3);
    assert_eq!(stats.aborted, 0);
    for req in requests {
        assert_eq!(h.sink.calls_for(req.session_id).len(), 2);
    }
}

#[tokio::test(start_paused = true)]
async fn test_worker_shutdown_marks_unfinished_anchors_pending() {
    // Never deep enough: the anchor polls for ten minutes
    let config = AnchorConfig {
        max_in_flight: 1,
        ..AnchorConfig::default()
    };
    let h = harness_with(config, 0);
    let (tx, rx) = mpsc::channel(8);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(AnchorWorker::new(h.service.clone()).run(rx, shutdown_rx));

    let polling = request();
    let queued = request();
    tx.send(polling.clone()).await.unwrap();
    tx.send(queued.clone()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert!(h.chain.poll_calls() >= 1);
    assert_eq!(h.chain.submit_calls(), 1);

    shutdown_tx.send(true).unwrap();
    let stats = handle.await.unwrap();
    assert_eq!(stats.received, 1);
    assert_eq!(stats.aborted, 2);
    assert_eq!(stats.confirmed + stats.unconfirmed + stats.pending, 0);

    assert_eq!(
        h.sink.calls_for(polling.session_id).last(),
        Some(&SinkCall::Pending {
            session_id: polling.session_id
        })
    );
    assert_eq!(
        h.sink.calls_for(queued.session_id),
        vec![SinkCall::Pending {
            session_id: queued.session_id
        }]
    );
    assert_eq!(pending_events(&h.bus), 2);
    assert!(h.bus.get_events().iter().all(|e| match e {
        LucidEvent::AnchorPending { last_error, .. } => last_error == INTERRUPTED,
        _ => true,
    }));
    // Queue is closed once the worker stops
    assert!(tx.send(request()).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_worker_leaves_requests_queued_while_busy() {
    let config = AnchorConfig {
        max_in_flight: 1,
        ..AnchorConfig::default()
    };
    let h = harness_with(config, 12);
    h.chain.push_submission(ChainStep::Hang);
    let (tx, rx) = mpsc::channel(1);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(AnchorWorker::new(h.service.clone()).run(rx, shutdown_rx));

    tx.send(request()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    tx.send(request()).await.unwrap();

    // One anchor running, one waiting in the queue: no room for a third
    assert!(matches!(
        tx.try_send(request()),
        Err(mpsc::error::TrySendError::Full(_))
    ));

    drop(tx);
    let stats = handle.await.unwrap();
    assert_eq!(stats.received, 2);
    assert_eq!(stats.confirmed, 2);
}

#[tokio::test(start_paused = true)]
async fn test_worker_limits_in_flight() {
    let config = AnchorConfig {
        max_in_flight: 1,
        ..AnchorConfig::default()
    };
    let h = harness_with(config, 12);
    // First anchor hangs through one deadline before it is accepted
    h.chain.push_submission(ChainStep::Hang);
    let (tx, rx) = mpsc::channel(8);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(AnchorWorker::new(h.service.clone()).run(rx, shutdown_rx));

    tx.send(request()).await.unwrap();
    tx.send(request()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    // Second request waits for the permit, so only one submission so far
    assert_eq!(h.chain.submit_calls(), 1);

    drop(tx);
    let stats = handle.await.unwrap();
    assert_eq!(stats.confirmed, 2);
    assert_eq!(h.chain.submit_calls(), 3);
}
