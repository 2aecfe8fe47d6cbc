//! Shared setup for the integration scenarios.

use lc_01_session_pipeline::{ChannelSource, SessionPipelineApi, SourceFrame};
use lc_02_chain_anchor::ScriptedChain;
use lc_03_poot_consensus::{
    InMemoryIdentityRegistry, InMemoryProofStore, InMemoryRewardLedger, PootConfig,
    PootDependencies, PootService, ProofData, ProofSubmission, RecordingEventBus, TimeSource,
};
use node_runtime::adapters::{ChainBackend, PipelineRootLookup};
use node_runtime::container::PipelineServiceImpl;
use node_runtime::{NodeConfig, NodeRuntime, SubsystemContainer};
use shared_crypto::Ed25519KeyPair;
use shared_types::{NodeId, OwnerAddress, SessionRecord, Slot};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const OWNER: &str = "TQn9Y2khEsLJW1ChVWFMSMeRDow5KcbLSE";
pub const SLOT_SECS: u64 = 120;

pub fn owner() -> OwnerAddress {
    OwnerAddress::parse(OWNER).unwrap()
}

/// 1 KiB chunks, millisecond backoff and polling.
pub fn fast_config() -> NodeConfig {
    let mut config = NodeConfig::default();
    config.pipeline.max_chunk_size = 1024;
    config.pipeline.compression_level = 1;
    config.anchor.initial_backoff = Duration::from_millis(10);
    config.anchor.max_backoff = Duration::from_millis(40);
    config.anchor.rpc_timeout = Duration::from_millis(50);
    config.anchor.poll_interval = Duration::from_millis(10);
    config.anchor.confirmation_threshold = 2;
    config.security.master_key = Some([7u8; 32]);
    config
}

/// Started runtime over a scripted chain.
pub async fn started_runtime(chain: Arc<ScriptedChain>) -> NodeRuntime {
    let container =
        SubsystemContainer::with_chain(fast_config(), ChainBackend::Dev(chain)).unwrap();
    let mut runtime = NodeRuntime::with_container(container);
    runtime.start().await.unwrap();
    runtime
}

/// Stream `data` through a fresh session and wait for the final record.
pub async fn run_session(pipeline: &PipelineServiceImpl, data: Vec<u8>) -> SessionRecord {
    let session = pipeline.start_session(owner()).await.unwrap();
    let (tx, source) = ChannelSource::channel(8);
    let handle = pipeline
        .spawn_pipeline(session.id, Box::new(source))
        .await
        .unwrap();
    if !data.is_empty() {
        tx.send(SourceFrame::Data(data)).await.unwrap();
    }
    tx.send(SourceFrame::Stop).await.unwrap();
    handle.await.unwrap().unwrap()
}

/// Poll `check` every 10ms for up to five seconds.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..500 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 5s");
}

pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

// =============================================================================
// POOT
// =============================================================================

/// Clock pinned to 10 seconds into a slot.
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn at_slot(slot: Slot) -> Arc<Self> {
        Arc::new(Self {
            now: AtomicU64::new(slot * SLOT_SECS + 10),
        })
    }

    pub fn set_slot(&self, slot: Slot) {
        self.now.store(slot * SLOT_SECS + 10, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

pub type PootOverPipeline = PootService<
    InMemoryProofStore,
    InMemoryIdentityRegistry,
    PipelineRootLookup<PipelineServiceImpl>,
    InMemoryRewardLedger,
    RecordingEventBus,
>;

/// PoOT service validating against a live pipeline, on a manual clock.
pub struct PootHarness {
    pub service: Arc<PootOverPipeline>,
    pub identity: Arc<InMemoryIdentityRegistry>,
    pub ledger: Arc<InMemoryRewardLedger>,
    pub events: Arc<RecordingEventBus>,
    pub clock: Arc<ManualClock>,
}

pub fn poot_over(pipeline: Arc<PipelineServiceImpl>, slot: Slot) -> PootHarness {
    let identity = Arc::new(InMemoryIdentityRegistry::new());
    let ledger = Arc::new(InMemoryRewardLedger::new());
    let events = Arc::new(RecordingEventBus::new());
    let clock = ManualClock::at_slot(slot);
    let service = PootService::new(PootDependencies {
        store: Arc::new(InMemoryProofStore::new()),
        identity: identity.clone(),
        session_roots: Arc::new(PipelineRootLookup::new(pipeline)),
        ledger: ledger.clone(),
        event_bus: events.clone(),
        config: PootConfig {
            slot_duration_secs: SLOT_SECS,
            slot_reward_pool: 1_000,
            ..PootConfig::default()
        },
    })
    .unwrap()
    .with_time_source(clock.clone());

    PootHarness {
        service: Arc::new(service),
        identity,
        ledger,
        events,
        clock,
    }
}

pub struct TestNode {
    pub id: NodeId,
    pub keypair: Ed25519KeyPair,
}

impl PootHarness {
    pub fn node(&self, name: &str, seed: u8) -> TestNode {
        let keypair = Ed25519KeyPair::from_seed([seed; 32]);
        let id = NodeId::new(name).unwrap();
        self.identity
            .register(id.clone(), *keypair.public_key().as_bytes());
        TestNode { id, keypair }
    }

    pub fn signed(&self, node: &TestNode, slot: Slot, data: ProofData) -> ProofSubmission {
        ProofSubmission::signed(&node.keypair, node.id.clone(), slot, data, self.clock.now())
            .unwrap()
    }
}
