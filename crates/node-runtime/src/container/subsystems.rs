//! # Subsystem Container
//!
//! Builds every subsystem with its adapters and keeps them alive for the
//! lifetime of the node.
//!
//! ## Initialization Order
//!
//! ```text
//! 1. event bus
//! 2. session pipeline (lc-01) with the anchor queue
//! 3. chain anchor (lc-02) writing back through the pipeline
//! 4. PoOT consensus (lc-03) reading session roots from the pipeline
//! ```
//!
//! Subsystems publish only to the event bus. The two direct links above
//! go through the adapters in [`crate::adapters`].

use crate::adapters::{ChainBackend, PipelineRootLookup, SessionAnchorSink};
use crate::container::config::NodeConfig;
use lc_01_session_pipeline::{
    InMemoryChunkStore, InMemorySessionStore, PipelineDependencies, QueueAnchorScheduler,
    SessionError, SessionPipelineService,
};
use lc_02_chain_anchor::{
    AnchorConfigError, AnchorDependencies, AnchorService, JsonRpcChainSubmitter, ScriptedChain,
};
use lc_03_poot_consensus::{
    InMemoryIdentityRegistry, InMemoryProofStore, InMemoryRewardLedger, PootConfigError,
    PootDependencies, PootService,
};
use shared_bus::InMemoryEventBus;
use shared_crypto::SecretKey;
use shared_types::AnchorRequest;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

/// Session pipeline with in-memory stores.
pub type PipelineServiceImpl = SessionPipelineService<
    InMemorySessionStore,
    InMemoryChunkStore,
    QueueAnchorScheduler,
    lc_01_session_pipeline::SharedBusAdapter<InMemoryEventBus>,
>;

/// Anchor service writing back into [`PipelineServiceImpl`].
pub type AnchorServiceImpl = AnchorService<
    ChainBackend,
    SessionAnchorSink<PipelineServiceImpl>,
    lc_02_chain_anchor::SharedBusAdapter<InMemoryEventBus>,
>;

/// PoOT service validating against [`PipelineServiceImpl`] roots.
pub type PootServiceImpl = PootService<
    InMemoryProofStore,
    InMemoryIdentityRegistry,
    PipelineRootLookup<PipelineServiceImpl>,
    InMemoryRewardLedger,
    lc_03_poot_consensus::SharedBusAdapter<InMemoryEventBus>,
>;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("session pipeline: {0}")]
    Pipeline(#[from] SessionError),

    #[error("chain anchor: {0}")]
    Anchor(#[from] AnchorConfigError),

    #[error("PoOT consensus: {0}")]
    Poot(#[from] PootConfigError),
}

/// All subsystem instances of one node.
pub struct SubsystemContainer {
    /// Node-wide event bus. Audit and monitoring consumers subscribe here.
    pub event_bus: Arc<InMemoryEventBus>,

    /// Session pipeline (lc-01).
    pub pipeline: Arc<PipelineServiceImpl>,

    /// Chain anchor (lc-02).
    pub anchor: Arc<AnchorServiceImpl>,

    /// PoOT consensus (lc-03).
    pub poot: Arc<PootServiceImpl>,

    /// Public keys of nodes allowed to submit proofs.
    pub identities: Arc<InMemoryIdentityRegistry>,

    /// Settled rewards.
    pub ledger: Arc<InMemoryRewardLedger>,

    /// Receiving end of the anchor queue until the worker claims it.
    anchor_queue: Option<mpsc::Receiver<AnchorRequest>>,

    pub config: NodeConfig,
}

impl SubsystemContainer {
    /// Build with the chain client named in `config.chain`.
    pub fn new(config: NodeConfig) -> Result<Self, ContainerError> {
        let chain = match (&config.chain.rpc_url, &config.chain.contract_address) {
            (Some(url), Some(contract)) => {
                ChainBackend::JsonRpc(JsonRpcChainSubmitter::new(url.clone(), contract.clone()))
            }
            _ => ChainBackend::Dev(Arc::new(ScriptedChain::new(config.chain.dev_confirmations))),
        };
        Self::with_chain(config, chain)
    }

    /// Build with an explicit chain client.
    #[instrument(name = "subsystem_init", skip_all, fields(chain = chain.name()))]
    pub fn with_chain(config: NodeConfig, chain: ChainBackend) -> Result<Self, ContainerError> {
        info!("Initializing Lucid subsystem container");

        let event_bus = Arc::new(InMemoryEventBus::with_capacity(
            config.runtime.event_bus_capacity,
        ));

        // lc-01
        let master_key = match config.security.master_key {
            Some(bytes) => SecretKey::from_bytes(bytes),
            None => {
                warn!("No master key configured, session keys will not survive a restart");
                SecretKey::generate()
            }
        };
        let (scheduler, anchor_queue) = QueueAnchorScheduler::channel(config.anchor.queue_capacity);
        let pipeline = Arc::new(SessionPipelineService::new(PipelineDependencies {
            store: Arc::new(InMemorySessionStore::new()),
            chunk_store: Arc::new(InMemoryChunkStore::new()),
            anchors: Arc::new(scheduler),
            event_bus: Arc::new(lc_01_session_pipeline::SharedBusAdapter::new(
                event_bus.clone(),
            )),
            master_key,
            config: config.pipeline.clone(),
        })?);
        info!("  [lc-01] Session pipeline initialized");

        // lc-02
        let anchor = Arc::new(AnchorService::new(AnchorDependencies {
            chain: Arc::new(chain),
            sink: Arc::new(SessionAnchorSink::new(pipeline.clone())),
            event_bus: Arc::new(lc_02_chain_anchor::SharedBusAdapter::new(event_bus.clone())),
            config: config.anchor.clone(),
        })?);
        info!("  [lc-02] Chain anchor initialized");

        // lc-03
        let identities = Arc::new(InMemoryIdentityRegistry::new());
        let ledger = Arc::new(InMemoryRewardLedger::new());
        let poot = Arc::new(PootService::new(PootDependencies {
            store: Arc::new(InMemoryProofStore::new()),
            identity: identities.clone(),
            session_roots: Arc::new(PipelineRootLookup::new(pipeline.clone())),
            ledger: ledger.clone(),
            event_bus: Arc::new(lc_03_poot_consensus::SharedBusAdapter::new(
                event_bus.clone(),
            )),
            config: config.poot.clone(),
        })?);
        info!("  [lc-03] PoOT consensus initialized");

        Ok(Self {
            event_bus,
            pipeline,
            anchor,
            poot,
            identities,
            ledger,
            anchor_queue: Some(anchor_queue),
            config,
        })
    }

    /// Hand the anchor queue to the worker. `None` once taken.
    pub fn take_anchor_queue(&mut self) -> Option<mpsc::Receiver<AnchorRequest>> {
        self.anchor_queue.take()
    }
}
