//! Chain client selection.

use async_trait::async_trait;
use lc_02_chain_anchor::{AnchorSubmissionError, ChainSubmitter, JsonRpcChainSubmitter, ScriptedChain};
use shared_types::AnchorRequest;
use std::sync::Arc;

/// The chain client the anchor service talks to.
pub enum ChainBackend {
    /// In-process chain that accepts everything. Used when no RPC endpoint
    /// is configured.
    Dev(Arc<ScriptedChain>),
    JsonRpc(JsonRpcChainSubmitter),
}

impl ChainBackend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dev(_) => "dev",
            Self::JsonRpc(_) => "json-rpc",
        }
    }
}

#[async_trait]
impl ChainSubmitter for ChainBackend {
    async fn submit_anchor(&self, request: &AnchorRequest) -> Result<String, AnchorSubmissionError> {
        match self {
            Self::Dev(chain) => chain.submit_anchor(request).await,
            Self::JsonRpc(client) => client.submit_anchor(request).await,
        }
    }

    async fn get_confirmations(&self, txid: &str) -> Result<u64, AnchorSubmissionError> {
        match self {
            Self::Dev(chain) => chain.get_confirmations(txid).await,
            Self::JsonRpc(client) => client.get_confirmations(txid).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{OwnerAddress, SessionId};

    #[tokio::test]
    async fn test_dev_backend_delegates_to_scripted_chain() {
        let chain = Arc::new(ScriptedChain::new(12));
        let backend = ChainBackend::Dev(chain.clone());
        let request = AnchorRequest {
            session_id: SessionId::new(),
            merkle_root: [3; 32],
            owner: OwnerAddress::parse("TQn9Y2khEsLJW1ChVWFMSMeRDow5KcbLSE").unwrap(),
            requested_at: 5,
        };

        let txid = backend.submit_anchor(&request).await.unwrap();
        assert_eq!(backend.get_confirmations(&txid).await.unwrap(), 12);
        assert_eq!(chain.accepted(), vec![request]);
        assert_eq!(backend.name(), "dev");
    }
}
