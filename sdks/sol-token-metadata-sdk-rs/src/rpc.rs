//! JSON-RPC backend for the submitter.

use {
    crate::{error::NetworkError, submit::SubmitBackend},
    async_trait::async_trait,
    solana_client::{
        client_error::{ClientError, ClientErrorKind},
        nonblocking::rpc_client::RpcClient,
    },
    solana_sdk::{
        commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey, signature::Signature,
        transaction::Transaction,
    },
    std::time::Duration,
    tracing::debug,
};

/// [`SubmitBackend`] over a Solana JSON-RPC endpoint.
pub struct RpcBackend {
    client: RpcClient,
    commitment: CommitmentConfig,
}

impl RpcBackend {
    /// Connect to `url`. `timeout` bounds each HTTP request.
    pub fn new(url: impl Into<String>, commitment: CommitmentConfig, timeout: Duration) -> Self {
        let client = RpcClient::new_with_timeout_and_commitment(url.into(), timeout, commitment);
        Self { client, commitment }
    }

    /// Endpoint URL
    pub fn url(&self) -> String {
        self.client.url()
    }

    /// Confirmation level used for sends and status checks
    pub fn commitment(&self) -> CommitmentConfig {
        self.commitment
    }
}

fn network_error(err: ClientError) -> NetworkError {
    match err.kind() {
        ClientErrorKind::TransactionError(tx_err) => NetworkError::Rejected(tx_err.to_string()),
        _ => NetworkError::Rpc(err.to_string()),
    }
}

#[async_trait]
impl SubmitBackend for RpcBackend {
    async fn latest_blockhash(&self) -> Result<Hash, NetworkError> {
        self.client
            .get_latest_blockhash()
            .await
            .map_err(network_error)
    }

    async fn send_and_confirm(
        &self,
        transaction: &Transaction,
    ) -> Result<Signature, NetworkError> {
        debug!(url = %self.client.url(), "send_and_confirm_transaction");
        self.client
            .send_and_confirm_transaction(transaction)
            .await
            .map_err(network_error)
    }

    async fn signature_confirmed(&self, signature: &Signature) -> Result<bool, NetworkError> {
        let status = self
            .client
            .get_signature_status_with_commitment(signature, self.commitment)
            .await
            .map_err(network_error)?;
        Ok(matches!(status, Some(Ok(()))))
    }

    async fn balance(&self, pubkey: &Pubkey) -> Result<u64, NetworkError> {
        self.client.get_balance(pubkey).await.map_err(network_error)
    }
}
