//! Signing, submission and confirmation.

use std::{sync::Arc, time::Duration};

use solana_sdk::{
    commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};
use tracing::{debug, warn};

use crate::{
    builder::{Anchor, PreparedTransaction},
    error::{LinktreeError, Result},
    rpc::LinktreeRpc,
    signer::WalletSigner,
};

/// How submissions wait for confirmation.
#[derive(Debug, Clone, Copy)]
pub struct SubmitConfig {
    /// Commitment level a transaction must reach
    pub commitment: CommitmentConfig,
    /// Delay between signature status polls
    pub poll_interval: Duration,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            commitment: CommitmentConfig::confirmed(),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Sends transactions and waits until they land or expire.
///
/// Nothing is retried: every failure is returned classified so the caller
/// can decide (see [`LinktreeError::is_retryable`]).
#[derive(Clone)]
pub struct Submitter {
    rpc: Arc<dyn LinktreeRpc>,
    config: SubmitConfig,
}

impl Submitter {
    pub fn new(rpc: Arc<dyn LinktreeRpc>, config: SubmitConfig) -> Self {
        Self { rpc, config }
    }

    pub fn config(&self) -> &SubmitConfig {
        &self.config
    }

    /// Have `signer` sign `prepared`, then [`Submitter::submit`] it.
    ///
    /// An empty bundle is refused before the signer or the network is involved.
    pub async fn sign_and_submit(
        &self,
        signer: &dyn WalletSigner,
        prepared: PreparedTransaction,
    ) -> Result<Signature> {
        if prepared.is_empty() {
            return Err(LinktreeError::EmptyTransaction);
        }
        let anchor = prepared.anchor;
        let signed = signer.sign_transaction(prepared.transaction).await?;
        self.submit(&signed, anchor).await
    }

    /// Send a signed transaction and wait for it at the configured commitment.
    pub async fn submit(&self, transaction: &Transaction, anchor: Anchor) -> Result<Signature> {
        if transaction.message.instructions.is_empty() {
            return Err(LinktreeError::EmptyTransaction);
        }
        let signature = self.rpc.send_transaction(transaction).await?;
        debug!(%signature, blockhash = %anchor.blockhash, "sent transaction");
        self.confirm(&signature, anchor).await?;
        Ok(signature)
    }

    /// Poll until `signature` reaches the configured commitment.
    ///
    /// Returns [`LinktreeError::Expired`] once the block height passes the
    /// anchor's last valid height without the signature showing up.
    pub async fn confirm(&self, signature: &Signature, anchor: Anchor) -> Result<()> {
        loop {
            if let Some(status) = self.status(signature).await? {
                return status.map_err(|e| LinktreeError::from_transaction_error(e, anchor.blockhash));
            }

            let height = self.rpc.get_block_height().await?;
            if height > anchor.last_valid_block_height {
                // It may have landed between the status poll and the height check.
                if let Some(status) = self.status(signature).await? {
                    return status
                        .map_err(|e| LinktreeError::from_transaction_error(e, anchor.blockhash));
                }
                warn!(
                    %signature,
                    height,
                    last_valid_block_height = anchor.last_valid_block_height,
                    "transaction expired"
                );
                return Err(LinktreeError::Expired {
                    blockhash: anchor.blockhash,
                });
            }

            debug!(%signature, height, "waiting for confirmation");
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Ask the cluster faucet for `lamports` and wait for the airdrop to land.
    pub async fn request_airdrop(&self, address: &Pubkey, lamports: u64) -> Result<Signature> {
        let (latest, requested) = tokio::join!(
            self.rpc.get_latest_blockhash(),
            self.rpc.request_airdrop(address, lamports)
        );
        let (blockhash, last_valid_block_height) = latest?;
        let signature = requested?;
        debug!(%signature, %address, lamports, "requested airdrop");
        self.confirm(
            &signature,
            Anchor {
                blockhash,
                last_valid_block_height,
            },
        )
        .await?;
        Ok(signature)
    }

    async fn status(
        &self,
        signature: &Signature,
    ) -> Result<Option<std::result::Result<(), solana_sdk::transaction::TransactionError>>> {
        self.rpc
            .get_signature_status(signature, self.config.commitment)
            .await
    }
}
