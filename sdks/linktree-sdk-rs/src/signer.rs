//! Wallet capability.

use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};

use crate::error::{LinktreeError, Result};

/// Something that can approve transactions on behalf of one account:
/// a local keypair, a hardware wallet, a browser wallet bridge.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Account this signer signs for
    fn pubkey(&self) -> Pubkey;

    /// Return `transaction` with this signer's signature filled in.
    ///
    /// Declining or failing to sign is [`LinktreeError::SignerRejected`].
    async fn sign_transaction(&self, transaction: Transaction) -> Result<Transaction>;
}

#[async_trait]
impl WalletSigner for Keypair {
    fn pubkey(&self) -> Pubkey {
        Signer::pubkey(self)
    }

    async fn sign_transaction(&self, mut transaction: Transaction) -> Result<Transaction> {
        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_sign(&[self], blockhash)
            .map_err(|e| LinktreeError::SignerRejected(e.to_string()))?;
        Ok(transaction)
    }
}
