//! Network connection seam.
//!
//! Everything the SDK needs from a cluster goes through [`LinktreeRpc`], so
//! the reader, builder and submitter work the same against a live
//! `RpcClient` and against an in-memory cluster in tests.

use async_trait::async_trait;
use solana_client::{client_error::ClientError, nonblocking::rpc_client::RpcClient};
use solana_sdk::{
    account::Account,
    commitment_config::CommitmentConfig,
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::{Transaction, TransactionError},
};

use crate::error::{LinktreeError, Result};

/// One entry of an address's transaction-signature history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureRecord {
    /// Transaction signature, base58
    pub signature: String,
    /// Slot the transaction landed in
    pub slot: u64,
    /// Failure description, `None` for successful transactions
    pub error: Option<String>,
    /// Block time, when the node knows it
    pub block_time: Option<i64>,
}

/// Asynchronous cluster access used by the linktree SDK.
#[async_trait]
pub trait LinktreeRpc: Send + Sync {
    /// Endpoint identifier, used to scope caches
    fn endpoint(&self) -> String;

    /// All accounts owned by `program_id`
    async fn get_program_accounts(&self, program_id: &Pubkey) -> Result<Vec<(Pubkey, Account)>>;

    /// A single account, `None` when it does not exist
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>>;

    /// Lamport balance
    async fn get_balance(&self, address: &Pubkey) -> Result<u64>;

    /// Recent transaction signatures involving `address`, newest first
    async fn get_signatures_for_address(&self, address: &Pubkey) -> Result<Vec<SignatureRecord>>;

    /// Latest blockhash and the last block height at which it is valid
    async fn get_latest_blockhash(&self) -> Result<(Hash, u64)>;

    /// Current block height
    async fn get_block_height(&self) -> Result<u64>;

    /// Submit a signed transaction. Preflight failures come back already
    /// classified (see [`LinktreeError::from_transaction_error`]).
    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature>;

    /// `Some(result)` once `signature` reached `commitment`, `None` before that
    async fn get_signature_status(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<Option<std::result::Result<(), TransactionError>>>;

    /// Ask a dev/test cluster faucet for lamports
    async fn request_airdrop(&self, address: &Pubkey, lamports: u64) -> Result<Signature>;
}

#[async_trait]
impl LinktreeRpc for RpcClient {
    fn endpoint(&self) -> String {
        self.url()
    }

    async fn get_program_accounts(&self, program_id: &Pubkey) -> Result<Vec<(Pubkey, Account)>> {
        Ok(RpcClient::get_program_accounts(self, program_id).await?)
    }

    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>> {
        let response = self
            .get_account_with_commitment(address, self.commitment())
            .await?;
        Ok(response.value)
    }

    async fn get_balance(&self, address: &Pubkey) -> Result<u64> {
        Ok(RpcClient::get_balance(self, address).await?)
    }

    async fn get_signatures_for_address(&self, address: &Pubkey) -> Result<Vec<SignatureRecord>> {
        let entries = RpcClient::get_signatures_for_address(self, address).await?;
        Ok(entries
            .into_iter()
            .map(|entry| SignatureRecord {
                signature: entry.signature,
                slot: entry.slot,
                error: entry.err.map(|e| format!("{e:?}")),
                block_time: entry.block_time,
            })
            .collect())
    }

    async fn get_latest_blockhash(&self) -> Result<(Hash, u64)> {
        Ok(self
            .get_latest_blockhash_with_commitment(self.commitment())
            .await?)
    }

    async fn get_block_height(&self) -> Result<u64> {
        Ok(RpcClient::get_block_height(self).await?)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        RpcClient::send_transaction(self, transaction)
            .await
            .map_err(|e| send_error(e, transaction.message.recent_blockhash))
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<Option<std::result::Result<(), TransactionError>>> {
        Ok(self
            .get_signature_status_with_commitment(signature, commitment)
            .await?)
    }

    async fn request_airdrop(&self, address: &Pubkey, lamports: u64) -> Result<Signature> {
        Ok(RpcClient::request_airdrop(self, address, lamports).await?)
    }
}

/// Preflight rejections carry a transaction error; anything else is transport.
fn send_error(e: ClientError, blockhash: Hash) -> LinktreeError {
    match e.get_transaction_error() {
        Some(tx_err) => LinktreeError::from_transaction_error(tx_err, blockhash),
        None => LinktreeError::from(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linktree_interface::error::LinktreeProgramError;
    use serde_json::json;
    use solana_client::{client_error::ClientErrorKind, rpc_request::RpcRequest};
    use solana_rpc_client::mock_sender::Mocks;
    use solana_sdk::{
        instruction::{Instruction, InstructionError},
        signature::{Keypair, Signer},
    };

    fn mock_client(mocks: Mocks) -> RpcClient {
        RpcClient::new_mock_with_mocks("succeeds".to_string(), mocks)
    }

    #[tokio::test]
    async fn plain_reads_are_unwrapped() {
        let rpc = mock_client(Mocks::from([
            (RpcRequest::GetBalance, json!({"context": {"slot": 1}, "value": 42})),
            (RpcRequest::GetBlockHeight, json!(1234)),
        ]));

        assert_eq!(LinktreeRpc::endpoint(&rpc), "succeeds");
        assert_eq!(LinktreeRpc::get_balance(&rpc, &Pubkey::new_unique()).await.unwrap(), 42);
        assert_eq!(LinktreeRpc::get_block_height(&rpc).await.unwrap(), 1234);
    }

    #[tokio::test]
    async fn latest_blockhash_comes_with_its_last_valid_height() {
        let blockhash = Hash::new_unique();
        let rpc = mock_client(Mocks::from([(
            RpcRequest::GetLatestBlockhash,
            json!({
                "context": {"slot": 1},
                "value": {"blockhash": blockhash.to_string(), "lastValidBlockHeight": 300},
            }),
        )]));

        assert_eq!(
            LinktreeRpc::get_latest_blockhash(&rpc).await.unwrap(),
            (blockhash, 300)
        );
    }

    #[tokio::test]
    async fn signature_status_reports_landed_failures_and_unknowns() {
        let failed = json!({"InstructionError": [0, {"Custom": 6000}]});
        let rpc = mock_client(Mocks::from([(
            RpcRequest::GetSignatureStatuses,
            json!({
                "context": {"slot": 1},
                "value": [{
                    "slot": 1,
                    "confirmations": null,
                    "status": {"Err": failed},
                    "err": failed,
                    "confirmationStatus": "finalized",
                }],
            }),
        )]));
        let status = LinktreeRpc::get_signature_status(
            &rpc,
            &Signature::default(),
            CommitmentConfig::confirmed(),
        )
        .await
        .unwrap();
        assert_eq!(
            status,
            Some(Err(TransactionError::InstructionError(
                0,
                InstructionError::Custom(6000)
            )))
        );

        let rpc = mock_client(Mocks::from([(
            RpcRequest::GetSignatureStatuses,
            json!({"context": {"slot": 1}, "value": [null]}),
        )]));
        let status = LinktreeRpc::get_signature_status(
            &rpc,
            &Signature::default(),
            CommitmentConfig::confirmed(),
        )
        .await
        .unwrap();
        assert_eq!(status, None);
    }

    #[tokio::test]
    async fn send_returns_the_transaction_signature() {
        let payer = Keypair::new();
        let transaction = Transaction::new_signed_with_payer(
            &[Instruction::new_with_bytes(Pubkey::new_unique(), &[1], vec![])],
            Some(&payer.pubkey()),
            &[&payer],
            Hash::new_unique(),
        );
        let rpc = mock_client(Mocks::from([(
            RpcRequest::SendTransaction,
            json!(transaction.signatures[0].to_string()),
        )]));

        assert_eq!(
            LinktreeRpc::send_transaction(&rpc, &transaction).await.unwrap(),
            transaction.signatures[0]
        );
    }

    #[test]
    fn preflight_rejections_are_classified() {
        let blockhash = Hash::new_unique();

        let expired = send_error(ClientError::from(TransactionError::BlockhashNotFound), blockhash);
        assert!(matches!(expired, LinktreeError::Expired { blockhash: b } if b == blockhash));

        let reverted = send_error(
            ClientError::from(TransactionError::InstructionError(
                0,
                InstructionError::Custom(6000),
            )),
            blockhash,
        );
        assert_eq!(
            reverted.program_error(),
            Some(LinktreeProgramError::LengthInputsNotSame)
        );

        let transport = send_error(
            ClientError::from(ClientErrorKind::Custom("connection refused".into())),
            blockhash,
        );
        assert!(matches!(transport, LinktreeError::Rpc(_)));
    }
}
