//! Transaction preparation.
//!
//! A [`PreparedTransaction`] is an unsigned legacy transaction paying from
//! the acting wallet, bound to a fresh blockhash, together with what the
//! submitter and cache need to know about it.

use std::sync::Arc;

use solana_sdk::{
    hash::Hash, instruction::Instruction, message::Message, pubkey::Pubkey,
    transaction::Transaction,
};
use tracing::debug;

use crate::{
    cache::QueryKey, error::Result, rpc::LinktreeRpc, AddLinksParams, CreateProfileParams,
    DeleteLinksParams, DeleteProfileParams, EditSettingsParams, LinktreeClient,
};

/// Blockhash a transaction is bound to and the last block height at which
/// the cluster still accepts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// The mutation a transaction performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateProfile { owner: Pubkey, profile: Pubkey },
    AddLinks { owner: Pubkey, profile: Pubkey },
    EditSettings { owner: Pubkey, profile: Pubkey },
    DeleteLinks { owner: Pubkey, profile: Pubkey },
    DeleteProfile { owner: Pubkey, profile: Pubkey },
    Airdrop { recipient: Pubkey },
}

impl Operation {
    /// Cached queries whose answer changes once this operation lands.
    pub fn invalidates(&self) -> Vec<QueryKey> {
        match *self {
            Operation::CreateProfile { owner, profile }
            | Operation::DeleteProfile { owner, profile } => vec![
                QueryKey::Balance(owner),
                QueryKey::Signatures(owner),
                QueryKey::ProfileDirectory,
                QueryKey::ProfilesByOwner(owner),
                QueryKey::Profile(profile),
            ],
            Operation::AddLinks { owner, profile }
            | Operation::EditSettings { owner, profile }
            | Operation::DeleteLinks { owner, profile } => vec![
                QueryKey::Profile(profile),
                QueryKey::Balance(owner),
                QueryKey::Signatures(owner),
            ],
            Operation::Airdrop { recipient } => vec![
                QueryKey::Balance(recipient),
                QueryKey::Signatures(recipient),
            ],
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Operation::CreateProfile { .. } => "create_profile",
            Operation::AddLinks { .. } => "add_links",
            Operation::EditSettings { .. } => "edit_settings",
            Operation::DeleteLinks { .. } => "delete_links",
            Operation::DeleteProfile { .. } => "delete_profile",
            Operation::Airdrop { .. } => "airdrop",
        }
    }
}

/// Unsigned transaction ready for a signer.
#[derive(Debug, Clone)]
pub struct PreparedTransaction {
    pub transaction: Transaction,
    pub anchor: Anchor,
    /// Profile account the transaction targets
    pub profile_address: Pubkey,
    pub operation: Operation,
}

impl PreparedTransaction {
    /// True when there is nothing to execute (a settings edit with no changes)
    pub fn is_empty(&self) -> bool {
        self.transaction.message.instructions.is_empty()
    }
}

/// Builds [`PreparedTransaction`]s against a cluster.
#[derive(Clone)]
pub struct TransactionBuilder {
    rpc: Arc<dyn LinktreeRpc>,
    client: LinktreeClient,
}

impl TransactionBuilder {
    pub fn new(rpc: Arc<dyn LinktreeRpc>, client: LinktreeClient) -> Self {
        Self { rpc, client }
    }

    /// Instruction builder this transaction builder uses
    pub fn client(&self) -> &LinktreeClient {
        &self.client
    }

    /// Returns: [create_linktree_account]
    pub async fn prepare_create(&self, params: CreateProfileParams) -> Result<PreparedTransaction> {
        let owner = params.owner;
        let profile = self.client.profile_pda(&params.username, &owner)?;
        let ix = self.client.create_linktree_account_ix(params)?;
        self.prepare(owner, profile, vec![ix], Operation::CreateProfile { owner, profile })
            .await
    }

    /// Returns: [add_links]
    pub async fn prepare_add_links(&self, params: AddLinksParams) -> Result<PreparedTransaction> {
        let owner = params.owner;
        let profile = self.client.profile_pda(&params.username, &owner)?;
        let ix = self.client.add_links_ix(params)?;
        self.prepare(owner, profile, vec![ix], Operation::AddLinks { owner, profile })
            .await
    }

    /// Returns: zero, one or two edit instructions (see
    /// [`LinktreeClient::edit_settings_ixs`]). An empty bundle is returned as
    /// is; the submitter refuses it.
    pub async fn prepare_edit_settings(
        &self,
        params: EditSettingsParams,
    ) -> Result<PreparedTransaction> {
        let owner = params.owner;
        let profile = self.client.profile_pda(&params.username, &owner)?;
        let ixs = self.client.edit_settings_ixs(params)?;
        self.prepare(owner, profile, ixs, Operation::EditSettings { owner, profile })
            .await
    }

    /// Returns: [delete_links]
    pub async fn prepare_delete_links(
        &self,
        params: DeleteLinksParams,
    ) -> Result<PreparedTransaction> {
        let owner = params.owner;
        let profile = self.client.profile_pda(&params.username, &owner)?;
        let ix = self.client.delete_links_ix(params)?;
        self.prepare(owner, profile, vec![ix], Operation::DeleteLinks { owner, profile })
            .await
    }

    /// Returns: [delete_linktree_account]
    pub async fn prepare_delete(&self, params: DeleteProfileParams) -> Result<PreparedTransaction> {
        let owner = params.owner;
        let profile = self.client.profile_pda(&params.username, &owner)?;
        let ix = self.client.delete_linktree_account_ix(params)?;
        self.prepare(owner, profile, vec![ix], Operation::DeleteProfile { owner, profile })
            .await
    }

    async fn prepare(
        &self,
        payer: Pubkey,
        profile_address: Pubkey,
        instructions: Vec<Instruction>,
        operation: Operation,
    ) -> Result<PreparedTransaction> {
        let (blockhash, last_valid_block_height) = self.rpc.get_latest_blockhash().await?;
        let message = Message::new_with_blockhash(&instructions, Some(&payer), &blockhash);
        debug!(
            operation = operation.name(),
            %profile_address,
            %blockhash,
            last_valid_block_height,
            instructions = instructions.len(),
            "prepared transaction"
        );
        Ok(PreparedTransaction {
            transaction: Transaction::new_unsigned(message),
            anchor: Anchor {
                blockhash,
                last_valid_block_height,
            },
            profile_address,
            operation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutation_invalidation_lists() {
        let owner = Pubkey::new_unique();
        let profile = Pubkey::new_unique();

        let create = Operation::CreateProfile { owner, profile }.invalidates();
        assert!(create.contains(&QueryKey::ProfileDirectory));
        assert!(create.contains(&QueryKey::ProfilesByOwner(owner)));
        assert!(create.contains(&QueryKey::Profile(profile)));
        assert!(create.contains(&QueryKey::Balance(owner)));

        let add = Operation::AddLinks { owner, profile }.invalidates();
        assert!(add.contains(&QueryKey::Profile(profile)));
        assert!(!add.contains(&QueryKey::ProfileDirectory));

        let airdrop = Operation::Airdrop { recipient: owner }.invalidates();
        assert_eq!(
            airdrop,
            vec![QueryKey::Balance(owner), QueryKey::Signatures(owner)]
        );
    }
}
