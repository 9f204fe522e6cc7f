//! Profile account reader.

use std::sync::Arc;

use linktree_interface::state::LinkTreeAccount;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

use crate::{
    error::{LinktreeError, Result},
    rpc::{LinktreeRpc, SignatureRecord},
    LinktreeClient, ProfileSummary,
};

/// Enumerates and fetches profile accounts.
#[derive(Clone)]
pub struct LinktreeReader {
    rpc: Arc<dyn LinktreeRpc>,
    client: LinktreeClient,
}

impl LinktreeReader {
    pub fn new(rpc: Arc<dyn LinktreeRpc>, client: LinktreeClient) -> Self {
        Self { rpc, client }
    }

    /// Every decodable profile owned by the program.
    ///
    /// Accounts that do not decode are logged and skipped.
    pub async fn list_profiles(&self) -> Result<Vec<ProfileSummary>> {
        Ok(self
            .decoded_profiles()
            .await?
            .into_iter()
            .map(|(address, account)| summarize(address, account))
            .collect())
    }

    /// Profiles whose stored owner is `owner`.
    pub async fn list_profiles_by_owner(&self, owner: &Pubkey) -> Result<Vec<ProfileSummary>> {
        Ok(self
            .decoded_profiles()
            .await?
            .into_iter()
            .filter(|(_, account)| account.owner == *owner)
            .map(|(address, account)| summarize(address, account))
            .collect())
    }

    /// The profile at `address`, `None` when no account exists there.
    pub async fn get_profile(&self, address: &Pubkey) -> Result<Option<LinkTreeAccount>> {
        let Some(account) = self.rpc.get_account(address).await? else {
            debug!(%address, "no profile account");
            return Ok(None);
        };
        if account.owner != self.client.program_id {
            return Err(LinktreeError::WrongOwner {
                address: *address,
                owner: account.owner,
            });
        }
        LinkTreeAccount::try_from_account_data(&account.data)
            .map(Some)
            .map_err(|source| LinktreeError::Decode {
                address: *address,
                source,
            })
    }

    /// Derive the `(username, owner)` address and fetch it.
    pub async fn get_profile_by_username(
        &self,
        owner: &Pubkey,
        username: &str,
    ) -> Result<Option<LinkTreeAccount>> {
        let address = self.client.profile_pda(username, owner)?;
        self.get_profile(&address).await
    }

    /// Fetch several profiles concurrently. Every fetch settles; results come
    /// back in the order of `addresses`.
    pub async fn get_profiles(&self, addresses: &[Pubkey]) -> Vec<Result<Option<LinkTreeAccount>>> {
        let handles: Vec<_> = addresses
            .iter()
            .map(|address| {
                let reader = self.clone();
                let address = *address;
                tokio::spawn(async move { reader.get_profile(&address).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(
                handle
                    .await
                    .unwrap_or_else(|e| Err(LinktreeError::Rpc(format!("fetch task failed: {e}")))),
            );
        }
        results
    }

    /// Lamport balance of `address`
    pub async fn get_balance(&self, address: &Pubkey) -> Result<u64> {
        self.rpc.get_balance(address).await
    }

    /// Transaction signature history of `address`, newest first
    pub async fn get_signatures(&self, address: &Pubkey) -> Result<Vec<SignatureRecord>> {
        self.rpc.get_signatures_for_address(address).await
    }

    async fn decoded_profiles(&self) -> Result<Vec<(Pubkey, LinkTreeAccount)>> {
        let accounts = self.rpc.get_program_accounts(&self.client.program_id).await?;
        let total = accounts.len();
        let decoded: Vec<_> = accounts
            .into_iter()
            .filter_map(
                |(address, account)| match LinkTreeAccount::try_from_account_data(&account.data) {
                    Ok(profile) => Some((address, profile)),
                    Err(e) => {
                        warn!(%address, error = %e, "skipping undecodable program account");
                        None
                    }
                },
            )
            .collect();
        debug!(total, decoded = decoded.len(), "listed program accounts");
        Ok(decoded)
    }
}

fn summarize(address: Pubkey, account: LinkTreeAccount) -> ProfileSummary {
    ProfileSummary {
        username: account.username,
        address,
        owner: account.owner,
    }
}
