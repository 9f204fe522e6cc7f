//! Session facade: one wallet against one cluster.
//!
//! Reads are served from a [`QueryCache`]. Mutations never return `Err`;
//! every failure is caught at the operation boundary and reported in a
//! [`MutationOutcome`], and cached queries are invalidated only after a
//! mutation has landed.

use std::{future::Future, sync::Arc};

use linktree_interface::state::LinkTreeAccount;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use tracing::{error, info};

use crate::{
    builder::{Operation, PreparedTransaction, TransactionBuilder},
    cache::{CachedValue, QueryCache, QueryKey},
    error::{LinktreeError, Result},
    reader::LinktreeReader,
    rpc::{LinktreeRpc, SignatureRecord},
    signer::WalletSigner,
    submit::{SubmitConfig, Submitter},
    AddLinksParams, CreateProfileParams, DeleteLinksParams, DeleteProfileParams,
    EditSettingsParams, LinktreeClient, ProfileSummary, SettingChange,
};

/// Session settings.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Deployed linktree program
    pub program_id: Pubkey,
    pub submit: SubmitConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            program_id: linktree_interface::id(),
            submit: SubmitConfig::default(),
        }
    }
}

/// Result of a mutation: the confirmed signature, or why it failed.
#[derive(Debug)]
pub struct MutationOutcome {
    pub signature: Option<Signature>,
    pub error: Option<LinktreeError>,
}

impl MutationOutcome {
    fn succeeded(signature: Signature) -> Self {
        Self {
            signature: Some(signature),
            error: None,
        }
    }

    fn failed(error: LinktreeError) -> Self {
        Self {
            signature: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.signature.is_some()
    }

    /// Back to a plain `Result`, for callers that want `?`
    pub fn into_result(self) -> Result<Signature> {
        match self.error {
            Some(e) => Err(e),
            None => self.signature.ok_or(LinktreeError::EmptyTransaction),
        }
    }
}

/// A wallet bound to a cluster connection, with cached reads.
pub struct LinktreeSession {
    signer: Arc<dyn WalletSigner>,
    reader: LinktreeReader,
    builder: TransactionBuilder,
    submitter: Submitter,
    cache: QueryCache,
}

impl LinktreeSession {
    pub fn new(
        rpc: Arc<dyn LinktreeRpc>,
        signer: Arc<dyn WalletSigner>,
        config: SessionConfig,
    ) -> Self {
        let client = LinktreeClient::new(config.program_id);
        Self {
            signer,
            reader: LinktreeReader::new(rpc.clone(), client),
            builder: TransactionBuilder::new(rpc.clone(), client),
            submitter: Submitter::new(rpc.clone(), config.submit),
            cache: QueryCache::new(rpc.endpoint()),
        }
    }

    /// The acting wallet
    pub fn owner(&self) -> Pubkey {
        self.signer.pubkey()
    }

    pub fn client(&self) -> &LinktreeClient {
        self.builder.client()
    }

    pub fn reader(&self) -> &LinktreeReader {
        &self.reader
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    // === Reads ===

    pub async fn balance(&self, address: &Pubkey) -> Result<u64> {
        self.cached(
            QueryKey::Balance(*address),
            self.reader.get_balance(address),
            CachedValue::Balance,
            |v| match v {
                CachedValue::Balance(b) => Some(b),
                _ => None,
            },
        )
        .await
    }

    pub async fn signatures(&self, address: &Pubkey) -> Result<Vec<SignatureRecord>> {
        self.cached(
            QueryKey::Signatures(*address),
            self.reader.get_signatures(address),
            CachedValue::Signatures,
            |v| match v {
                CachedValue::Signatures(s) => Some(s),
                _ => None,
            },
        )
        .await
    }

    /// Every profile on the program
    pub async fn directory(&self) -> Result<Vec<ProfileSummary>> {
        self.cached(
            QueryKey::ProfileDirectory,
            self.reader.list_profiles(),
            CachedValue::Profiles,
            profiles,
        )
        .await
    }

    pub async fn profiles_by_owner(&self, owner: &Pubkey) -> Result<Vec<ProfileSummary>> {
        self.cached(
            QueryKey::ProfilesByOwner(*owner),
            self.reader.list_profiles_by_owner(owner),
            CachedValue::Profiles,
            profiles,
        )
        .await
    }

    pub async fn profile(&self, address: &Pubkey) -> Result<Option<LinkTreeAccount>> {
        self.cached(
            QueryKey::Profile(*address),
            self.reader.get_profile(address),
            CachedValue::Profile,
            |v| match v {
                CachedValue::Profile(p) => Some(p),
                _ => None,
            },
        )
        .await
    }

    /// The acting wallet's profile named `username`
    pub async fn my_profile(&self, username: &str) -> Result<Option<LinkTreeAccount>> {
        let address = self.client().profile_pda(username, &self.owner())?;
        self.profile(&address).await
    }

    // === Mutations ===

    pub async fn create_profile(&self, username: &str) -> MutationOutcome {
        let prepared = self
            .builder
            .prepare_create(CreateProfileParams {
                owner: self.owner(),
                username: username.to_string(),
            })
            .await;
        self.execute(prepared).await
    }

    pub async fn add_links(
        &self,
        username: &str,
        urls: Vec<String>,
        titles: Vec<String>,
    ) -> MutationOutcome {
        let prepared = self
            .builder
            .prepare_add_links(AddLinksParams {
                owner: self.owner(),
                username: username.to_string(),
                urls,
                titles,
            })
            .await;
        self.execute(prepared).await
    }

    pub async fn edit_settings(
        &self,
        username: &str,
        avatar_uri: SettingChange,
        color_hex: SettingChange,
    ) -> MutationOutcome {
        let prepared = self
            .builder
            .prepare_edit_settings(EditSettingsParams {
                owner: self.owner(),
                username: username.to_string(),
                avatar_uri,
                color_hex,
            })
            .await;
        self.execute(prepared).await
    }

    pub async fn delete_links(&self, username: &str, link_ids: Vec<u64>) -> MutationOutcome {
        let prepared = self
            .builder
            .prepare_delete_links(DeleteLinksParams {
                owner: self.owner(),
                username: username.to_string(),
                link_ids,
            })
            .await;
        self.execute(prepared).await
    }

    pub async fn delete_profile(&self, username: &str) -> MutationOutcome {
        let prepared = self
            .builder
            .prepare_delete(DeleteProfileParams {
                owner: self.owner(),
                username: username.to_string(),
            })
            .await;
        self.execute(prepared).await
    }

    /// Airdrop `lamports` to the acting wallet (dev/test clusters only)
    pub async fn request_airdrop(&self, lamports: u64) -> MutationOutcome {
        let recipient = self.owner();
        let outcome = self.submitter.request_airdrop(&recipient, lamports).await;
        self.settle(Operation::Airdrop { recipient }, outcome)
    }

    async fn execute(&self, prepared: Result<PreparedTransaction>) -> MutationOutcome {
        let prepared = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                error!(error = %e, "could not prepare transaction");
                return MutationOutcome::failed(e);
            }
        };
        let operation = prepared.operation;
        let outcome = self
            .submitter
            .sign_and_submit(self.signer.as_ref(), prepared)
            .await;
        self.settle(operation, outcome)
    }

    fn settle(&self, operation: Operation, outcome: Result<Signature>) -> MutationOutcome {
        match outcome {
            Ok(signature) => {
                info!(operation = operation.name(), %signature, "transaction confirmed");
                self.cache.invalidate_all(&operation.invalidates());
                MutationOutcome::succeeded(signature)
            }
            Err(e) => {
                error!(
                    operation = operation.name(),
                    error = %e,
                    retryable = e.is_retryable(),
                    "transaction failed"
                );
                MutationOutcome::failed(e)
            }
        }
    }

    async fn cached<T, Fut>(
        &self,
        key: QueryKey,
        fetch: Fut,
        wrap: impl FnOnce(T) -> CachedValue,
        unwrap: impl FnOnce(CachedValue) -> Option<T>,
    ) -> Result<T>
    where
        T: Clone,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(hit) = self.cache.get(&key).and_then(unwrap) {
            return Ok(hit);
        }
        // On error the ticket drops unused and other fetches of `key` stay valid.
        let ticket = self.cache.begin(key);
        let value = fetch.await?;
        self.cache.complete(ticket, wrap(value.clone()));
        Ok(value)
    }
}

fn profiles(value: CachedValue) -> Option<Vec<ProfileSummary>> {
    match value {
        CachedValue::Profiles(p) => Some(p),
        _ => None,
    }
}
