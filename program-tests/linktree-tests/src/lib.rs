//! In-memory cluster for exercising the linktree SDK end to end.
//!
//! [`MockCluster`] implements [`LinktreeRpc`]: it keeps accounts, balances,
//! blockhashes and signature statuses in memory and executes linktree
//! instructions the way the deployed program does (seed check, duplicate
//! create, length mismatch, link counter, settings, close). A few fault knobs
//! let tests drive expiry, late confirmation, RPC failures and preflight-less
//! submission.

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use linktree_interface::{
    error::LinktreeProgramError,
    instruction::LinktreeInstruction,
    state::{LinkTreeAccount, Link, LINKTREE_ACCOUNT_SPACE},
    try_find_linktree_pda_with_program,
};
use linktree_sdk::{
    error::SYSTEM_ACCOUNT_ALREADY_IN_USE, LinktreeError, LinktreeRpc, LinktreeSession,
    SessionConfig, SignatureRecord, SubmitConfig,
};
use solana_sdk::{
    account::Account,
    commitment_config::CommitmentConfig,
    hash::Hash,
    instruction::InstructionError,
    native_token::LAMPORTS_PER_SOL,
    pubkey::Pubkey,
    rent::Rent,
    signature::{Keypair, Signature, Signer},
    system_program,
    transaction::{Transaction, TransactionError},
};
use tracing_subscriber::EnvFilter;

/// Blocks a blockhash stays usable after it was issued
pub const BLOCKHASH_VALIDITY: u64 = 150;

/// Fee charged to the fee payer per required signature
pub const FEE_PER_SIGNATURE: u64 = 5_000;

/// Balance [`TestContext::funded_keypair`] starts wallets with
pub const FUNDING_LAMPORTS: u64 = 2 * LAMPORTS_PER_SOL;

// Anchor framework codes the program reports
const INSTRUCTION_DID_NOT_DESERIALIZE: u32 = 102;
const CONSTRAINT_SEEDS: u32 = 2006;
const ACCOUNT_DID_NOT_DESERIALIZE: u32 = 3003;
const ACCOUNT_DID_NOT_SERIALIZE: u32 = 3004;
const ACCOUNT_NOT_INITIALIZED: u32 = 3012;

// system program: ResultWithNegativeLamports
const SYSTEM_INSUFFICIENT_FUNDS: u32 = 1;

type SdkResult<T> = linktree_sdk::Result<T>;

#[derive(Default)]
struct Faults {
    fail_next_rpc: Option<String>,
    drop_next_send: bool,
    skip_preflight: bool,
    delay_next_status: Option<LateStatus>,
}

#[derive(Clone, Copy)]
struct LateStatus {
    hidden_polls: usize,
    past_expiry: bool,
}

struct ClusterState {
    accounts: HashMap<Pubkey, Account>,
    slot: u64,
    block_height: u64,
    latest_blockhash: Hash,
    // blockhash -> last valid block height
    blockhashes: HashMap<Hash, u64>,
    statuses: HashMap<Signature, Result<(), TransactionError>>,
    // status queries still answered with "not yet"
    hidden_statuses: HashMap<Signature, usize>,
    status_polls: usize,
    history: HashMap<Pubkey, Vec<SignatureRecord>>,
    faults: Faults,
    airdrops: u64,
    sent: usize,
}

impl ClusterState {
    fn new() -> Self {
        let mut state = Self {
            accounts: HashMap::new(),
            slot: 0,
            block_height: 0,
            latest_blockhash: Hash::default(),
            blockhashes: HashMap::new(),
            statuses: HashMap::new(),
            hidden_statuses: HashMap::new(),
            status_polls: 0,
            history: HashMap::new(),
            faults: Faults::default(),
            airdrops: 0,
            sent: 0,
        };
        state.advance_block();
        state
    }

    fn take_rpc_fault(&mut self) -> SdkResult<()> {
        match self.faults.fail_next_rpc.take() {
            Some(message) => Err(LinktreeError::Rpc(message)),
            None => Ok(()),
        }
    }

    fn advance_block(&mut self) {
        self.slot += 1;
        self.block_height += 1;
        self.latest_blockhash = Hash::new_unique();
        self.blockhashes
            .insert(self.latest_blockhash, self.block_height + BLOCKHASH_VALIDITY);
    }

    fn blockhash_is_valid(&self, blockhash: &Hash) -> bool {
        self.blockhashes
            .get(blockhash)
            .is_some_and(|last_valid| *last_valid >= self.block_height)
    }

    fn lamports(&self, address: &Pubkey) -> u64 {
        self.accounts.get(address).map_or(0, |a| a.lamports)
    }

    fn credit(&mut self, address: &Pubkey, lamports: u64) {
        self.accounts
            .entry(*address)
            .or_insert_with(|| Account::new(0, 0, &system_program::id()))
            .lamports += lamports;
    }

    fn record(
        &mut self,
        signature: Signature,
        result: Result<(), TransactionError>,
        involved: &[Pubkey],
    ) {
        let entry = SignatureRecord {
            signature: signature.to_string(),
            slot: self.slot,
            error: result.as_ref().err().map(|e| format!("{e:?}")),
            block_time: None,
        };
        for address in involved {
            self.history
                .entry(*address)
                .or_default()
                .insert(0, entry.clone());
        }
        self.statuses.insert(signature, result);
    }

    fn synthetic_signature(&mut self) -> Signature {
        self.airdrops += 1;
        let mut bytes = [0u8; 64];
        bytes[..8].copy_from_slice(&self.airdrops.to_le_bytes());
        bytes[63] = 0xad;
        Signature::from(bytes)
    }

    /// Run every instruction against a copy of the accounts; the copy is
    /// only returned when all of them succeed.
    fn execute(
        &self,
        program_id: &Pubkey,
        transaction: &Transaction,
    ) -> Result<HashMap<Pubkey, Account>, TransactionError> {
        let message = &transaction.message;
        let mut accounts = self.accounts.clone();
        for (index, ix) in message.instructions.iter().enumerate() {
            let fail = |e| TransactionError::InstructionError(index as u8, e);
            let key = |i: u8| message.account_keys.get(usize::from(i)).copied();

            if key(ix.program_id_index) != Some(*program_id) {
                return Err(fail(InstructionError::UnsupportedProgramId));
            }
            let metas = ix
                .accounts
                .iter()
                .map(|&i| key(i).map(|k| (k, message.is_signer(usize::from(i)))))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| fail(InstructionError::NotEnoughAccountKeys))?;

            run_linktree_instruction(program_id, &metas, &ix.data, &mut accounts).map_err(fail)?;
        }
        Ok(accounts)
    }
}

fn run_linktree_instruction(
    program_id: &Pubkey,
    metas: &[(Pubkey, bool)],
    data: &[u8],
    accounts: &mut HashMap<Pubkey, Account>,
) -> Result<(), InstructionError> {
    let instruction = LinktreeInstruction::unpack(data)
        .map_err(|_| InstructionError::Custom(INSTRUCTION_DID_NOT_DESERIALIZE))?;
    let [(profile, _), (owner, owner_signed), ..] = metas else {
        return Err(InstructionError::NotEnoughAccountKeys);
    };
    if !owner_signed {
        return Err(InstructionError::MissingRequiredSignature);
    }
    let expected = try_find_linktree_pda_with_program(program_id, instruction.username(), owner);
    if expected.map(|(address, _)| address) != Some(*profile) {
        return Err(InstructionError::Custom(CONSTRAINT_SEEDS));
    }

    match instruction {
        LinktreeInstruction::CreateLinktreeAccount(args) => {
            if accounts.contains_key(profile) {
                return Err(InstructionError::Custom(SYSTEM_ACCOUNT_ALREADY_IN_USE));
            }
            let rent = Rent::default().minimum_balance(LINKTREE_ACCOUNT_SPACE);
            let payer = accounts
                .get_mut(owner)
                .filter(|payer| payer.lamports >= rent)
                .ok_or(InstructionError::Custom(SYSTEM_INSUFFICIENT_FUNDS))?;
            payer.lamports -= rent;

            let record = LinkTreeAccount {
                owner: *owner,
                username: args.username,
                ..LinkTreeAccount::default()
            };
            let mut account = Account::new(rent, 0, program_id);
            account.data = allocate(&record)?;
            accounts.insert(*profile, account);
        }
        LinktreeInstruction::DeleteLinktreeAccount(_) => {
            load(program_id, profile, accounts)?;
            if let Some(closed) = accounts.remove(profile) {
                accounts
                    .entry(*owner)
                    .or_insert_with(|| Account::new(0, 0, &system_program::id()))
                    .lamports += closed.lamports;
            }
        }
        other => {
            let mut record = load(program_id, profile, accounts)?;
            apply(&mut record, other)?;
            let data = allocate(&record)?;
            if let Some(account) = accounts.get_mut(profile) {
                account.data = data;
            }
        }
    }
    Ok(())
}

fn load(
    program_id: &Pubkey,
    profile: &Pubkey,
    accounts: &HashMap<Pubkey, Account>,
) -> Result<LinkTreeAccount, InstructionError> {
    let account = accounts
        .get(profile)
        .filter(|a| a.owner == *program_id)
        .ok_or(InstructionError::Custom(ACCOUNT_NOT_INITIALIZED))?;
    LinkTreeAccount::try_from_account_data(&account.data)
        .map_err(|_| InstructionError::Custom(ACCOUNT_DID_NOT_DESERIALIZE))
}

fn apply(record: &mut LinkTreeAccount, instruction: LinktreeInstruction) -> Result<(), InstructionError> {
    match instruction {
        LinktreeInstruction::AddLinks(args) => {
            if args.urls.len() != args.titles.len() {
                return Err(InstructionError::Custom(
                    LinktreeProgramError::LengthInputsNotSame.code(),
                ));
            }
            for (url, title) in args.urls.into_iter().zip(args.titles) {
                record.links.push(Link {
                    id: record.link_counter,
                    title,
                    url,
                    active: true,
                });
                record.link_counter += 1;
            }
        }
        LinktreeInstruction::DeleteLinks(args) => {
            for link in record
                .links
                .iter_mut()
                .filter(|link| args.link_ids.contains(&link.id))
            {
                link.active = false;
            }
        }
        LinktreeInstruction::EditAvatarUri(args) => record.avatar_uri = args.avatar_uri,
        LinktreeInstruction::EditColorHex(args) => record.color_hex = args.color_hex,
        LinktreeInstruction::CreateLinktreeAccount(_)
        | LinktreeInstruction::DeleteLinktreeAccount(_) => {}
    }
    Ok(())
}

fn allocate(record: &LinkTreeAccount) -> Result<Vec<u8>, InstructionError> {
    let mut data = record.pack();
    if data.len() > LINKTREE_ACCOUNT_SPACE {
        return Err(InstructionError::Custom(ACCOUNT_DID_NOT_SERIALIZE));
    }
    data.resize(LINKTREE_ACCOUNT_SPACE, 0);
    Ok(data)
}

/// A single-node cluster with the linktree program deployed.
pub struct MockCluster {
    program_id: Pubkey,
    state: Mutex<ClusterState>,
}

impl Default for MockCluster {
    fn default() -> Self {
        Self::new(linktree_interface::id())
    }
}

impl MockCluster {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            state: Mutex::new(ClusterState::new()),
        }
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    /// Give `address` lamports without a transaction
    pub fn fund(&self, address: &Pubkey, lamports: u64) {
        self.state().credit(address, lamports);
    }

    /// The next RPC call of any kind fails with [`LinktreeError::Rpc`]
    pub fn fail_next_rpc(&self, message: impl Into<String>) {
        self.state().faults.fail_next_rpc = Some(message.into());
    }

    /// The next transaction is accepted but never lands, and the chain moves
    /// past its blockhash's last valid height.
    pub fn drop_next_transaction(&self) {
        self.state().faults.drop_next_send = true;
    }

    /// When set, failing transactions are accepted and their failure shows
    /// up in the signature status instead of being returned by `send`.
    pub fn skip_preflight(&self, skip: bool) {
        self.state().faults.skip_preflight = skip;
    }

    /// The next transaction lands, but status queries report it as unknown
    /// for the first `polls` calls.
    pub fn delay_next_status(&self, polls: usize) {
        self.state().faults.delay_next_status = Some(LateStatus {
            hidden_polls: polls,
            past_expiry: false,
        });
    }

    /// The next transaction lands, its first status query reports it as
    /// unknown, and the chain is already past its blockhash's last valid
    /// height by then.
    pub fn confirm_next_after_expiry(&self) {
        self.state().faults.delay_next_status = Some(LateStatus {
            hidden_polls: 1,
            past_expiry: true,
        });
    }

    /// Move the chain past the last valid height of every issued blockhash
    pub fn expire_blockhashes(&self) {
        let mut state = self.state();
        state.block_height += BLOCKHASH_VALIDITY + 1;
        state.advance_block();
    }

    /// Store arbitrary bytes in an account owned by the program
    pub fn insert_raw_account(&self, address: Pubkey, data: Vec<u8>) {
        let mut account = Account::new(LAMPORTS_PER_SOL, 0, &self.program_id);
        account.data = data;
        self.state().accounts.insert(address, account);
    }

    pub fn set_account(&self, address: Pubkey, account: Account) {
        self.state().accounts.insert(address, account);
    }

    pub fn account(&self, address: &Pubkey) -> Option<Account> {
        self.state().accounts.get(address).cloned()
    }

    /// Decoded profile stored at `address`
    pub fn profile(&self, address: &Pubkey) -> Option<LinkTreeAccount> {
        self.account(address)
            .and_then(|a| LinkTreeAccount::try_from_account_data(&a.data).ok())
    }

    /// Transactions that got past signature and blockhash checks
    pub fn transactions_sent(&self) -> usize {
        self.state().sent
    }

    pub fn block_height(&self) -> u64 {
        self.state().block_height
    }

    /// Signature status queries answered so far
    pub fn status_polls(&self) -> usize {
        self.state().status_polls
    }

    fn state(&self) -> MutexGuard<'_, ClusterState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl LinktreeRpc for MockCluster {
    fn endpoint(&self) -> String {
        "mock://linktree".to_string()
    }

    async fn get_program_accounts(&self, program_id: &Pubkey) -> SdkResult<Vec<(Pubkey, Account)>> {
        let mut state = self.state();
        state.take_rpc_fault()?;
        Ok(state
            .accounts
            .iter()
            .filter(|(_, account)| account.owner == *program_id)
            .map(|(address, account)| (*address, account.clone()))
            .collect())
    }

    async fn get_account(&self, address: &Pubkey) -> SdkResult<Option<Account>> {
        let mut state = self.state();
        state.take_rpc_fault()?;
        Ok(state.accounts.get(address).cloned())
    }

    async fn get_balance(&self, address: &Pubkey) -> SdkResult<u64> {
        let mut state = self.state();
        state.take_rpc_fault()?;
        Ok(state.lamports(address))
    }

    async fn get_signatures_for_address(&self, address: &Pubkey) -> SdkResult<Vec<SignatureRecord>> {
        let mut state = self.state();
        state.take_rpc_fault()?;
        Ok(state.history.get(address).cloned().unwrap_or_default())
    }

    async fn get_latest_blockhash(&self) -> SdkResult<(Hash, u64)> {
        let mut state = self.state();
        state.take_rpc_fault()?;
        let blockhash = state.latest_blockhash;
        let last_valid = state
            .blockhashes
            .get(&blockhash)
            .copied()
            .unwrap_or(state.block_height);
        Ok((blockhash, last_valid))
    }

    async fn get_block_height(&self) -> SdkResult<u64> {
        let mut state = self.state();
        state.take_rpc_fault()?;
        Ok(state.block_height)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> SdkResult<Signature> {
        let mut state = self.state();
        state.take_rpc_fault()?;

        let blockhash = transaction.message.recent_blockhash;
        let signature = transaction.signatures.first().copied().unwrap_or_default();
        if transaction.verify().is_err() {
            return Err(LinktreeError::TransactionFailed(
                TransactionError::SignatureFailure,
            ));
        }
        if !state.blockhash_is_valid(&blockhash) {
            return Err(LinktreeError::from_transaction_error(
                TransactionError::BlockhashNotFound,
                blockhash,
            ));
        }
        let Some(payer) = transaction.message.account_keys.first().copied() else {
            return Err(LinktreeError::TransactionFailed(
                TransactionError::AccountNotFound,
            ));
        };
        let fee =
            FEE_PER_SIGNATURE * u64::from(transaction.message.header.num_required_signatures);
        if state.lamports(&payer) < fee {
            return Err(LinktreeError::TransactionFailed(
                TransactionError::InsufficientFundsForFee,
            ));
        }
        state.sent += 1;

        if std::mem::take(&mut state.faults.drop_next_send) {
            let last_valid = state
                .blockhashes
                .get(&blockhash)
                .copied()
                .unwrap_or(state.block_height);
            state.block_height = last_valid;
            state.advance_block();
            return Ok(signature);
        }

        let result = match state.execute(&self.program_id, transaction) {
            Ok(accounts) => {
                state.accounts = accounts;
                Ok(())
            }
            Err(e) if !state.faults.skip_preflight => {
                return Err(LinktreeError::from_transaction_error(e, blockhash));
            }
            Err(e) => Err(e),
        };
        if let Some(account) = state.accounts.get_mut(&payer) {
            account.lamports = account.lamports.saturating_sub(fee);
        }
        state.record(signature, result, &transaction.message.account_keys);
        if let Some(late) = state.faults.delay_next_status.take() {
            state.hidden_statuses.insert(signature, late.hidden_polls);
            if late.past_expiry {
                let last_valid = state
                    .blockhashes
                    .get(&blockhash)
                    .copied()
                    .unwrap_or(state.block_height);
                state.block_height = last_valid;
            }
        }
        state.advance_block();
        Ok(signature)
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
        _commitment: CommitmentConfig,
    ) -> SdkResult<Option<Result<(), TransactionError>>> {
        let mut state = self.state();
        state.take_rpc_fault()?;
        state.status_polls += 1;
        if let Some(hidden) = state.hidden_statuses.get_mut(signature) {
            if *hidden > 0 {
                *hidden -= 1;
                return Ok(None);
            }
        }
        Ok(state.statuses.get(signature).cloned())
    }

    async fn request_airdrop(&self, address: &Pubkey, lamports: u64) -> SdkResult<Signature> {
        let mut state = self.state();
        state.take_rpc_fault()?;
        state.credit(address, lamports);
        let signature = state.synthetic_signature();
        state.record(signature, Ok(()), &[*address]);
        state.advance_block();
        Ok(signature)
    }
}

/// Signer whose user declines every request.
pub struct RejectingSigner {
    pub pubkey: Pubkey,
}

#[async_trait]
impl linktree_sdk::WalletSigner for RejectingSigner {
    fn pubkey(&self) -> Pubkey {
        self.pubkey
    }

    async fn sign_transaction(&self, _transaction: Transaction) -> SdkResult<Transaction> {
        Err(LinktreeError::SignerRejected("user declined".into()))
    }
}

/// Install a test-writer subscriber once per test binary (`RUST_LOG` wins).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Fresh cluster plus helpers for one test.
pub struct TestContext {
    pub cluster: Arc<MockCluster>,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            cluster: Arc::new(MockCluster::default()),
        }
    }

    pub fn rpc(&self) -> Arc<dyn LinktreeRpc> {
        self.cluster.clone()
    }

    /// A new wallet holding [`FUNDING_LAMPORTS`]
    pub fn funded_keypair(&self) -> Arc<Keypair> {
        let keypair = Keypair::new();
        self.cluster.fund(&keypair.pubkey(), FUNDING_LAMPORTS);
        Arc::new(keypair)
    }

    /// Submission settings that poll without waiting
    pub fn submit_config() -> SubmitConfig {
        SubmitConfig {
            commitment: CommitmentConfig::confirmed(),
            poll_interval: Duration::from_millis(1),
        }
    }

    pub fn session(&self, signer: Arc<dyn linktree_sdk::WalletSigner>) -> LinktreeSession {
        LinktreeSession::new(
            self.rpc(),
            signer,
            SessionConfig {
                program_id: self.cluster.program_id(),
                submit: Self::submit_config(),
            },
        )
    }
}

/// Runs one test body against a fresh [`TestContext`].
pub struct TestRunner;

impl TestRunner {
    pub async fn run<F, Fut>(test: F)
    where
        F: FnOnce(TestContext) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        init_tracing();
        if let Err(e) = test(TestContext::new()).await {
            panic!("test failed: {e:?}");
        }
    }
}
