//! Shared harness for the metadata submission tests: a scripted in-memory
//! backend and a few fixtures.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use sol_token_metadata_sdk::{
    MetadataPayload, MetadataUpdater, NetworkError, RetryPolicy, SubmitBackend, Submitter,
};
use solana_sdk::{
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    native_token::LAMPORTS_PER_SOL,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};

/// What the next `send_and_confirm` call does.
#[derive(Clone, Debug)]
pub enum SendOutcome {
    Confirm,
    Fail(NetworkError),
    /// Never answers; only a timeout gets the caller out.
    Hang,
    /// Confirms after the given delay.
    Slow(Duration),
    /// The send reports `error`, but the transaction lands anyway: its
    /// signature reads as confirmed once `after_checks` status checks of it
    /// have answered "not yet".
    FailThenLand {
        error: NetworkError,
        after_checks: usize,
    },
}

/// A send the backend observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentTransaction {
    pub blockhash: Hash,
    pub signature: Signature,
    pub account_keys: Vec<Pubkey>,
}

#[derive(Debug)]
pub struct MockBackend {
    balance: AtomicU64,
    script: Mutex<VecDeque<SendOutcome>>,
    fallback: Mutex<SendOutcome>,
    failed_sends_land: AtomicBool,
    late_landings: Mutex<HashMap<Signature, usize>>,
    blockhash_delay_ms: AtomicU64,
    sent: Mutex<Vec<SentTransaction>>,
    pub blockhash_calls: AtomicUsize,
    pub send_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub balance_calls: AtomicUsize,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            balance: AtomicU64::new(LAMPORTS_PER_SOL),
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(SendOutcome::Confirm),
            failed_sends_land: AtomicBool::new(false),
            late_landings: Mutex::new(HashMap::new()),
            blockhash_delay_ms: AtomicU64::new(0),
            sent: Mutex::new(Vec::new()),
            blockhash_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            balance_calls: AtomicUsize::new(0),
        }
    }
}

impl MockBackend {
    /// Funded with 1 SOL, confirms every send.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Sends play `script` in order, then `fallback` forever.
    pub fn scripted(script: Vec<SendOutcome>, fallback: SendOutcome) -> Arc<Self> {
        let backend = Self::default();
        *backend.script.lock().unwrap() = script.into();
        *backend.fallback.lock().unwrap() = fallback;
        Arc::new(backend)
    }

    pub fn always_failing(error: NetworkError) -> Arc<Self> {
        Self::scripted(Vec::new(), SendOutcome::Fail(error))
    }

    pub fn set_balance(&self, lamports: u64) {
        self.balance.store(lamports, Ordering::SeqCst);
    }

    /// Report failed sends as confirmed on the status check.
    pub fn set_failed_sends_land(&self, land: bool) {
        self.failed_sends_land.store(land, Ordering::SeqCst);
    }

    /// Delay every blockhash fetch by `delay`.
    pub fn set_blockhash_delay(&self, delay: Duration) {
        self.blockhash_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentTransaction> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sends(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn blockhashes(&self) -> usize {
        self.blockhash_calls.load(Ordering::SeqCst)
    }

    pub fn status_checks(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn balance_checks(&self) -> usize {
        self.balance_calls.load(Ordering::SeqCst)
    }

    /// No network call of any kind was made.
    pub fn untouched(&self) -> bool {
        self.blockhashes() == 0
            && self.sends() == 0
            && self.status_checks() == 0
            && self.balance_checks() == 0
    }

    fn next_outcome(&self) -> SendOutcome {
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| self.fallback.lock().unwrap().clone())
    }
}

#[async_trait]
impl SubmitBackend for MockBackend {
    async fn latest_blockhash(&self) -> Result<Hash, NetworkError> {
        self.blockhash_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.blockhash_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(Hash::new_unique())
    }

    async fn send_and_confirm(&self, transaction: &Transaction) -> Result<Signature, NetworkError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        let signature = transaction.signatures[0];
        self.sent.lock().unwrap().push(SentTransaction {
            blockhash: transaction.message.recent_blockhash,
            signature,
            account_keys: transaction.message.account_keys.clone(),
        });

        match self.next_outcome() {
            SendOutcome::Confirm => Ok(signature),
            SendOutcome::Fail(error) => Err(error),
            SendOutcome::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(NetworkError::Rpc("hung send woke up".into()))
            }
            SendOutcome::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(signature)
            }
            SendOutcome::FailThenLand {
                error,
                after_checks,
            } => {
                self.late_landings
                    .lock()
                    .unwrap()
                    .insert(signature, after_checks);
                Err(error)
            }
        }
    }

    async fn signature_confirmed(&self, signature: &Signature) -> Result<bool, NetworkError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(pending) = self.late_landings.lock().unwrap().get_mut(signature) {
            if *pending == 0 {
                return Ok(true);
            }
            *pending -= 1;
            return Ok(false);
        }
        Ok(self.failed_sends_land.load(Ordering::SeqCst))
    }

    async fn balance(&self, _pubkey: &Pubkey) -> Result<u64, NetworkError> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.balance.load(Ordering::SeqCst))
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Retry policy with a short per-attempt timeout so hung attempts fail fast.
pub fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::default()
        .with_max_attempts(max_attempts)
        .with_attempt_timeout(Duration::from_millis(200))
}

pub fn submitter(backend: &Arc<MockBackend>, policy: RetryPolicy) -> Submitter<Arc<MockBackend>> {
    Submitter::new(backend.clone(), policy)
}

pub fn updater(backend: &Arc<MockBackend>, policy: RetryPolicy) -> MetadataUpdater<Arc<MockBackend>> {
    MetadataUpdater::new(backend.clone(), policy)
}

/// Any instruction the signer must sign; the mock never inspects it.
pub fn noop_instruction(signer: &Pubkey) -> Instruction {
    Instruction {
        program_id: Pubkey::new_unique(),
        accounts: vec![AccountMeta::new(*signer, true)],
        data: vec![1, 2, 3],
    }
}

/// Name "Test", symbol "TST", no royalties, the signer as sole verified creator.
pub fn test_payload(signer: &Keypair) -> MetadataPayload {
    MetadataPayload::new("Test", "TST", "https://x/y.json", 0).with_sole_creator(signer.pubkey())
}
