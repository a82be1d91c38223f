//! Transaction submission with bounded retries.
//!
//! A [`Submitter`] owns the whole network conversation for one instruction.
//! Progress is tracked by a [`Submission`], an explicit state machine:
//!
//! ```text
//! Idle -> Sending -> Confirmed
//!            |
//!            v
//!         Failed -> Sending (while attempts remain)
//!            |
//!            v
//!        Exhausted
//! ```
//!
//! The message is built once. Every attempt fetches a fresh blockhash and
//! re-signs, so a retry is never rejected as stale. Each retry therefore
//! carries a new signature while earlier ones stay valid until their
//! blockhash expires. Before a failed attempt is counted, the submitter asks
//! the cluster whether any signature sent so far landed; if one did, that one
//! is the result.

use {
    crate::error::{MetadataError, MetadataResult, NetworkError},
    async_trait::async_trait,
    solana_sdk::{
        hash::Hash,
        instruction::Instruction,
        pubkey::Pubkey,
        signature::{Keypair, Signature, Signer},
        transaction::Transaction,
    },
    std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        time::Duration,
    },
    tracing::{debug, info, warn},
};

/// Total attempts made by default
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Upper bound for a single attempt
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(60);

/// Network boundary used by the submitter.
///
/// Implementations report every failure as a [`NetworkError`] and must not
/// retry internally.
#[async_trait]
pub trait SubmitBackend: Send + Sync {
    /// Recent blockhash used as the transaction's freshness token
    async fn latest_blockhash(&self) -> Result<Hash, NetworkError>;

    /// Send and wait until the configured confirmation level is reached
    async fn send_and_confirm(&self, transaction: &Transaction)
        -> Result<Signature, NetworkError>;

    /// Whether `signature` has reached the configured confirmation level
    async fn signature_confirmed(&self, signature: &Signature) -> Result<bool, NetworkError>;

    /// Balance in lamports
    async fn balance(&self, pubkey: &Pubkey) -> Result<u64, NetworkError>;
}

#[async_trait]
impl<B: SubmitBackend + ?Sized> SubmitBackend for Arc<B> {
    async fn latest_blockhash(&self) -> Result<Hash, NetworkError> {
        (**self).latest_blockhash().await
    }

    async fn send_and_confirm(
        &self,
        transaction: &Transaction,
    ) -> Result<Signature, NetworkError> {
        (**self).send_and_confirm(transaction).await
    }

    async fn signature_confirmed(&self, signature: &Signature) -> Result<bool, NetworkError> {
        (**self).signature_confirmed(signature).await
    }

    async fn balance(&self, pubkey: &Pubkey) -> Result<u64, NetworkError> {
        (**self).balance(pubkey).await
    }
}

/// Retry configuration
///
/// `attempt_timeout` bounds one attempt as a whole: blockhash fetch, signing
/// and send-and-confirm together. The status sweep that follows a failed
/// attempt gets a separate bound of the same length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    attempt_timeout: Duration,
    retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            retry_delay: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    /// Policy with every knob set; `max_attempts` is clamped to at least 1.
    pub fn new(max_attempts: u32, attempt_timeout: Duration, retry_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            attempt_timeout,
            retry_delay,
        }
    }

    /// Total attempts, including the first one. Never below 1.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Bound for one attempt
    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Pause before each retry; zero retries immediately
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Set the attempt budget (clamped to at least 1).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    /// Set the delay between attempts.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
}

/// Cooperative cancellation flag, checked before each attempt starts.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Visible to every clone.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// States of one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitState {
    /// Nothing sent yet
    Idle,
    /// Attempt `attempt` is in flight
    Sending {
        /// 1-based attempt number
        attempt: u32,
    },
    /// Attempt `attempt` failed; more attempts remain
    Failed {
        /// 1-based attempt number
        attempt: u32,
        /// Why it failed
        error: NetworkError,
    },
    /// The cluster confirmed the transaction
    Confirmed {
        /// Attempt that produced the confirmation
        attempt: u32,
        /// Transaction signature
        signature: Signature,
    },
    /// No attempts left
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Error of the final attempt
        last_error: NetworkError,
    },
}

/// Attempt bookkeeping for a single `submit` call.
#[derive(Debug, Clone)]
pub struct Submission {
    state: SubmitState,
    max_attempts: u32,
    attempts: u32,
    last_error: Option<NetworkError>,
    sent: Vec<Signature>,
}

impl Submission {
    /// Fresh submission with a budget of `max_attempts` (at least 1).
    pub fn new(max_attempts: u32) -> Self {
        Self {
            state: SubmitState::Idle,
            max_attempts: max_attempts.max(1),
            attempts: 0,
            last_error: None,
            sent: Vec::new(),
        }
    }

    /// Current state
    pub fn state(&self) -> &SubmitState {
        &self.state
    }

    /// Attempt budget after clamping
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Signatures handed to the backend so far, oldest first
    pub fn sent(&self) -> &[Signature] {
        &self.sent
    }

    /// Record that the in-flight attempt is about to send `signature`.
    pub fn record_sent(&mut self, signature: Signature) {
        if matches!(self.state, SubmitState::Sending { .. }) {
            self.sent.push(signature);
        }
    }

    /// Attempts started so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Attempts still available
    pub fn remaining(&self) -> u32 {
        self.max_attempts - self.attempts
    }

    /// Most recent failure
    pub fn last_error(&self) -> Option<&NetworkError> {
        self.last_error.as_ref()
    }

    /// Whether the state is Confirmed or Exhausted
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            SubmitState::Confirmed { .. } | SubmitState::Exhausted { .. }
        )
    }

    /// Idle/Failed -> Sending. Returns the attempt number, or `None` when no
    /// attempt may start from the current state.
    pub fn begin_attempt(&mut self) -> Option<u32> {
        match self.state {
            SubmitState::Idle | SubmitState::Failed { .. } if self.remaining() > 0 => {
                self.attempts += 1;
                self.state = SubmitState::Sending {
                    attempt: self.attempts,
                };
                Some(self.attempts)
            }
            _ => None,
        }
    }

    /// Sending -> Confirmed
    pub fn confirm(&mut self, signature: Signature) {
        if let SubmitState::Sending { attempt } = self.state {
            self.state = SubmitState::Confirmed { attempt, signature };
        }
    }

    /// Sending -> Failed, or Sending -> Exhausted when the budget is spent.
    pub fn fail(&mut self, error: NetworkError) -> &SubmitState {
        if let SubmitState::Sending { attempt } = self.state {
            self.last_error = Some(error.clone());
            self.state = if self.remaining() == 0 {
                SubmitState::Exhausted {
                    attempts: attempt,
                    last_error: error,
                }
            } else {
                SubmitState::Failed { attempt, error }
            };
        }
        &self.state
    }

    /// Final result once the submission is terminal.
    pub fn outcome(&self) -> Option<MetadataResult<SubmitOutcome>> {
        match &self.state {
            SubmitState::Confirmed { attempt, signature } => Some(Ok(SubmitOutcome {
                signature: *signature,
                attempts: *attempt,
            })),
            SubmitState::Exhausted {
                attempts,
                last_error,
            } => Some(Err(MetadataError::SubmissionExhausted {
                attempts: *attempts,
                last_error: last_error.clone(),
            })),
            _ => None,
        }
    }
}

/// A confirmed submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Transaction signature (the transaction id)
    pub signature: Signature,
    /// Attempts it took
    pub attempts: u32,
}

/// Signs and delivers a single-instruction transaction.
pub struct Submitter<B> {
    backend: B,
    policy: RetryPolicy,
}

impl<B: SubmitBackend> Submitter<B> {
    /// Create a submitter over `backend`.
    pub fn new(backend: B, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    /// The network backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The retry policy
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Wrap `instruction` in a transaction paid and signed by `signer` and
    /// deliver it, retrying network failures up to the policy's budget.
    pub async fn submit(
        &self,
        instruction: &Instruction,
        signer: &Keypair,
        cancel: &CancelToken,
    ) -> MetadataResult<SubmitOutcome> {
        let payer = signer.pubkey();
        let mut transaction =
            Transaction::new_with_payer(std::slice::from_ref(instruction), Some(&payer));
        let mut submission = Submission::new(self.policy.max_attempts);
        let limit = self.policy.attempt_timeout;

        loop {
            if let Some(result) = submission.outcome() {
                match &result {
                    Ok(outcome) => info!(
                        signature = %outcome.signature,
                        attempts = outcome.attempts,
                        "transaction confirmed"
                    ),
                    Err(error) => warn!(%error, "giving up"),
                }
                return result;
            }

            if cancel.is_cancelled() {
                warn!(attempts = submission.attempts(), "submission cancelled");
                return Err(MetadataError::Cancelled {
                    attempts: submission.attempts(),
                });
            }

            if submission.attempts() > 0 && !self.policy.retry_delay.is_zero() {
                tokio::time::sleep(self.policy.retry_delay).await;
            }

            let Some(attempt) = submission.begin_attempt() else {
                return Err(MetadataError::SubmissionExhausted {
                    attempts: submission.attempts(),
                    last_error: submission
                        .last_error()
                        .cloned()
                        .unwrap_or(NetworkError::Rpc("no attempt could start".into())),
                });
            };
            info!(
                attempt,
                max_attempts = submission.max_attempts(),
                payer = %payer,
                "sending transaction"
            );

            let result = match tokio::time::timeout(
                limit,
                self.attempt(&mut transaction, signer, &mut submission),
            )
            .await
            {
                Ok(result) => result?,
                Err(_) => Err(NetworkError::Timeout(limit)),
            };

            match result {
                Ok(signature) => submission.confirm(signature),
                Err(error) => {
                    if let Some(signature) = self.find_landed(submission.sent()).await {
                        info!(
                            %signature,
                            attempt,
                            %error,
                            "attempt failed but a sent transaction landed"
                        );
                        submission.confirm(signature);
                        continue;
                    }
                    warn!(
                        attempt,
                        remaining = submission.remaining(),
                        %error,
                        "attempt failed"
                    );
                    submission.fail(error);
                }
            }
        }
    }

    /// One attempt. The outer error is fatal, the inner one is retryable.
    async fn attempt(
        &self,
        transaction: &mut Transaction,
        signer: &Keypair,
        submission: &mut Submission,
    ) -> MetadataResult<Result<Signature, NetworkError>> {
        let blockhash = match self.backend.latest_blockhash().await {
            Ok(blockhash) => blockhash,
            Err(error) => return Ok(Err(error)),
        };

        transaction
            .try_sign(&[signer], blockhash)
            .map_err(|e| MetadataError::Signing(e.to_string()))?;
        let signature = transaction.signatures[0];
        debug!(%signature, %blockhash, "signed with fresh blockhash");
        submission.record_sent(signature);

        Ok(self.backend.send_and_confirm(transaction).await)
    }

    /// Newest first; the first confirmed signature wins.
    async fn find_landed(&self, sent: &[Signature]) -> Option<Signature> {
        let limit = self.policy.attempt_timeout;
        let sweep = async {
            for signature in sent.iter().rev() {
                match self.backend.signature_confirmed(signature).await {
                    Ok(true) => return Some(*signature),
                    Ok(false) => {}
                    Err(error) => {
                        debug!(%signature, %error, "status check failed, treating as not landed")
                    }
                }
            }
            None
        };
        match tokio::time::timeout(limit, sweep).await {
            Ok(landed) => landed,
            Err(_) => {
                debug!(checked = sent.len(), "status sweep timed out");
                None
            }
        }
    }
}
