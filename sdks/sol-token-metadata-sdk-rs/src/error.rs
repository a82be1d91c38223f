//! Error types
//!
//! Errors are split in two families. [`MetadataError`] is always fatal to the
//! current run. [`NetworkError`] is what a [`crate::submit::SubmitBackend`]
//! reports for a single attempt; only the submitter decides whether it is
//! retried, and it reaches callers wrapped in a [`MetadataError`].

use {std::time::Duration, thiserror::Error};

/// Input that was rejected before any network call was made.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ValidationError {
    /// A string could not be parsed as a base58 public key
    #[error("Invalid {field} address: {value}")]
    InvalidAddress {
        /// Which input carried the address
        field: String,
        /// The rejected input
        value: String,
    },
    /// An account role was left as the all-zero default key
    #[error("Account {0} must not be the default address")]
    DefaultAddress(&'static str),
    /// A required payload field is empty
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    /// A payload field exceeds the program limit
    #[error("Field {field} is {len} bytes, limit is {max}")]
    FieldTooLong {
        /// Field name
        field: &'static str,
        /// Actual length in bytes
        len: usize,
        /// Program limit in bytes
        max: usize,
    },
    /// The payload violates a metadata invariant
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    /// Key material could not be turned into a keypair
    #[error("Invalid keypair: {0}")]
    InvalidKeypair(String),
}

/// Errors returned by the SDK. None of these are retried.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum MetadataError {
    /// Input validation failed
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// No bump produced an off-curve address
    #[error("Program address derivation exhausted the bump space")]
    DerivationExhausted,
    /// The signer cannot cover rent and fees
    #[error("Insufficient funds: balance {balance} lamports, {required} required")]
    InsufficientFunds {
        /// Current balance in lamports
        balance: u64,
        /// Minimum balance in lamports
        required: u64,
    },
    /// The transaction could not be signed by the supplied keypair
    #[error("Signing failed: {0}")]
    Signing(String),
    /// Instruction arguments could not be encoded
    #[error("Serialization failed: {0}")]
    Serialization(String),
    /// A network call outside the submission retry loop failed
    #[error("Network error: {0}")]
    Network(NetworkError),
    /// Every attempt failed
    #[error("Transaction failed after {attempts} attempts: {last_error}")]
    SubmissionExhausted {
        /// Attempts made
        attempts: u32,
        /// Error observed on the final attempt
        last_error: NetworkError,
    },
    /// The caller cancelled before the next attempt started
    #[error("Submission cancelled after {attempts} attempts")]
    Cancelled {
        /// Attempts made before cancellation
        attempts: u32,
    },
}

impl MetadataError {
    /// True for errors raised before anything touched the network.
    pub fn is_validation(&self) -> bool {
        matches!(self, MetadataError::Validation(_))
    }

    /// Attempts made by the submitter, when the error came from it.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            MetadataError::SubmissionExhausted { attempts, .. }
            | MetadataError::Cancelled { attempts } => Some(*attempts),
            _ => None,
        }
    }
}

/// Failure of a single network call. Retryable by the submitter.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum NetworkError {
    /// Transport or RPC-level failure
    #[error("RPC error: {0}")]
    Rpc(String),
    /// The cluster rejected the transaction
    #[error("Transaction rejected: {0}")]
    Rejected(String),
    /// The call did not finish within the per-attempt timeout
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// Convenience alias used throughout the SDK.
pub type MetadataResult<T> = Result<T, MetadataError>;
