//! End-to-end metadata creation: validate and derive, check funds, build, submit.

use {
    crate::{
        error::{MetadataError, MetadataResult, NetworkError, ValidationError},
        instruction::{create_metadata_accounts_v3, CreateMetadataAccounts},
        state::{CollectionDetails, MetadataPayload},
        submit::{CancelToken, RetryPolicy, SubmitBackend, Submitter},
        TokenMetadataClient,
    },
    solana_sdk::{
        native_token::LAMPORTS_PER_SOL,
        pubkey::Pubkey,
        signature::{Keypair, Signature, Signer},
    },
    tracing::{info, warn},
};

/// Minimum signer balance: covers metadata account rent plus fees (0.02 SOL)
pub const MIN_BALANCE_LAMPORTS: u64 = LAMPORTS_PER_SOL / 50;

/// What a successful run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    /// Token mint
    pub mint: Pubkey,
    /// Metadata PDA written by the transaction
    pub metadata: Pubkey,
    /// Bump of the metadata PDA
    pub bump: u8,
    /// Transaction signature
    pub signature: Signature,
    /// Attempts the submission took
    pub attempts: u32,
}

/// Runs the single-signer metadata creation flow against a backend.
///
/// The signer acts as mint authority, payer and update authority.
pub struct MetadataUpdater<B> {
    client: TokenMetadataClient,
    submitter: Submitter<B>,
    min_balance_lamports: u64,
}

impl<B: SubmitBackend> MetadataUpdater<B> {
    /// Updater for the default Token Metadata program.
    pub fn new(backend: B, policy: RetryPolicy) -> Self {
        Self {
            client: TokenMetadataClient::default(),
            submitter: Submitter::new(backend, policy),
            min_balance_lamports: MIN_BALANCE_LAMPORTS,
        }
    }

    /// Target a different metadata program deployment.
    pub fn with_client(mut self, client: TokenMetadataClient) -> Self {
        self.client = client;
        self
    }

    /// Override the funds gate.
    pub fn with_min_balance(mut self, lamports: u64) -> Self {
        self.min_balance_lamports = lamports;
        self
    }

    /// The underlying submitter
    pub fn submitter(&self) -> &Submitter<B> {
        &self.submitter
    }

    /// Fail with `InsufficientFunds` unless `payer` holds the minimum balance.
    pub async fn check_funds(&self, payer: &Pubkey) -> MetadataResult<u64> {
        let limit = self.submitter.policy().attempt_timeout();
        let balance =
            tokio::time::timeout(limit, self.submitter.backend().balance(payer))
                .await
                .unwrap_or(Err(NetworkError::Timeout(limit)))
                .map_err(MetadataError::Network)?;

        info!(
            %payer,
            balance_sol = balance as f64 / LAMPORTS_PER_SOL as f64,
            "wallet balance"
        );
        if balance < self.min_balance_lamports {
            warn!(
                balance,
                required = self.min_balance_lamports,
                "insufficient funds"
            );
            return Err(MetadataError::InsufficientFunds {
                balance,
                required: self.min_balance_lamports,
            });
        }
        Ok(balance)
    }

    /// Create the metadata account of `mint` with `payload`.
    ///
    /// The payload is expected to already carry its creator list. Every input
    /// check, including the metadata PDA derivation, runs before the balance
    /// query.
    pub async fn create_metadata(
        &self,
        signer: &Keypair,
        mint: Pubkey,
        payload: MetadataPayload,
        is_mutable: bool,
        collection_details: Option<CollectionDetails>,
        cancel: &CancelToken,
    ) -> MetadataResult<UpdateReport> {
        let authority = signer.pubkey();
        payload.validate(&authority)?;
        if self.client.program_id == Pubkey::default() {
            return Err(ValidationError::DefaultAddress("program_id").into());
        }
        let derived = self.client.metadata_pda_and_bump(&mint)?;
        let accounts = CreateMetadataAccounts {
            metadata: derived.address,
            mint,
            mint_authority: authority,
            payer: authority,
            update_authority: authority,
        };
        accounts.ensure_not_default()?;

        self.check_funds(&authority).await?;
        info!("validations passed, proceeding with metadata creation");
        info!(metadata = %derived.address, bump = derived.bump, "derived metadata PDA");

        let instruction = create_metadata_accounts_v3(
            &self.client.program_id,
            &accounts,
            &payload,
            is_mutable,
            collection_details,
        )?;

        let outcome = self
            .submitter
            .submit(&instruction, signer, cancel)
            .await?;

        Ok(UpdateReport {
            mint,
            metadata: derived.address,
            bump: derived.bump,
            signature: outcome.signature,
            attempts: outcome.attempts,
        })
    }
}
