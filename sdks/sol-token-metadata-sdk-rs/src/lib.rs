#![deny(missing_docs)]
#![cfg_attr(not(test), forbid(unsafe_code))]

//! Solana Token Metadata – Rust SDK (client-side helpers)
//!
//! This crate provides:
//! - PDA helpers for the metadata account of a mint
//! - A `CreateMetadataAccountV3` builder with correct account ordering and
//!   client-side validation
//! - A retrying submitter and an end-to-end updater over a pluggable backend
//!
//! The builders mirror the Token Metadata program's invariants. The program
//! itself is an external, versioned contract; nothing here owns it.

pub mod error;
pub mod instruction;
pub mod keys;
pub mod pda;
pub mod rpc;
pub mod state;
pub mod submit;
pub mod updater;

pub use error::{MetadataError, MetadataResult, NetworkError, ValidationError};
pub use instruction::CreateMetadataAccounts;
pub use pda::DerivedAddress;
pub use state::{Collection, CollectionDetails, Creator, MetadataPayload, UseMethod, Uses};
pub use submit::{CancelToken, RetryPolicy, SubmitBackend, SubmitOutcome, Submitter};
pub use updater::{MetadataUpdater, UpdateReport, MIN_BALANCE_LAMPORTS};

use solana_sdk::{instruction::Instruction, pubkey::Pubkey};

/// Program id of the Metaplex Token Metadata program (same on every cluster)
pub const TOKEN_METADATA_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

/// The program ID for the Token Metadata program
pub fn id() -> Pubkey {
    TOKEN_METADATA_PROGRAM_ID
}

/// Thin client for building PDAs and instructions for the Token Metadata program.
///
/// The `program_id` must be the deployed Token Metadata program id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenMetadataClient {
    /// Target program
    pub program_id: Pubkey,
}

impl Default for TokenMetadataClient {
    fn default() -> Self {
        Self::new(id())
    }
}

impl TokenMetadataClient {
    /// Client for `program_id`.
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    /// Derive the metadata PDA for a given mint.
    pub fn metadata_pda(&self, mint: &Pubkey) -> MetadataResult<Pubkey> {
        Ok(self.metadata_pda_and_bump(mint)?.address)
    }

    /// Derive the metadata PDA for a given mint, with the bump.
    pub fn metadata_pda_and_bump(&self, mint: &Pubkey) -> MetadataResult<DerivedAddress> {
        pda::find_metadata_pda(&self.program_id, mint)
    }

    /// Build a CreateMetadataAccountV3 instruction for `params.mint`.
    ///
    /// The metadata account is derived from the mint.
    pub fn create_metadata_v3_ix(&self, params: CreateMetadataParams) -> MetadataResult<Instruction> {
        let metadata = self.metadata_pda(&params.mint)?;
        instruction::create_metadata_accounts_v3(
            &self.program_id,
            &CreateMetadataAccounts {
                metadata,
                mint: params.mint,
                mint_authority: params.mint_authority,
                payer: params.payer,
                update_authority: params.update_authority,
            },
            &params.data,
            params.is_mutable,
            params.collection_details,
        )
    }
}

/// Parameters for the CreateMetadataAccountV3 instruction.
#[derive(Debug, Clone)]
pub struct CreateMetadataParams {
    /// Account that pays for the metadata PDA creation
    pub payer: Pubkey,
    /// Token mint the metadata is associated with
    pub mint: Pubkey,
    /// Current mint authority of the mint (must sign)
    pub mint_authority: Pubkey,
    /// Authority recorded on the metadata (must sign)
    pub update_authority: Pubkey,
    /// Metadata content
    pub data: MetadataPayload,
    /// If false, metadata can never be updated
    pub is_mutable: bool,
    /// Sized collection details, for collection parents only
    pub collection_details: Option<CollectionDetails>,
}
