//! Program-derived address helpers.
//!
//! Keep the seeds stable: the on-chain program recomputes the same address and
//! rejects the instruction if ours differs.

use {
    crate::error::{MetadataError, MetadataResult},
    solana_sdk::pubkey::Pubkey,
};

/// PDA seed for the metadata account
pub const METADATA_SEED: &[u8] = b"metadata";

/// A program-derived address together with the bump that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedAddress {
    /// The off-curve address
    pub address: Pubkey,
    /// Bump byte appended to the seeds
    pub bump: u8,
}

/// Derive `[seed_label, program_id, target]` under `program_id`.
///
/// Uses Solana's canonical bump search (255 downward, first off-curve hash).
pub fn derive_program_address(
    seed_label: &[u8],
    program_id: &Pubkey,
    target: &Pubkey,
) -> MetadataResult<DerivedAddress> {
    let seeds: [&[u8]; 3] = [seed_label, program_id.as_ref(), target.as_ref()];
    let (address, bump) = Pubkey::try_find_program_address(&seeds, program_id)
        .ok_or(MetadataError::DerivationExhausted)?;
    Ok(DerivedAddress { address, bump })
}

/// Derive the metadata PDA for a given mint.
pub fn find_metadata_pda(program_id: &Pubkey, mint: &Pubkey) -> MetadataResult<DerivedAddress> {
    derive_program_address(METADATA_SEED, program_id, mint)
}
