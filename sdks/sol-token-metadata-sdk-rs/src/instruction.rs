//! Instruction types
//!
//! Wire layout of the Token Metadata program's `CreateMetadataAccountV3`
//! instruction: a one-byte discriminator followed by the borsh-encoded
//! arguments. Field order is fixed by the program.

use {
    crate::{
        error::{MetadataError, MetadataResult, ValidationError},
        state::{Collection, CollectionDetails, Creator, MetadataPayload, UseMethod, Uses},
    },
    borsh::{BorshDeserialize, BorshSerialize},
    solana_sdk::{
        instruction::{AccountMeta, Instruction},
        pubkey::Pubkey,
    },
};

/// The native System program, which allocates the metadata account
pub const SYSTEM_PROGRAM_ID: Pubkey = solana_sdk::pubkey!("11111111111111111111111111111111");

/// Discriminator of `CreateMetadataAccountV3` in the program's instruction enum
pub const CREATE_METADATA_ACCOUNT_V3: u8 = 33;

/// `Creator` as encoded on the wire
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct CreatorArg {
    /// Creator wallet
    pub address: [u8; 32],
    /// Creator signed
    pub verified: bool,
    /// Royalty share
    pub share: u8,
}

/// `Collection` as encoded on the wire
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct CollectionArg {
    /// Verified by the collection authority
    pub verified: bool,
    /// Collection mint
    pub key: [u8; 32],
}

/// `UseMethod` as encoded on the wire
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseMethodArg {
    /// Burn on use
    Burn,
    /// Multiple uses
    Multiple,
    /// Single use
    Single,
}

/// `Uses` as encoded on the wire
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct UsesArg {
    /// Consumption method
    pub use_method: UseMethodArg,
    /// Uses left
    pub remaining: u64,
    /// Uses granted
    pub total: u64,
}

/// `CollectionDetails` as encoded on the wire
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum CollectionDetailsArg {
    /// Sized collection
    V1 {
        /// Collection size
        size: u64,
    },
}

/// `DataV2` as encoded on the wire
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct DataV2 {
    /// Token name
    pub name: String,
    /// Token symbol
    pub symbol: String,
    /// Off-chain JSON URI
    pub uri: String,
    /// Royalty in basis points
    pub seller_fee_basis_points: u16,
    /// Creators; the program rejects `Some(vec![])`
    pub creators: Option<Vec<CreatorArg>>,
    /// Collection membership
    pub collection: Option<CollectionArg>,
    /// Uses descriptor
    pub uses: Option<UsesArg>,
}

/// Arguments of `CreateMetadataAccountV3`
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct CreateMetadataAccountArgsV3 {
    /// Metadata content
    pub data: DataV2,
    /// Whether the update authority may change the metadata later
    pub is_mutable: bool,
    /// Sized collection details
    pub collection_details: Option<CollectionDetailsArg>,
}

/// Instructions of the token metadata program used by this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataInstruction {
    /// Create a metadata account for a mint
    CreateMetadataAccountV3(CreateMetadataAccountArgsV3),
}

impl MetadataInstruction {
    /// Unpack a byte array into a MetadataInstruction
    pub fn unpack(input: &[u8]) -> MetadataResult<Self> {
        let (tag, rest) = input
            .split_first()
            .ok_or_else(|| MetadataError::Serialization("empty instruction data".into()))?;
        match *tag {
            CREATE_METADATA_ACCOUNT_V3 => borsh::from_slice(rest)
                .map(MetadataInstruction::CreateMetadataAccountV3)
                .map_err(|e| MetadataError::Serialization(e.to_string())),
            other => Err(MetadataError::Serialization(format!(
                "unknown instruction tag {other}"
            ))),
        }
    }

    /// Pack the MetadataInstruction into a byte array
    pub fn pack(&self) -> MetadataResult<Vec<u8>> {
        let (tag, args) = match self {
            MetadataInstruction::CreateMetadataAccountV3(args) => {
                (CREATE_METADATA_ACCOUNT_V3, args)
            }
        };
        let mut out = vec![tag];
        borsh::to_writer(&mut out, args).map_err(|e| MetadataError::Serialization(e.to_string()))?;
        Ok(out)
    }
}

impl From<&Creator> for CreatorArg {
    fn from(c: &Creator) -> Self {
        Self {
            address: c.address.to_bytes(),
            verified: c.verified,
            share: c.share,
        }
    }
}

impl From<&Collection> for CollectionArg {
    fn from(c: &Collection) -> Self {
        Self {
            verified: c.verified,
            key: c.key.to_bytes(),
        }
    }
}

impl From<&Uses> for UsesArg {
    fn from(u: &Uses) -> Self {
        let use_method = match u.use_method {
            UseMethod::Burn => UseMethodArg::Burn,
            UseMethod::Multiple => UseMethodArg::Multiple,
            UseMethod::Single => UseMethodArg::Single,
        };
        Self {
            use_method,
            remaining: u.remaining,
            total: u.total,
        }
    }
}

impl From<CollectionDetails> for CollectionDetailsArg {
    fn from(d: CollectionDetails) -> Self {
        match d {
            CollectionDetails::V1 { size } => CollectionDetailsArg::V1 { size },
        }
    }
}

impl From<&MetadataPayload> for DataV2 {
    fn from(p: &MetadataPayload) -> Self {
        let creators = if p.creators.is_empty() {
            None
        } else {
            Some(p.creators.iter().map(CreatorArg::from).collect())
        };
        Self {
            name: p.name.clone(),
            symbol: p.symbol.clone(),
            uri: p.uri.clone(),
            seller_fee_basis_points: p.seller_fee_basis_points,
            creators,
            collection: p.collection.as_ref().map(CollectionArg::from),
            uses: p.uses.as_ref().map(UsesArg::from),
        }
    }
}

/// Accounts referenced by `CreateMetadataAccountV3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateMetadataAccounts {
    /// Metadata PDA of the mint
    pub metadata: Pubkey,
    /// Token mint
    pub mint: Pubkey,
    /// Current mint authority (signs)
    pub mint_authority: Pubkey,
    /// Funds rent and fees (signs)
    pub payer: Pubkey,
    /// Authority recorded on the metadata (signs)
    pub update_authority: Pubkey,
}

impl CreateMetadataAccounts {
    /// Reject any role left as the all-zero default key.
    pub fn ensure_not_default(&self) -> Result<(), ValidationError> {
        let roles = [
            ("metadata", self.metadata),
            ("mint", self.mint),
            ("mint_authority", self.mint_authority),
            ("payer", self.payer),
            ("update_authority", self.update_authority),
        ];
        match roles.iter().find(|(_, key)| *key == Pubkey::default()) {
            Some((role, _)) => Err(ValidationError::DefaultAddress(*role)),
            None => Ok(()),
        }
    }
}

/// Build a CreateMetadataAccountV3 instruction.
///
/// Accounts (strict order):
/// - metadata (writable)
/// - mint (readonly)
/// - mint_authority (readonly, signer)
/// - payer (writable, signer)
/// - update_authority (readonly, signer)
/// - system_program (readonly)
pub fn create_metadata_accounts_v3(
    program_id: &Pubkey,
    accounts: &CreateMetadataAccounts,
    payload: &MetadataPayload,
    is_mutable: bool,
    collection_details: Option<CollectionDetails>,
) -> MetadataResult<Instruction> {
    if *program_id == Pubkey::default() {
        return Err(ValidationError::DefaultAddress("program_id").into());
    }
    accounts.ensure_not_default()?;
    payload.validate(&accounts.update_authority)?;

    let data = MetadataInstruction::CreateMetadataAccountV3(CreateMetadataAccountArgsV3 {
        data: DataV2::from(payload),
        is_mutable,
        collection_details: collection_details.map(CollectionDetailsArg::from),
    })
    .pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(accounts.metadata, false),
            AccountMeta::new_readonly(accounts.mint, false),
            AccountMeta::new_readonly(accounts.mint_authority, true),
            AccountMeta::new(accounts.payer, true),
            AccountMeta::new_readonly(accounts.update_authority, true),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ],
        data,
    })
}
