//! Metadata payload types
//!
//! These mirror the Token Metadata program's `DataV2` argument. Encoding to
//! the program's wire layout lives in [`crate::instruction`].

use {crate::error::ValidationError, solana_sdk::pubkey::Pubkey};

/// Maximum name length accepted by the Token Metadata program
pub const MAX_NAME_LENGTH: usize = 32;
/// Maximum symbol length accepted by the Token Metadata program
pub const MAX_SYMBOL_LENGTH: usize = 10;
/// Maximum URI length accepted by the Token Metadata program
pub const MAX_URI_LENGTH: usize = 200;
/// Maximum number of creators
pub const MAX_CREATOR_LIMIT: usize = 5;
/// Royalties are expressed in basis points of 100%
pub const MAX_SELLER_FEE_BASIS_POINTS: u16 = 10_000;
/// Creator shares must add up to this when creators are present
pub const TOTAL_CREATOR_SHARES: u32 = 100;

/// A royalty recipient listed in the metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creator {
    /// Creator wallet
    pub address: Pubkey,
    /// Whether the creator signed this metadata
    pub verified: bool,
    /// Percentage share of royalties
    pub share: u8,
}

/// Collection membership
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    /// Set by the collection authority; cannot be self-asserted
    pub verified: bool,
    /// Collection mint
    pub key: Pubkey,
}

/// How a token's uses are consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseMethod {
    /// Burned on use
    Burn,
    /// Usable `total` times
    Multiple,
    /// Usable exactly once
    Single,
}

/// Limited-use descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uses {
    /// Consumption method
    pub use_method: UseMethod,
    /// Uses left
    pub remaining: u64,
    /// Uses granted at creation
    pub total: u64,
}

/// Sized-collection details attached at creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionDetails {
    /// Collection parent with a tracked size
    V1 {
        /// Number of verified items
        size: u64,
    },
}

/// Logical content stored in the metadata account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataPayload {
    /// Token name
    pub name: String,
    /// Token symbol
    pub symbol: String,
    /// Off-chain JSON URI
    pub uri: String,
    /// Royalty in basis points
    pub seller_fee_basis_points: u16,
    /// Royalty recipients; empty means none
    pub creators: Vec<Creator>,
    /// Optional collection membership
    pub collection: Option<Collection>,
    /// Optional uses descriptor
    pub uses: Option<Uses>,
}

impl MetadataPayload {
    /// Payload with no creators, collection or uses.
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        uri: impl Into<String>,
        seller_fee_basis_points: u16,
    ) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            uri: uri.into(),
            seller_fee_basis_points,
            creators: Vec::new(),
            collection: None,
            uses: None,
        }
    }

    /// Replace the creator list with a single verified creator owning 100%.
    pub fn with_sole_creator(mut self, address: Pubkey) -> Self {
        self.creators = vec![Creator {
            address,
            verified: true,
            share: 100,
        }];
        self
    }

    /// Check the payload against the program's invariants.
    ///
    /// `update_authority` is the only signer of the transaction, so it is the
    /// only creator that may be marked verified.
    pub fn validate(&self, update_authority: &Pubkey) -> Result<(), ValidationError> {
        check_field("name", &self.name, MAX_NAME_LENGTH)?;
        check_field("symbol", &self.symbol, MAX_SYMBOL_LENGTH)?;
        check_field("uri", &self.uri, MAX_URI_LENGTH)?;

        if self.seller_fee_basis_points > MAX_SELLER_FEE_BASIS_POINTS {
            return Err(ValidationError::InvalidPayload(format!(
                "seller fee {} exceeds {} basis points",
                self.seller_fee_basis_points, MAX_SELLER_FEE_BASIS_POINTS
            )));
        }

        self.validate_creators(update_authority)?;

        if let Some(uses) = &self.uses {
            validate_uses(uses)?;
        }
        Ok(())
    }

    fn validate_creators(&self, update_authority: &Pubkey) -> Result<(), ValidationError> {
        if self.creators.is_empty() {
            return Ok(());
        }
        if self.creators.len() > MAX_CREATOR_LIMIT {
            return Err(ValidationError::InvalidPayload(format!(
                "{} creators, limit is {}",
                self.creators.len(),
                MAX_CREATOR_LIMIT
            )));
        }

        let mut total: u32 = 0;
        for (i, creator) in self.creators.iter().enumerate() {
            if self.creators[..i]
                .iter()
                .any(|c| c.address == creator.address)
            {
                return Err(ValidationError::InvalidPayload(format!(
                    "duplicate creator {}",
                    creator.address
                )));
            }
            if creator.verified && creator.address != *update_authority {
                return Err(ValidationError::InvalidPayload(format!(
                    "creator {} is marked verified but does not sign",
                    creator.address
                )));
            }
            total += u32::from(creator.share);
        }

        if total != TOTAL_CREATOR_SHARES {
            return Err(ValidationError::InvalidPayload(format!(
                "creator shares sum to {total}, expected {TOTAL_CREATOR_SHARES}"
            )));
        }
        Ok(())
    }
}

fn check_field(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    if value.len() > max {
        return Err(ValidationError::FieldTooLong {
            field,
            len: value.len(),
            max,
        });
    }
    Ok(())
}

fn validate_uses(uses: &Uses) -> Result<(), ValidationError> {
    if uses.remaining > uses.total {
        return Err(ValidationError::InvalidPayload(format!(
            "uses remaining {} exceeds total {}",
            uses.remaining, uses.total
        )));
    }
    if uses.use_method == UseMethod::Single && uses.total != 1 {
        return Err(ValidationError::InvalidPayload(
            "single-use tokens must have a total of 1".into(),
        ));
    }
    Ok(())
}
