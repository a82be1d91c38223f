//! Resolved run configuration and the JSON payload file format.

use {
    anyhow::Context as _,
    serde::Deserialize,
    sol_token_metadata_sdk::{
        keys::parse_pubkey, Collection, Creator, MetadataPayload, RetryPolicy, UseMethod, Uses,
    },
    solana_sdk::{commitment_config::CommitmentConfig, native_token::LAMPORTS_PER_SOL},
    std::{path::Path, time::Duration},
};

/// Everything the updater needs, resolved from flags, env and `.env`.
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    pub rpc_url: String,
    pub commitment: CommitmentConfig,
    pub policy: RetryPolicy,
    pub min_balance_lamports: u64,
    /// solana.fm `cluster` query value
    pub explorer_cluster: &'static str,
}

impl UpdateConfig {
    pub fn explorer_link(&self, signature: &str) -> String {
        format!(
            "https://solana.fm/tx/{signature}?cluster={}",
            self.explorer_cluster
        )
    }

    pub fn rpc_timeout(&self) -> Duration {
        self.policy.attempt_timeout()
    }
}

/// Convert a SOL amount given on the command line to lamports.
pub fn sol_to_lamports(sol: f64) -> anyhow::Result<u64> {
    anyhow::ensure!(
        sol.is_finite() && sol >= 0.0,
        "balance threshold must be a non-negative number of SOL, got {sol}"
    );
    Ok((sol * LAMPORTS_PER_SOL as f64).round() as u64)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PayloadFile {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    #[serde(default)]
    pub seller_fee_basis_points: u16,
    #[serde(default)]
    pub creators: Option<Vec<CreatorEntry>>,
    #[serde(default)]
    pub collection: Option<CollectionEntry>,
    #[serde(default)]
    pub uses: Option<UsesEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatorEntry {
    pub address: String,
    #[serde(default)]
    pub verified: bool,
    pub share: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CollectionEntry {
    #[serde(default)]
    pub verified: bool,
    pub key: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub enum UseMethodEntry {
    Burn,
    Multiple,
    Single,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UsesEntry {
    pub use_method: UseMethodEntry,
    pub remaining: u64,
    pub total: u64,
}

impl PayloadFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read payload file {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse payload file {}", path.display()))
    }

    /// Addresses are parsed here; payload invariants are checked by the updater.
    pub fn into_payload(self) -> anyhow::Result<MetadataPayload> {
        let mut payload =
            MetadataPayload::new(self.name, self.symbol, self.uri, self.seller_fee_basis_points);

        payload.creators = self
            .creators
            .unwrap_or_default()
            .into_iter()
            .map(|c| {
                Ok(Creator {
                    address: parse_pubkey(&c.address, "creator")?,
                    verified: c.verified,
                    share: c.share,
                })
            })
            .collect::<anyhow::Result<_>>()?;

        payload.collection = self
            .collection
            .map(|c| -> anyhow::Result<_> {
                Ok(Collection {
                    verified: c.verified,
                    key: parse_pubkey(&c.key, "collection")?,
                })
            })
            .transpose()?;

        payload.uses = self.uses.map(|u| Uses {
            use_method: match u.use_method {
                UseMethodEntry::Burn => UseMethod::Burn,
                UseMethodEntry::Multiple => UseMethod::Multiple,
                UseMethodEntry::Single => UseMethod::Single,
            },
            remaining: u.remaining,
            total: u.total,
        });

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, solana_sdk::pubkey::Pubkey, std::io::Write, tempfile::NamedTempFile};

    #[test]
    fn parses_camel_case_payload() -> anyhow::Result<()> {
        let creator = Pubkey::new_unique();
        let collection = Pubkey::new_unique();
        let mut file = NamedTempFile::new()?;
        write!(
            file,
            r#"{{
                "name": "SPL Token Name",
                "symbol": "SPLTOKEN",
                "uri": "https://x/y.json",
                "sellerFeeBasisPoints": 250,
                "creators": [{{ "address": "{creator}", "verified": true, "share": 100 }}],
                "collection": {{ "key": "{collection}" }},
                "uses": {{ "useMethod": "Multiple", "remaining": 4, "total": 5 }}
            }}"#
        )?;

        let payload = PayloadFile::load(file.path())?.into_payload()?;
        assert_eq!(payload.seller_fee_basis_points, 250);
        assert_eq!(payload.creators.len(), 1);
        assert_eq!(payload.creators[0].address, creator);
        assert_eq!(payload.collection.as_ref().map(|c| c.key), Some(collection));
        assert!(!payload.collection.as_ref().map_or(true, |c| c.verified));
        assert_eq!(payload.uses.as_ref().map(|u| u.use_method), Some(UseMethod::Multiple));
        Ok(())
    }

    #[test]
    fn null_and_missing_optionals_mean_none() -> anyhow::Result<()> {
        let file: PayloadFile = serde_json::from_str(
            r#"{"name":"A","symbol":"B","uri":"u","creators":[],"collection":null,"uses":null}"#,
        )?;
        let payload = file.into_payload()?;
        assert_eq!(payload.seller_fee_basis_points, 0);
        assert!(payload.creators.is_empty());
        assert!(payload.collection.is_none());
        assert!(payload.uses.is_none());
        Ok(())
    }

    #[test]
    fn bad_addresses_and_unknown_fields_fail() {
        let file: PayloadFile = serde_json::from_str(
            r#"{"name":"A","symbol":"B","uri":"u","creators":[{"address":"nope","share":100}]}"#,
        )
        .unwrap();
        let err = file.into_payload().unwrap_err();
        assert!(err.to_string().contains("Invalid creator address: nope"));

        assert!(serde_json::from_str::<PayloadFile>(
            r#"{"name":"A","symbol":"B","uri":"u","isMutable":true}"#
        )
        .is_err());
    }

    #[test]
    fn sol_amounts() {
        assert_eq!(sol_to_lamports(0.02).unwrap(), 20_000_000);
        assert_eq!(sol_to_lamports(0.0).unwrap(), 0);
        assert!(sol_to_lamports(-1.0).is_err());
        assert!(sol_to_lamports(f64::NAN).is_err());
    }

    #[test]
    fn explorer_link_carries_cluster() {
        let config = UpdateConfig {
            rpc_url: "http://127.0.0.1:8899".into(),
            commitment: CommitmentConfig::confirmed(),
            policy: RetryPolicy::default(),
            min_balance_lamports: 0,
            explorer_cluster: "devnet-alpha",
        };
        assert_eq!(
            config.explorer_link("abc"),
            "https://solana.fm/tx/abc?cluster=devnet-alpha"
        );
    }
}
