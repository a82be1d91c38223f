use anyhow::Context as _;
use sol_token_metadata_sdk::keys::keypair_from_bytes;
use solana_sdk::signature::Keypair;
use zeroize::Zeroizing;

#[derive(Clone, Debug, PartialEq, Eq)]
enum SignerSourceKind {
    Prompt,
    Stdin,
    File(String),
    Env(String),
}

fn parse_source(spec: &str) -> SignerSourceKind {
    if let Some(rest) = spec.strip_prefix("file:") {
        SignerSourceKind::File(rest.to_string())
    } else if let Some(rest) = spec.strip_prefix("env:") {
        SignerSourceKind::Env(rest.to_string())
    } else if spec == "stdin" {
        SignerSourceKind::Stdin
    } else if spec == "prompt" {
        SignerSourceKind::Prompt
    } else {
        SignerSourceKind::File(spec.to_string())
    }
}

/// Load a keypair from `prompt`, `stdin`, `file:/path`, `env:VAR` or a bare path.
///
/// Accepted encodings: the Solana CLI JSON byte array, or a base58 string.
pub fn keypair_from_source(spec: &str) -> anyhow::Result<Keypair> {
    use std::io::Read as _;

    let text: Zeroizing<String> = match parse_source(spec) {
        SignerSourceKind::Prompt => {
            Zeroizing::new(rpassword::prompt_password("enter signer secret key (base58 or JSON): ")?)
        }
        SignerSourceKind::Stdin => {
            let mut buf = Zeroizing::new(String::new());
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
        SignerSourceKind::File(path) => Zeroizing::new(
            std::fs::read_to_string(&path)
                .with_context(|| format!("read keypair file {path}"))?,
        ),
        SignerSourceKind::Env(var) => Zeroizing::new(
            std::env::var(&var).with_context(|| format!("env {var} not set"))?,
        ),
    };

    let secret = decode_secret(&text)
        .context("Failed to load wallet keypair. Check that it is formatted correctly")?;
    Ok(keypair_from_bytes(&secret)?)
}

fn decode_secret(text: &str) -> anyhow::Result<Zeroizing<Vec<u8>>> {
    let trimmed = text.trim();
    anyhow::ensure!(!trimmed.is_empty(), "empty key material");
    let bytes = if trimmed.starts_with('[') {
        serde_json::from_str::<Vec<u8>>(trimmed).context("parse JSON byte array")?
    } else {
        bs58::decode(trimmed)
            .into_vec()
            .context("decode base58 secret")?
    };
    Ok(Zeroizing::new(bytes))
}
