use sol_token_metadata_sdk::{
    CancelToken, Creator, MetadataError, NetworkError, TokenMetadataClient, ValidationError,
    MIN_BALANCE_LAMPORTS,
};
use sol_token_metadata_tests::{
    fast_policy, init_tracing, test_payload, updater, MockBackend, SendOutcome,
};
use solana_sdk::{pubkey::Pubkey, signature::Keypair};

#[tokio::test]
async fn underfunded_signer_stops_before_any_transaction() -> anyhow::Result<()> {
    init_tracing();
    let backend = MockBackend::new();
    backend.set_balance(15_000_000);
    let signer = Keypair::new();

    let err = updater(&backend, fast_policy(3))
        .create_metadata(
            &signer,
            Pubkey::new_unique(),
            test_payload(&signer),
            true,
            None,
            &CancelToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        MetadataError::InsufficientFunds {
            balance: 15_000_000,
            required: MIN_BALANCE_LAMPORTS,
        }
    );
    assert_eq!(backend.balance_checks(), 1);
    assert_eq!(backend.blockhashes(), 0);
    assert_eq!(backend.sends(), 0);
    Ok(())
}

#[tokio::test]
async fn exactly_the_minimum_passes_the_funds_gate() -> anyhow::Result<()> {
    init_tracing();
    let backend = MockBackend::new();
    backend.set_balance(MIN_BALANCE_LAMPORTS);
    let signer = Keypair::new();

    let report = updater(&backend, fast_policy(3))
        .create_metadata(
            &signer,
            Pubkey::new_unique(),
            test_payload(&signer),
            true,
            None,
            &CancelToken::new(),
        )
        .await?;

    assert_eq!(report.attempts, 1);
    assert_eq!(backend.sends(), 1);
    Ok(())
}

#[tokio::test]
async fn invalid_payload_never_touches_the_network() -> anyhow::Result<()> {
    init_tracing();
    let backend = MockBackend::new();
    let signer = Keypair::new();

    let mut payload = test_payload(&signer);
    payload.creators[0].share = 99;
    let err = updater(&backend, fast_policy(3))
        .create_metadata(
            &signer,
            Pubkey::new_unique(),
            payload,
            true,
            None,
            &CancelToken::new(),
        )
        .await
        .unwrap_err();
    assert!(err.is_validation(), "{err:?}");

    let mut payload = test_payload(&signer);
    payload.name.clear();
    let err = updater(&backend, fast_policy(3))
        .create_metadata(
            &signer,
            Pubkey::new_unique(),
            payload,
            true,
            None,
            &CancelToken::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        MetadataError::Validation(ValidationError::MissingField("name"))
    );

    assert!(backend.untouched());
    Ok(())
}

#[tokio::test]
async fn default_mint_is_rejected_before_the_balance_query() -> anyhow::Result<()> {
    init_tracing();
    let backend = MockBackend::new();
    backend.set_balance(1);
    let signer = Keypair::new();

    let err = updater(&backend, fast_policy(3))
        .create_metadata(
            &signer,
            Pubkey::default(),
            test_payload(&signer),
            true,
            None,
            &CancelToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        MetadataError::Validation(ValidationError::DefaultAddress("mint"))
    );
    assert!(backend.untouched());
    Ok(())
}

#[tokio::test]
async fn verified_creator_other_than_the_signer_is_rejected() -> anyhow::Result<()> {
    init_tracing();
    let backend = MockBackend::new();
    let signer = Keypair::new();

    let mut payload = test_payload(&signer);
    payload.creators = vec![Creator {
        address: Pubkey::new_unique(),
        verified: true,
        share: 100,
    }];
    let err = updater(&backend, fast_policy(3))
        .create_metadata(
            &signer,
            Pubkey::new_unique(),
            payload,
            true,
            None,
            &CancelToken::new(),
        )
        .await
        .unwrap_err();

    assert!(err.is_validation(), "{err:?}");
    assert!(backend.untouched());
    Ok(())
}

#[tokio::test]
async fn successful_run_reports_pda_and_signature() -> anyhow::Result<()> {
    init_tracing();
    let backend = MockBackend::scripted(
        vec![SendOutcome::Fail(NetworkError::Rpc("503".into()))],
        SendOutcome::Confirm,
    );
    let signer = Keypair::new();
    let mint = Pubkey::new_unique();

    let report = updater(&backend, fast_policy(3))
        .create_metadata(
            &signer,
            mint,
            test_payload(&signer),
            true,
            None,
            &CancelToken::new(),
        )
        .await?;

    let expected = TokenMetadataClient::default().metadata_pda_and_bump(&mint)?;
    assert_eq!(report.mint, mint);
    assert_eq!(report.metadata, expected.address);
    assert_eq!(report.bump, expected.bump);
    assert_eq!(report.attempts, 2);
    assert_eq!(report.signature, backend.sent()[1].signature);
    assert_eq!(backend.balance_checks(), 1);
    assert_ne!(report.signature, backend.sent()[0].signature);
    // the reported PDA is the account the transaction actually wrote
    assert!(backend.sent()[1].account_keys.contains(&report.metadata));
    Ok(())
}

#[tokio::test]
async fn exhausted_submission_surfaces_through_the_updater() -> anyhow::Result<()> {
    init_tracing();
    let backend = MockBackend::always_failing(NetworkError::Rpc("down".into()));
    let signer = Keypair::new();

    let err = updater(&backend, fast_policy(3))
        .create_metadata(
            &signer,
            Pubkey::new_unique(),
            test_payload(&signer),
            true,
            None,
            &CancelToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.attempts(), Some(3));
    assert_eq!(backend.sends(), 3);
    Ok(())
}
