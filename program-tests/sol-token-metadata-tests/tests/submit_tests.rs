use std::{collections::HashSet, time::Duration};

use sol_token_metadata_sdk::{CancelToken, MetadataError, NetworkError};
use sol_token_metadata_tests::{
    fast_policy, init_tracing, noop_instruction, submitter, MockBackend, SendOutcome,
};
use solana_sdk::signature::{Keypair, Signer};

fn down() -> NetworkError {
    NetworkError::Rpc("connection refused".into())
}

#[tokio::test]
async fn always_failing_backend_is_sent_exactly_max_attempts() -> anyhow::Result<()> {
    init_tracing();
    let backend = MockBackend::always_failing(down());
    let signer = Keypair::new();

    let err = submitter(&backend, fast_policy(3))
        .submit(&noop_instruction(&signer.pubkey()), &signer, &CancelToken::new())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        MetadataError::SubmissionExhausted {
            attempts: 3,
            last_error: down(),
        }
    );
    assert_eq!(backend.sends(), 3);
    assert_eq!(backend.blockhashes(), 3);
    // after each failure every signature sent so far is checked again
    assert_eq!(backend.status_checks(), 1 + 2 + 3);
    Ok(())
}

#[tokio::test]
async fn succeeds_on_third_attempt_with_that_attempts_signature() -> anyhow::Result<()> {
    init_tracing();
    let backend = MockBackend::scripted(
        vec![
            SendOutcome::Fail(down()),
            SendOutcome::Fail(NetworkError::Rejected("blockhash not found".into())),
        ],
        SendOutcome::Confirm,
    );
    let signer = Keypair::new();

    let outcome = submitter(&backend, fast_policy(3))
        .submit(&noop_instruction(&signer.pubkey()), &signer, &CancelToken::new())
        .await?;

    let sent = backend.sent();
    assert_eq!(backend.sends(), 3);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.signature, sent[2].signature);
    Ok(())
}

#[tokio::test]
async fn every_attempt_uses_a_fresh_blockhash_and_signature() -> anyhow::Result<()> {
    init_tracing();
    let backend = MockBackend::always_failing(down());
    let signer = Keypair::new();

    let _ = submitter(&backend, fast_policy(4))
        .submit(&noop_instruction(&signer.pubkey()), &signer, &CancelToken::new())
        .await;

    let sent = backend.sent();
    assert_eq!(sent.len(), 4);
    let blockhashes: HashSet<_> = sent.iter().map(|s| s.blockhash).collect();
    let signatures: HashSet<_> = sent.iter().map(|s| s.signature).collect();
    assert_eq!(blockhashes.len(), 4);
    assert_eq!(signatures.len(), 4);
    Ok(())
}

#[tokio::test]
async fn hung_send_times_out_and_counts_as_an_attempt() -> anyhow::Result<()> {
    init_tracing();
    let backend = MockBackend::scripted(vec![SendOutcome::Hang], SendOutcome::Confirm);
    let signer = Keypair::new();
    let policy = fast_policy(2);

    let outcome = submitter(&backend, policy)
        .submit(&noop_instruction(&signer.pubkey()), &signer, &CancelToken::new())
        .await?;
    assert_eq!(outcome.attempts, 2);
    assert_eq!(backend.sends(), 2);

    let backend = MockBackend::scripted(Vec::new(), SendOutcome::Hang);
    let err = submitter(&backend, fast_policy(1))
        .submit(&noop_instruction(&signer.pubkey()), &signer, &CancelToken::new())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        MetadataError::SubmissionExhausted {
            attempts: 1,
            last_error: NetworkError::Timeout(policy.attempt_timeout()),
        }
    );
    Ok(())
}

#[tokio::test]
async fn failed_send_that_landed_is_confirmed_without_resending() -> anyhow::Result<()> {
    init_tracing();
    let backend = MockBackend::always_failing(NetworkError::Timeout(Duration::from_secs(60)));
    backend.set_failed_sends_land(true);
    let signer = Keypair::new();

    let outcome = submitter(&backend, fast_policy(3))
        .submit(&noop_instruction(&signer.pubkey()), &signer, &CancelToken::new())
        .await?;

    assert_eq!(outcome.attempts, 1);
    assert_eq!(backend.sends(), 1);
    assert_eq!(outcome.signature, backend.sent()[0].signature);
    Ok(())
}

#[tokio::test]
async fn earlier_attempt_landing_late_wins_over_rejected_retries() -> anyhow::Result<()> {
    init_tracing();
    let already_in_use = NetworkError::Rejected("account already in use".into());
    let backend = MockBackend::scripted(
        vec![SendOutcome::FailThenLand {
            error: NetworkError::Timeout(Duration::from_secs(60)),
            after_checks: 2,
        }],
        SendOutcome::Fail(already_in_use),
    );
    let signer = Keypair::new();

    let outcome = submitter(&backend, fast_policy(3))
        .submit(&noop_instruction(&signer.pubkey()), &signer, &CancelToken::new())
        .await?;

    let sent = backend.sent();
    assert_eq!(backend.sends(), 3);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.signature, sent[0].signature);
    assert_ne!(outcome.signature, sent[2].signature);
    Ok(())
}

#[tokio::test]
async fn attempt_timeout_covers_blockhash_and_send_together() -> anyhow::Result<()> {
    init_tracing();
    // each call alone fits in the 200ms budget, both together do not
    let backend = MockBackend::scripted(
        vec![SendOutcome::Slow(Duration::from_millis(120))],
        SendOutcome::Confirm,
    );
    backend.set_blockhash_delay(Duration::from_millis(120));
    let signer = Keypair::new();

    let outcome = submitter(&backend, fast_policy(2))
        .submit(&noop_instruction(&signer.pubkey()), &signer, &CancelToken::new())
        .await?;

    assert_eq!(outcome.attempts, 2);
    assert_eq!(backend.sends(), 2);
    assert_eq!(outcome.signature, backend.sent()[1].signature);
    Ok(())
}

#[tokio::test]
async fn cancelled_token_stops_before_any_send() -> anyhow::Result<()> {
    init_tracing();
    let backend = MockBackend::new();
    let signer = Keypair::new();
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = submitter(&backend, fast_policy(3))
        .submit(&noop_instruction(&signer.pubkey()), &signer, &cancel)
        .await
        .unwrap_err();

    assert_eq!(err, MetadataError::Cancelled { attempts: 0 });
    assert!(backend.untouched());
    Ok(())
}

#[tokio::test]
async fn cancellation_between_attempts_keeps_the_attempt_count() -> anyhow::Result<()> {
    init_tracing();
    let backend = MockBackend::scripted(vec![SendOutcome::Hang], SendOutcome::Confirm);
    let signer = Keypair::new();
    let cancel = CancelToken::new();

    let trip = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trip.cancel();
    });

    let err = submitter(&backend, fast_policy(3))
        .submit(&noop_instruction(&signer.pubkey()), &signer, &cancel)
        .await
        .unwrap_err();

    assert_eq!(err, MetadataError::Cancelled { attempts: 1 });
    assert_eq!(backend.sends(), 1);
    Ok(())
}

#[tokio::test]
async fn signer_missing_from_instruction_is_fatal() -> anyhow::Result<()> {
    init_tracing();
    let backend = MockBackend::new();
    let payer = Keypair::new();
    let other = Keypair::new();
    let mut ix = noop_instruction(&payer.pubkey());
    ix.accounts
        .push(solana_sdk::instruction::AccountMeta::new_readonly(other.pubkey(), true));

    let err = submitter(&backend, fast_policy(3))
        .submit(&ix, &payer, &CancelToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, MetadataError::Signing(_)), "{err:?}");
    assert_eq!(backend.sends(), 0);
    Ok(())
}
