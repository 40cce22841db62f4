pub mod helpers;

use astria_blobstream_verifier::{
    batch::Batch,
    verifier::{
        ErrorKind,
        Stage,
    },
};

use crate::helpers::{
    batch,
    blob_namespace,
    TestVerifier,
    BLOB_SHARES,
    HEIGHT,
};

#[tokio::test]
async fn blob_attested_by_blobstream_is_verified() {
    let test = TestVerifier::spawn().await;
    test.mount_tx(1).await;
    test.mount_block(1).await;
    test.mount_share_proof(false, 1).await;
    test.mount_data_root_inclusion_proof(batch(), 1).await;
    test.mount_blobstream(&[batch()], 1).await;

    let attested = test.verifier(0, batch()).run().await.unwrap();
    assert_eq!(HEIGHT, attested.located.height);
    assert_eq!(1, attested.located.tx_index);
    assert_eq!(0, attested.located.blob_index);
    assert_eq!(BLOB_SHARES, attested.located.share_range);
    assert_eq!(blob_namespace(), attested.located.namespace);
    assert_eq!(test.block.data_root(), attested.located.data_root);
    assert_eq!(HEIGHT, attested.tuple.height());
    assert_eq!(test.block.data_root(), attested.tuple.data_root());
    assert_eq!(batch(), attested.batch);
}

#[tokio::test]
async fn batch_of_a_single_block_is_verified() {
    let single = Batch::new(HEIGHT, HEIGHT + 1, 9).unwrap();
    let test = TestVerifier::spawn().await;
    test.mount_tx(1).await;
    test.mount_block(1).await;
    test.mount_share_proof(false, 1).await;
    test.mount_data_root_inclusion_proof(single, 1).await;
    test.mount_blobstream(&[batch(), single], 1).await;

    let attested = test.verifier(0, single).run().await.unwrap();
    assert_eq!(single, attested.batch);
}

#[tokio::test]
async fn wrong_nonce_is_an_attestation_mismatch() {
    let wrong_nonce = Batch::new(batch().start(), batch().end(), 8).unwrap();
    let test = TestVerifier::spawn().await;
    test.mount_tx(1).await;
    test.mount_block(1).await;
    test.mount_share_proof(false, 1).await;
    test.mount_data_root_inclusion_proof(wrong_nonce, 1).await;
    test.mount_blobstream(&[batch()], 1).await;

    let error = test.verifier(0, wrong_nonce).run().await.unwrap_err();
    assert_eq!(Stage::VerifyAttestation, error.stage());
    assert!(
        matches!(error.kind(), ErrorKind::AttestationMismatch { height, .. } if *height == HEIGHT),
        "{error:?}",
    );
}

#[tokio::test]
async fn blob_index_past_the_blobs_of_the_transaction_fails_before_any_proof_is_fetched() {
    let test = TestVerifier::spawn().await;
    test.mount_tx(1).await;
    test.mount_block(1).await;
    test.mount_share_proof(false, 0).await;
    test.mount_data_root_inclusion_proof(batch(), 0).await;
    test.mount_blobstream(&[batch()], 0).await;

    let error = test.verifier(1, batch()).run().await.unwrap_err();
    assert_eq!(Stage::Locate, error.stage());
    assert!(
        matches!(
            error.kind(),
            ErrorKind::Range { height, tx_index: 1, blob_index: 1, .. } if *height == HEIGHT
        ),
        "{error:?}",
    );
}

#[tokio::test]
async fn unknown_transaction_is_not_found() {
    let test = TestVerifier::spawn().await;
    test.mount_tx_not_found().await;
    test.mount_block(0).await;
    test.mount_blobstream(&[batch()], 0).await;

    let error = test.verifier(0, batch()).run().await.unwrap_err();
    assert_eq!(Stage::Locate, error.stage());
    assert!(
        matches!(
            error.kind(),
            ErrorKind::NotFound {
                reported_missing: true,
                ..
            }
        ),
        "{error:?}",
    );
}

#[tokio::test]
async fn malformed_transaction_hash_is_a_decode_error() {
    let test = TestVerifier::spawn().await;
    test.mount_tx(0).await;

    let error = test
        .verifier_for_tx("0x1234", 0, batch())
        .run()
        .await
        .unwrap_err();
    assert_eq!(Stage::Locate, error.stage());
    assert_eq!("decode_error", error.kind().name());
}

#[tokio::test]
async fn tampered_share_is_an_invalid_proof() {
    let test = TestVerifier::spawn().await;
    test.mount_tx(1).await;
    test.mount_block(1).await;
    test.mount_share_proof(true, 1).await;
    test.mount_data_root_inclusion_proof(batch(), 0).await;
    test.mount_blobstream(&[batch()], 0).await;

    let error = test.verifier(0, batch()).run().await.unwrap_err();
    assert_eq!(Stage::VerifyShares, error.stage());
    assert!(
        matches!(error.kind(), ErrorKind::ProofInvalid { range, .. } if *range == BLOB_SHARES),
        "{error:?}",
    );
}

#[tokio::test]
async fn block_outside_the_batch_fails_without_fetching_a_proof() {
    let elsewhere = Batch::new(200, 208, 7).unwrap();
    let test = TestVerifier::spawn().await;
    test.mount_tx(1).await;
    test.mount_block(1).await;
    test.mount_share_proof(false, 1).await;
    test.mount_blobstream(&[batch()], 0).await;

    let error = test.verifier(0, elsewhere).run().await.unwrap_err();
    assert_eq!(Stage::ProveBatch, error.stage());
    assert_eq!("proof_fetch_error", error.kind().name());
}
