//! This contains test scenarios that a given [BlockService] needs to pass.
//! We use [rstest] and [rstest_reuse] to provide all services we want to test
//! against, and then apply this template to all test functions.

use rstest::*;
use rstest_reuse::{self, *};

use super::BlockService;
use crate::blockservice;
use crate::fixtures::{BLOB_A, BLOB_A_CID, BLOB_B, BLOB_B_CID};

/// This produces a template, which will be applied to all individual test functions.
/// See https://github.com/la10736/rstest/issues/130#issuecomment-968864832
#[template]
#[rstest]
#[case::memory(blockservice::from_addr("memory://").await.unwrap())]
#[case::sled(blockservice::from_addr("sled://").await.unwrap())]
pub fn block_services(#[case] block_service: impl BlockService) {}

/// Using [BlockService::has] on a non-existing block should return false.
#[apply(block_services)]
#[tokio::test]
async fn has_nonexistent_false(block_service: impl BlockService) {
    assert!(!block_service
        .has(&BLOB_A_CID)
        .await
        .expect("must not fail"));
}

/// Trying to read a non-existing block should return a None.
#[apply(block_services)]
#[tokio::test]
async fn not_found_get(block_service: impl BlockService) {
    assert!(block_service
        .get(&BLOB_A_CID)
        .await
        .expect("must not fail")
        .is_none())
}

/// Put a block in the store, check has, get it back.
#[apply(block_services)]
#[tokio::test]
async fn put_has_get(block_service: impl BlockService) {
    for (block_contents, block_cid) in &[(&*BLOB_A, *BLOB_A_CID), (&*BLOB_B, *BLOB_B_CID)] {
        block_service
            .put(block_cid, (*block_contents).clone())
            .await
            .expect("put must succeed");

        assert!(
            block_service.has(block_cid).await.expect("must not fail"),
            "block service should now have the block"
        );

        let data = block_service
            .get(block_cid)
            .await
            .expect("get must succeed")
            .expect("must be some");

        assert_eq!(&block_contents[..], &data[..], "read block contents must match");
    }
}

/// Putting the same block twice keeps the first copy and doesn't fail.
#[apply(block_services)]
#[tokio::test]
async fn put_twice(block_service: impl BlockService) {
    block_service
        .put(&BLOB_A_CID, BLOB_A.clone())
        .await
        .expect("put must succeed");
    block_service
        .put(&BLOB_A_CID, BLOB_A.clone())
        .await
        .expect("second put must succeed");

    assert_eq!(
        &BLOB_A[..],
        &block_service
            .get(&BLOB_A_CID)
            .await
            .expect("get must succeed")
            .expect("must be some")[..]
    );
}

/// Many concurrent writers of the same and different blocks.
#[apply(block_services)]
#[tokio::test]
async fn concurrent_puts(block_service: impl BlockService) {
    let block_service = &block_service;

    let puts = (0..16).map(|i| {
        async move {
            let (data, cid) = if i % 2 == 0 {
                (BLOB_A.clone(), *BLOB_A_CID)
            } else {
                (BLOB_B.clone(), *BLOB_B_CID)
            };
            block_service.put(&cid, data).await
        }
    });

    for result in futures::future::join_all(puts).await {
        result.expect("put must succeed");
    }

    assert!(block_service.has(&BLOB_A_CID).await.expect("must not fail"));
    assert!(block_service.has(&BLOB_B_CID).await.expect("must not fail"));
}
