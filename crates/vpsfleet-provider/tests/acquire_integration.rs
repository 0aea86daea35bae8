//! Acquisition flow against the fake vendor

mod support;

use chrono::{DateTime, Utc};
use support::{fake_provider, fast};
use vpsfleet_common::BatchId;
use vpsfleet_provider::error::{Error, Phase};
use vpsfleet_provider::{AcquireOptions, Batch, ServerProvider};

/// Check every server of a batch against a fresh listing.
async fn validate_batch(
    provider: &ServerProvider,
    batch: &Batch,
    name: &str,
    window: (DateTime<Utc>, DateTime<Utc>),
) {
    assert!(BatchId::parse(&batch.batch_id).is_some());

    let listing = provider.list(Some(&batch.batch_id)).await.unwrap();
    assert_eq!(listing.servers.len(), batch.servers.len());

    for server in &batch.servers {
        assert_eq!(server.batch_id, batch.batch_id);
        assert_eq!(
            server.raw_info["label"],
            format!("{}-{}", name, server.id).as_str()
        );
        assert!(server.ip.as_deref().unwrap().starts_with("192.168."));
        assert!(
            server.created_at >= window.0 && server.created_at <= window.1,
            "created_at {} outside window",
            server.created_at
        );
        assert!(server.age.contains("seconds"));

        let listed = listing
            .servers
            .iter()
            .find(|s| s.id == server.id)
            .expect("acquired server missing from listing");
        assert_eq!(listed.ip, server.ip);
        assert_eq!(listed.batch_id, server.batch_id);
        assert_eq!(listed.created_at, server.created_at);
    }
}

#[tokio::test]
async fn acquires_and_releases_a_single_server() {
    let (_api, provider) = fake_provider();

    let before = Utc::now();
    let batch = provider.acquire(1, fast()).await.unwrap();
    let after = Utc::now();

    assert_eq!(batch.servers.len(), 1);
    assert_eq!(provider.list(None).await.unwrap().servers.len(), 1);
    validate_batch(&provider, &batch, "test", (before, after)).await;

    provider.release(&batch.batch_id).await.unwrap();
    assert!(provider.list(None).await.unwrap().servers.is_empty());
}

#[tokio::test]
async fn acquires_and_releases_three_batches() {
    let (_api, provider) = fake_provider();

    let t0 = Utc::now();
    let batch1 = provider
        .acquire(
            5,
            AcquireOptions {
                name: Some("a".to_string()),
                ..fast()
            },
        )
        .await
        .unwrap();
    assert_eq!(provider.list(None).await.unwrap().servers.len(), 5);

    let t1 = Utc::now();
    let batch2 = provider.acquire(2, fast()).await.unwrap();
    assert_eq!(provider.list(None).await.unwrap().servers.len(), 7);

    let t2 = Utc::now();
    let batch3 = provider
        .acquire(
            4,
            AcquireOptions {
                name: Some("test-server".to_string()),
                ..fast()
            },
        )
        .await
        .unwrap();
    let t3 = Utc::now();
    assert_eq!(provider.list(None).await.unwrap().servers.len(), 11);

    assert_ne!(batch1.batch_id, batch2.batch_id);
    assert_ne!(batch2.batch_id, batch3.batch_id);

    validate_batch(&provider, &batch1, "a", (t0, t1)).await;
    validate_batch(&provider, &batch2, "test", (t1, t2)).await;
    validate_batch(&provider, &batch3, "test-server", (t2, t3)).await;

    let report = provider.release(&batch2.batch_id).await.unwrap();
    assert_eq!(report.errors, 0);
    assert_eq!(report.servers.len(), 2);
    assert_eq!(provider.list(None).await.unwrap().servers.len(), 9);
    validate_batch(&provider, &batch1, "a", (t0, t1)).await;
    validate_batch(&provider, &batch3, "test-server", (t2, t3)).await;

    provider.release(&batch1.batch_id).await.unwrap();
    assert_eq!(provider.list(None).await.unwrap().servers.len(), 4);

    provider.release(&batch3.batch_id).await.unwrap();
    assert!(provider.list(None).await.unwrap().servers.is_empty());
}

#[tokio::test]
async fn rolls_back_every_created_server_when_boot_configs_fail() {
    let (api, provider) = fake_provider();

    let batch1 = provider
        .acquire(
            5,
            AcquireOptions {
                name: Some("a".to_string()),
                ..fast()
            },
        )
        .await
        .unwrap();
    let batch2 = provider.acquire(7, fast()).await.unwrap();
    assert_eq!(provider.list(None).await.unwrap().servers.len(), 12);

    // Servers created once the store holds 15 reject boot configuration, so
    // part of the next batch fails mid-workflow.
    api.reject_boot_configs_when_store_reaches(15);

    let error = provider.acquire(8, fast()).await.unwrap_err();
    match &error {
        Error::Batch { phase, failures } => {
            assert_eq!(*phase, Phase::Configs);
            assert!(!failures.is_empty());
        }
        other => panic!("expected a configs batch error, got {other:?}"),
    }

    // The failed batch is gone entirely; the surviving batches are intact.
    assert_eq!(provider.list(None).await.unwrap().servers.len(), 12);
    assert_eq!(api.server_count(), 12);
    assert_eq!(
        provider
            .list(Some(&batch1.batch_id))
            .await
            .unwrap()
            .servers
            .len(),
        5
    );
    assert_eq!(
        provider
            .list(Some(&batch2.batch_id))
            .await
            .unwrap()
            .servers
            .len(),
        7
    );
}

#[tokio::test]
async fn rolls_back_when_a_boot_job_reports_failure() {
    let (api, provider) = fake_provider();

    api.fail_next_boot_job();
    let error = provider.acquire(2, fast()).await.unwrap_err();
    match &error {
        Error::Batch { phase, failures } => {
            assert_eq!(*phase, Phase::AwaitJobs);
            assert_eq!(failures.len(), 1);
        }
        other => panic!("expected an await-jobs batch error, got {other:?}"),
    }

    // Both created servers were rolled back even though only one job failed.
    assert!(provider.list(None).await.unwrap().servers.is_empty());
    assert_eq!(api.server_count(), 0);
}

#[tokio::test]
async fn rejects_unsupported_options() {
    let (_api, provider) = fake_provider();

    let error = provider
        .acquire(
            1,
            AcquireOptions {
                size: Some("64gb".to_string()),
                ..fast()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(error, Error::Validation(_)));

    let error = provider
        .acquire(
            1,
            AcquireOptions {
                image: Some("@plan9".to_string()),
                ..fast()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(error, Error::Validation(_)));

    let error = provider
        .acquire(
            1,
            AcquireOptions {
                region: Some("mars".to_string()),
                ..fast()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(error, Error::Validation(_)));

    // Nothing was created along the way
    assert!(provider.list(None).await.unwrap().servers.is_empty());
}

#[tokio::test]
async fn list_rejects_malformed_filter() {
    let (_api, provider) = fake_provider();
    let error = provider.list(Some("not-a-batch-id")).await.unwrap_err();
    assert!(matches!(error, Error::Validation(_)));
}
