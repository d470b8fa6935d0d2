//! Integration tests for replacing article files.
//!
//! These tests drive the complete flow against an in-memory Figshare:
//! - listing and deleting existing files
//! - registering, partitioning, transferring and completing each upload
//! - retry of transient part failures and abort on fatal ones
//! - per-file isolation within a batch
//!
//! Run with: `cargo test --test replace_integration`

mod common;

use std::path::PathBuf;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use areadata::api::{FileStatus, Method};
use areadata::UploadError;

use common::{data_file, md5_of, replacer, FakeFigshare};

const ARTICLE: u64 = 16587311;

fn fake_with_article(part_size: u64) -> std::sync::Arc<FakeFigshare> {
    let fake = FakeFigshare::new(part_size);
    fake.add_article(ARTICLE, "AREAdata");
    fake
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[test]
fn test_replace_two_existing_with_one_three_part_file() {
    let fake = fake_with_article(10);
    let old_a = fake.seed_file(ARTICLE, "temperature-2020.zip", 100);
    let old_b = fake.seed_file(ARTICLE, "humidity-2020.zip", 100);
    let temp = TempDir::new().unwrap();
    let path = data_file(&temp, "temperature-2021.zip", 25);

    let replacer = replacer(&fake, 1);
    let report = replacer
        .replace(ARTICLE, &[path.clone()], &CancellationToken::new())
        .unwrap();

    assert_eq!(report.deleted, vec![old_a, old_b]);
    assert!(!report.has_failures());

    let files = replacer.list_files(ARTICLE).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "temperature-2021.zip");
    assert_eq!(files[0].status, FileStatus::Complete);
    assert_eq!(files[0].size, Some(25));
    assert_eq!(files[0].computed_md5.as_deref(), Some(md5_of(&path).as_str()));

    let (_, stored) = &fake.files_in(ARTICLE)[0];
    assert_eq!(stored.plan.len(), 3);
    assert_eq!(stored.md5, md5_of(&path));
}

#[test]
fn test_transient_failure_recovered() {
    let fake = fake_with_article(10);
    fake.fail_part("daily.grib", 3, &[503]);
    let temp = TempDir::new().unwrap();
    let path = data_file(&temp, "daily.grib", 40);

    let report = replacer(&fake, 1)
        .replace(ARTICLE, &[path], &CancellationToken::new())
        .unwrap();

    let resource = report.outcomes[0].result.as_ref().unwrap();
    assert_eq!(resource.status, FileStatus::Complete);

    let (file_id, stored) = &fake.files_in(ARTICLE)[0];
    assert_eq!(stored.plan.len(), 4);
    for part in 1..=4 {
        assert_eq!(stored.accepted[&part], 1, "part {} accepted once", part);
    }
    // Failed attempt plus the retry.
    assert_eq!(fake.count(Method::Put, &format!("/{}/3", file_id)), 2);
}

#[test]
fn test_fatal_failure_aborts_without_finalizing() {
    let fake = fake_with_article(10);
    fake.fail_part("daily.grib", 2, &[403]);
    let temp = TempDir::new().unwrap();
    let path = data_file(&temp, "daily.grib", 50);

    let report = replacer(&fake, 1)
        .replace(ARTICLE, &[path], &CancellationToken::new())
        .unwrap();

    let err = report.outcomes[0].result.as_ref().unwrap_err();
    assert_eq!(err.status(), Some(403));

    // Completion is never requested; the partial file is deleted.
    let completions = fake
        .log()
        .iter()
        .filter(|(m, u)| *m == Method::Post && u.contains("/files/"))
        .count();
    assert_eq!(completions, 0);
    assert_eq!(fake.count(Method::Delete, ""), 1);
    assert!(fake.files_in(ARTICLE).is_empty());
    // Parts after the rejected one were never sent.
    assert_eq!(fake.count(Method::Put, "/3"), 0);
}

#[test]
fn test_batch_isolation() {
    let fake = fake_with_article(8);
    fake.fail_part("a.zip", 1, &[400]);
    let temp = TempDir::new().unwrap();
    let a = data_file(&temp, "a.zip", 30);
    let b = data_file(&temp, "b.zip", 30);

    let report = replacer(&fake, 1)
        .replace(ARTICLE, &[a.clone(), b.clone()], &CancellationToken::new())
        .unwrap();

    assert_eq!(report.outcomes[0].path, a);
    assert_eq!(report.outcomes[1].path, b);
    assert!(report.outcomes[0].result.is_err());
    assert_eq!(report.succeeded().count(), 1);
    assert_eq!(report.failed().count(), 1);

    let files = fake.files_in(ARTICLE);
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].1.name, "b.zip");
    assert!(files[0].1.complete);
}

#[test]
fn test_parallel_transfer() {
    let fake = fake_with_article(16);
    let temp = TempDir::new().unwrap();
    let path = data_file(&temp, "large.nc", 16 * 20 + 3);

    let report = replacer(&fake, 4)
        .replace(ARTICLE, &[path.clone()], &CancellationToken::new())
        .unwrap();

    let resource = report.outcomes[0].result.as_ref().unwrap();
    assert_eq!(resource.size, Some(16 * 20 + 3));
    assert_eq!(resource.computed_md5.as_deref(), Some(md5_of(&path).as_str()));

    let (_, stored) = &fake.files_in(ARTICLE)[0];
    assert_eq!(stored.plan.len(), 21);
    assert!(stored.accepted.values().all(|&n| n == 1));
}

// ============================================================================
// Failure modes
// ============================================================================

#[test]
fn test_digest_mismatch_aborts() {
    let fake = fake_with_article(10);
    fake.corrupt_digest("daily.grib");
    let temp = TempDir::new().unwrap();
    let path = data_file(&temp, "daily.grib", 20);

    let report = replacer(&fake, 1)
        .replace(ARTICLE, &[path], &CancellationToken::new())
        .unwrap();

    assert!(matches!(
        report.outcomes[0].result,
        Err(UploadError::ChecksumMismatch { .. })
    ));
    assert!(fake.files_in(ARTICLE).is_empty());
}

#[test]
fn test_empty_file_rejected_locally() {
    let fake = fake_with_article(10);
    let temp = TempDir::new().unwrap();
    let path = data_file(&temp, "empty.grib", 0);

    let report = replacer(&fake, 1)
        .replace(ARTICLE, &[path], &CancellationToken::new())
        .unwrap();

    assert!(matches!(
        report.outcomes[0].result,
        Err(UploadError::InvalidDescriptor { .. })
    ));
    assert_eq!(fake.count(Method::Post, ""), 0);
}

#[test]
fn test_unknown_article() {
    let fake = fake_with_article(10);

    let err = replacer(&fake, 1)
        .replace(1, &[PathBuf::from("unused")], &CancellationToken::new())
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
}

#[test]
fn test_cancelled_before_start_deletes_nothing() {
    let fake = fake_with_article(10);
    fake.seed_file(ARTICLE, "keep.zip", 10);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = replacer(&fake, 1)
        .replace(ARTICLE, &[PathBuf::from("unused")], &cancel)
        .unwrap_err();

    assert!(matches!(err, UploadError::Cancelled));
    assert_eq!(fake.files_in(ARTICLE).len(), 1);
}

#[test]
fn test_cancel_mid_transfer_aborts_file_and_skips_rest() {
    let fake = fake_with_article(10);
    let temp = TempDir::new().unwrap();
    let first = data_file(&temp, "a.zip", 25);
    let second = data_file(&temp, "b.zip", 15);
    let cancel = CancellationToken::new();
    fake.cancel_at_part("a.zip", 2, &cancel);

    let report = replacer(&fake, 1)
        .replace(ARTICLE, &[first, second], &cancel)
        .unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert!(matches!(report.outcomes[0].result, Err(UploadError::Cancelled)));
    assert!(matches!(report.outcomes[1].result, Err(UploadError::Cancelled)));

    // Only a.zip was registered, and its session was deleted.
    assert_eq!(fake.count(Method::Post, &format!("/articles/{}/files", ARTICLE)), 1);
    let log = fake.log();
    let deletes: Vec<&String> = log
        .iter()
        .filter(|(m, _)| *m == Method::Delete)
        .map(|(_, url)| url)
        .collect();
    assert_eq!(deletes.len(), 1);
    assert!(deletes[0].contains(&format!("/articles/{}/files/", ARTICLE)));
    assert!(fake.files_in(ARTICLE).is_empty());

    // No completion request and no retry of the interrupted part.
    assert!(!log
        .iter()
        .any(|(m, url)| *m == Method::Post && url.contains("/files/")));
    assert_eq!(fake.count(Method::Put, "/2"), 1);
    assert_eq!(fake.count(Method::Put, "/3"), 0);
}

#[test]
fn test_keep_existing() {
    let fake = fake_with_article(10);
    fake.seed_file(ARTICLE, "old.zip", 10);
    let temp = TempDir::new().unwrap();
    let path = data_file(&temp, "new.zip", 15);

    let report = replacer(&fake, 1)
        .with_keep_existing(true)
        .replace(ARTICLE, &[path], &CancellationToken::new())
        .unwrap();

    assert!(report.deleted.is_empty());
    assert_eq!(fake.files_in(ARTICLE).len(), 2);
}

// ============================================================================
// Article helpers
// ============================================================================

#[test]
fn test_create_and_list_articles() {
    let fake = fake_with_article(10);
    let replacer = replacer(&fake, 1);

    let id = replacer.create_article("AREAdata 2021").unwrap();
    let articles = replacer.list_articles().unwrap();

    assert_eq!(articles.len(), 2);
    assert!(articles.iter().any(|a| a.id == id && a.title == "AREAdata 2021"));
}
