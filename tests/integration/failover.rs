//! Endpoint fallback and integrity handling against real mirrors.

use anyhow::Result;
use modsync_cli::core::SyncError;
use modsync_cli::executor::{ActionKind, OutcomeStatus};
use modsync_cli::test_utils::MirrorFixture;

use crate::common::Client;

fn mirror_with(files: &[(&str, &str)]) -> Result<MirrorFixture> {
    let mut mirror = MirrorFixture::new()?;
    for (path, content) in files {
        mirror.required(path, content)?;
    }
    mirror.publish("1")?;
    Ok(mirror)
}

#[tokio::test]
async fn test_corrupt_primary_falls_back_to_next_endpoint() -> Result<()> {
    let files = [("core/engine.jar", "engine"), ("core/assets.zip", "assets")];
    let primary = mirror_with(&files)?;
    let fallback = mirror_with(&files)?;
    primary.corrupt("core/engine.jar", "engine but wrong")?;

    let client = Client::new(&[primary.endpoint(), fallback.endpoint()])?;
    let (_, report) = client.sync().await?;

    assert!(!report.has_failures(), "{report:?}");
    let engine = report
        .outcomes()
        .iter()
        .find(|o| o.path == "core/engine.jar")
        .expect("engine outcome");
    assert_eq!(engine.endpoint.as_deref(), Some(fallback.endpoint().trim_end_matches('/')));
    assert_eq!(client.read("core/engine.jar"), Some(b"engine".to_vec()));
    Ok(())
}

#[tokio::test]
async fn test_failed_update_keeps_previous_file() -> Result<()> {
    let mirror = mirror_with(&[("core/engine.jar", "engine 2"), ("core/assets.zip", "assets")])?;
    mirror.corrupt("core/engine.jar", "garbage")?;

    let client = Client::new(&[mirror.endpoint()])?;
    client.write("core/engine.jar", "engine 1")?;

    let (plan, report) = client.sync().await?;
    assert_eq!(plan.to_update.len(), 1);
    assert!(report.has_failures());

    let failure = report.failures().next().expect("one failure");
    assert_eq!(failure.path, "core/engine.jar");
    assert_eq!(failure.action, ActionKind::Update);
    assert!(matches!(failure.status, OutcomeStatus::Failed(_)));

    // The sibling download still ran and nothing half-written remains
    assert_eq!(report.succeeded_count(ActionKind::Download), 1);
    assert_eq!(client.read("core/engine.jar"), Some(b"engine 1".to_vec()));
    assert_eq!(client.files(), vec!["core/assets.zip", "core/engine.jar"]);
    Ok(())
}

#[tokio::test]
async fn test_manifest_missing_on_primary_uses_fallback() -> Result<()> {
    let empty = MirrorFixture::new()?;
    let fallback = mirror_with(&[("core/engine.jar", "engine")])?;

    let client = Client::new(&[empty.endpoint(), fallback.endpoint()])?;
    let (manifest, plan) = client.audit().await?;

    assert_eq!(manifest.len(), 1);
    assert_eq!(plan.to_download.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_no_endpoint_answers() -> Result<()> {
    let first = MirrorFixture::new()?;
    let second = MirrorFixture::new()?;
    let client = Client::new(&[first.endpoint(), second.endpoint()])?;
    client.write("keep.txt", "untouched")?;

    let err = client.sync().await.unwrap_err();
    assert!(
        matches!(err.downcast_ref::<SyncError>(), Some(SyncError::ManifestUnavailable { .. })),
        "unexpected error: {err:#}"
    );
    assert_eq!(client.read("keep.txt"), Some(b"untouched".to_vec()));
    Ok(())
}
