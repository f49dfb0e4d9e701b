//! Reference audit scenarios, each run against a real mirror directory.

use anyhow::Result;
use modsync_cli::manifest::{ManifestClient, ManifestFetchOptions};
use modsync_cli::test_utils::{MirrorFixture, MockResponse, MockTransport};
use modsync_cli::transport::EndpointSet;
use std::time::Duration;

use crate::common::{Client, paths};

#[tokio::test]
async fn test_scenario_a_download_into_empty_tree() -> Result<()> {
    let mut mirror = MirrorFixture::new()?;
    mirror.required("core/foo.jar", vec![7u8; 100])?;
    mirror.publish("1")?;
    let client = Client::new(&[mirror.endpoint()])?;

    let (_, plan) = client.audit().await?;
    assert_eq!(paths(&plan.to_download), vec!["core/foo.jar"]);
    assert_eq!(plan.download_bytes(), 100);
    assert_eq!(plan.total_operations(), 1);

    let (_, report) = client.sync().await?;
    assert!(!report.has_failures(), "{report:?}");

    let (_, plan) = client.audit().await?;
    assert_eq!(plan.up_to_date, vec!["core/foo.jar"]);
    assert!(plan.is_converged());
    assert_eq!(client.read("core/foo.jar"), Some(vec![7u8; 100]));
    Ok(())
}

#[tokio::test]
async fn test_scenario_b_changed_content_is_updated() -> Result<()> {
    let mut mirror = MirrorFixture::new()?;
    mirror.required("mods/bar.jar", "bar v3")?;
    mirror.publish("1")?;
    let client = Client::new(&[mirror.endpoint()])?;
    client.write("mods/bar.jar", "bar v2")?;

    let (_, plan) = client.audit().await?;
    assert_eq!(paths(&plan.to_update), vec!["mods/bar.jar"]);
    assert!(plan.to_download.is_empty());
    assert!(plan.to_delete.is_empty());

    let (_, report) = client.sync().await?;
    assert!(!report.has_failures(), "{report:?}");
    assert_eq!(client.read("mods/bar.jar"), Some(b"bar v3".to_vec()));
    Ok(())
}

#[tokio::test]
async fn test_scenario_c_stale_inactive_version_deleted_canonical_not_fetched() -> Result<()> {
    let mut mirror = MirrorFixture::new()?;
    mirror.optional("mods/baz-1.0.jar", "baz one", &[], &[])?;
    mirror.publish("1")?;
    let client = Client::new(&[mirror.endpoint()])?;
    client.write("mods/baz-2.0.jar.disabled", "baz two")?;

    let (_, plan) = client.audit().await?;
    assert_eq!(plan.to_delete, vec!["mods/baz-2.0.jar.disabled"]);
    assert!(plan.to_download.is_empty());
    assert!(plan.skipped.contains(&"mods/baz-1.0.jar".to_string()));

    client.sync().await?;
    assert!(client.files().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_scenario_d_missing_dependency_disables_component() -> Result<()> {
    let mut mirror = MirrorFixture::new()?;
    mirror.optional("addon.jar", "addon", &["core.jar"], &[])?;
    mirror.optional("core.jar", "core", &[], &[])?;
    mirror.publish("1")?;
    let client = Client::new(&[mirror.endpoint()])?;
    client.write("addon.jar", "addon")?;

    let (_, plan) = client.audit().await?;
    assert_eq!(plan.to_disable, vec!["addon.jar"]);
    assert!(plan.to_download.is_empty());

    let (_, report) = client.sync().await?;
    assert!(!report.has_failures(), "{report:?}");
    assert_eq!(client.files(), vec!["addon.jar.disabled"]);

    let (_, plan) = client.audit().await?;
    assert!(plan.is_converged());
    assert!(plan.skipped.contains(&"addon.jar.disabled".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_scenario_e_ignored_file_left_alone() -> Result<()> {
    let mut mirror = MirrorFixture::new()?;
    mirror.required("config/options.txt", "server defaults")?;
    mirror.required("core/engine.jar", "engine")?;
    mirror.publish("1")?;
    let client = Client::new(&[mirror.endpoint()])?.with_ignore(&["config/*.txt"]);
    client.write("config/options.txt", "my settings")?;

    let (_, plan) = client.audit().await?;
    assert!(plan.skipped.contains(&"config/options.txt".to_string()));
    assert!(plan.to_update.is_empty());
    assert!(!plan.to_delete.contains(&"config/options.txt".to_string()));
    assert_eq!(paths(&plan.to_download), vec!["core/engine.jar"]);

    client.sync().await?;
    assert_eq!(client.read("config/options.txt"), Some(b"my settings".to_vec()));
    Ok(())
}

#[tokio::test]
async fn test_scenario_f_fallback_after_primary_times_out() -> Result<()> {
    let mut mirror = MirrorFixture::new()?;
    mirror.required("core/foo.jar", "foo")?;
    let published = mirror.publish("9")?;

    let transport = MockTransport::new();
    transport.script("http://primary/launcher/manifest", vec![MockResponse::Hang; 3]);
    transport.respond("http://fallback/launcher/manifest", published.to_json_pretty()?);

    let options = ManifestFetchOptions {
        attempt_timeout: Duration::from_millis(50),
        backoff_step: Duration::from_millis(1),
        ..ManifestFetchOptions::default()
    };
    let client = ManifestClient::new(transport.clone(), options);
    let mut endpoints = EndpointSet::new(["http://primary", "http://fallback"])?;

    let fetched = client.fetch(&mut endpoints).await?;
    assert_eq!(fetched.manifest.format_version, "9");
    assert_eq!(fetched.manifest.aggregate_digest, published.aggregate_digest);
    assert_eq!(fetched.endpoint, "http://fallback");
    assert_eq!(transport.request_count("http://primary/launcher/manifest"), 3);
    assert_eq!(transport.requests().len(), 4);
    assert_eq!(endpoints.preferred(), 1);
    Ok(())
}
