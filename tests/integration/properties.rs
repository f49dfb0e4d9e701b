//! Properties that must hold for any tree: idempotence, convergence,
//! canonical uniqueness and ignore precedence.

use anyhow::Result;
use modsync_cli::manifest::FileEntry;
use modsync_cli::test_utils::{MirrorFixture, entry};
use modsync_cli::version::{self, VersionComparator};
use std::cmp::Ordering;

use crate::common::Client;

/// A mirror with versioned duplicates, relations, and a messy client tree
/// exercising every plan class at once.
fn messy_setup() -> Result<(MirrorFixture, Client)> {
    let mut mirror = MirrorFixture::new()?;
    mirror
        .required("core/engine-1.2.jar", "engine 1.2")?
        .required("core/engine-1.10.jar", "engine 1.10")?
        .required("core/libs.zip", "libs")?
        .required("config/defaults.cfg", "defaults")?;
    mirror
        .optional("mods/minimap-3.0.jar", "minimap 3", &[], &[])?
        .optional("mods/shaders.jar", "shaders", &["mods/optifine.jar"], &[])?
        .optional("mods/optifine.jar", "optifine", &[], &[])?
        .optional("mods/jei.jar", "jei", &[], &[])?;
    mirror.publish("2024.11.3")?;

    let client = Client::new(&[mirror.endpoint()])?.with_ignore(&["saves/", "options.txt"]);
    client.write("core/engine-1.2.jar", "engine 1.2")?; // stale required version
    client.write("core/libs.zip.disabled", "libs")?; // required, switched off
    client.write("config/defaults.cfg", "tampered")?; // wrong content
    client.write("mods/minimap-2.9.jar", "minimap 2.9")?; // older optional the user runs
    client.write("mods/shaders.jar", "shaders")?; // dependency not installed
    client.write("mods/jei.jar", "jei")?; // both forms present
    client.write("mods/jei.jar.disabled", "old jei")?;
    client.write("mods/unknown.jar", "stray")?; // not in the manifest
    client.write("mods/big.jar.part", "partial")?; // interrupted download
    client.write("saves/world/level.dat", "world")?; // ignored directory
    client.write("options.txt", "fov=90")?; // ignored file
    Ok((mirror, client))
}

#[tokio::test]
async fn test_plan_is_idempotent() -> Result<()> {
    let (_mirror, client) = messy_setup()?;

    let (_, first) = client.audit().await?;
    let (_, second) = client.audit().await?;
    assert_eq!(first, second);
    assert!(!first.is_converged());
    Ok(())
}

#[tokio::test]
async fn test_apply_converges() -> Result<()> {
    let (_mirror, client) = messy_setup()?;

    let (plan, report) = client.sync().await?;
    assert!(!report.has_failures(), "{report:?}");
    assert_eq!(report.len(), plan.total_operations());

    let (_, after) = client.audit().await?;
    assert!(after.to_download.is_empty(), "{after:?}");
    assert!(after.to_update.is_empty(), "{after:?}");
    assert!(after.to_delete.is_empty(), "{after:?}");
    assert!(after.to_disable.is_empty(), "{after:?}");
    assert!(after.is_converged());

    assert_eq!(
        client.files(),
        vec![
            "config/defaults.cfg",
            "core/engine-1.10.jar",
            "core/libs.zip",
            "mods/jei.jar",
            "mods/minimap-3.0.jar",
            "mods/shaders.jar.disabled",
            "options.txt",
            "saves/world/level.dat",
        ]
    );
    assert_eq!(client.read("config/defaults.cfg"), Some(b"defaults".to_vec()));
    assert_eq!(client.read("mods/jei.jar"), Some(b"jei".to_vec()));

    // A second run has nothing left to do
    let (second_plan, second_report) = client.sync().await?;
    assert!(second_plan.is_converged());
    assert!(second_report.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_dependency_cascades_converge_in_one_sync() -> Result<()> {
    let mut mirror = MirrorFixture::new()?;
    mirror
        .optional("mods/a.jar", "a", &["mods/b.jar"], &[])?
        .optional("mods/b.jar", "b", &["mods/c.jar"], &[])?
        .optional("mods/c.jar", "c", &[], &[])?
        .optional("mods/addon.jar", "addon", &["mods/lib.jar"], &[])?;
    mirror.required("config/a.json", "json")?.required("config/a.toml", "toml")?;
    mirror.publish("1")?;

    let client = Client::new(&[mirror.endpoint()])?;
    client.write("mods/a.jar", "a")?;
    client.write("mods/b.jar", "b")?; // mods/c.jar is not installed
    client.write("mods/addon.jar", "addon")?;
    client.write("mods/lib.jar", "lib")?; // unknown to the manifest, so swept
    client.write("config/a.toml", "toml")?;

    let (plan, report) = client.sync().await?;
    assert!(!report.has_failures(), "{report:?}");
    assert_eq!(plan.to_disable, vec!["mods/a.jar", "mods/addon.jar", "mods/b.jar"]);
    assert_eq!(plan.to_delete, vec!["mods/lib.jar"]);

    let (_, after) = client.audit().await?;
    assert!(after.is_converged(), "{after:?}");
    assert_eq!(
        client.files(),
        vec![
            "config/a.json",
            "config/a.toml",
            "mods/a.jar.disabled",
            "mods/addon.jar.disabled",
            "mods/b.jar.disabled",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_ignored_paths_never_mutated() -> Result<()> {
    let mut mirror = MirrorFixture::new()?;
    mirror
        .required("saves/world/level.dat", "server world")?
        .required("options.txt", "server options")?
        .required("core/engine.jar", "engine")?;
    mirror.publish("1")?;

    let client = Client::new(&[mirror.endpoint()])?.with_ignore(&["saves/", "options.txt", "screenshots/**"]);
    client.write("saves/world/level.dat", "my world")?;
    client.write("saves/world/region/r.0.0.mca", "region")?;
    client.write("screenshots/2024-01-01.png", "png")?;

    let (_, plan) = client.audit().await?;
    let ignored = ["saves/world/level.dat", "saves/world/region/r.0.0.mca", "screenshots/2024-01-01.png", "options.txt"];
    for path in ignored {
        assert!(!plan.to_delete.iter().any(|p| p == path), "{path} planned for delete");
        assert!(!plan.to_download.iter().any(|e| e.path == path), "{path} planned for download");
        assert!(!plan.to_update.iter().any(|e| e.path == path), "{path} planned for update");
    }

    client.sync().await?;
    assert_eq!(client.read("saves/world/level.dat"), Some(b"my world".to_vec()));
    assert!(client.exists("screenshots/2024-01-01.png"));
    assert!(!client.exists("options.txt"));
    assert!(client.exists("core/engine.jar"));
    Ok(())
}

#[test]
fn test_canonical_entry_dominates_its_stem() {
    let entries: Vec<FileEntry> = [
        "mods/jei-1.9.jar",
        "mods/jei-1.10.jar",
        "mods/jei-1.10-beta.jar",
        "mods/jei.jar",
        "mods/JEI_v2.jar",
        "mods/jeitweaks-0.3.jar",
        "core/jei-5.jar",
    ]
    .into_iter()
    .map(|path| entry(path, path))
    .collect();

    let canonical = version::resolve(&entries);

    for (stem, chosen) in &canonical {
        let siblings: Vec<&FileEntry> = entries.iter().filter(|e| version::stem(&e.path) == *stem).collect();
        let chosen_version = version::ParsedName::parse(&chosen.path).version.unwrap_or_default();
        for sibling in siblings {
            let sibling_version = version::ParsedName::parse(&sibling.path).version.unwrap_or_default();
            assert_ne!(
                VersionComparator::compare(&chosen_version, &sibling_version),
                Ordering::Less,
                "{} chosen over newer {}",
                chosen.path,
                sibling.path
            );
        }
    }

    // Exactly one canonical entry per stem, whatever the input order
    let mut reversed = entries.clone();
    reversed.reverse();
    let again = version::resolve(&reversed);
    assert_eq!(canonical.len(), again.len());
    for (stem, chosen) in &canonical {
        assert_eq!(chosen.path, again[stem].path);
    }
    assert_eq!(canonical["mods/jei"].path, "mods/JEI_v2.jar");
    assert_eq!(canonical["core/jei"].path, "core/jei-5.jar");
    assert_eq!(canonical["mods/jeitweaks"].path, "mods/jeitweaks-0.3.jar");
}

#[test]
fn test_extensions_never_collapse_into_one_stem() {
    let entries: Vec<FileEntry> = ["config/a.json", "config/a.toml", "config/a.cfg", "packs/faithful-1.0.zip", "packs/faithful-2.0.zip"]
        .into_iter()
        .map(|path| entry(path, path))
        .collect();

    let canonical = version::resolve(&entries);
    assert_eq!(canonical.len(), 4);
    assert_eq!(canonical["config/a.json"].path, "config/a.json");
    assert_eq!(canonical["config/a.toml"].path, "config/a.toml");
    assert_eq!(canonical["packs/faithful.zip"].path, "packs/faithful-2.0.zip");
}
