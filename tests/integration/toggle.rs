//! Component closures applied to a real tree.

use anyhow::Result;
use modsync_cli::core::ComponentState;
use modsync_cli::manifest::Manifest;
use modsync_cli::resolver::{ComponentGraph, ToggleRequest};
use modsync_cli::test_utils::{entry, list_files, write_file};
use modsync_cli::tree;
use tempfile::TempDir;

fn manifest() -> Result<Manifest> {
    Manifest::new(
        "1",
        vec![entry("core/engine.jar", "engine")],
        vec![
            entry("mods/optifine.jar", "optifine"),
            entry("mods/shaders.jar", "shaders").with_depends_on(["mods/optifine.jar"]),
            entry("mods/sodium.jar", "sodium").with_conflicts(["mods/optifine.jar"]),
        ],
    )
}

fn request(id: &str, desired_state: ComponentState) -> ToggleRequest {
    ToggleRequest {
        component_id: id.to_string(),
        desired_state,
    }
}

#[tokio::test]
async fn test_enable_pulls_dependencies_and_evicts_conflicts() -> Result<()> {
    let temp = TempDir::new()?;
    let root = temp.path();
    write_file(root, "core/engine.jar", "engine")?;
    write_file(root, "mods/optifine.jar.disabled", "optifine")?;
    write_file(root, "mods/shaders.jar.disabled", "shaders")?;
    write_file(root, "mods/sodium.jar", "sodium")?;

    let graph = ComponentGraph::from_manifest(&manifest()?)?;
    let states = tree::component_states(root, graph.components()).await?;
    let closure = graph.toggle(&request("mods/shaders.jar", ComponentState::Active), &states)?;

    assert_eq!(closure.enable, vec!["mods/optifine.jar", "mods/shaders.jar"]);
    assert_eq!(closure.disable, vec!["mods/sodium.jar"]);
    assert!(closure.is_satisfiable());

    tree::apply_closure(root, &closure).await?;
    assert_eq!(
        list_files(root),
        vec!["core/engine.jar", "mods/optifine.jar", "mods/shaders.jar", "mods/sodium.jar.disabled"]
    );

    // Re-resolving the same request is a no-op
    let states = tree::component_states(root, graph.components()).await?;
    let again = graph.toggle(&request("mods/shaders.jar", ComponentState::Active), &states)?;
    assert!(again.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_disable_takes_dependents_down_first() -> Result<()> {
    let temp = TempDir::new()?;
    let root = temp.path();
    write_file(root, "mods/optifine.jar", "optifine")?;
    write_file(root, "mods/shaders.jar", "shaders")?;

    let graph = ComponentGraph::from_manifest(&manifest()?)?;
    let states = tree::component_states(root, graph.components()).await?;
    let closure = graph.toggle(&request("mods/optifine.jar", ComponentState::Inactive), &states)?;

    assert_eq!(closure.disable, vec!["mods/shaders.jar", "mods/optifine.jar"]);
    assert!(closure.enable.is_empty());

    tree::apply_closure(root, &closure).await?;
    assert_eq!(list_files(root), vec!["mods/optifine.jar.disabled", "mods/shaders.jar.disabled"]);

    // Nothing is enabled behind the user's back, only hinted
    let states = tree::component_states(root, graph.components()).await?;
    assert!(graph.newly_satisfiable(&states).is_empty());
    tree::set_state(root, "mods/optifine.jar", ComponentState::Active).await?;
    let states = tree::component_states(root, graph.components()).await?;
    assert_eq!(graph.newly_satisfiable(&states), vec!["mods/shaders.jar"]);
    Ok(())
}

#[tokio::test]
async fn test_required_component_cannot_be_disabled() -> Result<()> {
    let temp = TempDir::new()?;
    write_file(temp.path(), "core/engine.jar", "engine")?;

    let graph = ComponentGraph::from_manifest(&manifest()?)?;
    let states = tree::component_states(temp.path(), graph.components()).await?;
    assert!(graph.toggle(&request("core/engine.jar", ComponentState::Inactive), &states).is_err());
    assert!(temp.path().join("core/engine.jar").exists());
    Ok(())
}

#[tokio::test]
async fn test_missing_dependency_reported() -> Result<()> {
    let temp = TempDir::new()?;
    write_file(temp.path(), "mods/shaders.jar.disabled", "shaders")?;

    let graph = ComponentGraph::from_manifest(&manifest()?)?;
    let states = tree::component_states(temp.path(), graph.components()).await?;
    let closure = graph.toggle(&request("mods/shaders.jar", ComponentState::Active), &states)?;

    assert_eq!(closure.missing, vec!["mods/optifine.jar"]);
    assert_eq!(closure.enable, vec!["mods/shaders.jar"]);
    assert!(!closure.is_satisfiable());
    Ok(())
}
