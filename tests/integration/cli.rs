//! The `modsync` binary against `file://` mirrors.

use assert_cmd::Command;
use modsync_cli::config::SyncConfig;
use modsync_cli::manifest::Manifest;
use modsync_cli::test_utils::{MirrorFixture, file_url, list_files, write_file};
use predicates::prelude::*;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use tempfile::TempDir;

/// An isolated client: its own config, cache and game directory.
struct Harness {
    home: TempDir,
    game: TempDir,
}

impl Harness {
    fn new(endpoints: &[String]) -> Self {
        Self::with_config(SyncConfig {
            endpoints: endpoints.to_vec(),
            ..SyncConfig::default()
        })
    }

    fn with_config(mut config: SyncConfig) -> Self {
        let home = TempDir::new().unwrap();
        let game = TempDir::new().unwrap();
        config.cache_path = Some(home.path().join("hash-cache.json").display().to_string());
        config.manifest_backoff_ms = 1;
        config.attempt_timeout_secs = 10;
        std::fs::write(home.path().join("config.toml"), toml::to_string(&config).unwrap()).unwrap();
        Self {
            home,
            game,
        }
    }

    fn config_path(&self) -> PathBuf {
        self.home.path().join("config.toml")
    }

    fn cache_path(&self) -> PathBuf {
        self.home.path().join("hash-cache.json")
    }

    fn game(&self) -> &Path {
        self.game.path()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("modsync").unwrap();
        cmd.arg("--config")
            .arg(self.config_path())
            .arg("--no-progress")
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .env_remove("MODSYNC_CONFIG");
        cmd
    }
}

fn simple_mirror() -> MirrorFixture {
    let mut mirror = MirrorFixture::new().unwrap();
    mirror.required("core/engine.jar", "engine").unwrap();
    mirror.optional("mods/minimap.jar", "minimap", &[], &[]).unwrap();
    mirror.publish("7").unwrap();
    mirror
}

#[test]
fn test_audit_json_is_read_only() {
    let mirror = simple_mirror();
    let harness = Harness::new(&[mirror.endpoint()]);

    let output = harness.cmd().arg("audit").arg(harness.game()).arg("--json").assert().success();
    let json: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();

    assert_eq!(json["formatVersion"], "7");
    assert_eq!(json["plan"]["toDownload"][0]["path"], "core/engine.jar");
    assert_eq!(json["plan"]["skipped"][0], "mods/minimap.jar");
    assert!(list_files(harness.game()).is_empty());
}

#[test]
fn test_sync_then_audit_reports_up_to_date() {
    let mirror = simple_mirror();
    let harness = Harness::new(&[mirror.endpoint()]);
    write_file(harness.game(), "mods/stray.jar", "stray").unwrap();

    harness.cmd().arg("sync").arg(harness.game()).arg("--dry-run").assert().success().stdout(
        predicate::str::contains("download").and(predicate::str::contains("core/engine.jar")),
    );
    assert_eq!(list_files(harness.game()), vec!["mods/stray.jar"]);

    harness.cmd().arg("sync").arg(harness.game()).assert().success();
    assert_eq!(list_files(harness.game()), vec!["core/engine.jar"]);
    assert!(harness.cache_path().exists());

    harness
        .cmd()
        .arg("audit")
        .arg(harness.game())
        .assert()
        .success()
        .stdout(predicate::str::contains("1 files up to date"));
}

#[test]
fn test_sync_failure_exits_nonzero() {
    let mirror = simple_mirror();
    mirror.corrupt("core/engine.jar", "not the engine").unwrap();
    let harness = Harness::new(&[mirror.endpoint()]);

    harness
        .cmd()
        .arg("sync")
        .arg(harness.game())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("core/engine.jar").and(predicate::str::contains("Sync incomplete")));
    assert!(list_files(harness.game()).is_empty());
}

#[test]
fn test_unreachable_mirrors_fail_before_touching_tree() {
    let empty = TempDir::new().unwrap();
    let harness = Harness::new(&[file_url(empty.path())]);
    write_file(harness.game(), "mods/stray.jar", "stray").unwrap();

    harness
        .cmd()
        .arg("sync")
        .arg(harness.game())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Manifest unavailable"));
    assert_eq!(list_files(harness.game()), vec!["mods/stray.jar"]);
}

#[test]
fn test_endpoint_flag_overrides_config() {
    let mirror = simple_mirror();
    let empty = TempDir::new().unwrap();
    let harness = Harness::new(&[file_url(empty.path())]);

    harness
        .cmd()
        .arg("sync")
        .arg(harness.game())
        .arg("--endpoint")
        .arg(mirror.endpoint())
        .assert()
        .success();
    assert_eq!(list_files(harness.game()), vec!["core/engine.jar"]);
}

#[test]
fn test_toggle_disable_and_enable() {
    let mirror = simple_mirror();
    let harness = Harness::new(&[mirror.endpoint()]);
    write_file(harness.game(), "mods/minimap.jar", "minimap").unwrap();

    harness
        .cmd()
        .args(["toggle"])
        .arg(harness.game())
        .args(["mods/minimap.jar", "--disable", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("disable"));
    assert_eq!(list_files(harness.game()), vec!["mods/minimap.jar"]);

    harness.cmd().arg("toggle").arg(harness.game()).args(["mods/minimap.jar", "--disable"]).assert().success();
    assert_eq!(list_files(harness.game()), vec!["mods/minimap.jar.disabled"]);

    harness.cmd().arg("toggle").arg(harness.game()).args(["mods/minimap.jar", "--enable"]).assert().success();
    assert_eq!(list_files(harness.game()), vec!["mods/minimap.jar"]);
}

#[test]
fn test_toggle_enable_downloads_missing_dependency() {
    let mut mirror = MirrorFixture::new().unwrap();
    mirror.optional("mods/base.jar", "base", &[], &[]).unwrap();
    mirror.optional("mods/addon.jar", "addon", &["mods/base.jar"], &[]).unwrap();
    mirror.publish("1").unwrap();
    let harness = Harness::new(&[mirror.endpoint()]);
    write_file(harness.game(), "mods/addon.jar.disabled", "addon").unwrap();

    harness.cmd().arg("toggle").arg(harness.game()).args(["mods/addon.jar", "--enable"]).assert().success();

    assert_eq!(list_files(harness.game()), vec!["mods/addon.jar", "mods/base.jar"]);
    assert_eq!(std::fs::read(harness.game().join("mods/base.jar")).unwrap(), b"base");
}

#[test]
fn test_toggle_unknown_component_suggests_closest() {
    let mirror = simple_mirror();
    let harness = Harness::new(&[mirror.endpoint()]);

    harness
        .cmd()
        .arg("toggle")
        .arg(harness.game())
        .args(["mods/minimapp.jar", "--enable"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Did you mean 'mods/minimap.jar'?"));
}

#[test]
fn test_manifest_build_round_trips() {
    let server = TempDir::new().unwrap();
    write_file(server.path(), "core/engine.jar", "engine").unwrap();
    write_file(server.path(), "core/libs/lwjgl-3.3.jar", "lwjgl").unwrap();
    write_file(server.path(), "extras/mods/minimap.jar", "minimap").unwrap();
    let out = server.path().join("launcher/manifest");

    let harness = Harness::new(&["http://unused".to_string()]);
    harness
        .cmd()
        .args(["manifest", "build", "--format-version", "3"])
        .arg("--required")
        .arg(server.path().join("core"))
        .arg("--optional")
        .arg(server.path().join("extras"))
        .arg("-o")
        .arg(&out)
        .assert()
        .success();

    let manifest = Manifest::from_json(&std::fs::read(&out).unwrap(), "test").unwrap();
    assert_eq!(manifest.format_version, "3");
    let required: Vec<&str> = manifest.required_entries.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(required, vec!["engine.jar", "libs/lwjgl-3.3.jar"]);
    assert_eq!(manifest.required_entries[0].locator(), "files/engine.jar");
    assert_eq!(manifest.optional_entries[0].path, "mods/minimap.jar");

    let stdout = harness
        .cmd()
        .args(["manifest", "build", "--format-version", "3", "--locator-prefix", "dl/"])
        .arg("--required")
        .arg(server.path().join("core"))
        .assert()
        .success();
    let printed = Manifest::from_json(&stdout.get_output().stdout, "stdout").unwrap();
    assert_eq!(printed.required_entries[0].locator(), "dl/engine.jar");
    assert!(printed.optional_entries.is_empty());
}

#[test]
fn test_cache_show_and_clear() {
    let mirror = simple_mirror();
    let harness = Harness::new(&[mirror.endpoint()]);

    harness.cmd().args(["cache", "show"]).assert().success().stdout(predicate::str::contains("No cache yet"));

    harness.cmd().arg("sync").arg(harness.game()).assert().success();
    harness.cmd().args(["cache", "show"]).assert().success().stdout(predicate::str::contains("Entries: 1"));

    harness.cmd().args(["cache", "clear"]).assert().success();
    assert!(!harness.cache_path().exists());
    // Clearing twice is fine
    harness.cmd().args(["cache", "clear"]).assert().success();
}

/// Accept one HTTP request and hand back its raw text.
fn capture_one_request(listener: TcpListener) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let mut received = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let Ok(n) = stream.read(&mut buf) else { break };
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&received).to_string();
            if let Some(split) = text.find("\r\n\r\n") {
                let length = text[..split]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse::<usize>().ok())?
                    })
                    .unwrap_or(0);
                if received.len() >= split + 4 + length {
                    break;
                }
            }
        }
        let _ = stream.write_all(b"HTTP/1.1 204 No Content\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        let _ = tx.send(String::from_utf8_lossy(&received).to_string());
    });
    rx
}

#[test]
fn test_clean_sync_posts_notice() {
    let mirror = simple_mirror();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/notify", listener.local_addr().unwrap());
    let received = capture_one_request(listener);

    let harness = Harness::with_config(SyncConfig {
        endpoints: vec![mirror.endpoint()],
        notify_url: Some(url),
        ..SyncConfig::default()
    });
    harness
        .cmd()
        .env_remove("HTTP_PROXY")
        .env_remove("http_proxy")
        .env_remove("ALL_PROXY")
        .env_remove("all_proxy")
        .arg("sync")
        .arg(harness.game())
        .assert()
        .success();

    let request = received.recv_timeout(Duration::from_secs(10)).unwrap();
    assert!(request.starts_with("POST /notify"), "{request}");
    assert!(request.contains("\"formatVersion\":\"7\""), "{request}");
    assert!(!request.contains(&harness.game().display().to_string()));
}
