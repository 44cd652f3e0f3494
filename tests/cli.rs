use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let sandbox = Self {
            dir: TempDir::new().unwrap(),
        };
        fs::create_dir_all(sandbox.cache()).unwrap();
        sandbox
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn cache(&self) -> PathBuf {
        self.path("cache")
    }

    /// Config file pointing the codecs at shell scripts (or at nothing).
    fn config(&self, extractor: Option<&str>, injector: Option<&str>) -> PathBuf {
        let codec = |name: &str, body: Option<&str>| match body {
            Some(body) => {
                let script = self.path(&format!("{}.sh", name));
                fs::write(&script, body).unwrap();
                format!(
                    "[codecs.{}]\nprogram = \"/bin/sh\"\nargs = [\"{}\"]\n",
                    name,
                    script.display()
                )
            }
            None => format!(
                "[codecs.{}]\nprogram = \"{}\"\n",
                name,
                self.path(&format!("missing-{}", name)).display()
            ),
        };

        let content = format!(
            "[cache]\ndirectory = \"{}\"\n\n[codecs]\ntimeout = 5\n\n{}\n{}",
            self.cache().display(),
            codec("extractor", extractor),
            codec("injector", injector),
        );
        let path = self.path("rizombridge.toml");
        fs::write(&path, content).unwrap();
        path
    }

    fn extend_config(&self, config: &Path, extra: &str) {
        let mut content = fs::read_to_string(config).unwrap();
        content.push('\n');
        content.push_str(extra);
        fs::write(config, content).unwrap();
    }

    fn cmd(&self, config: &Path) -> Command {
        let mut cmd = Command::cargo_bin("rizombridge").unwrap();
        cmd.current_dir(self.dir.path())
            .arg("--config")
            .arg(config)
            .arg("--output-format")
            .arg("plain");
        cmd
    }
}

fn binary_fbx() -> Vec<u8> {
    let mut header = b"Kaydara FBX Binary  \0".to_vec();
    header.extend_from_slice(&[0x1A, 0x00]);
    header.extend_from_slice(&7500u32.to_le_bytes());
    header
}

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("rizombridge")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("import"))
        .stdout(predicate::str::contains("export"))
        .stdout(predicate::str::contains("cache"));
}

#[cfg(unix)]
#[test]
fn import_writes_cache_entry() {
    let sandbox = Sandbox::new();
    let config = sandbox.config(Some(": > \"$2\"\n"), None);
    fs::write(sandbox.path("crate.fbx"), binary_fbx()).unwrap();

    sandbox
        .cmd(&config)
        .arg("import")
        .arg(sandbox.path("crate.fbx"))
        .assert()
        .code(0)
        .stdout(predicate::str::contains("STATUS: SUCCESS"));

    assert!(sandbox.cache().join("crate.dat").is_file());

    sandbox
        .cmd(&config)
        .args(["cache", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("crate.fbx\t0\t"));
}

#[test]
fn import_without_extractor_is_cancelled() {
    let sandbox = Sandbox::new();
    let config = sandbox.config(None, None);
    fs::write(sandbox.path("crate.fbx"), binary_fbx()).unwrap();

    sandbox
        .cmd(&config)
        .arg("import")
        .arg(sandbox.path("crate.fbx"))
        .assert()
        .code(3)
        .stdout(predicate::str::contains("Extractor not found"));
}

#[test]
fn import_missing_source_is_invalid_path() {
    let sandbox = Sandbox::new();
    let config = sandbox.config(None, None);

    sandbox
        .cmd(&config)
        .arg("import")
        .arg(sandbox.path("nope.fbx"))
        .assert()
        .code(4);
}

#[test]
fn export_with_missing_injector_keeps_plain_container() {
    let sandbox = Sandbox::new();
    let config = sandbox.config(None, None);
    fs::write(sandbox.path("staged.fbx"), b"plain export").unwrap();
    fs::write(sandbox.cache().join("out.dat"), b"").unwrap();

    sandbox
        .cmd(&config)
        .arg("export")
        .arg(sandbox.path("out.fbx"))
        .arg("--from")
        .arg(sandbox.path("staged.fbx"))
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Injector not found"));

    assert_eq!(fs::read(sandbox.path("out.fbx")).unwrap(), b"plain export");
    assert!(!sandbox.path("out.fbx.temp.fbx").exists());
}

#[cfg(unix)]
#[test]
fn export_injects_selected_cache() {
    let sandbox = Sandbox::new();
    let config = sandbox.config(None, Some("{ cat \"$1\"; cat \"$2\"; } > \"$3\"\n"));
    fs::write(sandbox.path("staged.fbx"), b"plain|").unwrap();
    fs::write(sandbox.cache().join("barrel.dat"), b"").unwrap();

    sandbox
        .cmd(&config)
        .arg("export")
        .arg(sandbox.path("out.fbx"))
        .arg("--from")
        .arg(sandbox.path("staged.fbx"))
        .args(["--cache", "barrel.fbx"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Injected: true"));

    assert_eq!(fs::read(sandbox.path("out.fbx")).unwrap(), b"plain|");
}

#[test]
fn export_with_unknown_cache_fails_before_writing() {
    let sandbox = Sandbox::new();
    let config = sandbox.config(None, None);
    fs::write(sandbox.path("staged.fbx"), b"plain").unwrap();

    sandbox
        .cmd(&config)
        .arg("export")
        .arg(sandbox.path("out.fbx"))
        .arg("--from")
        .arg(sandbox.path("staged.fbx"))
        .args(["--cache", "ghost.fbx"])
        .assert()
        .code(6)
        .stderr(predicate::str::contains("ghost.fbx"));

    assert!(!sandbox.path("out.fbx").exists());
}

#[test]
fn export_without_staged_container_is_host_failure() {
    let sandbox = Sandbox::new();
    let config = sandbox.config(None, None);

    sandbox
        .cmd(&config)
        .arg("export")
        .arg(sandbox.path("out.fbx"))
        .arg("--no-inject")
        .assert()
        .code(5);

    assert!(!sandbox.path("out.fbx").exists());
    assert!(!sandbox.path("out.fbx.temp.fbx").exists());
}

#[test]
fn export_with_missing_host_program_is_host_failure() {
    let sandbox = Sandbox::new();
    let config = sandbox.config(None, None);
    sandbox.extend_config(
        &config,
        "[host]\nexport_command = [\"/nonexistent/blender\", \"{path}\"]\n",
    );

    sandbox
        .cmd(&config)
        .arg("export")
        .arg(sandbox.path("out.fbx"))
        .arg("--no-inject")
        .assert()
        .code(5)
        .stderr(predicate::str::contains("/nonexistent/blender"));

    assert!(!sandbox.path("out.fbx").exists());
}

#[test]
fn export_ignores_cache_selector_when_injection_disabled() {
    let sandbox = Sandbox::new();
    let config = sandbox.config(None, None);
    sandbox.extend_config(&config, "[export]\ninject = false\n");
    fs::write(sandbox.path("staged.fbx"), b"plain").unwrap();

    sandbox
        .cmd(&config)
        .arg("export")
        .arg(sandbox.path("out.fbx"))
        .arg("--from")
        .arg(sandbox.path("staged.fbx"))
        .args(["--cache", "ghost.fbx"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Ignoring --cache ghost.fbx"));

    assert_eq!(fs::read(sandbox.path("out.fbx")).unwrap(), b"plain");
}

#[cfg(unix)]
#[test]
fn export_all_overrides_configured_scope() {
    let sandbox = Sandbox::new();
    let config = sandbox.config(None, None);
    sandbox.extend_config(
        &config,
        r#"[export]
scope = "selected"

[host]
export_command = ["/bin/sh", "-c", "printf '%s' \"$2\" > \"$1\"", "host", "{path}", "{scope}"]
"#,
    );

    sandbox
        .cmd(&config)
        .arg("export")
        .arg(sandbox.path("out.fbx"))
        .args(["--no-inject", "--all"])
        .assert()
        .code(0);
    assert_eq!(fs::read_to_string(sandbox.path("out.fbx")).unwrap(), "all");

    sandbox
        .cmd(&config)
        .arg("export")
        .arg(sandbox.path("out.fbx"))
        .arg("--no-inject")
        .assert()
        .code(0);
    assert_eq!(fs::read_to_string(sandbox.path("out.fbx")).unwrap(), "selected");
}

#[test]
fn cache_path_and_delete() {
    let sandbox = Sandbox::new();
    let config = sandbox.config(None, None);
    fs::write(sandbox.cache().join("crate.dat"), b"").unwrap();

    sandbox
        .cmd(&config)
        .args(["cache", "path", "/scenes/crate.fbx"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            sandbox.cache().join("crate.dat").display().to_string(),
        ));

    sandbox
        .cmd(&config)
        .args(["cache", "delete", "crate.dat"])
        .assert()
        .success();
    assert!(!sandbox.cache().join("crate.dat").exists());

    sandbox
        .cmd(&config)
        .args(["cache", "delete", "crate.dat"])
        .assert()
        .code(1);
}

#[test]
fn cache_clear_requires_confirmation_off_terminal() {
    let sandbox = Sandbox::new();
    let config = sandbox.config(None, None);
    fs::write(sandbox.cache().join("a.dat"), b"").unwrap();
    fs::write(sandbox.cache().join("b.dat"), b"").unwrap();

    sandbox
        .cmd(&config)
        .args(["cache", "clear"])
        .write_stdin("y\n")
        .assert()
        .code(1);
    assert!(sandbox.cache().join("a.dat").exists());

    sandbox
        .cmd(&config)
        .args(["cache", "clear", "--yes"])
        .assert()
        .code(0);
    assert!(!sandbox.cache().join("a.dat").exists());
    assert!(!sandbox.cache().join("b.dat").exists());
}

#[test]
fn cache_list_as_json() {
    let sandbox = Sandbox::new();
    let config = sandbox.config(None, None);
    fs::write(sandbox.cache().join("crate.dat"), b"1234").unwrap();

    let output = Command::cargo_bin("rizombridge")
        .unwrap()
        .current_dir(sandbox.dir.path())
        .arg("--config")
        .arg(&config)
        .args(["--output-format", "json", "cache", "list"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["type"], "cache_list");
    assert_eq!(json["entries"][0]["source_base_name"], "crate");
    assert_eq!(json["entries"][0]["size_bytes"], 4);
}

#[test]
fn init_config_writes_sample() {
    let sandbox = Sandbox::new();

    Command::cargo_bin("rizombridge")
        .unwrap()
        .current_dir(sandbox.dir.path())
        .args(["init-config", "sample.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sample.toml"));

    let content = fs::read_to_string(sandbox.path("sample.toml")).unwrap();
    assert!(content.contains("[cache]"));
}

#[test]
fn invalid_config_is_reported() {
    let sandbox = Sandbox::new();
    let config = sandbox.path("broken.toml");
    fs::write(&config, "[codecs]\ntimeout = \"soon\"\n").unwrap();

    sandbox
        .cmd(&config)
        .args(["cache", "list"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));
}
