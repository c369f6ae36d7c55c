//! CLI integration tests for lyceum admin commands.
//!
//! Each test uses an isolated temp directory for the data dir, so tests can
//! run in parallel.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::Path;

use assert_cmd::Command;
use assert_fs::TempDir;
use predicates::prelude::*;

use lyceum::auth::PasswordHasher;
use lyceum::config::{CONFIG_FILE_NAME, ServerConfig};
use lyceum::store::{SqliteStore, Store};
use lyceum::types::Role;

const EMAIL: &str = "Director@School.ro";
const PASSWORD: &str = "initial-password";

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("lyceum").expect("failed to find binary");
        cmd.env("NO_COLOR", "1");
        cmd
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        self.cmd()
            .args([
                "admin",
                "init",
                "--data-dir",
                &self.data_dir_str(),
                "--non-interactive",
                "--email",
                EMAIL,
                "--password",
                PASSWORD,
            ])
            .assert()
    }

    fn config(&self) -> ServerConfig {
        ServerConfig::load(&self.data_dir().join(CONFIG_FILE_NAME)).expect("load config")
    }

    fn store(&self) -> SqliteStore {
        SqliteStore::new(self.config().db_path()).expect("open store")
    }
}

#[test]
fn test_init_creates_config_and_admin() {
    let ctx = TestContext::new();

    ctx.init()
        .success()
        .stdout(predicate::str::contains("Created admin 'director@school.ro'"));

    let config = ctx.config();
    config.validate().expect("generated config is valid");
    assert_eq!(config.jwt_secret.len(), 64);
    assert!(config.media_dir().is_dir());

    let store = ctx.store();
    let admin = store
        .get_user_by_email("director@school.ro")
        .unwrap()
        .expect("admin exists");
    assert!(PasswordHasher::new().verify(PASSWORD, &admin.password_hash));
    assert_eq!(store.list_user_roles(&admin.id).unwrap(), vec![Role::Admin]);

    let admin_group = store
        .get_system_group("Role: ADMIN")
        .unwrap()
        .expect("role group exists");
    assert!(store.get_group_member(&admin_group.id, &admin.id).unwrap().is_some());
    for name in ["Role: TEACHER", "Role: STUDENT"] {
        assert!(store.get_system_group(name).unwrap().is_some());
    }
}

#[cfg(unix)]
#[test]
fn test_init_restricts_config_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let ctx = TestContext::new();
    ctx.init().success();

    let mode = std::fs::metadata(ctx.data_dir().join(CONFIG_FILE_NAME))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_init_twice_fails() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.init()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn test_init_non_interactive_requires_credentials() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args([
            "admin",
            "init",
            "--data-dir",
            &ctx.data_dir_str(),
            "--non-interactive",
            "--password",
            PASSWORD,
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "--email and --password are required",
        ));

    assert!(!ctx.data_dir().join(CONFIG_FILE_NAME).exists());
}

#[test]
fn test_init_rejects_short_password() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args([
            "admin",
            "init",
            "--data-dir",
            &ctx.data_dir_str(),
            "--non-interactive",
            "--email",
            EMAIL,
            "--password",
            "short",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 8 characters"));

    assert!(!ctx.data_dir().join(CONFIG_FILE_NAME).exists());
}

#[test]
fn test_serve_requires_init() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args(["serve", "--data-dir", &ctx.data_dir_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Run 'lyceum admin init' first"));
}
