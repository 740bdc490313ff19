//! Integration tests for the storevault binary

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const KEY: &str = "integration-test-secret-0123456789abcdef";

/// Get a Command isolated to `base`
fn storevault(base: &Path) -> Command {
    let mut cmd = Command::cargo_bin("storevault").expect("Failed to find storevault binary");
    cmd.current_dir(base)
        .env("STOREVAULT_DATA_DIR", base)
        .env("RUST_LOG", "warn")
        .env_remove("STOREVAULT_BACKUP_KEY")
        .env_remove("STOREVAULT_DRIVE_TOKEN");
    cmd
}

/// Initialize, lower the Argon2 cost and write a customers table
fn initialized() -> TempDir {
    let temp = TempDir::new().unwrap();
    storevault(temp.path()).arg("init").assert().success();

    let config_path = temp.path().join("config.json");
    let mut config: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&config_path).unwrap()).unwrap();
    config["kdf"] = serde_json::json!({"memory_cost": 1024, "time_cost": 1, "parallelism": 1});
    std::fs::write(&config_path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    std::fs::write(
        temp.path().join("data").join("customers.json"),
        r#"[{"id": 1, "email": "ana@example.com"}, {"id": 2, "email": "ben@example.com"}]"#,
    )
    .unwrap();

    temp
}

#[test]
fn test_no_command_prints_hint() {
    let temp = TempDir::new().unwrap();
    storevault(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("storevault --help"));
}

#[test]
fn test_init_writes_settings() {
    let temp = TempDir::new().unwrap();
    storevault(temp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialization complete!"))
        .stdout(predicate::str::contains("customers"));

    assert!(temp.path().join("config.json").exists());
    assert!(temp.path().join("data").is_dir());
}

#[test]
fn test_status_without_key_reports_disabled() {
    let temp = TempDir::new().unwrap();
    storevault(temp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Encryption:    disabled"))
        .stdout(predicate::str::contains("Initialized:     No"));
}

#[test]
fn test_status_with_key_reports_enabled() {
    let temp = initialized();
    storevault(temp.path())
        .arg("status")
        .env("STOREVAULT_BACKUP_KEY", KEY)
        .assert()
        .success()
        .stdout(predicate::str::contains("enabled (aes-256-gcm)"));
}

#[test]
fn test_create_list_and_inspect() {
    let temp = initialized();

    storevault(temp.path())
        .args(["backup", "create"])
        .env("STOREVAULT_BACKUP_KEY", KEY)
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup Created"))
        .stdout(predicate::str::contains(".encrypted.json"))
        .stdout(predicate::str::contains("Encrypted: Yes"));

    storevault(temp.path())
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("encrypted"))
        .stdout(predicate::str::contains("Total: 1 backup(s)"));

    storevault(temp.path())
        .args(["backup", "inspect", "latest"])
        .env("STOREVAULT_BACKUP_KEY", KEY)
        .assert()
        .success()
        .stdout(predicate::str::contains("customers"))
        .stdout(predicate::str::contains(
            "Validated 1 table(s), 2 record(s) (encrypted, envelope v2)",
        ));
}

#[test]
fn test_inspect_with_wrong_key_fails() {
    let temp = initialized();

    storevault(temp.path())
        .args(["backup", "create"])
        .env("STOREVAULT_BACKUP_KEY", KEY)
        .assert()
        .success();

    storevault(temp.path())
        .args(["backup", "inspect", "latest"])
        .env("STOREVAULT_BACKUP_KEY", "a-completely-different-secret-value-0000")
        .assert()
        .failure()
        .stderr(predicate::str::contains("encryption key"));
}

#[test]
fn test_plaintext_backup_without_key() {
    let temp = initialized();

    storevault(temp.path())
        .args(["backup", "create"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Encrypted: No"));

    storevault(temp.path())
        .args(["backup", "restore", "latest"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(plaintext)"));
}

#[test]
fn test_prune_requires_force() {
    let temp = initialized();
    for _ in 0..2 {
        storevault(temp.path())
            .args(["backup", "create", "--no-encrypt"])
            .assert()
            .success();
        std::thread::sleep(std::time::Duration::from_millis(20));
    }

    storevault(temp.path())
        .args(["backup", "prune", "--keep", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--force"));

    storevault(temp.path())
        .args(["backup", "prune", "--keep", "1", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 1 backup(s)."));

    storevault(temp.path())
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total: 1 backup(s)"));
}

#[test]
fn test_inspect_latest_with_no_backups() {
    let temp = initialized();
    storevault(temp.path())
        .args(["backup", "inspect", "latest"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Backup not found: latest"));
}
