//! End-to-end tests of the `chomp` binary.
//!
//! Every test gets its own HOME, cache and remote store. Stdout is a pipe,
//! so output is JSON.

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn chomp(&self) -> Command {
        let mut cmd = Command::cargo_bin("chomp").unwrap();
        cmd.env("HOME", self.dir.path())
            .env_remove("CHOMP_TEST_DB")
            .env_remove("CHEAPCHOMP_DB")
            .env_remove("CHEAPCHOMP_REMOTE")
            .env_remove("CHOMP_PASSWORD")
            .env_remove("RUST_LOG")
            .arg("--db")
            .arg(self.dir.path().join("cache.db"))
            .arg("--remote")
            .arg(self.dir.path().join("remote.db"));
        cmd
    }

    fn json(&self, args: &[&str]) -> Value {
        let output = self.chomp().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "chomp {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }

    fn register(&self) {
        self.json(&["register", "shopper@example.com", "--password", "hunter22"]);
    }
}

#[test]
fn version_reports_package_version() {
    let env = Env::new();
    let out = env.json(&["version"]);
    assert_eq!(out["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(out["schema_version"], 4);
}

#[test]
fn commands_require_sign_in() {
    let env = Env::new();
    env.chomp().args(["list"]).assert().failure().code(3);
}

#[test]
fn register_then_whoami() {
    let env = Env::new();
    env.register();

    let out = env.json(&["whoami"]);
    assert_eq!(out["email"], "shopper@example.com");
    assert_eq!(out["mode"], "online");
    assert_eq!(out["pending_sync"], 0);
}

#[test]
fn register_rejects_mismatched_confirmation() {
    let env = Env::new();
    env.chomp()
        .args(["register", "shopper@example.com", "--password", "hunter22", "--confirm", "hunter23"])
        .assert()
        .failure()
        .code(4);
}

#[test]
fn login_with_wrong_password_fails() {
    let env = Env::new();
    env.register();
    env.json(&["logout"]);

    env.chomp()
        .args(["login", "shopper@example.com", "--password", "wrong-pass"])
        .assert()
        .failure()
        .code(5);

    let out = env.json(&["login", "shopper@example.com", "--password", "hunter22"]);
    assert_eq!(out["email"], "shopper@example.com");
}

#[test]
fn add_without_store_is_rejected() {
    let env = Env::new();
    env.register();
    env.chomp().args(["add", "Milk", "3.49"]).assert().failure().code(4);
}

#[test]
fn online_add_accumulates_quantity() {
    let env = Env::new();
    env.register();

    env.json(&["add", "Milk", "3.49", "--store", "s1"]);
    let out = env.json(&["add", "Milk", "3.49", "--store", "s1", "--qty", "2"]);
    assert_eq!(out["quantity"], 3);

    let list = env.json(&["list"]);
    assert_eq!(list["count"], 1);
    assert_eq!(list["items"][0]["quantity"], 3);
    assert_eq!(list["total"], 10.47);
}

#[test]
fn offline_changes_sync_when_going_online() {
    let env = Env::new();
    env.register();

    env.json(&["mode", "offline"]);
    let out = env.json(&["add", "Eggs", "2.00", "--store", "s1"]);
    assert_eq!(out["pending"], true);

    let list = env.json(&["list"]);
    assert_eq!(list["mode"], "offline");
    assert_eq!(list["items"][0]["pending"], true);

    let status = env.json(&["sync", "status"]);
    assert_eq!(status["pending"], 1);
    assert_eq!(status["pending_items"][0]["action"], "add");

    let out = env.json(&["mode", "online"]);
    assert_eq!(out["mode"], "online");
    assert_eq!(out["sync"]["stats"]["inserted"], 1);

    let list = env.json(&["list"]);
    assert_eq!(list["count"], 1);
    assert_eq!(list["items"][0]["name"], "Eggs");
    assert_eq!(list["items"][0]["pending"], false);

    let status = env.json(&["sync", "status"]);
    assert_eq!(status["pending"], 0);
}

#[test]
fn delete_and_undo() {
    let env = Env::new();
    env.register();
    env.json(&["add", "Bread", "2.79", "--store", "s1", "--qty", "2"]);

    let list = env.json(&["list"]);
    let id = list["items"][0]["id"].as_str().unwrap().to_string();

    env.json(&["delete", id.as_str()]);
    assert_eq!(env.json(&["list"])["count"], 0);

    let out = env.json(&["undo"]);
    assert_eq!(out["restored"]["name"], "Bread");
    let list = env.json(&["list"]);
    assert_eq!(list["items"][0]["quantity"], 2);

    let out = env.json(&["undo"]);
    assert!(out["restored"].is_null());
}

#[test]
fn check_records_expense() {
    let env = Env::new();
    env.register();
    env.json(&["add", "Cheese", "4.25", "--store", "s1"]);
    let id = env.json(&["list"])["items"][0]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let out = env.json(&["check", id.as_str()]);
    assert_eq!(out["amount"], 4.25);

    let expenses = env.json(&["expenses"]);
    assert_eq!(expenses["total"], 4.25);
    assert_eq!(expenses["months"].as_array().unwrap().len(), 12);
}

#[test]
fn favorites_and_cache() {
    let env = Env::new();
    env.register();
    env.json(&["fav", "add", "Jam", "3.00", "--store", "s1"]);

    let favs = env.json(&["fav", "list"]);
    assert_eq!(favs["count"], 1);
    assert_eq!(favs["items"][0]["name"], "Jam");

    // Favorites survive a cache clear
    let out = env.json(&["cache", "clear"]);
    assert_eq!(out["removed"], 0);
    assert_eq!(env.json(&["cache", "list"])["count"], 1);

    env.json(&["fav", "remove", "Jam"]);
    assert_eq!(env.json(&["fav", "list"])["count"], 0);
    assert_eq!(env.json(&["cache", "clear"])["removed"], 1);
}

#[test]
fn sync_run_with_nothing_pending() {
    let env = Env::new();
    let out = env.json(&["sync", "run"]);
    assert_eq!(out["outcome"]["status"], "success");
    assert_eq!(out["stats"]["pending"], 0);
}

#[test]
fn completions_generate() {
    let env = Env::new();
    let output = env.chomp().args(["completions", "bash"]).output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("chomp"));
}
