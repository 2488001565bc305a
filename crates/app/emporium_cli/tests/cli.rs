use assert_cmd::Command;
use predicates::prelude::*;

const SECRET: &str = "cli-test-secret";

fn emporium() -> Command {
    let mut cmd = Command::cargo_bin("emporium").unwrap();
    cmd.env("JWT_SECRET", SECRET).env_remove("AUTH_SECRET");
    cmd
}

fn issue(args: &[&str]) -> String {
    let out = emporium()
        .args(["token", "issue"])
        .args(args)
        .output()
        .unwrap();
    assert!(out.status.success());
    String::from_utf8(out.stdout).unwrap().trim().to_string()
}

#[test]
fn version_prints_name_and_version() {
    emporium()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("emporium_cli "));
}

#[test]
fn issued_token_verifies() {
    let token = issue(&["user-7"]);
    assert_eq!(token.split('.').count(), 3);

    emporium()
        .args(["token", "verify", &token])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"user_id\": \"user-7\""))
        .stdout(predicate::str::contains("\"token_type\": \"access\""));
}

#[test]
fn refresh_kind_is_carried() {
    let token = issue(&["user-7", "--kind", "refresh", "--ttl", "120"]);
    emporium()
        .args(["token", "inspect", &token])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"token_type\": \"refresh\""));
}

#[test]
fn verify_with_other_secret_fails() {
    let token = issue(&["user-7"]);
    emporium()
        .args(["token", "verify", &token, "--secret", "someone-else"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid or expired token"));
}

#[test]
fn inspect_ignores_signature() {
    let token = issue(&["user-9"]);
    emporium()
        .env("JWT_SECRET", "unrelated")
        .args(["token", "inspect", &token])
        .assert()
        .success()
        .stdout(predicate::str::contains("user-9"));
}

#[test]
fn inspect_rejects_garbage() {
    emporium()
        .args(["token", "inspect", "not.a.token"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed token"));
}

#[test]
fn zero_ttl_is_rejected() {
    emporium()
        .args(["token", "issue", "user-7", "--ttl", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--ttl must be positive"));
}

#[test]
fn unknown_kind_is_a_usage_error() {
    emporium()
        .args(["token", "issue", "user-7", "--kind", "bearer"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn verify_without_any_secret_fails_and_writes_nothing() {
    let token = issue(&["user-7"]);
    let data_home = std::env::temp_dir().join(format!(
        "emporium-cli-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));

    Command::cargo_bin("emporium")
        .unwrap()
        .env_remove("JWT_SECRET")
        .env_remove("AUTH_SECRET")
        .env("XDG_DATA_HOME", &data_home)
        .env("HOME", &data_home)
        .args(["token", "verify", &token])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no signing secret"));

    assert!(!data_home.exists(), "no secret file created");
}
