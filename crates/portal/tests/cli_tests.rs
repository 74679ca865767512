//! CLI integration via the JSON interface.

use test_helpers::{portal_bin, redirect, serve, status, Fixture};

const PAST: &str = "2020-01-01";
const FUTURE: &str = "2999-01-01T00:00:00Z";

/// Campaign server: `/start` redirects to `/landing?pathid=42`, `/landing*` answers 200,
/// `/gone` answers 404.
fn campaign_server() -> std::net::SocketAddr {
    serve(|path, addr| {
        if path.starts_with("/start") {
            redirect(&format!("http://{addr}/landing?pathid=42"))
        } else if path.starts_with("/landing") {
            status(200)
        } else {
            status(404)
        }
    })
}

// ── Eligibility ─────────────────────────────────────────────────

#[test]
fn offline_falls_back_to_native() {
    let fx = Fixture::offline();
    let v = fx.json(
        &["check", "https://example.invalid/x", "--target-date", PAST, "--json"],
        0,
    );
    assert_eq!(v["should_show_external_content"], false);
    assert_eq!(v["final_url"], "");
    assert_eq!(v["reason"], "no internet connection");
}

#[test]
fn native_decision_is_replayed() {
    let fx = Fixture::offline();
    let url = "https://example.invalid/x";
    fx.json(&["check", url, "--target-date", PAST, "--json"], 0);

    let v = fx.json(&["check", url, "--target-date", PAST, "--json"], 0);
    assert_eq!(v["should_show_external_content"], false);
    assert_eq!(v["reason"], "cached app content");

    let s = fx.json(&["status", url, "--json"], 0);
    assert_eq!(s["app_shown"], true);
    assert_eq!(s["external_shown"], false);
    assert_eq!(s["decided"], true);
}

#[test]
fn future_target_date_blocks() {
    let addr = campaign_server();
    let fx = Fixture::new(&[addr.to_string()], "phone");
    let url = format!("http://{addr}/start");
    let v = fx.json(&["check", &url, "--target-date", FUTURE, "--json"], 0);
    assert_eq!(v["should_show_external_content"], false);
    assert_eq!(v["reason"], "target date not reached");
}

#[test]
fn tablet_is_excluded_unless_device_check_disabled() {
    let addr = campaign_server();
    let url = format!("http://{addr}/start");

    let fx = Fixture::new(&[addr.to_string()], "tablet");
    let v = fx.json(&["check", &url, "--target-date", PAST, "--json"], 0);
    assert_eq!(v["reason"], "device not supported");

    let fx = Fixture::new(&[addr.to_string()], "tablet");
    let v = fx.json(
        &["check", &url, "--target-date", PAST, "--no-device-check", "--json"],
        0,
    );
    assert_eq!(v["should_show_external_content"], true);
}

#[test]
fn rejected_status_is_server_failure() {
    let addr = campaign_server();
    let fx = Fixture::new(&[addr.to_string()], "phone");
    let url = format!("http://{addr}/gone");
    let v = fx.json(&["check", &url, "--target-date", PAST, "--json"], 0);
    assert_eq!(v["should_show_external_content"], false);
    assert_eq!(v["reason"], "server check failed: server error: 404");
}

// ── External content ────────────────────────────────────────────

#[test]
fn all_checks_pass_records_redirect_target() {
    let addr = campaign_server();
    let fx = Fixture::new(&[addr.to_string()], "phone");
    let url = format!("http://{addr}/start");
    let landing = format!("http://{addr}/landing?pathid=42");

    let v = fx.json(&["check", &url, "--target-date", PAST, "--json"], 0);
    assert_eq!(v["should_show_external_content"], true);
    assert_eq!(v["final_url"], landing.as_str());
    assert_eq!(v["reason"], "all checks passed");

    let s = fx.json(&["status", &url, "--json"], 0);
    assert_eq!(s["external_shown"], true);
    assert_eq!(s["saved_url"], landing.as_str());
    assert_eq!(s["saved_path_id"], "42");
}

#[test]
fn external_decision_revalidates_with_push_id() {
    let addr = campaign_server();
    let fx = Fixture::new(&[addr.to_string()], "phone");
    let url = format!("http://{addr}/start");
    fx.json(&["check", &url, "--target-date", PAST, "--json"], 0);

    let id = fx.stdout(&["id"]).trim().to_string();
    let v = fx.json(&["check", &url, "--target-date", FUTURE, "--json"], 0);
    assert_eq!(v["should_show_external_content"], true);
    assert_eq!(v["reason"], "valid cached external content");
    assert_eq!(
        v["final_url"],
        format!("http://{addr}/landing?pathid=42&push_id={id}").as_str()
    );
}

#[test]
fn custom_cache_key_scopes_decision() {
    let fx = Fixture::offline();
    let url = "https://example.invalid/x";
    fx.json(
        &["check", url, "--target-date", PAST, "--cache-key", "spring", "--json"],
        0,
    );

    let scoped = fx.json(&["status", url, "--cache-key", "spring", "--json"], 0);
    assert_eq!(scoped["app_shown"], true);
    let default = fx.json(&["status", url, "--json"], 0);
    assert_eq!(default["app_shown"], false);
}

#[test]
fn human_output_prints_final_url_on_stdout() {
    let addr = campaign_server();
    let fx = Fixture::new(&[addr.to_string()], "phone");
    let url = format!("http://{addr}/start");
    let out = fx.stdout(&["check", &url, "--target-date", PAST]);
    assert_eq!(out.trim(), format!("http://{addr}/landing?pathid=42"));
}

// ── Maintenance ─────────────────────────────────────────────────

#[test]
fn reset_forgets_decision() {
    let fx = Fixture::offline();
    let url = "https://example.invalid/x";
    fx.json(&["check", url, "--target-date", PAST, "--json"], 0);
    fx.stdout(&["reset", url]);

    let s = fx.json(&["status", url, "--json"], 0);
    assert_eq!(s["app_shown"], false);
    assert_eq!(s["external_shown"], false);
    assert_eq!(s["saved_url"], serde_json::Value::Null);
    assert_eq!(s["decided"], false);
}

#[test]
fn client_identity_is_stable() {
    let fx = Fixture::offline();
    let first = fx.stdout(&["id"]).trim().to_string();
    let second = fx.stdout(&["id"]).trim().to_string();
    assert_eq!(first, second);
    assert!((10..=20).contains(&first.len()), "{first}");
    assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
}

#[test]
fn journal_chain_verifies_and_tails() {
    let fx = Fixture::offline();
    let url = "https://example.invalid/x";
    fx.json(&["check", url, "--target-date", PAST, "--json"], 0);
    fx.json(&["check", url, "--target-date", PAST, "--json"], 0);

    let out = fx
        .portal()
        .args(["journal", "--verify"])
        .output()
        .unwrap();
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("2 entries"));

    let tail = fx.stdout(&["journal", "--tail", "1"]);
    let entry: serde_json::Value = serde_json::from_str(tail.trim()).unwrap();
    assert_eq!(entry["event_type"], "Decision");
    assert_eq!(entry["replayed"], true);
    assert_eq!(entry["reason"], "cached app content");
}

#[test]
fn tampered_journal_fails_verify() {
    let fx = Fixture::offline();
    let url = "https://example.invalid/x";
    fx.json(&["check", url, "--target-date", PAST, "--json"], 0);
    fx.json(&["check", url, "--target-date", PAST, "--json"], 0);

    let path = fx.dir.path().join("decisions.jsonl");
    let content = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, content.replacen("no internet", "no network", 1)).unwrap();

    let out = fx
        .portal()
        .args(["journal", "--verify"])
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("hash chain broken"));
}

#[test]
fn init_writes_default_config_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/config.json");
    let path_str = path.to_str().unwrap();

    let out = portal_bin()
        .args(["--config", path_str, "init"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["max_redirects"], 10);
    assert_eq!(written["device_class"], "unknown");

    let again = portal_bin()
        .args(["--config", path_str, "init"])
        .output()
        .unwrap();
    assert!(!again.status.success());
    assert!(String::from_utf8_lossy(&again.stderr).contains("already exists"));

    let forced = portal_bin()
        .args(["--config", path_str, "init", "--force"])
        .output()
        .unwrap();
    assert!(forced.status.success());
}

// ── Errors ──────────────────────────────────────────────────────

#[test]
fn invalid_target_date_is_error() {
    let fx = Fixture::offline();
    let out = fx
        .portal()
        .args(["check", "https://example.invalid/x", "--target-date", "tomorrow"])
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("invalid --target-date"));
}

#[test]
fn missing_explicit_config_is_error() {
    let out = portal_bin()
        .args(["--config", "/nonexistent/portal.json", "id"])
        .output()
        .unwrap();
    assert!(!out.status.success());
}
