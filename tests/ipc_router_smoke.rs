use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar(state_dir: &PathBuf) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_campusd");
    let mut child = Command::new(exe)
        // Port 1 refuses connections immediately; network-backed methods
        // must fail fast and cleanly.
        .env("CAMPUSD_API_BASE_URL", "http://127.0.0.1:1")
        .env("CAMPUSD_STATE_DIR", state_dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn campusd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn error_code(resp: &serde_json::Value) -> &str {
    resp.get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

#[test]
fn router_dispatch_smoke_covers_local_methods() {
    let state_dir = temp_dir("campusd-router-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar(&state_dir);

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["ok"], true);
    assert_eq!(health["result"]["tokenPresent"], false);
    assert_eq!(health["result"]["apiBaseUrl"], "http://127.0.0.1:1");

    let config = request(&mut stdin, &mut reader, "2", "config.get", json!({}));
    assert_eq!(config["ok"], true);
    assert_eq!(config["result"]["allowManualRoleOverride"], false);

    // Session lifecycle is local and durable.
    let set = request(
        &mut stdin,
        &mut reader,
        "3",
        "session.set",
        json!({ "token": "smoke-token", "expiresAt": "2026-12-01T10:00:00Z" }),
    );
    assert_eq!(set["ok"], true);

    let got = request(&mut stdin, &mut reader, "4", "session.get", json!({}));
    assert_eq!(got["result"]["tokenPresent"], true);
    assert!(got["result"]["expiresAt"]
        .as_str()
        .expect("expiry present")
        .starts_with("2026-12-01"));

    // Role override ships disabled.
    let override_resp = request(
        &mut stdin,
        &mut reader,
        "5",
        "auth.overrideRole",
        json!({ "role": "teacher" }),
    );
    assert_eq!(override_resp["ok"], false);
    assert_eq!(error_code(&override_resp), "disabled");

    // Network-backed listing fails cleanly against the dead backend.
    let rooms = request(
        &mut stdin,
        &mut reader,
        "6",
        "rooms.list",
        json!({ "page": 1, "pageSize": 100 }),
    );
    assert_eq!(rooms["ok"], false);
    assert_eq!(error_code(&rooms), "network_error");

    // Role resolution against the dead backend clears the stored session.
    let resolve = request(&mut stdin, &mut reader, "7", "auth.resolveRole", json!({}));
    assert_eq!(resolve["ok"], false);
    assert_eq!(error_code(&resolve), "auth_required");
    let got = request(&mut stdin, &mut reader, "8", "session.get", json!({}));
    assert_eq!(got["result"]["tokenPresent"], false);

    // Editing views must be opened before they accept edits.
    let cycle = request(
        &mut stdin,
        &mut reader,
        "9",
        "grades.cycleAssignment",
        json!({ "courseId": "c1", "studentId": "s1" }),
    );
    assert_eq!(error_code(&cycle), "no_view");

    let check = request(
        &mut stdin,
        &mut reader,
        "10",
        "schedule.checkConflicts",
        json!({
            "scope": "group",
            "key": "CS-31",
            "entry": {
                "id": "",
                "dayOfWeek": 1,
                "startTime": "09:00",
                "endTime": "10:00"
            }
        }),
    );
    assert_eq!(error_code(&check), "no_view");

    // Parameter validation reports bad_params without touching the network.
    let bad = request(
        &mut stdin,
        &mut reader,
        "11",
        "rooms.search",
        json!({ "page": 1 }),
    );
    assert_eq!(error_code(&bad), "bad_params");

    let unknown = request(&mut stdin, &mut reader, "12", "rooms.paint", json!({}));
    assert_eq!(error_code(&unknown), "not_implemented");

    let out = request(&mut stdin, &mut reader, "13", "auth.signOut", json!({}));
    assert_eq!(out["ok"], true);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(state_dir);
}

#[test]
fn malformed_request_line_gets_a_bare_error() {
    let state_dir = temp_dir("campusd-bad-json");
    let (mut child, mut stdin, mut reader) = spawn_sidecar(&state_dir);

    writeln!(stdin, "this is not json").expect("write garbage");
    stdin.flush().expect("flush");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response");
    assert_eq!(value["ok"], false);
    assert_eq!(value["error"]["code"], "bad_json");

    // The loop survives garbage and keeps answering.
    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["ok"], true);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(state_dir);
}

#[test]
fn session_survives_a_restart() {
    let state_dir = temp_dir("campusd-session-durability");

    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar(&state_dir);
        let set = request(
            &mut stdin,
            &mut reader,
            "1",
            "session.set",
            json!({ "token": "durable-token" }),
        );
        assert_eq!(set["ok"], true);
        drop(stdin);
        let _ = child.wait();
    }

    let (mut child, mut stdin, mut reader) = spawn_sidecar(&state_dir);
    let got = request(&mut stdin, &mut reader, "1", "session.get", json!({}));
    assert_eq!(got["result"]["tokenPresent"], true);

    let cleared = request(&mut stdin, &mut reader, "2", "session.clear", json!({}));
    assert_eq!(cleared["ok"], true);
    let got = request(&mut stdin, &mut reader, "3", "session.get", json!({}));
    assert_eq!(got["result"]["tokenPresent"], false);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(state_dir);
}
