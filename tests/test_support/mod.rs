#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub const SAMPLE_CSV: &str = "\
SEAT_NO,NAME,COLL_NO,SEX,RSLT,P1_CD,P1_T,P1_I,P2_T,P2_I,SGP1,C1,CGPA,GCGPA
1001,ASHA RAO,55,2,PASS,BMS601,40,30,52,28,7.5,20,7.2,
1002,VIKRAM SHAH,56,1,ATKT,BMS601,22,18,35,20,5.1,20,5.4,
1003,\"MEHTA, RIYA\",57,2,PASS,BMS601,61,35,58,33,8.4,20,8.1,8.0
";

pub fn temp_dir(prefix: &str) -> PathBuf {
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

pub fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_recordsd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn recordsd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

pub fn request(
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

pub fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

/// Returns the error code of a failed call.
pub fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

pub fn login(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    username: &str,
    password: &str,
) -> serde_json::Value {
    let id = format!("login-{}", username);
    let res = request_ok(
        stdin,
        reader,
        &id,
        "auth.login",
        json!({ "username": username, "password": password }),
    );
    res.get("user").cloned().expect("user")
}

/// Opens `workspace`, logs in as admin, and loads the sample sheet.
pub fn seed_workspace(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    workspace: &Path,
) {
    let csv = workspace.join("BMS6T.csv");
    std::fs::write(&csv, SAMPLE_CSV).expect("write sample csv");
    request_ok(
        stdin,
        reader,
        "seed-ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    login(stdin, reader, "admin", "admin123");
    let summary = request_ok(
        stdin,
        reader,
        "seed-import",
        "records.importCsv",
        json!({ "path": csv.to_string_lossy() }),
    );
    assert_eq!(summary.get("inserted").and_then(|v| v.as_u64()), Some(3));
}

pub fn get_record(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    seat_no: &str,
) -> serde_json::Value {
    request_ok(stdin, reader, id, "records.get", json!({ "seatNo": seat_no }))
        .get("record")
        .cloned()
        .expect("record")
}
