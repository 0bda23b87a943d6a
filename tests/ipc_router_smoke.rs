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

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_schoold");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn schoold");
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

fn request_ok(
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
    value
}

fn error_code(value: &serde_json::Value) -> &str {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("schoold-router-smoke");
    let snapshot_out = workspace.join("smoke-snapshot.bin");
    let logs_out = workspace.join("smoke-logs.json");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));

    // Anything touching the store before a workspace is selected is refused.
    let early = request(&mut stdin, &mut reader, "1b", "users.list", json!({}));
    assert_eq!(error_code(&early), "no_workspace");

    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(
        selected
            .get("result")
            .and_then(|r| r.get("backend"))
            .and_then(|v| v.as_str()),
        Some("sqlite")
    );

    let registered = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "users.register",
        json!({
            "user_id": "SMOKE01",
            "name": "Smoke Tester",
            "role": "teacher",
            "password": "pw"
        }),
    );
    assert_eq!(
        registered
            .get("result")
            .and_then(|r| r.get("userId"))
            .and_then(|v| v.as_str()),
        Some("SMOKE01")
    );

    let duplicate = request(
        &mut stdin,
        &mut reader,
        "4",
        "users.register",
        json!({ "user_id": "SMOKE01", "name": "Someone Else", "role": "parent" }),
    );
    assert_eq!(error_code(&duplicate), "duplicate_key");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "users.authenticate",
        json!({ "userId": "SMOKE01", "password": "pw" }),
    );
    let bad_login = request(
        &mut stdin,
        &mut reader,
        "6",
        "users.authenticate",
        json!({ "userId": "SMOKE01", "password": "wrong" }),
    );
    assert_eq!(error_code(&bad_login), "invalid_credentials");

    let _ = request_ok(&mut stdin, &mut reader, "7", "users.list", json!({}));

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "students.create",
        json!({ "name": "Amy", "class_id": "C1" }),
    );
    let student_id = created
        .get("result")
        .and_then(|r| r.get("studentId"))
        .and_then(|v| v.as_str())
        .expect("studentId")
        .to_string();
    assert!(student_id.starts_with("STU"));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "students.create",
        json!({ "name": "Bob", "class_id": "C2" }),
    );

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "students.list",
        json!({ "class_id": "C1", "status": "active" }),
    );
    let students = listed
        .get("result")
        .and_then(|r| r.get("students"))
        .and_then(|v| v.as_array())
        .expect("students array");
    assert_eq!(students.len(), 1);
    assert_eq!(
        students[0].get("name").and_then(|v| v.as_str()),
        Some("Amy")
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "teachers.create",
        json!({ "name": "Mr. Lee", "department": "Math", "subject": "Algebra" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "teachers.list",
        json!({ "department": "Math" }),
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "13",
        "parents.create",
        json!({ "name": "Parent Johnson", "occupation": "Engineer" }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "14", "parents.list", json!({}));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "15",
        "classes.create",
        json!({ "class_name": "Grade 1A", "grade_level": "1" }),
    );
    let classes = request_ok(&mut stdin, &mut reader, "16", "classes.list", json!({}));
    let capacity = classes
        .get("result")
        .and_then(|r| r.get("classes"))
        .and_then(|v| v.as_array())
        .and_then(|a| a.first())
        .and_then(|c| c.get("capacity"))
        .and_then(|v| v.as_i64());
    assert_eq!(capacity, Some(30));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "17",
        "grades.create",
        json!({ "student_id": student_id, "subject": "Math", "grade_value": 88.5 }),
    );
    let grades = request_ok(
        &mut stdin,
        &mut reader,
        "18",
        "grades.list",
        json!({ "student_id": student_id }),
    );
    let grade = grades
        .get("result")
        .and_then(|r| r.get("grades"))
        .and_then(|v| v.as_array())
        .and_then(|a| a.first())
        .cloned()
        .expect("one grade");
    assert_eq!(grade.get("max_grade").and_then(|v| v.as_f64()), Some(100.0));
    assert_eq!(grade.get("term").and_then(|v| v.as_str()), Some("Term 1"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "19",
        "logs.append",
        json!({ "type": "system", "message": "smoke entry", "level": "info" }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "20", "logs.list", json!({}));
    let _ = request_ok(&mut stdin, &mut reader, "21", "logs.stats", json!({}));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "22",
        "logs.export",
        json!({ "outPath": logs_out.to_string_lossy() }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "23", "logs.clear", json!({}));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "24",
        "snapshot.export",
        json!({ "outPath": snapshot_out.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "25",
        "snapshot.import",
        json!({ "inPath": snapshot_out.to_string_lossy() }),
    );

    let unknown = request(&mut stdin, &mut reader, "26", "nope.method", json!({}));
    assert_eq!(error_code(&unknown), "not_implemented");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
