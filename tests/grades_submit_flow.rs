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

fn spawn_daemon() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_gradebookd");
    let mut child = Command::new(exe)
        .env_remove("GRADEBOOKD_DATA_DIR")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn gradebookd");
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
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> &str {
    assert_eq!(value.get("ok").and_then(|v| v.as_bool()), Some(false));
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

#[test]
fn submit_returns_computed_slip_and_persists_student() {
    let data_dir = temp_dir("gradebook-submit-flow");
    let (_child, mut stdin, mut reader) = spawn_daemon();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "store.open",
        json!({ "path": data_dir.to_string_lossy() }),
    );

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "grades.submit",
        json!({
            "studentName": "  Lina  ",
            "studentId": " s-1 ",
            "course": "programming",
            "grades": { "exam": 90, "project": 80, "homework": "70" }
        }),
    );
    let student = result.get("student").expect("student slip");
    assert_eq!(student.get("name").and_then(|v| v.as_str()), Some("Lina"));
    assert_eq!(student.get("id").and_then(|v| v.as_str()), Some("s-1"));
    assert_eq!(
        student.get("course").and_then(|v| v.as_str()),
        Some("Programming")
    );
    // 90 * 0.4 + 80 * 0.4 + 70 * 0.2
    assert_eq!(student.get("grade").and_then(|v| v.as_str()), Some("82.00"));
    assert_eq!(
        student.get("status").and_then(|v| v.as_str()),
        Some("Passed")
    );

    let listed = request_ok(&mut stdin, &mut reader, "3", "students.list", json!({}));
    let students = listed
        .get("students")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    assert_eq!(students.len(), 1);
    assert_eq!(
        students[0].get("id").and_then(|v| v.as_str()),
        Some("s-1")
    );
    let courses = students[0]
        .get("courses")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    assert_eq!(courses.len(), 1);
    assert_eq!(
        courses[0].get("courseName").and_then(|v| v.as_str()),
        Some("Programming")
    );

    let _ = std::fs::remove_dir_all(data_dir);
}

#[test]
fn submit_validation_precedence_and_error_codes() {
    let data_dir = temp_dir("gradebook-submit-validation");
    let (_child, mut stdin, mut reader) = spawn_daemon();

    // Everything fails with no_store until a store is opened.
    let resp = request(
        &mut stdin,
        &mut reader,
        "0",
        "grades.submit",
        json!({
            "studentName": "Lina",
            "studentId": "s-1",
            "course": "math",
            "grades": { "exam": 50, "homework": 50 }
        }),
    );
    assert_eq!(error_code(&resp), "no_store");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "store.open",
        json!({ "path": data_dir.to_string_lossy() }),
    );

    let resp = request(
        &mut stdin,
        &mut reader,
        "2",
        "grades.submit",
        json!({
            "studentName": "   ",
            "studentId": "s-1",
            "course": "math",
            "grades": { "exam": 50, "homework": 50 }
        }),
    );
    assert_eq!(error_code(&resp), "bad_params");

    let resp = request(
        &mut stdin,
        &mut reader,
        "3",
        "grades.submit",
        json!({
            "studentName": "Lina",
            "studentId": "s-1",
            "course": "history",
            "grades": { "exam": 50, "homework": 50 }
        }),
    );
    assert_eq!(error_code(&resp), "unknown_course");

    // The course key is exact; display names do not resolve here.
    let resp = request(
        &mut stdin,
        &mut reader,
        "4",
        "grades.submit",
        json!({
            "studentName": "Lina",
            "studentId": "s-1",
            "course": "Math",
            "grades": { "exam": 50, "homework": 50 }
        }),
    );
    assert_eq!(error_code(&resp), "unknown_course");

    let resp = request(
        &mut stdin,
        &mut reader,
        "5",
        "grades.submit",
        json!({
            "studentName": "Lina",
            "studentId": "s-1",
            "course": "math",
            "grades": { "exam": 101, "homework": 50 }
        }),
    );
    assert_eq!(error_code(&resp), "invalid_component_grade");
    assert_eq!(
        resp.get("error")
            .and_then(|e| e.get("details"))
            .and_then(|d| d.get("component"))
            .and_then(|v| v.as_str()),
        Some("exam")
    );

    let resp = request(
        &mut stdin,
        &mut reader,
        "6",
        "grades.submit",
        json!({
            "studentName": "Lina",
            "studentId": "s-1",
            "course": "math",
            "grades": { "exam": "ninety", "homework": 50 }
        }),
    );
    assert_eq!(error_code(&resp), "invalid_component_grade");

    // A component absent from the input is invalid on submit.
    let resp = request(
        &mut stdin,
        &mut reader,
        "7",
        "grades.submit",
        json!({
            "studentName": "Lina",
            "studentId": "s-1",
            "course": "math",
            "grades": { "exam": 90 }
        }),
    );
    assert_eq!(error_code(&resp), "invalid_component_grade");
    assert_eq!(
        resp.get("error")
            .and_then(|e| e.get("details"))
            .and_then(|d| d.get("component"))
            .and_then(|v| v.as_str()),
        Some("homework")
    );

    // Nothing was persisted by any of the failed submissions.
    let listed = request_ok(&mut stdin, &mut reader, "8", "students.list", json!({}));
    assert_eq!(
        listed
            .get("students")
            .and_then(|v| v.as_array())
            .map(|v| v.len()),
        Some(0)
    );

    let _ = std::fs::remove_dir_all(data_dir);
}

#[test]
fn duplicate_course_is_rejected_ignoring_name_case() {
    let data_dir = temp_dir("gradebook-submit-duplicate");
    let (_child, mut stdin, mut reader) = spawn_daemon();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "store.open",
        json!({ "path": data_dir.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "grades.submit",
        json!({
            "studentName": "Omar",
            "studentId": "77",
            "course": "math",
            "grades": { "exam": 40, "homework": 40 }
        }),
    );

    let resp = request(
        &mut stdin,
        &mut reader,
        "3",
        "grades.submit",
        json!({
            "studentName": "Omar",
            "studentId": "77",
            "course": "math",
            "grades": { "exam": 99, "homework": 99 }
        }),
    );
    assert_eq!(error_code(&resp), "duplicate_course_grade");

    // A different course for the same student is fine and appends.
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "grades.submit",
        json!({
            "studentName": "Omar",
            "studentId": "77",
            "course": "web_development",
            "grades": { "project": 50, "homework": 80 }
        }),
    );
    // 50 * 0.8 + 80 * 0.2
    assert_eq!(
        result
            .get("student")
            .and_then(|s| s.get("grade"))
            .and_then(|v| v.as_str()),
        Some("56.00")
    );
    assert_eq!(
        result
            .get("student")
            .and_then(|s| s.get("status"))
            .and_then(|v| v.as_str()),
        Some("Failed")
    );

    let listed = request_ok(&mut stdin, &mut reader, "5", "students.list", json!({}));
    let students = listed
        .get("students")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    assert_eq!(students.len(), 1);
    assert_eq!(
        students[0]
            .get("courses")
            .and_then(|v| v.as_array())
            .map(|v| v.len()),
        Some(2)
    );

    let _ = std::fs::remove_dir_all(data_dir);
}
