use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_gradebookd");
    let mut child = Command::new(exe)
        .env_remove("GRADEBOOKD_CONFIG")
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

fn ids(list: &serde_json::Value) -> Vec<String> {
    list.as_array()
        .expect("course array")
        .iter()
        .map(|c| c["id"].as_str().expect("course id").to_string())
        .collect()
}

fn sample_courses() -> serde_json::Value {
    json!([
        { "id": "301", "name": "Algorithms", "completed": false,
          "prerequisites": [{ "id": "201", "name": "Data Structures" }, { "id": "150", "name": "Discrete Math" }] },
        { "id": "101", "name": "Intro to Programming", "completed": true, "prerequisites": [] },
        { "id": "201", "name": "Data Structures", "completed": true,
          "prerequisites": [{ "id": "101", "name": "Intro to Programming" }] },
        { "id": "150", "name": "Discrete Math", "completed": false },
        { "id": "410", "name": "Compilers", "completed": false,
          "prerequisites": [{ "id": "301", "name": "Algorithms" }, { "id": "999", "name": "Removed course" }] }
    ])
}

#[test]
fn sort_levels_and_flatten_keep_prerequisites_first() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let sorted = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "courses.sort",
        json!({ "courses": sample_courses() }),
    );
    let levels = sorted["levels"].as_array().expect("levels").clone();
    let level_ids: Vec<Vec<String>> = levels.iter().map(ids).collect();
    assert_eq!(
        level_ids,
        vec![
            vec!["101".to_string(), "150".to_string()],
            vec!["201".to_string()],
            vec!["301".to_string()],
            vec!["410".to_string()],
        ]
    );

    let flat = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "courses.flatten",
        json!({ "levels": levels }),
    );
    assert_eq!(ids(&flat["courses"]), vec!["101", "150", "201", "301", "410"]);

    let empty = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "courses.sort",
        json!({ "courses": [] }),
    );
    assert_eq!(empty["levels"], json!([]));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn cyclic_courses_still_come_back() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let res = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "courses.sort",
        json!({ "courses": [
            { "id": "A", "name": "A", "prerequisites": [{ "id": "B", "name": "B" }] },
            { "id": "B", "name": "B", "prerequisites": [{ "id": "C", "name": "C" }] },
            { "id": "C", "name": "C", "prerequisites": [{ "id": "A", "name": "A" }] }
        ]}),
    );
    let level_ids: Vec<Vec<String>> = res["levels"]
        .as_array()
        .expect("levels")
        .iter()
        .map(ids)
        .collect();
    assert_eq!(
        level_ids,
        vec![vec!["C".to_string()], vec!["B".to_string()], vec!["A".to_string()]]
    );

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn ordered_and_filter_apply_tab_and_query() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let ordered = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "courses.ordered",
        json!({ "courses": sample_courses(), "tab": "incomplete" }),
    );
    assert_eq!(ids(&ordered["courses"]), vec!["150", "301", "410"]);

    let searched = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "courses.filter",
        json!({ "courses": sample_courses(), "tab": "completed", "query": "DATA" }),
    );
    assert_eq!(ids(&searched["courses"]), vec!["201"]);

    let all = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "courses.filter",
        json!({ "courses": sample_courses(), "tab": "whatever", "query": "" }),
    );
    assert_eq!(ids(&all["courses"]), vec!["301", "101", "201", "150", "410"]);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn prerequisite_checks_validation_and_removal() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let used = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "courses.isPrerequisite",
        json!({ "courses": sample_courses(), "courseId": "201" }),
    );
    assert_eq!(used["isPrerequisite"], json!(true));
    let unused = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "courses.isPrerequisite",
        json!({ "courses": sample_courses(), "courseId": "410" }),
    );
    assert_eq!(unused["isPrerequisite"], json!(false));

    let valid = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "courses.validatePrerequisites",
        json!({ "courses": sample_courses(), "courseId": "410", "prerequisiteIds": ["301", "150"] }),
    );
    assert_eq!(valid["valid"], json!(true));

    let own = request(
        &mut stdin,
        &mut reader,
        "4",
        "courses.validatePrerequisites",
        json!({ "courses": sample_courses(), "courseId": "301", "prerequisiteIds": ["301"] }),
    );
    assert_eq!(own["ok"], json!(false));
    assert_eq!(own["error"]["code"], json!("bad_params"));

    let unknown = request(
        &mut stdin,
        &mut reader,
        "5",
        "courses.validatePrerequisites",
        json!({ "courses": sample_courses(), "prerequisiteIds": ["999"] }),
    );
    assert_eq!(unknown["ok"], json!(false));
    assert!(unknown["error"]["message"]
        .as_str()
        .unwrap_or_default()
        .contains("999"));

    let repeated = request(
        &mut stdin,
        &mut reader,
        "5b",
        "courses.validatePrerequisites",
        json!({ "courses": sample_courses(), "courseId": "410", "prerequisiteIds": ["301", "301"] }),
    );
    assert_eq!(repeated["ok"], json!(false));
    assert_eq!(repeated["error"]["code"], json!("bad_params"));
    assert!(repeated["error"]["message"]
        .as_str()
        .unwrap_or_default()
        .contains("more than once"));

    let removed = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "courses.remove",
        json!({ "courses": sample_courses(), "courseId": "201" }),
    );
    assert_eq!(removed["removed"], json!(true));
    assert_eq!(ids(&removed["courses"]), vec!["301", "101", "150", "410"]);
    let algorithms = &removed["courses"][0]["prerequisites"];
    assert_eq!(ids(algorithms), vec!["150"]);

    let missing = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "courses.remove",
        json!({ "courses": sample_courses(), "courseId": "nope" }),
    );
    assert_eq!(missing["removed"], json!(false));
    assert_eq!(missing["courses"].as_array().map(Vec::len), Some(5));

    drop(stdin);
    let _ = child.wait();
}
