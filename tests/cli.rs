use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

fn bubble_flow() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("bubble-flow"))
}

#[test]
fn validate_reports_ok_for_fixture_directory() {
    bubble_flow()
        .args(["validate", "--registry", "fixtures/registry.json", "fixtures/flows"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK  fixtures/flows/daily_report.ts"))
        .stdout(predicate::str::contains("OK  fixtures/flows/slack_greeter.ts"))
        .stdout(predicate::str::contains("All flows valid"));
}

#[test]
fn validate_reports_errors_with_position() {
    bubble_flow()
        .args([
            "validate",
            "--registry",
            "fixtures/registry.json",
            "tests/data/throw_in_handle.ts",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "ERR tests/data/throw_in_handle.ts:6:7: throw statements are not allowed directly in handle method.",
        ))
        .stderr(predicate::str::contains("1 flow(s) failed validation"));
}

#[test]
fn validate_json_mode() {
    let assert = bubble_flow()
        .args([
            "validate",
            "--json",
            "--registry",
            "fixtures/registry.json",
            "tests/data/syntax_error.ts",
        ])
        .assert()
        .failure();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let payload: Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(payload["ok"], Value::Bool(false));
    assert!(payload["hash_blake3"].as_str().is_some());
    let errors = payload["errors"].as_array().expect("errors array");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["code"], "syntax");
    assert_eq!(errors[0]["line"], 3);
}

#[test]
fn extract_prints_parameters() {
    let assert = bubble_flow()
        .args([
            "extract",
            "--registry",
            "fixtures/registry.json",
            "fixtures/flows/daily_report.ts",
        ])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let payload: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(payload["valid"], Value::Bool(true));
    assert_eq!(
        payload["bubble_parameters"]["1"]["class_name"],
        "PostgreSQLBubble"
    );
    assert_eq!(payload["trigger"]["cron_schedule"], "0 9 * * 1-5");
}

#[test]
fn normalize_in_place_rewrites_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flow.ts");
    std::fs::write(&path, "while (busy) wait();\n").unwrap();
    bubble_flow()
        .arg("normalize")
        .arg("--in-place")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "while (busy) {\n  wait();\n}\n"
    );
}

#[test]
fn credentials_lists_requirements_and_injects_values() {
    let assert = bubble_flow()
        .args([
            "credentials",
            "--registry",
            "fixtures/registry.json",
            "fixtures/flows/slack_greeter.ts",
        ])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let requirements: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(requirements, serde_json::json!({ "SlackBubble": ["SLACK_CRED"] }));

    let assert = bubble_flow()
        .args([
            "credentials",
            "--registry",
            "fixtures/registry.json",
            "--value",
            "SLACK_CRED=cred_1",
            "fixtures/flows/slack_greeter.ts",
        ])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let records: Value = serde_json::from_str(&stdout).unwrap();
    let params = records["2"]["parameters"].as_array().unwrap();
    let creds = params
        .iter()
        .find(|p| p["name"] == "credentials")
        .expect("credentials parameter");
    assert_eq!(creds["value"]["value"]["SLACK_CRED"], "cred_1");
}

#[test]
fn malformed_credential_value_is_rejected() {
    bubble_flow()
        .args(["credentials", "--value", "nohandle", "fixtures/flows/slack_greeter.ts"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected KIND=HANDLE"));
}
