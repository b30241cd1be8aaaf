#![cfg(feature = "cli")]

use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Output, Stdio};

struct Server {
    child: Child,
    calc_url: String,
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn start_server() -> Server {
    let mut child = Command::new(env!("CARGO_BIN_EXE_simplerpc"))
        .args(["--log-level", "error", "--format", "json"])
        .args(["serve", "--host", "127.0.0.1", "--port", "0"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("serve command should start");

    let stdout = child.stdout.take().expect("stdout should be piped");
    let mut line = String::new();
    BufReader::new(stdout)
        .read_line(&mut line)
        .expect("serve should print its address");
    let ready: serde_json::Value =
        serde_json::from_str(&line).expect("serve should emit json");

    let calc_url = ready["objects"]
        .as_array()
        .and_then(|objects| {
            objects
                .iter()
                .find(|o| o["object_uri"] == "Calc")
                .and_then(|o| o["url"].as_str())
        })
        .expect("Calc should be published")
        .to_string();

    Server { child, calc_url }
}

fn simplerpc(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_simplerpc"))
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .output()
        .expect("simplerpc should run")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("command should emit json")
}

#[test]
fn call_against_serve_returns_sum() {
    let server = start_server();
    assert!(server.calc_url.starts_with("simple://127.0.0.1:"));

    let output = simplerpc(&["call", &server.calc_url, "Add", "--arg", "2", "--arg", "3"]);
    assert_eq!(output.status.code(), Some(0));
    let result = stdout_json(&output);
    assert_eq!(result["status"], "return");
    assert_eq!(result["return_value"], 5);
}

#[test]
fn remote_fault_exits_70() {
    let server = start_server();

    let output = simplerpc(&["call", &server.calc_url, "Fail"]);
    assert_eq!(output.status.code(), Some(70));
    let result = stdout_json(&output);
    assert_eq!(result["status"], "fault");
    assert_eq!(result["fault"], "boom");
}

#[test]
fn out_arguments_are_printed() {
    let server = start_server();

    let output = simplerpc(&["call", &server.calc_url, "Div", "-a", "17", "-a", "5"]);
    assert_eq!(output.status.code(), Some(0));
    let result = stdout_json(&output);
    assert_eq!(result["return_value"], 3);
    assert_eq!(result["out_arguments"], serde_json::json!([2]));
}

#[test]
fn unsupported_argument_exits_60() {
    let output = simplerpc(&["call", "simple://127.0.0.1:1/Calc", "Add", "--arg", "[1,2]"]);
    assert_eq!(output.status.code(), Some(60));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot encode value of kind array"), "{stderr}");
}

#[test]
fn unreachable_server_is_a_fault() {
    let output = simplerpc(&["call", "simple://127.0.0.1:1/Calc", "Add"]);
    assert_eq!(output.status.code(), Some(70));
    let result = stdout_json(&output);
    assert!(result["fault"]
        .as_str()
        .is_some_and(|m| m.starts_with("transport error")));
}

#[test]
fn parse_prints_endpoint_parts() {
    let output = simplerpc(&["parse", "simple://[::1]:8080/Calc"]);
    assert!(output.status.success());
    let endpoint = stdout_json(&output);
    assert_eq!(endpoint["host"], "::1");
    assert_eq!(endpoint["port"], 8080);
    assert_eq!(endpoint["object_uri"], "Calc");
    assert_eq!(endpoint["canonical"], "tcp://[::1]:8080");
}

#[test]
fn malformed_url_exits_64() {
    let output = simplerpc(&["parse", "not-a-url"]);
    assert_eq!(output.status.code(), Some(64));

    let output = simplerpc(&["call", "simple://localhost:8080", "Add"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn version_reports_package_version() {
    let output = simplerpc(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("simplerpc {}", env!("CARGO_PKG_VERSION")));
}
