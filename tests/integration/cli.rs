//! Command-line behaviour of the `stacksplit` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

use super::fixture_path;

/// Binary isolated from the caller's configuration files.
fn stacksplit(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("stacksplit").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env_remove("STACKSPLIT_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_stats_text() {
    let home = TempDir::new().unwrap();
    stacksplit(&home)
        .arg("stats")
        .arg(fixture_path("web_service.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Resources"))
        .stdout(predicate::str::contains("AWS::Lambda::Function"));
}

#[test]
fn test_stats_json() {
    let home = TempDir::new().unwrap();
    let report = stdout_json(
        stacksplit(&home).args(["stats", "--format", "json"]).arg(fixture_path("web_service.yaml")),
    );
    assert_eq!(report["stats"]["resource_count"], 4);
    assert_eq!(report["stats"]["output_count"], 1);
    assert_eq!(report["stats"]["parameter_count"], 1);
    assert_eq!(report["stats"]["resource_types"]["AWS::EC2::Subnet"], 1);
    assert_eq!(report["warnings"], Value::Array(Vec::new()));
}

#[test]
fn test_graph_lists_typed_edges() {
    let home = TempDir::new().unwrap();
    stacksplit(&home)
        .arg("graph")
        .arg(fixture_path("web_service.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Subnet -[ref]-> Vpc"))
        .stdout(predicate::str::contains("Function -[getatt Arn]-> Role"));

    let graph = stdout_json(
        stacksplit(&home).args(["graph", "-f", "json"]).arg(fixture_path("web_service.yaml")),
    );
    assert_eq!(graph["nodes"].as_array().unwrap().len(), 4);
    assert_eq!(graph["edges"].as_array().unwrap().len(), 2);
    assert_eq!(graph["cycles"], Value::Array(Vec::new()));
}

#[test]
fn test_analyze_json() {
    let home = TempDir::new().unwrap();
    let suggestion = stdout_json(
        stacksplit(&home).args(["analyze", "--format", "json"]).arg(fixture_path("web_service.yaml")),
    );
    assert_eq!(suggestion["recommended"]["strategy"], "hybrid");
    assert_eq!(suggestion["alternatives"].as_array().unwrap().len(), 2);
    let order: Vec<&str> = suggestion["recommended"]["deployment_order"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    let position = |name: &str| order.iter().position(|n| *n == name).unwrap();
    assert!(position("IAM") < position("Compute"));
}

#[test]
fn test_analyze_text() {
    let home = TempDir::new().unwrap();
    stacksplit(&home)
        .arg("analyze")
        .arg(fixture_path("web_service.yaml"))
        .args(["--strategy", "semantic"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recommended:"))
        .stdout(predicate::str::contains("Networking"));
}

#[test]
fn test_split_writes_children_and_parent() {
    let home = TempDir::new().unwrap();
    let out = home.path().join("out");
    stacksplit(&home)
        .arg("split")
        .arg(fixture_path("web_service.yaml"))
        .arg("--output-dir")
        .arg(&out)
        .args(["--prefix", "web"])
        .assert()
        .success()
        .stdout(predicate::str::contains("into 3 stacks"));

    for name in ["Networking", "IAM", "Compute", "Parent"] {
        assert!(out.join(format!("{name}.yaml")).is_file(), "missing {name}.yaml");
    }
    let compute = std::fs::read_to_string(out.join("Compute.yaml")).unwrap();
    assert!(compute.contains("Fn::ImportValue"));
    assert!(compute.contains("web-IAM-Role-Arn"));
}

#[test]
fn test_split_json_without_parent() {
    let home = TempDir::new().unwrap();
    let out = home.path().join("out");
    stacksplit(&home)
        .arg("split")
        .arg(fixture_path("web_service.yaml"))
        .args(["-o"])
        .arg(&out)
        .args(["--format", "json", "--no-parent"])
        .assert()
        .success();

    assert!(out.join("IAM.json").is_file());
    assert!(!out.join("Parent.json").exists());
    let iam: Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("IAM.json")).unwrap()).unwrap();
    assert_eq!(iam["Outputs"]["RoleArnExport"]["Export"]["Name"], "IAM-Role-Arn");
}

#[test]
fn test_split_reads_config_file() {
    let home = TempDir::new().unwrap();
    let out = home.path().join("out");
    std::fs::write(
        home.path().join("stacksplit.toml"),
        "[generate]\nstack_name_prefix = \"shop\"\nformat = \"json\"\ngenerate_parent = false\n",
    )
    .unwrap();

    stacksplit(&home)
        .arg("split")
        .arg(fixture_path("web_service.yaml"))
        .arg("-o")
        .arg(&out)
        .assert()
        .success();

    let compute = std::fs::read_to_string(out.join("Compute.json")).unwrap();
    assert!(compute.contains("shop-IAM-Role-Arn"));
    assert!(!out.join("Parent.json").exists());

    // Flags beat the file.
    stacksplit(&home)
        .arg("split")
        .arg(fixture_path("web_service.yaml"))
        .arg("-o")
        .arg(&out)
        .args(["--prefix", "flag"])
        .assert()
        .success();
    let compute = std::fs::read_to_string(out.join("Compute.json")).unwrap();
    assert!(compute.contains("flag-IAM-Role-Arn"));
}

#[test]
fn test_config_path_from_environment() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("custom.toml");
    std::fs::write(&config, "[analysis]\nmax_cluster_size = 0\n").unwrap();

    stacksplit(&home)
        .env("STACKSPLIT_CONFIG", &config)
        .arg("analyze")
        .arg(fixture_path("web_service.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_cluster_size"));

    // The environment path must exist; it is not silently skipped.
    stacksplit(&home)
        .env("STACKSPLIT_CONFIG", home.path().join("missing.toml"))
        .arg("analyze")
        .arg(fixture_path("web_service.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config"));
}

#[test]
fn test_invalid_config_fails() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("bad.toml");
    std::fs::write(&config, "[analysis]\nmin_quality = 2.0\n").unwrap();

    stacksplit(&home)
        .args(["analyze"])
        .arg(fixture_path("web_service.yaml"))
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("min_quality"));
}

#[test]
fn test_missing_template_fails() {
    let home = TempDir::new().unwrap();
    stacksplit(&home)
        .args(["stats", "does-not-exist.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read template"));
}

#[test]
fn test_malformed_resources_section_fails() {
    let home = TempDir::new().unwrap();
    stacksplit(&home)
        .arg("analyze")
        .arg(fixture_path("invalid_resources.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid template section 'Resources'"));
}

#[test]
fn test_invalid_option_fails() {
    let home = TempDir::new().unwrap();
    stacksplit(&home)
        .arg("analyze")
        .arg(fixture_path("web_service.yaml"))
        .args(["--min-quality", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid options"));
}
