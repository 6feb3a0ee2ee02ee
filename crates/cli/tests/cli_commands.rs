mod support;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn categories_lists_every_token() {
    cargo_bin_cmd!("olf")
        .arg("categories")
        .assert()
        .success()
        .stdout(predicate::str::contains("SYMBOLS -> macho_symbols (default)"))
        .stdout(predicate::str::contains("LOAD_COMMANDS -> macho_load_commands (extended)"))
        .stdout(predicate::str::contains("DIE_CALL_GRAPH -> macho_die_call_graph (reserved)"));
}

#[test]
fn tables_reports_live_and_materialized_states() {
    let dir = tempdir().expect("tempdir");
    let fixture = support::write_macho_fixture(dir.path());

    cargo_bin_cmd!("olf")
        .arg("tables")
        .arg(&fixture)
        .args(["--cache", "SYMBOLS"])
        .assert()
        .success()
        .stdout(predicate::str::contains("policy: SYMBOLS"))
        .stdout(predicate::str::contains(
            "- macho_symbols [materialized, 3 rows] (raw: raw_macho_symbols)",
        ))
        .stdout(predicate::str::contains("- macho_imports [live]"));
}

#[test]
fn tables_json_includes_state_tags() {
    let dir = tempdir().expect("tempdir");
    let fixture = support::write_macho_fixture(dir.path());

    let output = cargo_bin_cmd!("olf")
        .args(["tables", "--json", "--extended"])
        .arg(&fixture)
        .output()
        .expect("run olf");
    assert!(output.status.success());
    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    let entries = entries.as_array().expect("array");
    assert_eq!(entries.len(), 7);
    assert_eq!(entries[0]["canonical"], "macho_symbols");
    assert_eq!(entries[0]["state"], "canonical_live");
    assert_eq!(entries[6]["canonical"], "macho_headers");
}

#[test]
fn query_prints_an_aligned_table() {
    let dir = tempdir().expect("tempdir");
    let fixture = support::write_macho_fixture(dir.path());

    cargo_bin_cmd!("olf")
        .arg("query")
        .arg(&fixture)
        .args(["--sql", "SELECT name, global FROM macho_symbols WHERE name = '_main'"])
        .assert()
        .success()
        .stdout(predicate::str::contains("name   global"))
        .stdout(predicate::str::contains("_main  1"))
        .stdout(predicate::str::contains("(1 row)"));
}

#[test]
fn query_json_emits_objects_per_row() {
    let dir = tempdir().expect("tempdir");
    let fixture = support::write_macho_fixture(dir.path());

    let output = cargo_bin_cmd!("olf")
        .arg("query")
        .arg(&fixture)
        .args(["--json", "--sql", "SELECT name FROM macho_symbols ORDER BY name"])
        .output()
        .expect("run olf");
    assert!(output.status.success());
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    let names: Vec<_> =
        rows.as_array().expect("array").iter().map(|r| r["name"].as_str().unwrap_or("")).collect();
    assert_eq!(names, ["_helper", "_main", "_printf"]);
}

#[test]
fn bogus_cache_token_fails_and_names_it() {
    let dir = tempdir().expect("tempdir");
    cargo_bin_cmd!("olf")
        .arg("tables")
        .arg(dir.path().join("never-read.o"))
        .args(["--cache", "BOGUS"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("BOGUS"));
}

#[test]
fn non_object_input_fails() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("plain.txt");
    std::fs::write(&path, "hello").expect("write");
    cargo_bin_cmd!("olf")
        .arg("tables")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("File format error"));
}

#[test]
fn info_json_reports_header_and_hash() {
    let dir = tempdir().expect("tempdir");
    let fixture = support::write_macho_fixture(dir.path());

    let output =
        cargo_bin_cmd!("olf").arg("info").arg(&fixture).arg("--json").output().expect("run olf");
    assert!(output.status.success());
    let info: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(info["format"], "macho");
    assert_eq!(info["header"]["magic"], 0xfeed_facf_u32);
    assert_eq!(info["sha256"].as_str().map(str::len), Some(64));
    assert_eq!(info["libs"], serde_json::json!([]));
}

#[test]
fn shell_runs_statements_from_stdin() {
    let dir = tempdir().expect("tempdir");
    let fixture = support::write_macho_fixture(dir.path());

    cargo_bin_cmd!("olf")
        .arg("shell")
        .arg(&fixture)
        .write_stdin("SELECT count(*) AS n\n  FROM macho_symbols;\nSELECT * FROM nope;\n.quit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("ölf> "))
        .stdout(predicate::str::contains("n\n-\n3"))
        .stdout(predicate::str::contains("Error:"));
}

#[test]
fn verbose_flag_emits_logs_on_stderr() {
    let dir = tempdir().expect("tempdir");
    let fixture = support::write_macho_fixture(dir.path());

    cargo_bin_cmd!("olf")
        .env_remove("RUST_LOG")
        .args(["-v", "tables"])
        .arg(&fixture)
        .assert()
        .success()
        .stderr(predicate::str::contains("Session ready"));
}
