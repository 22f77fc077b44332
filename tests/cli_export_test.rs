//! Integration tests for `export` and `graph`.

mod common;

use common::TestEnv;
use predicates::prelude::*;
use std::fs;

fn populated() -> TestEnv {
    let env = TestEnv::init();
    env.add("Goal", "concept");
    env.add("Habit", "concept");
    env.add("Review", "method");
    env.ontology().args(["approve", "C_1"]).assert().success();
    env.ontology()
        .args(["relate", "C_1", "M_1", "--type", "requires"])
        .assert()
        .success();
    env
}

// === CSV ===

#[test]
fn test_export_csv_default_path() {
    let env = populated();
    env.ontology()
        .arg("export")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"format\":\"csv\""))
        .stdout(predicate::str::contains("\"rows\":3"));

    let bytes = fs::read(env.path().join("ontology_export.csv")).unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"));
    let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "id,name,definition,purpose,status,meta_meta,examples,relations,created,updated"
    );
    assert!(text.contains("C_1,Goal,"));
    assert!(text.contains("requires:M_1"));
}

#[test]
fn test_export_csv_filters() {
    let env = populated();
    let out = env.path().join("out/approved.csv");
    env.ontology()
        .args(["export", "--status", "approved", "-o", out.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"rows\":1"));
    let text = fs::read_to_string(&out).unwrap();
    assert!(text.contains("Goal"));
    assert!(!text.contains("Habit"));

    env.ontology()
        .args(["export", "--prefix", "M", "-o", "methods.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"rows\":1"));
    assert!(fs::read_to_string(env.path().join("methods.csv")).unwrap().contains("Review"));
}

// === XLSX ===

#[test]
fn test_export_xlsx_sheets() {
    let env = populated();
    let json = env.json(&["export", "--format", "xlsx"]);
    assert_eq!(json["format"], "xlsx");
    assert_eq!(json["rows"], 3);
    assert_eq!(json["sheets"].as_array().unwrap().len(), 2);

    let bytes = fs::read(env.path().join("ontology_export.xlsx")).unwrap();
    assert!(bytes.starts_with(b"PK"));
}

#[test]
fn test_export_human_output() {
    let env = populated();
    env.ontology()
        .args(["export", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 3 objects to ontology_export.csv"));
}

// === Graph ===

#[test]
fn test_graph_default_path() {
    let env = populated();
    env.ontology()
        .arg("graph")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"nodes\":3"))
        .stdout(predicate::str::contains("\"edges\":1"));

    let mermaid = fs::read_to_string(env.path().join("visuals/ontology.mmd")).unwrap();
    assert!(mermaid.starts_with("graph TD\n"));
    assert!(mermaid.contains("C_1 -->|requires| M_1"));
}

#[test]
fn test_graph_custom_output() {
    let env = TestEnv::init();
    env.ontology()
        .args(["graph", "-o", "g.mmd"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"nodes\":0"));
    assert_eq!(fs::read_to_string(env.path().join("g.mmd")).unwrap(), "graph TD\n");
}
