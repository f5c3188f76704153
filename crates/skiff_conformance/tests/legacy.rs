//! Build info written by older or newer encoders.

use serde_json::{json, Value};
use skiff_conformance::{checked, Workspace};
use skiff_incremental::{CheckReason, SnapshotStatus};

fn project() -> Workspace {
    Workspace::new(
        &[
            ("src/util.ts", "export const answer = 42;\n"),
            ("src/main.ts", "import { answer } from './util';\nconsole.log(answer);\n"),
        ],
        &["src/main.ts"],
    )
}

fn document(ws: &Workspace) -> Value {
    serde_json::from_slice(&ws.build_info().expect("build info written")).unwrap()
}

fn edit_document(ws: &Workspace, edit: impl FnOnce(&mut Value)) {
    let mut doc = document(ws);
    edit(&mut doc);
    ws.set_build_info(&serde_json::to_vec_pretty(&doc).unwrap());
}

fn file_index(doc: &Value, path: &str) -> usize {
    doc["fileNames"]
        .as_array()
        .unwrap()
        .iter()
        .position(|name| name == path)
        .unwrap()
}

#[test]
fn version_only_entries_are_upgraded() {
    let ws = project();
    ws.build();
    edit_document(&ws, |doc| {
        for info in doc["fileInfos"].as_array_mut().unwrap() {
            *info = info["version"].clone();
        }
    });

    let report = ws.build();
    assert_eq!(report.snapshot, SnapshotStatus::Reused);
    assert!(report.checked.is_empty());
    assert!(report.emitted.is_empty());
    assert!(report.build_info_written);
    assert!(document(&ws)["fileInfos"]
        .as_array()
        .unwrap()
        .iter()
        .all(Value::is_object));

    assert!(ws.build().is_noop());
}

#[test]
fn numeric_implied_format_is_kept_in_original() {
    let ws = project();
    ws.build();
    edit_document(&ws, |doc| {
        let util = file_index(doc, "src/util.ts");
        doc["fileInfos"][util]["impliedNodeFormat"] = json!(1);
    });

    let report = ws.build();
    assert!(report.checked.is_empty());
    let doc = document(&ws);
    let util = &doc["fileInfos"][file_index(&doc, "src/util.ts")];
    assert_eq!(util["impliedNodeFormat"], "commonjs");
    assert_eq!(util["original"]["impliedNodeFormat"], 1);
}

#[test]
fn unknown_fields_survive_rebuilds() {
    let mut ws = project();
    ws.build();
    edit_document(&ws, |doc| {
        doc["producer"] = json!({ "name": "other", "build": 7 });
        doc["options"]["experimentalLayout"] = json!(true);
    });

    ws.write("src/util.ts", "export const answer = 43;\n");
    let report = ws.build();
    assert_eq!(checked(&report), ["src/main.ts", "src/util.ts"]);
    let doc = document(&ws);
    assert_eq!(doc["producer"], json!({ "name": "other", "build": 7 }));
    assert_eq!(doc["options"]["experimentalLayout"], json!(true));
}

#[test]
fn newer_major_version_is_discarded() {
    let ws = project();
    ws.build();
    edit_document(&ws, |doc| doc["version"] = json!("2.0.0"));

    let report = ws.build();
    assert_eq!(report.snapshot, SnapshotStatus::Discarded);
    assert_eq!(checked(&report), ["src/main.ts", "src/util.ts"]);
    assert!(report.checked.iter().all(|c| c.reason == CheckReason::FullBuild));
    let mut unchanged = report.unchanged();
    unchanged.sort_unstable();
    assert_eq!(
        unchanged,
        ["out/main.d.ts", "out/main.js", "out/util.d.ts", "out/util.js"]
    );
    assert_eq!(document(&ws)["version"], "1.0.0");
}

#[test]
fn corrupt_build_info_is_a_cache_miss() {
    let ws = project();
    ws.build();
    ws.set_build_info(b"{ not json");

    let report = ws.build();
    assert_eq!(report.snapshot, SnapshotStatus::Discarded);
    assert_eq!(checked(&report).len(), 2);
    ws.assert_matches_clean_rebuild();
}
