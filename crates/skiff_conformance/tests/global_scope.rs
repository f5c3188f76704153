//! Files without imports or exports declare globals; changing one rechecks
//! the whole program.

use skiff_conformance::{checked, Workspace};
use skiff_incremental::CheckReason;

fn project() -> Workspace {
    Workspace::new(
        &[
            ("src/limits.ts", "const LIMIT = 3;\n"),
            ("src/a.ts", "export const cap = LIMIT;\n"),
            ("src/b.ts", "export const unrelated = 'b';\n"),
        ],
        &["src/limits.ts", "src/a.ts", "src/b.ts"],
    )
}

#[test]
fn globals_are_visible_without_imports() {
    let ws = project();
    let report = ws.build();
    assert!(!report.has_errors());
    assert_eq!(ws.read("out/limits.d.ts").as_deref(), Some("declare const LIMIT = 3;\n"));
    assert_eq!(ws.read("out/a.d.ts").as_deref(), Some("export declare const cap = 3;\n"));
}

#[test]
fn global_change_rechecks_every_file() {
    let mut ws = project();
    ws.build();
    ws.write("src/limits.ts", "const LIMIT = 4;\n");

    let report = ws.build();
    assert_eq!(checked(&report), ["src/a.ts", "src/b.ts", "src/limits.ts"]);
    let b = report.checked.iter().find(|c| c.path == "src/b.ts").unwrap();
    assert_eq!(b.reason, CheckReason::GlobalScopeChanged("src/limits.ts".to_string()));
    assert_eq!(ws.read("out/a.d.ts").as_deref(), Some("export declare const cap = 4;\n"));
    assert_eq!(report.latest_changed_dts_file.as_deref(), Some("out/a.d.ts"));
    ws.assert_matches_clean_rebuild();
}

#[test]
fn module_edit_does_not_touch_unrelated_files() {
    let mut ws = project();
    ws.build();
    ws.write("src/b.ts", "export const unrelated = 'B';\n");
    assert_eq!(checked(&ws.build()), ["src/b.ts"]);
}

#[test]
fn file_turning_into_a_module_withdraws_its_globals() {
    let mut ws = project();
    ws.build();
    ws.write("src/limits.ts", "export const LIMIT = 3;\n");

    let report = ws.build();
    assert_eq!(report.checked.len(), 3);
    assert_eq!(
        skiff_conformance::diagnostic_codes(&report.diagnostics),
        [("src/a.ts".to_string(), "E2304".to_string())]
    );
    // Only this build's signature changes count; `b.ts` kept its declaration.
    assert!(matches!(
        report.latest_changed_dts_file.as_deref(),
        Some("out/limits.d.ts" | "out/a.d.ts")
    ));
    ws.assert_matches_clean_rebuild();
}
