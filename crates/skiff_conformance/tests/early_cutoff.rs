//! Signature-based early cutoff: edits that leave a file's declaration
//! output alone stop at that file; edits that change it reach exactly the
//! files whose own declarations depend on it.

use skiff_conformance::{checked, written, Workspace};

fn chain() -> Workspace {
    Workspace::new(
        &[
            ("src/a.ts", "export const a = 10;\n"),
            ("src/b.ts", "import { a } from './a';\nexport const c = a;\n"),
            ("src/main.ts", "import { c } from './b';\nconsole.log(c);\n"),
        ],
        &["src/main.ts"],
    )
}

#[test]
fn first_build_inlines_imported_literals() {
    let ws = chain();
    let report = ws.build();
    assert_eq!(checked(&report), ["src/a.ts", "src/b.ts", "src/main.ts"]);
    assert_eq!(ws.read("out/a.d.ts").as_deref(), Some("export declare const a = 10;\n"));
    assert_eq!(ws.read("out/b.d.ts").as_deref(), Some("export declare const c = 10;\n"));
    assert_eq!(ws.read("out/main.d.ts").as_deref(), Some("export {};\n"));
    assert_eq!(
        ws.read("out/main.js").as_deref(),
        Some("import { c } from \"./b\";\nconsole.log(c);\n")
    );
}

#[test]
fn body_only_edit_rechecks_only_the_edited_file() {
    let mut ws = chain();
    ws.build();
    ws.write("src/a.ts", "export const a = 10;\nconst scratch = a * 2;\n");

    let report = ws.build();
    assert_eq!(checked(&report), ["src/a.ts"]);
    assert!(report.signature_changed.is_empty());
    assert_eq!(written(&report), ["out/a.js"]);
    assert_eq!(report.unchanged(), ["out/a.d.ts"]);
    ws.assert_matches_clean_rebuild();
}

#[test]
fn declaration_edit_propagates_until_declarations_stabilize() {
    let mut ws = chain();
    ws.build();
    ws.write("src/a.ts", "export const a = 20;\n");

    let report = ws.build();
    assert_eq!(checked(&report), ["src/a.ts", "src/b.ts", "src/main.ts"]);
    let mut changed = report.signature_changed.clone();
    changed.sort();
    assert_eq!(changed, ["src/a.ts", "src/b.ts"]);
    assert_eq!(ws.read("out/b.d.ts").as_deref(), Some("export declare const c = 20;\n"));
    // `main.ts` exposes nothing, so its outputs are byte-identical.
    assert!(report.unchanged().contains(&"out/main.js"));
    assert!(report.unchanged().contains(&"out/main.d.ts"));
    ws.assert_matches_clean_rebuild();
}

#[test]
fn stable_dependent_stops_propagation() {
    let mut ws = Workspace::new(
        &[
            ("src/a.ts", "export const a = 10;\n"),
            ("src/b.ts", "import { a } from './a';\nexport let widened = a;\n"),
            ("src/main.ts", "import { widened } from './b';\nexport const m = widened;\n"),
        ],
        &["src/main.ts"],
    );
    ws.build();
    assert_eq!(ws.read("out/b.d.ts").as_deref(), Some("export declare let widened: number;\n"));

    ws.write("src/a.ts", "export const a = 11;\n");
    let report = ws.build();
    // `b.ts` widens the literal, so its signature holds and `main.ts` is skipped.
    assert_eq!(checked(&report), ["src/a.ts", "src/b.ts"]);
    ws.assert_matches_clean_rebuild();
}

#[test]
fn type_change_surfaces_errors_in_dependents() {
    let mut ws = Workspace::new(
        &[
            ("src/a.ts", "export let a = 1;\n"),
            ("src/b.ts", "import { a } from './a';\nexport const n: number = a;\n"),
        ],
        &["src/b.ts"],
    );
    assert!(!ws.build().has_errors());

    ws.write("src/a.ts", "export let a = 'one';\n");
    let report = ws.build();
    assert_eq!(checked(&report), ["src/a.ts", "src/b.ts"]);
    assert!(report.has_errors());
    assert_eq!(
        skiff_conformance::diagnostic_codes(&report.diagnostics),
        [("src/b.ts".to_string(), "E2322".to_string())]
    );
    ws.assert_matches_clean_rebuild();
}
