//! A line-oriented fake front end for engine tests.
//!
//! Each source line is one directive:
//!
//! - `import ./x` depends on `./x`
//! - `uses ./x` depends on `./x` and copies its signature into the declaration
//! - `ref x.d.ts` is a triple-slash reference
//! - `export <text>` contributes `<text>` to the declaration
//! - `global` marks the file as declaring globals
//! - `error <msg>` reports a diagnostic
//! - `fault` makes the checker fail on the file
//!
//! Anything else is implementation detail that does not reach the declaration.

use std::sync::Mutex;

use skiff_diagnostics::{Category, Diagnostic, DiagnosticCode};

use crate::emit_kind::ArtifactKind;
use crate::host::{
    CheckOutput, CheckRequest, Checker, CheckerFault, EmitRequest, Emitter, Reference, ScanOutput,
};

#[derive(Default)]
pub(crate) struct FakeChecker {
    checked: Mutex<Vec<String>>,
}

impl FakeChecker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Paths checked since the last call, sorted.
    pub(crate) fn take_checked(&self) -> Vec<String> {
        let mut checked = std::mem::take(&mut *self.checked.lock().unwrap());
        checked.sort();
        checked
    }
}

impl Checker for FakeChecker {
    fn scan(&self, _path: &str, text: &str) -> ScanOutput {
        let mut out = ScanOutput::default();
        for line in text.lines().map(str::trim) {
            if let Some(spec) = line
                .strip_prefix("import ")
                .or_else(|| line.strip_prefix("uses "))
            {
                out.references.push(Reference::import(spec.trim()));
            } else if let Some(spec) = line.strip_prefix("ref ") {
                out.references.push(Reference::triple_path(spec.trim()));
            } else if line == "global" {
                out.affects_global_scope = true;
            }
        }
        out
    }

    fn type_check(&self, request: &CheckRequest<'_>) -> Result<CheckOutput, CheckerFault> {
        self.checked.lock().unwrap().push(request.path.to_string());
        let mut declaration = String::new();
        let mut diagnostics = Vec::new();
        for line in request.text.lines().map(str::trim) {
            if line == "fault" {
                return Err(CheckerFault::new(format!("crashed on {}", request.path)));
            } else if let Some(text) = line.strip_prefix("export ") {
                declaration.push_str(text);
                declaration.push('\n');
            } else if let Some(msg) = line.strip_prefix("error ") {
                diagnostics.push(
                    Diagnostic::error(DiagnosticCode::new(Category::Error, 1), msg)
                        .in_file(request.path),
                );
            } else if let Some(spec) = line.strip_prefix("uses ") {
                let target = request.program.resolve(request.file, spec.trim());
                let signature = target.and_then(|t| {
                    request
                        .dependency_signatures
                        .iter()
                        .find(|d| d.file == t)
                        .and_then(|d| d.signature)
                });
                match signature {
                    Some(sig) => declaration.push_str(&format!("uses {sig}\n")),
                    None => diagnostics.push(
                        Diagnostic::error(
                            DiagnosticCode::new(Category::Error, 2307),
                            format!("cannot find module '{}'", spec.trim()),
                        )
                        .in_file(request.path),
                    ),
                }
            }
        }
        let declaration = (!request.path.ends_with(".d.ts")).then_some(declaration);
        Ok(CheckOutput {
            diagnostics,
            declaration,
        })
    }
}

#[derive(Default)]
pub(crate) struct FakeEmitter {
    faults: Mutex<Vec<String>>,
}

impl FakeEmitter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_on(&self, path: &str) {
        self.faults.lock().unwrap().push(path.to_string());
    }
}

impl Emitter for FakeEmitter {
    fn emit(&self, request: &EmitRequest<'_>) -> Result<String, CheckerFault> {
        if self.faults.lock().unwrap().iter().any(|p| p == request.path) {
            return Err(CheckerFault::new("emitter failed"));
        }
        Ok(match request.artifact {
            ArtifactKind::Js if request.options.inline_source_map => {
                format!("// js {}\n{}\n//# inline-map", request.path, request.text)
            }
            ArtifactKind::Js => format!("// js {}\n{}", request.path, request.text),
            ArtifactKind::JsMap => format!("{{\"file\":\"{}\"}}", request.outputs.js),
            ArtifactKind::Dts => format!("// d.ts {}", request.path),
            ArtifactKind::DtsMap => format!("{{\"file\":\"{}\"}}", request.outputs.dts),
        })
    }
}
