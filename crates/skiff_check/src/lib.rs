//! Reference front end for a small TypeScript-like module language.
//!
//! [`SkiffChecker`] and [`SkiffEmitter`] implement the engine's checker and
//! emitter interfaces: scanning for references, type checking, declaration
//! and JavaScript output, and line-granular source maps.

pub mod analysis;
pub mod ast;
pub mod codes;
pub mod declarations;
pub mod expr;
pub mod js;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod sourcemap;
pub mod span;
pub mod token;
pub mod types;

#[cfg(test)]
mod testing;

use skiff_common::{file_name, parent_dir, relative_path};
use skiff_incremental::host::{
    CheckOutput, CheckRequest, Checker, CheckerFault, EmitRequest, Emitter, Reference, ScanOutput,
};
use skiff_incremental::outputs::is_declaration_file;
use skiff_incremental::ArtifactKind;

use crate::analysis::{Analyzer, ModuleInfo};
use crate::printer::Output;
use crate::sourcemap::SourceMap;
use crate::span::LineIndex;

/// The type checker.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkiffChecker;

impl Checker for SkiffChecker {
    fn scan(&self, _path: &str, text: &str) -> ScanOutput {
        let (unit, _) = parser::parse(text);
        let mut references: Vec<Reference> = unit
            .references
            .iter()
            .map(|reference| Reference::triple_path(reference.text.as_str()))
            .collect();
        references.extend(
            unit.module_specifiers()
                .map(|specifier| Reference::import(specifier.value.as_str())),
        );
        ScanOutput {
            references,
            affects_global_scope: !unit.is_module(),
            implied_format: None,
        }
    }

    fn type_check(&self, request: &CheckRequest<'_>) -> Result<CheckOutput, CheckerFault> {
        let info = analyze(request.program, request.file, request.path)?;
        let lines = LineIndex::new(&info.text);
        let diagnostics = info
            .problems
            .iter()
            .cloned()
            .map(|problem| problem.into_diagnostic(request.path, &lines))
            .collect();
        let declaration =
            (!is_declaration_file(request.path)).then(|| declarations::signature_text(&info));
        tracing::debug!(
            target: "skiff.check",
            path = request.path,
            problems = info.problems.len(),
            "checked"
        );
        Ok(CheckOutput {
            diagnostics,
            declaration,
        })
    }
}

/// The code generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkiffEmitter;

impl Emitter for SkiffEmitter {
    fn emit(&self, request: &EmitRequest<'_>) -> Result<String, CheckerFault> {
        let info = analyze(request.program, request.file, request.path)?;
        let outputs = request.outputs;
        let options = request.options;
        match request.artifact {
            ArtifactKind::Js => {
                let output = js::js_output(&info, options);
                let mut text = output.text();
                if options.inline_source_map {
                    let map = source_map(&output, &outputs.js, &outputs.js, request.path);
                    let url = map.to_data_url().map_err(map_fault)?;
                    text.push_str(&format!("//# sourceMappingURL={url}"));
                } else if options.source_map {
                    text.push_str(&format!("//# sourceMappingURL={}", file_name(&outputs.js_map)));
                }
                Ok(text)
            }
            ArtifactKind::JsMap => {
                let output = js::js_output(&info, options);
                source_map(&output, &outputs.js, &outputs.js_map, request.path)
                    .to_json()
                    .map_err(map_fault)
            }
            ArtifactKind::Dts => {
                let mut text = declarations::declaration_output(&info).text();
                if options.declaration_map {
                    text.push_str(&format!("//# sourceMappingURL={}", file_name(&outputs.dts_map)));
                }
                Ok(text)
            }
            ArtifactKind::DtsMap => {
                let output = declarations::declaration_output(&info);
                source_map(&output, &outputs.dts, &outputs.dts_map, request.path)
                    .to_json()
                    .map_err(map_fault)
            }
        }
    }
}

fn analyze(
    program: &dyn skiff_incremental::ProgramView,
    file: skiff_incremental::FileId,
    path: &str,
) -> Result<std::rc::Rc<ModuleInfo>, CheckerFault> {
    Analyzer::new(program)
        .analyze(file)
        .ok_or_else(|| CheckerFault::new(format!("{path} is not part of the program")))
}

/// Builds the map for `output`, written as `generated` and stored at
/// `map_path`; sources are relative to the map's directory.
fn source_map(output: &Output, generated: &str, map_path: &str, source: &str) -> SourceMap {
    SourceMap::from_lines(
        file_name(generated),
        &relative_path(parent_dir(map_path), source),
        &output.source_lines(),
    )
}

fn map_fault(err: serde_json::Error) -> CheckerFault {
    CheckerFault::new(format!("cannot serialize source map: {err}"))
}
