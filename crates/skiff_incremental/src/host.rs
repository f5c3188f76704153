//! Interfaces to the language front end.
//!
//! The engine decides what to check and emit; a [`Checker`] and an [`Emitter`]
//! do the language work. Both are called from worker threads.

use skiff_common::ContentHash;
use skiff_config::CompilerOptions;
use skiff_diagnostics::Diagnostic;

use crate::emit_kind::ArtifactKind;
use crate::file_id::FileId;
use crate::outputs::OutputPaths;
use crate::version::ImpliedFormat;

/// How a file refers to another file.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ReferenceKind {
    /// `import ... from "x"` or `export ... from "x"`.
    Import,
    /// `/// <reference path="x" />`.
    TriplePath,
}

/// A reference to another file found by [`Checker::scan`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Reference {
    /// The specifier as written.
    pub specifier: String,
    /// The syntax the reference came from.
    pub kind: ReferenceKind,
}

impl Reference {
    /// Creates an import reference.
    pub fn import(specifier: impl Into<String>) -> Self {
        Self {
            specifier: specifier.into(),
            kind: ReferenceKind::Import,
        }
    }

    /// Creates a triple-slash path reference.
    pub fn triple_path(specifier: impl Into<String>) -> Self {
        Self {
            specifier: specifier.into(),
            kind: ReferenceKind::TriplePath,
        }
    }
}

/// What a cheap syntactic pass learns about a file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanOutput {
    /// Outgoing references in source order.
    pub references: Vec<Reference>,
    /// The file declares globals visible without an import.
    pub affects_global_scope: bool,
    /// Module interpretation, if the front end determines one.
    pub implied_format: Option<ImpliedFormat>,
}

/// Read-only view of the loaded program.
pub trait ProgramView: Sync {
    /// Returns the id of a program file.
    fn file_id(&self, path: &str) -> Option<FileId>;
    /// Returns the path of a program file.
    fn file_path(&self, file: FileId) -> Option<&str>;
    /// Returns the text of a program file.
    fn file_text(&self, file: FileId) -> Option<&str>;
    /// Resolves a specifier written in `from` to a program file.
    fn resolve(&self, from: FileId, specifier: &str) -> Option<FileId>;
    /// Returns every file that declares globals, in id order.
    fn global_files(&self) -> Vec<FileId>;
}

/// Signature of one dependency at the time a file is checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DependencySignature {
    /// The dependency.
    pub file: FileId,
    /// Its project-relative path.
    pub path: String,
    /// Its finalized signature, or `None` if it never checked cleanly.
    pub signature: Option<ContentHash>,
}

/// Input to [`Checker::type_check`].
pub struct CheckRequest<'a> {
    /// The file to check.
    pub file: FileId,
    /// Its path.
    pub path: &'a str,
    /// Its text.
    pub text: &'a str,
    /// Signatures of its direct dependencies, already finalized for this build.
    pub dependency_signatures: Vec<DependencySignature>,
    /// The program the file belongs to.
    pub program: &'a dyn ProgramView,
    /// Active options.
    pub options: &'a CompilerOptions,
}

/// Result of checking a file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckOutput {
    /// Problems found in the file.
    pub diagnostics: Vec<Diagnostic>,
    /// The file's declaration text; `None` for declaration inputs, whose
    /// signature is their version.
    pub declaration: Option<String>,
}

/// An internal failure of the front end for one file.
///
/// Distinct from diagnostics: a fault means the checker could not produce a
/// trustworthy result at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CheckerFault {
    /// Description of the failure.
    pub message: String,
}

impl CheckerFault {
    /// Creates a fault with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The type checker.
pub trait Checker: Send + Sync {
    /// Extracts references and global-scope information without checking.
    fn scan(&self, path: &str, text: &str) -> ScanOutput;

    /// Checks one file against its dependencies and produces its declaration.
    fn type_check(&self, request: &CheckRequest<'_>) -> Result<CheckOutput, CheckerFault>;
}

/// Input to [`Emitter::emit`].
pub struct EmitRequest<'a> {
    /// The source file.
    pub file: FileId,
    /// Its path.
    pub path: &'a str,
    /// Its text.
    pub text: &'a str,
    /// The artifact to produce.
    pub artifact: ArtifactKind,
    /// Where every artifact of the file goes, for map links.
    pub outputs: &'a OutputPaths,
    /// The program the file belongs to.
    pub program: &'a dyn ProgramView,
    /// Active options.
    pub options: &'a CompilerOptions,
}

/// The code generator.
pub trait Emitter: Send + Sync {
    /// Produces the text of one artifact.
    fn emit(&self, request: &EmitRequest<'_>) -> Result<String, CheckerFault>;
}
