//! Incremental build engine.
//!
//! Decides on every invocation which files must be rechecked and which
//! output artifacts must be rewritten, and persists enough state (the build
//! info) that a fresh process resumes where the previous one stopped.
//!
//! A build runs in two phases. [`plan_build`] loads the program, classifies
//! it against the previous [`BuildSnapshot`], rechecks the affected files
//! with signature-based early cutoff and plans the emit work.
//! [`BuildPlan::execute`] then writes the planned artifacts, skipping outputs
//! whose bytes already match. [`Builder`] wraps both with locking and
//! build-info persistence.

#![warn(missing_docs)]

pub mod builder;
pub mod cancel;
pub mod classify;
pub mod codec;
pub mod driver;
pub mod emit_kind;
pub mod error;
pub mod file_id;
pub mod fs;
pub mod graph;
pub mod host;
pub mod lock;
pub mod outputs;
pub mod planner;
pub mod program;
pub mod propagate;
pub mod report;
pub mod snapshot;
pub mod version;

#[cfg(test)]
mod testing;

pub use builder::{BuildFlags, Builder};
pub use cancel::CancellationToken;
pub use classify::{ChangeClassifier, ChangeSet, OptionChanges};
pub use codec::BuildInfoCodec;
pub use driver::{plan_build, BuildHost, BuildPlan, CompletedBuild, EMIT_FAULT, WRITE_FAILED};
pub use emit_kind::{ArtifactKind, EmitKind};
pub use error::{BuildError, DecodeError};
pub use file_id::{FileId, FileTable};
pub use fs::{FileSystem, MemoryFs, RealFs};
pub use graph::DependencyGraph;
pub use host::{
    CheckOutput, CheckRequest, Checker, CheckerFault, DependencySignature, EmitRequest, Emitter,
    ProgramView, Reference, ReferenceKind, ScanOutput,
};
pub use lock::BuildLock;
pub use outputs::OutputPaths;
pub use planner::{Deferral, EmitAction, EmitPlan, EmitPlanner};
pub use program::{Program, SourceFile, FILE_NOT_FOUND, FILE_UNREADABLE};
pub use propagate::{AffectedFilePropagator, CheckReason, CheckedFile, Propagation, CHECKER_FAULT};
pub use report::{
    BuildReport, CheckRecord, CleanReport, EmitRecord, SnapshotStatus, StatusReport, WriteOutcome,
};
pub use snapshot::BuildSnapshot;
pub use version::{FileRecord, FileVersionStore, ImpliedFormat, VersionDiff};
