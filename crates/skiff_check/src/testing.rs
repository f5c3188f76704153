//! Test helpers: in-memory programs checked with [`SkiffChecker`].

use std::rc::Rc;

use skiff_incremental::{MemoryFs, Program, ProgramView};

use crate::analysis::{Analyzer, ModuleInfo};
use crate::SkiffChecker;

/// Loads a program rooted at every given file.
pub(crate) fn load(files: &[(&str, &str)]) -> Program {
    let fs = MemoryFs::with_files(files.iter().copied());
    let roots: Vec<String> = files.iter().map(|(path, _)| path.to_string()).collect();
    Program::load(&fs, &SkiffChecker, &roots)
}

/// Analyzes `path` within a program of `files`.
pub(crate) fn analyze(files: &[(&str, &str)], path: &str) -> Rc<ModuleInfo> {
    let program = load(files);
    let file = program.file_id(path).expect("file in program");
    Analyzer::new(&program).analyze(file).expect("analyzable file")
}
