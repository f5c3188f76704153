//! Program discovery: the transitive closure of the root files.

use std::collections::{HashMap, HashSet, VecDeque};

use skiff_common::{join_relative, normalize_path, parent_dir, ContentHash};
use skiff_diagnostics::{Category, Diagnostic, DiagnosticCode};

use crate::file_id::{FileId, FileTable};
use crate::fs::FileSystem;
use crate::graph::DependencyGraph;
use crate::host::{Checker, ProgramView, Reference, ReferenceKind, ScanOutput};
use crate::outputs::is_declaration_file;

/// A root file could not be read.
pub const FILE_NOT_FOUND: DiagnosticCode = DiagnosticCode::new(Category::Build, 6053);
/// A referenced file exists but could not be read.
pub const FILE_UNREADABLE: DiagnosticCode = DiagnosticCode::new(Category::Build, 6054);

/// A loaded program file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// The file's id in the program.
    pub id: FileId,
    /// Project-relative path.
    pub path: String,
    /// Text, decoded lossily from the raw bytes.
    pub text: String,
    /// Hash of the raw bytes.
    pub version: ContentHash,
    /// Result of the syntactic scan.
    pub scan: ScanOutput,
    /// Target of each entry in `scan.references`.
    pub resolved: Vec<Option<FileId>>,
}

impl SourceFile {
    /// Returns `true` for `.d.ts` inputs.
    pub fn is_declaration(&self) -> bool {
        is_declaration_file(&self.path)
    }

    /// Resolved dependencies, sorted and deduplicated.
    pub fn dependencies(&self) -> Vec<FileId> {
        let mut deps: Vec<FileId> = self.resolved.iter().flatten().copied().collect();
        deps.sort_unstable();
        deps.dedup();
        deps
    }
}

/// The set of files taking part in one build.
#[derive(Debug, Default)]
pub struct Program {
    index: HashMap<String, FileId>,
    files: Vec<SourceFile>,
    diagnostics: Vec<Diagnostic>,
}

impl Program {
    /// Loads the root files and everything they reference, breadth first.
    ///
    /// Ids follow discovery order: roots in the given order, then referenced
    /// files level by level. Unreadable files are left out and reported.
    pub fn load(fs: &dyn FileSystem, checker: &dyn Checker, roots: &[String]) -> Program {
        Self::load_excluding(fs, checker, roots, &HashSet::new())
    }

    /// Like [`load`](Self::load), but references never resolve to a path in
    /// `outputs`.
    ///
    /// Builds pass the artifacts of known sources here, so a declaration
    /// emitted next to a deleted source is not picked up as its replacement.
    /// Roots are loaded even when listed.
    pub fn load_excluding(
        fs: &dyn FileSystem,
        checker: &dyn Checker,
        roots: &[String],
        outputs: &HashSet<String>,
    ) -> Program {
        struct Loaded {
            path: String,
            text: String,
            version: ContentHash,
            scan: ScanOutput,
            targets: Vec<Option<String>>,
        }

        let mut queue: VecDeque<(String, bool)> = VecDeque::new();
        let mut seen: HashSet<String> = HashSet::new();
        for root in roots {
            let root = normalize_path(root);
            if seen.insert(root.clone()) {
                queue.push_back((root, true));
            }
        }

        let mut loaded = Vec::new();
        let mut diagnostics = Vec::new();
        while let Some((path, is_root)) = queue.pop_front() {
            let bytes = match fs.read_file(&path) {
                Ok(bytes) => bytes,
                Err(err) => {
                    let diag = if is_root {
                        Diagnostic::error(FILE_NOT_FOUND, format!("file '{path}' not found"))
                    } else {
                        Diagnostic::error(FILE_UNREADABLE, format!("cannot read file '{path}'"))
                            .with_note(err.to_string())
                    };
                    tracing::debug!(target: "skiff.incremental", %path, error = %err, "skipping unreadable file");
                    diagnostics.push(diag.in_file(path));
                    continue;
                }
            };
            let version = ContentHash::from_bytes(&bytes);
            let text = String::from_utf8_lossy(&bytes).into_owned();
            let scan = checker.scan(&path, &text);
            let targets: Vec<Option<String>> = scan
                .references
                .iter()
                .map(|reference| resolve_reference(fs, &path, reference, outputs))
                .collect();
            for target in targets.iter().flatten() {
                if seen.insert(target.clone()) {
                    queue.push_back((target.clone(), false));
                }
            }
            loaded.push(Loaded {
                path,
                text,
                version,
                scan,
                targets,
            });
        }

        let index: HashMap<String, FileId> = loaded
            .iter()
            .enumerate()
            .map(|(idx, l)| (l.path.clone(), FileId::from_raw(idx as u32)))
            .collect();
        let files = loaded
            .into_iter()
            .enumerate()
            .map(|(idx, l)| SourceFile {
                id: FileId::from_raw(idx as u32),
                resolved: l
                    .targets
                    .iter()
                    .map(|t| t.as_deref().and_then(|t| index.get(t).copied()))
                    .collect(),
                path: l.path,
                text: l.text,
                version: l.version,
                scan: l.scan,
            })
            .collect();

        let program = Program {
            index,
            files,
            diagnostics,
        };
        tracing::debug!(target: "skiff.incremental", files = program.len(), "program loaded");
        program
    }

    /// Returns a file table with the same ids as the program.
    pub fn file_table(&self) -> FileTable {
        self.files.iter().map(|f| f.path.as_str()).collect()
    }

    /// Returns all files in id order.
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Returns one file.
    pub fn file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.index())
    }

    /// Returns the file at `path`.
    pub fn file_by_path(&self, path: &str) -> Option<&SourceFile> {
        self.index.get(path).and_then(|id| self.file(*id))
    }

    /// Returns the number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if no file could be loaded.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Problems found while loading.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Builds the dependency graph of the program.
    pub fn dependency_graph(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for file in &self.files {
            graph.set_dependencies(file.id, file.dependencies());
        }
        graph
    }
}

impl ProgramView for Program {
    fn file_id(&self, path: &str) -> Option<FileId> {
        self.index.get(path).copied()
    }

    fn file_path(&self, file: FileId) -> Option<&str> {
        self.file(file).map(|f| f.path.as_str())
    }

    fn file_text(&self, file: FileId) -> Option<&str> {
        self.file(file).map(|f| f.text.as_str())
    }

    fn resolve(&self, from: FileId, specifier: &str) -> Option<FileId> {
        let file = self.file(from)?;
        file.scan
            .references
            .iter()
            .position(|r| r.specifier == specifier)
            .and_then(|idx| file.resolved.get(idx).copied().flatten())
    }

    fn global_files(&self) -> Vec<FileId> {
        self.files
            .iter()
            .filter(|f| f.scan.affects_global_scope)
            .map(|f| f.id)
            .collect()
    }
}

/// Resolves a reference to an existing file path.
///
/// A specifier naming a `.ts` file is taken as is. Otherwise relative
/// imports try `x.ts`, `x.d.ts`, `x/index.ts` and `x/index.d.ts`, and a
/// `.js` specifier maps to its TypeScript source. Candidates in `outputs`
/// are skipped. Bare module names are not resolved.
pub fn resolve_reference(
    fs: &dyn FileSystem,
    from: &str,
    reference: &Reference,
    outputs: &HashSet<String>,
) -> Option<String> {
    let spec = reference.specifier.as_str();
    let relative = spec.starts_with("./") || spec.starts_with("../") || spec == "." || spec == "..";
    if reference.kind == ReferenceKind::Import && !relative {
        return None;
    }
    let base = join_relative(parent_dir(from), spec);
    let candidates: Vec<String> = if base.ends_with(".ts") {
        vec![base]
    } else if let Some(stem) = base.strip_suffix(".js") {
        vec![format!("{stem}.ts"), format!("{stem}.d.ts")]
    } else {
        vec![
            format!("{base}.ts"),
            format!("{base}.d.ts"),
            format!("{base}/index.ts"),
            format!("{base}/index.d.ts"),
        ]
    };
    candidates
        .into_iter()
        .find(|c| !outputs.contains(c) && fs.exists(c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use crate::host::{CheckOutput, CheckRequest, CheckerFault};

    /// Treats every line `import <spec>` as an import and `ref <spec>` as a
    /// triple-slash reference; `global` marks the file as global.
    struct LineScanner;

    impl Checker for LineScanner {
        fn scan(&self, _path: &str, text: &str) -> ScanOutput {
            let mut out = ScanOutput::default();
            for line in text.lines() {
                if let Some(spec) = line.strip_prefix("import ") {
                    out.references.push(Reference::import(spec.trim()));
                } else if let Some(spec) = line.strip_prefix("ref ") {
                    out.references.push(Reference::triple_path(spec.trim()));
                } else if line.trim() == "global" {
                    out.affects_global_scope = true;
                }
            }
            out
        }

        fn type_check(&self, _request: &CheckRequest<'_>) -> Result<CheckOutput, CheckerFault> {
            Ok(CheckOutput::default())
        }
    }

    fn load(fs: &MemoryFs, roots: &[&str]) -> Program {
        let roots: Vec<String> = roots.iter().map(|r| r.to_string()).collect();
        Program::load(fs, &LineScanner, &roots)
    }

    #[test]
    fn ids_follow_discovery_order() {
        let fs = MemoryFs::with_files([
            ("src/main.ts", "import ./b\nimport ./a"),
            ("src/a.ts", "import ./c"),
            ("src/b.ts", ""),
            ("src/c.ts", ""),
        ]);
        let program = load(&fs, &["src/main.ts"]);
        let paths: Vec<&str> = program.files().iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["src/main.ts", "src/b.ts", "src/a.ts", "src/c.ts"]);
        assert!(program.diagnostics().is_empty());
    }

    #[test]
    fn resolution_tries_extensions_and_index() {
        let fs = MemoryFs::with_files([
            ("main.ts", "import ./lib\nimport ./types\nimport ./util.js\nimport lodash"),
            ("lib/index.ts", ""),
            ("types.d.ts", ""),
            ("util.ts", ""),
        ]);
        let program = load(&fs, &["main.ts"]);
        let main = program.file_by_path("main.ts").unwrap();
        let targets: Vec<Option<&str>> = main
            .resolved
            .iter()
            .map(|r| r.and_then(|id| program.file_path(id)))
            .collect();
        assert_eq!(
            targets,
            vec![Some("lib/index.ts"), Some("types.d.ts"), Some("util.ts"), None]
        );
        assert!(program.file_by_path("types.d.ts").unwrap().is_declaration());
    }

    #[test]
    fn triple_slash_paths_are_relative_without_dot() {
        let fs = MemoryFs::with_files([("src/a.ts", "ref globals.d.ts"), ("src/globals.d.ts", "global")]);
        let program = load(&fs, &["src/a.ts"]);
        assert_eq!(program.len(), 2);
        assert_eq!(program.global_files(), vec![FileId::from_raw(1)]);
    }

    #[test]
    fn missing_root_is_reported_and_skipped() {
        let fs = MemoryFs::with_files([("a.ts", "")]);
        let program = load(&fs, &["gone.ts", "a.ts"]);
        assert_eq!(program.len(), 1);
        assert_eq!(program.files()[0].id, FileId::from_raw(0));
        let diag = &program.diagnostics()[0];
        assert_eq!(diag.code, FILE_NOT_FOUND);
        assert_eq!(diag.file(), Some("gone.ts"));
    }

    #[test]
    fn cycles_load_once() {
        let fs = MemoryFs::with_files([("a.ts", "import ./b"), ("b.ts", "import ./a\nimport ./b")]);
        let program = load(&fs, &["a.ts", "./b.ts"]);
        assert_eq!(program.len(), 2);
        let graph = program.dependency_graph();
        let (a, b) = (FileId::from_raw(0), FileId::from_raw(1));
        assert!(graph.has_edge(a, b));
        assert!(graph.has_edge(b, a));
        assert!(graph.has_edge(b, b));
    }

    #[test]
    fn excluded_outputs_do_not_resolve() {
        let fs = MemoryFs::with_files([
            ("main.ts", "import ./util\nimport ./types"),
            ("util.d.ts", ""),
            ("util.js", ""),
            ("types.d.ts", ""),
        ]);
        let roots = vec!["main.ts".to_string()];
        let outputs: HashSet<String> = ["util.js", "util.d.ts"].map(String::from).into();
        let program = Program::load_excluding(&fs, &LineScanner, &roots, &outputs);
        let main = program.file_by_path("main.ts").unwrap();
        assert_eq!(main.resolved[0], None);
        assert_eq!(main.resolved[1], program.file_id("types.d.ts"));
        assert!(program.file_by_path("util.d.ts").is_none());

        let with_util = load(&fs, &["main.ts"]);
        assert!(with_util.file_by_path("util.d.ts").is_some());
    }

    #[test]
    fn view_resolves_written_specifiers() {
        let fs = MemoryFs::with_files([("a.ts", "import ./b"), ("b.ts", "")]);
        let program = load(&fs, &["a.ts"]);
        let a = program.file_id("a.ts").unwrap();
        assert_eq!(program.resolve(a, "./b"), program.file_id("b.ts"));
        assert_eq!(program.resolve(a, "./c"), None);
        assert_eq!(program.file_text(a), Some("import ./b"));
    }
}
