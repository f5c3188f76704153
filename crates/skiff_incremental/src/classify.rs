//! Classification of what changed since the previous build.

use skiff_config::CompilerOptions;

use crate::emit_kind::EmitKind;
use crate::snapshot::BuildSnapshot;
use crate::version::FileVersionStore;

/// Option differences between the previous build and this one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OptionChanges {
    /// Checking results may differ, so every file is rechecked.
    pub semantic: bool,
    /// Outputs moved, so every enabled kind is rewritten for every file.
    pub output_location: bool,
    /// Kinds rewritten for every file because an emit-shape option flipped.
    pub emit_pending: EmitKind,
}

impl OptionChanges {
    /// Returns `true` if no option class changed.
    pub fn is_empty(&self) -> bool {
        !self.semantic && !self.output_location && self.emit_pending.is_empty()
    }
}

/// Files and options that differ from the previous snapshot.
///
/// Computed from content hashes and option values only; dependency effects
/// are the propagator's concern.
#[derive(Clone, Debug, Default)]
pub struct ChangeSet {
    /// A usable previous snapshot existed.
    pub previous_available: bool,
    /// Files whose version is unchanged.
    pub unchanged: Vec<String>,
    /// Files whose version changed.
    pub changed: Vec<String>,
    /// Files new to the program.
    pub added: Vec<String>,
    /// Files that left the program.
    pub removed: Vec<String>,
    /// The first changed, added or removed file that declares globals.
    pub global_scope_change: Option<String>,
    /// Option differences.
    pub options: OptionChanges,
}

impl ChangeSet {
    /// Returns `true` if neither files nor options changed.
    pub fn is_empty(&self) -> bool {
        self.previous_available
            && self.changed.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
            && self.options.is_empty()
    }

    /// Returns the number of files whose content must be reprocessed.
    pub fn dirty_count(&self) -> usize {
        self.changed.len() + self.added.len()
    }
}

/// Compares the current file versions and options against a snapshot.
pub struct ChangeClassifier;

impl ChangeClassifier {
    /// Classifies `current` against `previous`.
    ///
    /// Without a previous snapshot every file is added and every option
    /// class counts as changed.
    pub fn classify(
        previous: Option<&BuildSnapshot>,
        current: &FileVersionStore,
        options: &CompilerOptions,
    ) -> ChangeSet {
        let Some(previous) = previous else {
            return ChangeSet {
                previous_available: false,
                added: current.iter().map(|(p, _)| p.to_string()).collect(),
                options: OptionChanges {
                    semantic: true,
                    output_location: true,
                    emit_pending: EmitKind::enabled_by(options),
                },
                ..ChangeSet::default()
            };
        };

        let diff = current.diff_against(&previous.versions);
        let declares_globals = |path: &String| {
            current.get(path).is_some_and(|r| r.affects_global_scope)
                || previous.versions.get(path).is_some_and(|r| r.affects_global_scope)
        };
        let global_scope_change = diff
            .changed
            .iter()
            .chain(&diff.added)
            .chain(&diff.removed)
            .find(|p| declares_globals(*p))
            .cloned();

        let option_changes = OptionChanges {
            semantic: options.semantics_differ(&previous.options),
            output_location: options.output_location_differs(&previous.options),
            emit_pending: EmitKind::pending_on_change(
                EmitKind::enabled_by(&previous.options),
                EmitKind::enabled_by(options),
            ),
        };

        ChangeSet {
            previous_available: true,
            unchanged: diff.unchanged,
            changed: diff.changed,
            added: diff.added,
            removed: diff.removed,
            global_scope_change,
            options: option_changes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(files: &[(&str, &str, bool)], options: CompilerOptions) -> BuildSnapshot {
        let mut snapshot = BuildSnapshot::new(options);
        for (path, text, global) in files {
            snapshot.files.get_or_insert(path);
            snapshot.versions.record_version(path, text.as_bytes());
            snapshot.versions.get_mut(path).unwrap().affects_global_scope = *global;
        }
        snapshot
    }

    fn store(files: &[(&str, &str, bool)]) -> FileVersionStore {
        snapshot(files, CompilerOptions::default()).versions
    }

    #[test]
    fn no_previous_means_everything_added() {
        let current = store(&[("a.ts", "a", false), ("b.ts", "b", false)]);
        let changes = ChangeClassifier::classify(None, &current, &CompilerOptions::default());
        assert!(!changes.previous_available);
        assert_eq!(changes.added, vec!["a.ts", "b.ts"]);
        assert!(changes.options.semantic);
        assert!(!changes.is_empty());
    }

    #[test]
    fn unchanged_build_is_empty() {
        let files = [("a.ts", "a", false)];
        let previous = snapshot(&files, CompilerOptions::default());
        let changes =
            ChangeClassifier::classify(Some(&previous), &store(&files), &CompilerOptions::default());
        assert!(changes.is_empty());
        assert_eq!(changes.unchanged, vec!["a.ts"]);
    }

    #[test]
    fn content_changes_are_classified() {
        let previous = snapshot(
            &[("a.ts", "a", false), ("b.ts", "b", false)],
            CompilerOptions::default(),
        );
        let current = store(&[("a.ts", "a2", false), ("c.ts", "c", false)]);
        let changes =
            ChangeClassifier::classify(Some(&previous), &current, &CompilerOptions::default());
        assert_eq!(changes.changed, vec!["a.ts"]);
        assert_eq!(changes.added, vec!["c.ts"]);
        assert_eq!(changes.removed, vec!["b.ts"]);
        assert_eq!(changes.dirty_count(), 2);
        assert!(changes.global_scope_change.is_none());
    }

    #[test]
    fn global_file_change_is_flagged() {
        let previous = snapshot(
            &[("a.ts", "a", false), ("globals.d.ts", "g", true)],
            CompilerOptions::default(),
        );
        let current = store(&[("a.ts", "a", false), ("globals.d.ts", "g2", true)]);
        let changes =
            ChangeClassifier::classify(Some(&previous), &current, &CompilerOptions::default());
        assert_eq!(changes.global_scope_change.as_deref(), Some("globals.d.ts"));
    }

    #[test]
    fn removed_global_file_is_flagged() {
        let previous = snapshot(
            &[("a.ts", "a", false), ("globals.d.ts", "g", true)],
            CompilerOptions::default(),
        );
        let current = store(&[("a.ts", "a", false)]);
        let changes =
            ChangeClassifier::classify(Some(&previous), &current, &CompilerOptions::default());
        assert_eq!(changes.global_scope_change.as_deref(), Some("globals.d.ts"));
    }

    #[test]
    fn option_classes_are_separated() {
        let files = [("a.ts", "a", false)];
        let previous = snapshot(&files, CompilerOptions::default());

        let source_maps = CompilerOptions {
            source_map: true,
            ..CompilerOptions::default()
        };
        let changes = ChangeClassifier::classify(Some(&previous), &store(&files), &source_maps);
        assert!(!changes.options.semantic);
        assert!(!changes.options.output_location);
        assert_eq!(changes.options.emit_pending, EmitKind::JS | EmitKind::JS_MAP);

        let strict = CompilerOptions {
            strict: true,
            ..CompilerOptions::default()
        };
        let changes = ChangeClassifier::classify(Some(&previous), &store(&files), &strict);
        assert!(changes.options.semantic);
        assert!(changes.options.emit_pending.is_empty());

        let moved = CompilerOptions {
            out_dir: Some("dist".to_string()),
            ..CompilerOptions::default()
        };
        let changes = ChangeClassifier::classify(Some(&previous), &store(&files), &moved);
        assert!(changes.options.output_location);
    }
}
