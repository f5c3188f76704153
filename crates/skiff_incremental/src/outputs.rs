//! Output file locations for a source file under the current options.

use skiff_common::{join_relative, normalize_path};
use skiff_config::CompilerOptions;

use crate::emit_kind::ArtifactKind;

/// Paths of every artifact a source file can produce.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputPaths {
    /// `.js` output.
    pub js: String,
    /// `.js.map` output.
    pub js_map: String,
    /// `.d.ts` output.
    pub dts: String,
    /// `.d.ts.map` output.
    pub dts_map: String,
}

impl OutputPaths {
    /// Computes output paths for `source`, or `None` for declaration inputs
    /// and files that are not TypeScript sources.
    ///
    /// With `out_dir` set, the `root_dir` prefix (when it matches) is stripped
    /// and the remainder placed under `out_dir`.
    pub fn for_source(source: &str, options: &CompilerOptions) -> Option<Self> {
        if is_declaration_file(source) {
            return None;
        }
        let stem = source.strip_suffix(".ts")?;
        let base = match options.out_dir.as_deref() {
            Some(out_dir) => {
                let relative = options
                    .root_dir
                    .as_deref()
                    .and_then(|root| stem.strip_prefix(root))
                    .and_then(|rest| rest.strip_prefix('/'))
                    .unwrap_or(stem);
                join_relative(out_dir, relative)
            }
            None => normalize_path(stem),
        };
        let js = format!("{base}.js");
        let dts = format!("{base}.d.ts");
        Some(Self {
            js_map: format!("{js}.map"),
            dts_map: format!("{dts}.map"),
            js,
            dts,
        })
    }

    /// All four artifact paths.
    pub fn all(&self) -> [&str; 4] {
        [&self.js, &self.js_map, &self.dts, &self.dts_map]
    }

    /// Returns the path written for one artifact.
    pub fn get(&self, artifact: ArtifactKind) -> &str {
        match artifact {
            ArtifactKind::Js => &self.js,
            ArtifactKind::JsMap => &self.js_map,
            ArtifactKind::Dts => &self.dts,
            ArtifactKind::DtsMap => &self.dts_map,
        }
    }
}

/// Returns `true` for `.d.ts` declaration inputs.
pub fn is_declaration_file(path: &str) -> bool {
    path.ends_with(".d.ts")
}
