//! Configuration types deserialized from `skiff.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Default location of the persisted build-info file, relative to the project root.
pub const DEFAULT_BUILD_INFO_FILE: &str = ".skiff/buildinfo.json";

/// The top-level project configuration parsed from `skiff.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata (name, root files).
    pub project: ProjectMeta,
    /// Options controlling checking and emit.
    #[serde(default)]
    pub compiler_options: CompilerOptions,
}

/// Core project metadata required in every `skiff.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// The project version string.
    #[serde(default)]
    pub version: String,
    /// Root source files, relative to the project directory.
    ///
    /// Accepts either a single string or a list. Files referenced from the
    /// roots are pulled into the program transitively.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub files: Vec<String>,
}

/// Deserializes a field that can be either a single string or a list of strings.
///
/// Allows `files = "src/main.ts"` as well as `files = ["src/a.ts", "src/b.ts"]`.
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

/// Compiler options that influence what is checked and what is emitted.
///
/// The same struct is persisted inside the build-info snapshot so the next
/// build can tell which option classes changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    /// Directory that receives emitted files. Outputs sit next to their sources when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<String>,
    /// Source prefix stripped from output paths when `out_dir` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_dir: Option<String>,
    /// Emit `.d.ts` declaration files.
    pub declaration: bool,
    /// Emit `.d.ts.map` files for declarations.
    pub declaration_map: bool,
    /// Emit `.js.map` files next to JavaScript output.
    pub source_map: bool,
    /// Embed the JavaScript source map in the `.js` file.
    pub inline_source_map: bool,
    /// Emit only declaration artifacts.
    pub emit_declaration_only: bool,
    /// Check without emitting anything.
    pub no_emit: bool,
    /// Suppress all emit while the program has errors.
    pub no_emit_on_error: bool,
    /// Enable strict checking rules.
    pub strict: bool,
    /// Language level of emitted JavaScript.
    pub target: Target,
    /// Module format of emitted JavaScript.
    pub module: ModuleKind,
    /// Persist and reuse build-info between invocations.
    pub incremental: bool,
    /// Location of the build-info file, relative to the project root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_info_file: Option<String>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            out_dir: None,
            root_dir: None,
            declaration: false,
            declaration_map: false,
            source_map: false,
            inline_source_map: false,
            emit_declaration_only: false,
            no_emit: false,
            no_emit_on_error: false,
            strict: false,
            target: Target::default(),
            module: ModuleKind::default(),
            incremental: true,
            build_info_file: None,
        }
    }
}

impl CompilerOptions {
    /// Returns `true` if switching between `self` and `other` changes checker results,
    /// which forces every file to be rechecked.
    pub fn semantics_differ(&self, other: &CompilerOptions) -> bool {
        self.strict != other.strict || self.target != other.target || self.module != other.module
    }

    /// Returns `true` if switching between `self` and `other` moves output files.
    pub fn output_location_differs(&self, other: &CompilerOptions) -> bool {
        self.out_dir != other.out_dir || self.root_dir != other.root_dir
    }

    /// Returns the build-info path, falling back to [`DEFAULT_BUILD_INFO_FILE`].
    pub fn build_info_path(&self) -> &str {
        self.build_info_file
            .as_deref()
            .unwrap_or(DEFAULT_BUILD_INFO_FILE)
    }
}

/// Language level of emitted JavaScript.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// ECMAScript 5.
    Es5,
    /// ECMAScript 2015.
    Es2015,
    /// ECMAScript 2020 (default).
    #[default]
    Es2020,
    /// Latest supported ECMAScript.
    EsNext,
}

/// Module format of emitted JavaScript.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// CommonJS `require`/`exports`.
    CommonJs,
    /// ECMAScript modules (default).
    #[default]
    EsNext,
}
