//! JSON encoding of [`BuildSnapshot`] as the persisted build-info document.
//!
//! The document refers to files by their index in `fileNames`. Dependency
//! sets are stored once in `fileIdsList` and referenced by index from
//! `referencedMap`, so files sharing the same imports cost one small pair
//! each. Decoding is fail-safe: anything malformed, inconsistent, or written
//! by an incompatible encoder is a cache miss.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use skiff_common::{ContentHash, InternalError, SkiffResult};
use skiff_config::CompilerOptions;
use skiff_diagnostics::Diagnostic;

use crate::emit_kind::EmitKind;
use crate::error::{BuildError, DecodeError};
use crate::file_id::{FileId, FileTable};
use crate::graph::DependencyGraph;
use crate::snapshot::BuildSnapshot;
use crate::version::{FileRecord, FileVersionStore, ImpliedFormat};

const IMPLIED_FORMAT_KEY: &str = "impliedNodeFormat";

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildInfoDocument {
    version: String,
    file_names: Vec<String>,
    file_infos: Vec<FileInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    file_ids_list: Vec<Vec<u32>>,
    #[serde(default)]
    options: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    referenced_map: Vec<(u32, u32)>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    affected_files_pending_emit: Vec<(u32, u8)>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    change_file_set: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    semantic_diagnostics_per_file: Vec<(u32, Vec<Diagnostic>)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    latest_changed_dts_file: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    errors: bool,
    #[serde(default)]
    size: u64,
    #[serde(flatten)]
    unknown: Map<String, Value>,
}

/// A `fileInfos` entry. Older writers stored only the version string.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum FileInfo {
    VersionOnly(String),
    Full(FileInfoEntry),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileInfoEntry {
    version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    affects_global_scope: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    implied_node_format: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    original: Option<Map<String, Value>>,
    #[serde(flatten)]
    unknown: Map<String, Value>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Encoder and decoder for the build-info document.
pub struct BuildInfoCodec;

impl BuildInfoCodec {
    /// Schema version written by this encoder. Documents with the same major
    /// version are readable.
    pub const VERSION: &'static str = "1.0.0";

    /// Encodes a snapshot as pretty-printed JSON.
    ///
    /// The `size` field holds the byte length of the returned document.
    pub fn encode(snapshot: &BuildSnapshot) -> Result<Vec<u8>, BuildError> {
        let mut doc = Self::to_document(snapshot)?;
        let mut bytes = Vec::new();
        // Each pass can only grow the number by a digit, so this settles quickly.
        for _ in 0..8 {
            bytes = serde_json::to_vec_pretty(&doc).map_err(|e| BuildError::Serialization {
                reason: e.to_string(),
            })?;
            if bytes.len() as u64 == doc.size {
                break;
            }
            doc.size = bytes.len() as u64;
        }
        Ok(bytes)
    }

    /// Decodes a document, returning `None` for anything that cannot be used.
    pub fn decode(bytes: &[u8]) -> Option<BuildSnapshot> {
        match Self::try_decode(bytes) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::debug!(target: "skiff.incremental", error = %e, "discarding build info");
                None
            }
        }
    }

    /// Decodes a document, reporting why it was rejected.
    pub fn try_decode(bytes: &[u8]) -> Result<BuildSnapshot, DecodeError> {
        let doc: BuildInfoDocument = serde_json::from_slice(bytes)?;
        if !is_compatible(&doc.version) {
            return Err(DecodeError::IncompatibleVersion {
                found: doc.version,
                expected: Self::VERSION,
            });
        }
        if doc.file_infos.len() != doc.file_names.len() {
            return Err(DecodeError::Corrupt(format!(
                "{} file names but {} file infos",
                doc.file_names.len(),
                doc.file_infos.len()
            )));
        }

        let files: FileTable = doc.file_names.iter().map(String::as_str).collect();
        if files.len() != doc.file_names.len() {
            return Err(DecodeError::Corrupt("duplicate file names".to_string()));
        }
        let file_count = files.len();
        let check_id = |raw: u32| -> Result<FileId, DecodeError> {
            if (raw as usize) < file_count {
                Ok(FileId::from_raw(raw))
            } else {
                Err(DecodeError::Corrupt(format!("file id {raw} out of range")))
            }
        };

        let mut versions = FileVersionStore::new();
        for (path, info) in doc.file_names.iter().zip(doc.file_infos) {
            versions.insert(path.clone(), decode_file_info(info)?);
        }

        let mut lists: Vec<Vec<FileId>> = Vec::with_capacity(doc.file_ids_list.len());
        for list in &doc.file_ids_list {
            lists.push(list.iter().map(|raw| check_id(*raw)).collect::<Result<_, _>>()?);
        }
        let mut graph = DependencyGraph::new();
        for (file, list) in &doc.referenced_map {
            let deps = lists.get(*list as usize).ok_or_else(|| {
                DecodeError::Corrupt(format!("dependency list {list} out of range"))
            })?;
            graph.set_dependencies(check_id(*file)?, deps.iter().copied());
        }

        let mut pending_emit = BTreeMap::new();
        for (file, bits) in &doc.affected_files_pending_emit {
            let kinds = EmitKind::from_bits_truncate(*bits);
            if !kinds.is_empty() {
                pending_emit.insert(check_id(*file)?, kinds);
            }
        }
        let pending_check = doc
            .change_file_set
            .iter()
            .map(|raw| check_id(*raw))
            .collect::<Result<BTreeSet<_>, _>>()?;
        let mut diagnostics = BTreeMap::new();
        for (file, diags) in doc.semantic_diagnostics_per_file {
            diagnostics.insert(check_id(file)?, diags);
        }

        let options: CompilerOptions = serde_json::from_value(Value::Object(doc.options.clone()))?;
        let known = known_option_keys();
        let unknown_options = doc
            .options
            .into_iter()
            .filter(|(k, _)| !known.contains(k.as_str()))
            .collect();

        Ok(BuildSnapshot {
            files,
            versions,
            graph,
            options,
            unknown_options,
            latest_changed_dts_file: doc.latest_changed_dts_file,
            pending_emit,
            pending_check,
            diagnostics,
            errors: doc.errors,
            unknown_fields: doc.unknown,
        })
    }

    fn to_document(snapshot: &BuildSnapshot) -> Result<BuildInfoDocument, BuildError> {
        let mut file_names = Vec::with_capacity(snapshot.files.len());
        let mut file_infos = Vec::with_capacity(snapshot.files.len());
        for (_, path) in snapshot.files.iter() {
            let record = version_record(snapshot, path)?;
            file_names.push(path.to_string());
            file_infos.push(encode_file_info(record));
        }

        let mut file_ids_list: Vec<Vec<u32>> = Vec::new();
        let mut list_index: HashMap<&[FileId], u32> = HashMap::new();
        let mut referenced_map = Vec::new();
        for (file, deps) in snapshot.graph.iter() {
            let idx = *list_index.entry(&deps[..]).or_insert_with(|| {
                file_ids_list.push(deps.iter().map(|d| d.as_raw()).collect());
                (file_ids_list.len() - 1) as u32
            });
            referenced_map.push((file.as_raw(), idx));
        }

        let mut options = match serde_json::to_value(&snapshot.options) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(e) => {
                return Err(BuildError::Serialization {
                    reason: e.to_string(),
                })
            }
        };
        for (key, value) in &snapshot.unknown_options {
            options.entry(key.clone()).or_insert_with(|| value.clone());
        }

        Ok(BuildInfoDocument {
            version: Self::VERSION.to_string(),
            file_names,
            file_infos,
            file_ids_list,
            options,
            referenced_map,
            affected_files_pending_emit: snapshot
                .pending_emit
                .iter()
                .filter(|(_, kinds)| !kinds.is_empty())
                .map(|(id, kinds)| (id.as_raw(), kinds.bits()))
                .collect(),
            change_file_set: snapshot.pending_check.iter().map(|id| id.as_raw()).collect(),
            semantic_diagnostics_per_file: snapshot
                .diagnostics
                .iter()
                .filter(|(_, diags)| !diags.is_empty())
                .map(|(id, diags)| (id.as_raw(), diags.clone()))
                .collect(),
            latest_changed_dts_file: snapshot.latest_changed_dts_file.clone(),
            errors: snapshot.errors,
            size: 0,
            unknown: snapshot.unknown_fields.clone(),
        })
    }
}

fn version_record<'a>(snapshot: &'a BuildSnapshot, path: &str) -> SkiffResult<&'a FileRecord> {
    snapshot
        .versions
        .get(path)
        .ok_or_else(|| InternalError::new(format!("snapshot file '{path}' has no version record")))
}

fn encode_file_info(record: &FileRecord) -> FileInfo {
    FileInfo::Full(FileInfoEntry {
        version: record.version.to_string(),
        signature: record.signature.map(|s| s.to_string()),
        affects_global_scope: record.affects_global_scope,
        implied_node_format: record
            .implied_format
            .map(|f| Value::String(f.as_str().to_string())),
        original: record.original.clone(),
        unknown: Map::new(),
    })
}

fn decode_file_info(info: FileInfo) -> Result<FileRecord, DecodeError> {
    let entry = match info {
        FileInfo::VersionOnly(version) => {
            // Version-only entries predate separate signatures.
            let version = parse_hash(&version)?;
            return Ok(FileRecord {
                signature: Some(version),
                ..FileRecord::new(version)
            });
        }
        FileInfo::Full(entry) => entry,
    };

    let mut original = entry.original.unwrap_or_default();
    original.extend(entry.unknown);
    let implied_format = match entry.implied_node_format {
        None => None,
        Some(Value::String(name)) => match ImpliedFormat::parse(&name) {
            Some(format) => Some(format),
            None => {
                original.insert(IMPLIED_FORMAT_KEY.to_string(), Value::String(name));
                None
            }
        },
        Some(Value::Number(code)) => {
            let format = code.as_u64().and_then(ImpliedFormat::from_legacy_code);
            original.insert(IMPLIED_FORMAT_KEY.to_string(), Value::Number(code));
            format
        }
        Some(other) => {
            original.insert(IMPLIED_FORMAT_KEY.to_string(), other);
            None
        }
    };

    Ok(FileRecord {
        version: parse_hash(&entry.version)?,
        signature: entry.signature.as_deref().map(parse_hash).transpose()?,
        affects_global_scope: entry.affects_global_scope,
        implied_format,
        original: (!original.is_empty()).then_some(original),
    })
}

fn parse_hash(text: &str) -> Result<ContentHash, DecodeError> {
    text.parse()
        .map_err(|e: skiff_common::ParseHashError| DecodeError::Corrupt(e.to_string()))
}

fn is_compatible(version: &str) -> bool {
    let major = |v: &str| v.split('.').next().and_then(|m| m.parse::<u32>().ok());
    match (major(version), major(BuildInfoCodec::VERSION)) {
        (Some(found), Some(expected)) => found == expected,
        _ => false,
    }
}

/// Every key a serialized [`CompilerOptions`] can contain.
fn known_option_keys() -> BTreeSet<String> {
    let all_set = CompilerOptions {
        out_dir: Some(String::new()),
        root_dir: Some(String::new()),
        build_info_file: Some(String::new()),
        ..CompilerOptions::default()
    };
    match serde_json::to_value(all_set) {
        Ok(Value::Object(map)) => map.into_iter().map(|(k, _)| k).collect(),
        _ => BTreeSet::new(),
    }
}
