//! Version 3 source maps at line granularity.

use base64::Engine;
use serde::Serialize;

const BASE64_DIGITS: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Appends the base64 VLQ encoding of `value`.
pub fn encode_vlq(value: i64, out: &mut String) {
    let mut rest = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };
    loop {
        let mut digit = (rest & 0b1_1111) as usize;
        rest >>= 5;
        if rest > 0 {
            digit |= 0b10_0000;
        }
        out.push(BASE64_DIGITS[digit] as char);
        if rest == 0 {
            break;
        }
    }
}

/// A serialized source map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u32,
    pub file: String,
    pub source_root: String,
    pub sources: Vec<String>,
    pub names: Vec<String>,
    pub mappings: String,
}

impl SourceMap {
    /// Maps each generated line to the start of the source line it came
    /// from; `None` lines are left unmapped.
    pub fn from_lines(file: &str, source: &str, lines: &[Option<u32>]) -> Self {
        let mut mappings = String::new();
        let mut prev_source_line = 0i64;
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                mappings.push(';');
            }
            if let Some(line) = line {
                let line = i64::from(*line);
                encode_vlq(0, &mut mappings);
                encode_vlq(0, &mut mappings);
                encode_vlq(line - prev_source_line, &mut mappings);
                encode_vlq(0, &mut mappings);
                prev_source_line = line;
            }
        }
        Self {
            version: 3,
            file: file.to_string(),
            source_root: String::new(),
            sources: vec![source.to_string()],
            names: Vec::new(),
            mappings,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// The map as a `data:` URL for inline embedding.
    pub fn to_data_url(&self) -> serde_json::Result<String> {
        let json = self.to_json()?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(json);
        Ok(format!("data:application/json;base64,{encoded}"))
    }
}
