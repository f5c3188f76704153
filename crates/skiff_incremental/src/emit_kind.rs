//! Output artifact kinds and how option changes map onto pending emit work.

use bitflags::bitflags;
use skiff_config::CompilerOptions;
use std::fmt;

bitflags! {
    /// Set of output artifacts for a file.
    ///
    /// Persisted as its raw bits in `affectedFilesPendingEmit`.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    pub struct EmitKind: u8 {
        /// JavaScript output.
        const JS = 1 << 0;
        /// External `.js.map` source map.
        const JS_MAP = 1 << 1;
        /// Source map embedded in the `.js` output.
        const JS_INLINE_MAP = 1 << 2;
        /// `.d.ts` declaration output.
        const DTS = 1 << 3;
        /// `.d.ts.map` declaration map.
        const DTS_MAP = 1 << 4;

        /// Every JavaScript-side kind.
        const ALL_JS = Self::JS.bits() | Self::JS_MAP.bits() | Self::JS_INLINE_MAP.bits();
        /// Every declaration-side kind.
        const ALL_DTS = Self::DTS.bits() | Self::DTS_MAP.bits();
    }
}

impl Default for EmitKind {
    fn default() -> Self {
        EmitKind::empty()
    }
}

impl EmitKind {
    /// Kinds the options ask for, ignoring `no_emit`.
    pub fn requested_by(options: &CompilerOptions) -> EmitKind {
        let mut kinds = EmitKind::JS;
        if options.source_map {
            kinds |= EmitKind::JS_MAP;
        }
        if options.inline_source_map {
            kinds |= EmitKind::JS_INLINE_MAP;
        }
        if options.declaration {
            kinds |= EmitKind::DTS;
            if options.declaration_map {
                kinds |= EmitKind::DTS_MAP;
            }
        }
        if options.emit_declaration_only {
            kinds &= EmitKind::ALL_DTS;
        }
        kinds
    }

    /// Kinds the options actually produce. Empty under `no_emit`.
    pub fn enabled_by(options: &CompilerOptions) -> EmitKind {
        if options.no_emit {
            EmitKind::empty()
        } else {
            Self::requested_by(options)
        }
    }

    /// Kinds that must be rewritten for every file when switching from `old`
    /// to `new` enabled kinds.
    ///
    /// Works per family: if any bit of the JS or declaration family differs,
    /// every enabled kind of that family is pending. When nothing was enabled
    /// before, nothing is known to be on disk and all of `new` is pending.
    pub fn pending_on_change(old: EmitKind, new: EmitKind) -> EmitKind {
        if old == new {
            return EmitKind::empty();
        }
        if old.is_empty() {
            return new;
        }
        let diff = old ^ new;
        let mut pending = EmitKind::empty();
        if diff.intersects(EmitKind::ALL_JS) {
            pending |= new & EmitKind::ALL_JS;
        }
        if diff.intersects(EmitKind::ALL_DTS) {
            pending |= new & EmitKind::ALL_DTS;
        }
        pending
    }

    /// The files to write for these kinds, in write order.
    ///
    /// An inline source map lives inside the JavaScript file, so it is
    /// produced by the [`ArtifactKind::Js`] action.
    pub fn artifacts(self) -> impl Iterator<Item = ArtifactKind> {
        ArtifactKind::ALL
            .into_iter()
            .filter(move |artifact| self.intersects(artifact.produced_by()))
    }
}

/// A single output file written for a source file.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum ArtifactKind {
    /// `.js`, possibly with an embedded source map.
    Js,
    /// `.js.map`.
    JsMap,
    /// `.d.ts`.
    Dts,
    /// `.d.ts.map`.
    DtsMap,
}

impl ArtifactKind {
    /// Every artifact kind in write order.
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Js,
        ArtifactKind::JsMap,
        ArtifactKind::Dts,
        ArtifactKind::DtsMap,
    ];

    /// Emit kinds whose pending state is satisfied by writing this artifact.
    pub fn produced_by(self) -> EmitKind {
        match self {
            ArtifactKind::Js => EmitKind::JS | EmitKind::JS_INLINE_MAP,
            ArtifactKind::JsMap => EmitKind::JS_MAP,
            ArtifactKind::Dts => EmitKind::DTS,
            ArtifactKind::DtsMap => EmitKind::DTS_MAP,
        }
    }

    /// Short lowercase name for logs and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Js => "js",
            ArtifactKind::JsMap => "js.map",
            ArtifactKind::Dts => "d.ts",
            ArtifactKind::DtsMap => "d.ts.map",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(f: impl FnOnce(&mut CompilerOptions)) -> CompilerOptions {
        let mut o = CompilerOptions::default();
        f(&mut o);
        o
    }

    #[test]
    fn defaults_enable_js_only() {
        assert_eq!(EmitKind::enabled_by(&CompilerOptions::default()), EmitKind::JS);
    }

    #[test]
    fn options_enable_kinds() {
        let o = options(|o| {
            o.declaration = true;
            o.declaration_map = true;
            o.source_map = true;
        });
        assert_eq!(
            EmitKind::enabled_by(&o),
            EmitKind::JS | EmitKind::JS_MAP | EmitKind::DTS | EmitKind::DTS_MAP
        );
    }

    #[test]
    fn declaration_only_masks_js() {
        let o = options(|o| {
            o.declaration = true;
            o.source_map = true;
            o.emit_declaration_only = true;
        });
        assert_eq!(EmitKind::enabled_by(&o), EmitKind::DTS);
    }

    #[test]
    fn no_emit_enables_nothing_but_keeps_request() {
        let o = options(|o| {
            o.declaration = true;
            o.no_emit = true;
        });
        assert!(EmitKind::enabled_by(&o).is_empty());
        assert_eq!(EmitKind::requested_by(&o), EmitKind::JS | EmitKind::DTS);
    }

    #[test]
    fn source_map_toggle_rewrites_js_family_only() {
        let old = EmitKind::JS | EmitKind::DTS;
        let new = EmitKind::JS | EmitKind::JS_MAP | EmitKind::DTS;
        assert_eq!(
            EmitKind::pending_on_change(old, new),
            EmitKind::JS | EmitKind::JS_MAP
        );
    }

    #[test]
    fn declaration_map_toggle_rewrites_dts_family_only() {
        let old = EmitKind::JS | EmitKind::DTS;
        let new = EmitKind::JS | EmitKind::DTS | EmitKind::DTS_MAP;
        assert_eq!(
            EmitKind::pending_on_change(old, new),
            EmitKind::DTS | EmitKind::DTS_MAP
        );
    }

    #[test]
    fn disabling_a_kind_rewrites_the_rest_of_its_family() {
        let old = EmitKind::JS | EmitKind::JS_MAP;
        let new = EmitKind::JS;
        assert_eq!(EmitKind::pending_on_change(old, new), EmitKind::JS);
    }

    #[test]
    fn leaving_no_emit_rewrites_everything() {
        let new = EmitKind::JS | EmitKind::DTS;
        assert_eq!(EmitKind::pending_on_change(EmitKind::empty(), new), new);
        assert!(EmitKind::pending_on_change(new, new).is_empty());
    }

    #[test]
    fn inline_map_is_written_with_js() {
        let artifacts: Vec<_> = EmitKind::JS_INLINE_MAP.artifacts().collect();
        assert_eq!(artifacts, vec![ArtifactKind::Js]);
        let all: Vec<_> = (EmitKind::ALL_JS | EmitKind::ALL_DTS).artifacts().collect();
        assert_eq!(all, ArtifactKind::ALL.to_vec());
    }

    #[test]
    fn bits_roundtrip() {
        let kinds = EmitKind::JS | EmitKind::DTS_MAP;
        assert_eq!(EmitKind::from_bits_truncate(kinds.bits()), kinds);
    }
}
