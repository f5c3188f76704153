//! Project-relative path helpers.
//!
//! The build engine identifies files by forward-slash paths relative to the
//! project root, independent of the host platform. These helpers keep that
//! representation canonical so a path hashes and compares the same way on
//! every build.

/// Normalizes a project-relative path.
///
/// Backslashes become forward slashes, empty and `.` segments are dropped,
/// and `..` segments cancel the preceding segment. Leading `..` segments that
/// escape the root are kept.
pub fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Returns the directory part of a normalized path, or `""` at the root.
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Returns the final segment of a normalized path.
pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Joins a relative path onto a base directory and normalizes the result.
pub fn join_relative(base_dir: &str, relative: &str) -> String {
    if base_dir.is_empty() {
        normalize_path(relative)
    } else {
        normalize_path(&format!("{base_dir}/{relative}"))
    }
}

/// Returns the path of `target` relative to the directory `from_dir`.
///
/// Both arguments are normalized project-relative paths.
pub fn relative_path(from_dir: &str, target: &str) -> String {
    let from: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = target.split('/').filter(|s| !s.is_empty()).collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();
    let mut parts: Vec<&str> = vec![".."; from.len() - common];
    parts.extend(&to[common..]);
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_dots() {
        assert_eq!(normalize_path("./src/./a.ts"), "src/a.ts");
        assert_eq!(normalize_path("src//b.ts"), "src/b.ts");
    }

    #[test]
    fn normalize_resolves_parent_segments() {
        assert_eq!(normalize_path("src/lib/../a.ts"), "src/a.ts");
        assert_eq!(normalize_path("../shared/a.ts"), "../shared/a.ts");
        assert_eq!(normalize_path("a/../../b.ts"), "../b.ts");
    }

    #[test]
    fn normalize_converts_backslashes() {
        assert_eq!(normalize_path("src\\nested\\a.ts"), "src/nested/a.ts");
    }

    #[test]
    fn parent_and_file_name() {
        assert_eq!(parent_dir("src/nested/a.ts"), "src/nested");
        assert_eq!(parent_dir("a.ts"), "");
        assert_eq!(file_name("src/nested/a.ts"), "a.ts");
        assert_eq!(file_name("a.ts"), "a.ts");
    }

    #[test]
    fn join_relative_specifiers() {
        assert_eq!(join_relative("src", "./b"), "src/b");
        assert_eq!(join_relative("src/lib", "../b.ts"), "src/b.ts");
        assert_eq!(join_relative("", "./b"), "b");
    }

    #[test]
    fn relative_paths() {
        assert_eq!(relative_path("", "src/a.ts"), "src/a.ts");
        assert_eq!(relative_path("out", "src/a.ts"), "../src/a.ts");
        assert_eq!(relative_path("src", "src/a.ts"), "a.ts");
        assert_eq!(relative_path("out/lib", "src/lib/a.ts"), "../../src/lib/a.ts");
    }
}
